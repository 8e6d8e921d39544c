//! Volatile key schema. Owned by the engine, not the cache adapter.

/// Global click total.
pub const GLOBAL_TOTAL_KEY: &str = "global:total";

/// Ranked set backing the leaderboard fallback path.
pub const LEADERBOARD_KEY: &str = "lb:z";

/// Per-user click total.
pub fn user_total_key(user_id: i64) -> String {
    format!("u:{user_id}:total")
}

/// Placeholder username derived from the id when none was supplied.
pub fn default_username(user_id: i64) -> String {
    format!("user_{user_id}")
}
