use std::collections::HashMap;

use async_trait::async_trait;

use super::store_model::{LeaderboardRow, UserRecord};
use crate::errors::Result;

/// Trait defining the contract for the authoritative durable store.
///
/// All operations are point reads/writes or bounded queries against a
/// remote backend; a non-2xx response surfaces as a failed operation,
/// never a panic.
#[async_trait]
pub trait DurableStoreTrait: Send + Sync {
    /// Point read of a user identity row.
    async fn get_user(&self, user_id: i64) -> Result<Option<UserRecord>>;

    /// Inserts the user if absent; an existing row (and its username) is
    /// left untouched.
    async fn insert_user_if_absent(&self, user_id: i64, username: &str) -> Result<()>;

    /// Inserts or overwrites the user's username.
    async fn upsert_user(&self, user_id: i64, username: &str) -> Result<()>;

    /// Point read of a persisted per-user total.
    async fn get_total(&self, user_id: i64) -> Result<Option<u64>>;

    /// Invokes the server-side atomic increment procedure.
    async fn increment_total(&self, user_id: i64, delta: u64) -> Result<()>;

    /// Ordered top-N totals joined with usernames, descending.
    async fn top_totals(&self, limit: usize) -> Result<Vec<LeaderboardRow>>;

    /// Batch username lookup for the given ids.
    async fn usernames(&self, user_ids: &[i64]) -> Result<HashMap<i64, String>>;

    /// Full-scan sum of all persisted totals. O(users) - warm-up only.
    async fn sum_totals(&self) -> Result<u64>;
}
