use async_trait::async_trait;

use super::counters_model::{LeaderboardEntry, UserCounter};
use crate::errors::Result;

/// Trait defining the contract for the counter consistency engine.
#[async_trait]
pub trait CounterServiceTrait: Send + Sync {
    /// Applies `delta` clicks for `user_id` and returns the post-increment
    /// total. Never blocks on durable persistence.
    async fn increment(&self, user_id: i64, delta: i64) -> Result<u64>;

    /// Reconciled per-user total (max of volatile and durable values, with
    /// best-effort write-back repair of the cache).
    async fn read_user_stable(&self, user_id: i64) -> Result<u64>;

    /// Reconciled global total; seeds the cache from a durable summation on
    /// a cache miss.
    async fn read_global_stable(&self) -> Result<u64>;

    /// Top `limit` leaderboard entries, descending by total.
    async fn get_top(&self, limit: usize) -> Result<Vec<LeaderboardEntry>>;

    /// Ensures the user exists in the durable store and returns their
    /// reconciled state. A supplied username only overwrites a stored one
    /// when it is valid and different.
    async fn get_or_create_user(
        &self,
        user_id: i64,
        username: Option<&str>,
    ) -> Result<UserCounter>;

    /// Re-derives the global total from the durable store and max-merges it
    /// into the cache. Intended for process start.
    async fn warm_up(&self) -> Result<u64>;
}
