use async_trait::async_trait;

use crate::errors::Result;

/// The three updates a single increment must apply to the volatile store as
/// one indivisible batch: the per-user counter, the global counter, and the
/// ranked-set entry for the user.
#[derive(Debug, Clone)]
pub struct IncrementBatch<'a> {
    pub counter_key: &'a str,
    pub global_key: &'a str,
    pub board_key: &'a str,
    pub member: &'a str,
    pub delta: u64,
}

/// Trait defining the contract for the volatile (low-latency) store.
///
/// Implementations carry no business logic; key naming is owned by the
/// consistency engine.
#[async_trait]
pub trait CacheStoreTrait: Send + Sync {
    /// Reads a counter value. `None` when the key has never been written
    /// (or the cache was flushed).
    async fn get_counter(&self, key: &str) -> Result<Option<u64>>;

    /// Overwrites a counter value (write-back repair path).
    async fn set_counter(&self, key: &str, value: u64) -> Result<()>;

    /// Applies an increment batch atomically and returns the post-increment
    /// per-user counter value.
    async fn apply_increment(&self, batch: IncrementBatch<'_>) -> Result<u64>;

    /// Sets a ranked-set member to an absolute score (ZADD semantics).
    async fn rank_member(&self, board_key: &str, member: &str, score: u64) -> Result<()>;

    /// Top `limit` ranked-set members with scores, descending.
    async fn top_members(&self, board_key: &str, limit: usize) -> Result<Vec<(String, u64)>>;
}
