use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use super::cache_errors::CacheError;
use super::cache_traits::{CacheStoreTrait, IncrementBatch};
use crate::errors::Result;

/// Redis-backed volatile store.
///
/// Holds a multiplexed connection; each operation clones it, so concurrent
/// callers share one socket without locking.
pub struct RedisCacheStore {
    conn: MultiplexedConnection,
}

impl RedisCacheStore {
    /// Connects to the Redis instance at `url` (e.g. `redis://localhost:6379`).
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(CacheError::Command)?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(CacheError::Command)?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl CacheStoreTrait for RedisCacheStore {
    async fn get_counter(&self, key: &str) -> Result<Option<u64>> {
        let mut conn = self.conn.clone();
        let value: Option<u64> = conn.get(key).await.map_err(CacheError::Command)?;
        Ok(value)
    }

    async fn set_counter(&self, key: &str, value: u64) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.set(key, value).await.map_err(CacheError::Command)?;
        Ok(())
    }

    async fn apply_increment(&self, batch: IncrementBatch<'_>) -> Result<u64> {
        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        pipe.atomic()
            .incr(batch.counter_key, batch.delta)
            .incr(batch.global_key, batch.delta)
            .zincr(batch.board_key, batch.member, batch.delta as f64);
        let (user_total, _global_total, _score): (u64, u64, f64) = pipe
            .query_async(&mut conn)
            .await
            .map_err(CacheError::Command)?;
        Ok(user_total)
    }

    async fn rank_member(&self, board_key: &str, member: &str, score: u64) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .zadd(board_key, member, score as f64)
            .await
            .map_err(CacheError::Command)?;
        Ok(())
    }

    async fn top_members(&self, board_key: &str, limit: usize) -> Result<Vec<(String, u64)>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.clone();
        let rows: Vec<(String, f64)> = conn
            .zrevrange_withscores(board_key, 0, limit as isize - 1)
            .await
            .map_err(CacheError::Command)?;
        Ok(rows
            .into_iter()
            .map(|(member, score)| (member, score.max(0.0) as u64))
            .collect())
    }
}
