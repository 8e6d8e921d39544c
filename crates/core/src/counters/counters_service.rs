use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{error, warn};
use tokio::time::timeout;

use super::counters_constants::{
    default_username, user_total_key, GLOBAL_TOTAL_KEY, LEADERBOARD_KEY,
};
use super::counters_errors::CounterError;
use super::counters_model::{is_valid_username, LeaderboardEntry, UserCounter};
use super::counters_traits::CounterServiceTrait;
use super::reconcile::reconcile_total;
use crate::cache::{CacheStoreTrait, IncrementBatch};
use crate::constants::DURABLE_READ_TIMEOUT_MS;
use crate::errors::Result;
use crate::store::DurableStoreTrait;

/// The consistency engine between the volatile cache and the durable store.
///
/// Increments hit the cache synchronously and persist in the background;
/// stable reads merge both stores through [`reconcile_total`] and repair
/// the cache in place.
pub struct CounterService {
    cache: Arc<dyn CacheStoreTrait>,
    store: Arc<dyn DurableStoreTrait>,
    durable_timeout: Duration,
}

impl CounterService {
    pub fn new(cache: Arc<dyn CacheStoreTrait>, store: Arc<dyn DurableStoreTrait>) -> Self {
        CounterService {
            cache,
            store,
            durable_timeout: Duration::from_millis(DURABLE_READ_TIMEOUT_MS),
        }
    }

    /// Overrides the bounded durable-read timeout.
    pub fn with_durable_timeout(mut self, durable_timeout: Duration) -> Self {
        self.durable_timeout = durable_timeout;
        self
    }

    /// Spawns the fire-and-forget durable increment. Failure lands in the
    /// log sink, never in a caller's result.
    fn persist_increment(&self, user_id: i64, delta: u64) {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            if let Err(e) = store.increment_total(user_id, delta).await {
                error!("durable increment failed for user {user_id} (+{delta}): {e}");
            }
        });
    }

    /// Durable total under the bounded timeout. `None` means the store was
    /// unreachable or too slow, not that the user has no row.
    async fn durable_total(&self, user_id: i64) -> Option<u64> {
        match timeout(self.durable_timeout, self.store.get_total(user_id)).await {
            Ok(Ok(value)) => Some(value.unwrap_or(0)),
            Ok(Err(e)) => {
                warn!("durable total read failed for user {user_id}: {e}");
                None
            }
            Err(_) => {
                warn!("durable total read timed out for user {user_id}");
                None
            }
        }
    }

    /// Best-effort cache repair after reconciliation. Never fails the read.
    async fn write_back(&self, user_id: i64, total: u64) {
        let key = user_total_key(user_id);
        if let Err(e) = self.cache.set_counter(&key, total).await {
            warn!("cache write-back failed for user {user_id}: {e}");
            return;
        }
        if total > 0 {
            if let Err(e) = self
                .cache
                .rank_member(LEADERBOARD_KEY, &user_id.to_string(), total)
                .await
            {
                warn!("leaderboard repair failed for user {user_id}: {e}");
            }
        }
    }

    /// Leaderboard fallback: volatile ranked set plus a best-effort batch
    /// username lookup for just those ids.
    async fn top_from_cache(&self, limit: usize) -> Result<Vec<LeaderboardEntry>> {
        let members = self.cache.top_members(LEADERBOARD_KEY, limit).await?;
        let ranked: Vec<(i64, u64)> = members
            .into_iter()
            .filter_map(|(member, total)| member.parse::<i64>().ok().map(|id| (id, total)))
            .collect();

        let ids: Vec<i64> = ranked.iter().map(|(id, _)| *id).collect();
        let names = match timeout(self.durable_timeout, self.store.usernames(&ids)).await {
            Ok(Ok(names)) => names,
            Ok(Err(e)) => {
                warn!("username lookup failed on leaderboard fallback: {e}");
                Default::default()
            }
            Err(_) => {
                warn!("username lookup timed out on leaderboard fallback");
                Default::default()
            }
        };

        Ok(ranked
            .into_iter()
            .map(|(user_id, total)| LeaderboardEntry {
                user_id,
                total,
                username: names.get(&user_id).cloned(),
            })
            .collect())
    }
}

#[async_trait]
impl CounterServiceTrait for CounterService {
    async fn increment(&self, user_id: i64, delta: i64) -> Result<u64> {
        // Non-positive deltas count as a single click.
        let delta = if delta <= 0 { 1 } else { delta as u64 };

        let counter_key = user_total_key(user_id);
        let member = user_id.to_string();
        let batch = IncrementBatch {
            counter_key: &counter_key,
            global_key: GLOBAL_TOTAL_KEY,
            board_key: LEADERBOARD_KEY,
            member: &member,
            delta,
        };

        match self.cache.apply_increment(batch).await {
            Ok(new_total) => {
                self.persist_increment(user_id, delta);
                Ok(new_total)
            }
            Err(cache_err) => {
                warn!("volatile increment failed for user {user_id}: {cache_err}");
                // The durable procedure is additive, so it is still safe to
                // fire even though the cache never saw this increment.
                self.persist_increment(user_id, delta);
                match self.durable_total(user_id).await {
                    Some(last_known) => Ok(last_known),
                    None => Err(cache_err),
                }
            }
        }
    }

    async fn read_user_stable(&self, user_id: i64) -> Result<u64> {
        let key = user_total_key(user_id);
        let (volatile_res, durable) =
            tokio::join!(self.cache.get_counter(&key), self.durable_total(user_id));

        let volatile = match volatile_res {
            Ok(value) => Some(value.unwrap_or(0)),
            Err(e) => {
                warn!("volatile read failed for user {user_id}: {e}");
                None
            }
        };

        if volatile.is_none() && durable.is_none() {
            return Err(
                CounterError::Unavailable(format!("stable read for user {user_id}")).into(),
            );
        }

        let total = reconcile_total(volatile.unwrap_or(0), durable.unwrap_or(0));
        if volatile != Some(total) {
            self.write_back(user_id, total).await;
        }
        Ok(total)
    }

    async fn read_global_stable(&self) -> Result<u64> {
        match self.cache.get_counter(GLOBAL_TOTAL_KEY).await {
            Ok(Some(total)) => Ok(total),
            Ok(None) => {
                // Cold cache: re-derive from the durable store and seed it.
                let sum = self.store.sum_totals().await?;
                if let Err(e) = self.cache.set_counter(GLOBAL_TOTAL_KEY, sum).await {
                    warn!("global seed write failed: {e}");
                }
                Ok(sum)
            }
            Err(e) => {
                warn!("volatile global read failed: {e}");
                self.store.sum_totals().await
            }
        }
    }

    async fn get_top(&self, limit: usize) -> Result<Vec<LeaderboardEntry>> {
        match timeout(self.durable_timeout, self.store.top_totals(limit)).await {
            Ok(Ok(rows)) => Ok(rows
                .into_iter()
                .map(|row| LeaderboardEntry {
                    user_id: row.id,
                    total: row.total,
                    username: Some(row.username),
                })
                .collect()),
            Ok(Err(e)) => {
                warn!("durable leaderboard query failed, using cache fallback: {e}");
                self.top_from_cache(limit).await
            }
            Err(_) => {
                warn!("durable leaderboard query timed out, using cache fallback");
                self.top_from_cache(limit).await
            }
        }
    }

    async fn get_or_create_user(
        &self,
        user_id: i64,
        username: Option<&str>,
    ) -> Result<UserCounter> {
        let supplied = username.map(str::trim).filter(|name| is_valid_username(name));
        let existing = self.store.get_user(user_id).await?;

        match (&existing, supplied) {
            (None, Some(name)) => self.store.insert_user_if_absent(user_id, name).await?,
            (None, None) => {
                self.store
                    .insert_user_if_absent(user_id, &default_username(user_id))
                    .await?
            }
            // Never overwrite a stored username with a placeholder, and
            // skip the write entirely when nothing changed.
            (Some(record), Some(name)) if name != record.username => {
                self.store.upsert_user(user_id, name).await?
            }
            _ => {}
        }

        let username = supplied
            .map(String::from)
            .or(existing.map(|record| record.username))
            .unwrap_or_else(|| default_username(user_id));
        let total = self.read_user_stable(user_id).await?;

        Ok(UserCounter {
            id: user_id,
            username,
            total,
        })
    }

    async fn warm_up(&self) -> Result<u64> {
        let sum = self.store.sum_totals().await?;
        let cached = match self.cache.get_counter(GLOBAL_TOTAL_KEY).await {
            Ok(value) => value.unwrap_or(0),
            Err(e) => {
                warn!("volatile global read failed during warm-up: {e}");
                0
            }
        };

        let total = reconcile_total(cached, sum);
        if total != cached {
            if let Err(e) = self.cache.set_counter(GLOBAL_TOTAL_KEY, total).await {
                warn!("global warm-up write failed: {e}");
            }
        }
        Ok(total)
    }
}
