#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::cache::{CacheError, CacheStoreTrait, IncrementBatch};
    use crate::counters::{
        user_total_key, CounterService, CounterServiceTrait, GLOBAL_TOTAL_KEY, LEADERBOARD_KEY,
    };
    use crate::errors::Result;
    use crate::store::{DurableStoreTrait, LeaderboardRow, StoreError, UserRecord};

    #[derive(Default)]
    struct CacheState {
        counters: HashMap<String, u64>,
        board: HashMap<String, u64>,
    }

    /// In-memory volatile store; a single mutex makes the increment batch
    /// observably atomic, like the Redis MULTI it stands in for.
    #[derive(Default)]
    struct MockCacheStore {
        state: Mutex<CacheState>,
        fail: AtomicBool,
    }

    impl MockCacheStore {
        fn set_failing(&self, failing: bool) {
            self.fail.store(failing, Ordering::SeqCst);
        }

        fn guard(&self) -> Result<std::sync::MutexGuard<'_, CacheState>> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(CacheError::Unavailable("mock cache down".to_string()).into());
            }
            Ok(self.state.lock().unwrap())
        }

        fn counter(&self, key: &str) -> Option<u64> {
            self.state.lock().unwrap().counters.get(key).copied()
        }

        fn board_score(&self, member: &str) -> Option<u64> {
            self.state.lock().unwrap().board.get(member).copied()
        }
    }

    #[async_trait]
    impl CacheStoreTrait for MockCacheStore {
        async fn get_counter(&self, key: &str) -> Result<Option<u64>> {
            Ok(self.guard()?.counters.get(key).copied())
        }

        async fn set_counter(&self, key: &str, value: u64) -> Result<()> {
            self.guard()?.counters.insert(key.to_string(), value);
            Ok(())
        }

        async fn apply_increment(&self, batch: IncrementBatch<'_>) -> Result<u64> {
            let mut state = self.guard()?;
            let user = state
                .counters
                .entry(batch.counter_key.to_string())
                .or_insert(0);
            *user += batch.delta;
            let user = *user;
            *state.counters.entry(batch.global_key.to_string()).or_insert(0) += batch.delta;
            *state.board.entry(batch.member.to_string()).or_insert(0) += batch.delta;
            Ok(user)
        }

        async fn rank_member(&self, _board_key: &str, member: &str, score: u64) -> Result<()> {
            self.guard()?.board.insert(member.to_string(), score);
            Ok(())
        }

        async fn top_members(&self, _board_key: &str, limit: usize) -> Result<Vec<(String, u64)>> {
            let state = self.guard()?;
            let mut rows: Vec<(String, u64)> = state
                .board
                .iter()
                .map(|(member, score)| (member.clone(), *score))
                .collect();
            // Descending by score, member as the stable tie-break.
            rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            rows.truncate(limit);
            Ok(rows)
        }
    }

    #[derive(Default)]
    struct DurableState {
        users: HashMap<i64, String>,
        totals: HashMap<i64, u64>,
    }

    #[derive(Default)]
    struct MockDurableStore {
        state: Mutex<DurableState>,
        fail_all: AtomicBool,
        fail_top: AtomicBool,
        fail_names: AtomicBool,
        slow_totals: AtomicBool,
        user_writes: AtomicUsize,
    }

    impl MockDurableStore {
        fn with_user(self, id: i64, username: &str, total: u64) -> Self {
            {
                let mut state = self.state.lock().unwrap();
                state.users.insert(id, username.to_string());
                state.totals.insert(id, total);
            }
            self
        }

        fn check(&self) -> Result<()> {
            if self.fail_all.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("mock store down".to_string()).into());
            }
            Ok(())
        }

        fn total(&self, id: i64) -> Option<u64> {
            self.state.lock().unwrap().totals.get(&id).copied()
        }

        fn username(&self, id: i64) -> Option<String> {
            self.state.lock().unwrap().users.get(&id).cloned()
        }

        fn write_count(&self) -> usize {
            self.user_writes.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DurableStoreTrait for MockDurableStore {
        async fn get_user(&self, user_id: i64) -> Result<Option<UserRecord>> {
            self.check()?;
            Ok(self.username(user_id).map(|username| UserRecord {
                id: user_id,
                username,
            }))
        }

        async fn insert_user_if_absent(&self, user_id: i64, username: &str) -> Result<()> {
            self.check()?;
            self.user_writes.fetch_add(1, Ordering::SeqCst);
            self.state
                .lock()
                .unwrap()
                .users
                .entry(user_id)
                .or_insert_with(|| username.to_string());
            Ok(())
        }

        async fn upsert_user(&self, user_id: i64, username: &str) -> Result<()> {
            self.check()?;
            self.user_writes.fetch_add(1, Ordering::SeqCst);
            self.state
                .lock()
                .unwrap()
                .users
                .insert(user_id, username.to_string());
            Ok(())
        }

        async fn get_total(&self, user_id: i64) -> Result<Option<u64>> {
            self.check()?;
            if self.slow_totals.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(300)).await;
            }
            Ok(self.total(user_id))
        }

        async fn increment_total(&self, user_id: i64, delta: u64) -> Result<()> {
            self.check()?;
            *self
                .state
                .lock()
                .unwrap()
                .totals
                .entry(user_id)
                .or_insert(0) += delta;
            Ok(())
        }

        async fn top_totals(&self, limit: usize) -> Result<Vec<LeaderboardRow>> {
            self.check()?;
            if self.fail_top.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("mock top query down".to_string()).into());
            }
            let state = self.state.lock().unwrap();
            let mut rows: Vec<LeaderboardRow> = state
                .totals
                .iter()
                .map(|(id, total)| LeaderboardRow {
                    id: *id,
                    username: state
                        .users
                        .get(id)
                        .cloned()
                        .unwrap_or_else(|| format!("user_{id}")),
                    total: *total,
                })
                .collect();
            rows.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.id.cmp(&b.id)));
            rows.truncate(limit);
            Ok(rows)
        }

        async fn usernames(&self, user_ids: &[i64]) -> Result<HashMap<i64, String>> {
            self.check()?;
            if self.fail_names.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("mock name lookup down".to_string()).into());
            }
            let state = self.state.lock().unwrap();
            Ok(user_ids
                .iter()
                .filter_map(|id| state.users.get(id).map(|name| (*id, name.clone())))
                .collect())
        }

        async fn sum_totals(&self) -> Result<u64> {
            self.check()?;
            Ok(self.state.lock().unwrap().totals.values().sum())
        }
    }

    fn service(
        cache: &Arc<MockCacheStore>,
        store: &Arc<MockDurableStore>,
    ) -> CounterService {
        CounterService::new(
            Arc::clone(cache) as Arc<dyn CacheStoreTrait>,
            Arc::clone(store) as Arc<dyn DurableStoreTrait>,
        )
    }

    /// Polls until the fire-and-forget durable write lands.
    async fn wait_for_durable_total(store: &MockDurableStore, user_id: i64, expected: u64) {
        for _ in 0..200 {
            if store.total(user_id) == Some(expected) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!(
            "durable total for user {user_id} never reached {expected}, got {:?}",
            store.total(user_id)
        );
    }

    #[tokio::test]
    async fn stable_read_takes_durable_value_and_repairs_cache() {
        let cache = Arc::new(MockCacheStore::default());
        let store = Arc::new(MockDurableStore::default().with_user(1, "alice_a", 9));
        cache
            .set_counter(&user_total_key(1), 5)
            .await
            .unwrap();

        let svc = service(&cache, &store);
        assert_eq!(svc.read_user_stable(1).await.unwrap(), 9);
        assert_eq!(cache.counter(&user_total_key(1)), Some(9));
        assert_eq!(cache.board_score("1"), Some(9));
    }

    #[tokio::test]
    async fn stable_read_keeps_cache_value_when_durable_lags() {
        let cache = Arc::new(MockCacheStore::default());
        let store = Arc::new(MockDurableStore::default().with_user(1, "alice_a", 7));
        cache
            .set_counter(&user_total_key(1), 10)
            .await
            .unwrap();

        let svc = service(&cache, &store);
        assert_eq!(svc.read_user_stable(1).await.unwrap(), 10);
        assert_eq!(cache.counter(&user_total_key(1)), Some(10));
    }

    #[tokio::test]
    async fn flushed_cache_recovers_persisted_total() {
        let cache = Arc::new(MockCacheStore::default());
        let store = Arc::new(MockDurableStore::default().with_user(3, "carol_c", 7));

        let svc = service(&cache, &store);
        // Nothing in the cache at all - a simulated flush.
        assert_eq!(svc.read_user_stable(3).await.unwrap(), 7);
        assert_eq!(cache.counter(&user_total_key(3)), Some(7));
    }

    #[tokio::test]
    async fn stable_read_degrades_to_volatile_when_durable_is_down() {
        let cache = Arc::new(MockCacheStore::default());
        let store = Arc::new(MockDurableStore::default());
        store.fail_all.store(true, Ordering::SeqCst);
        cache.set_counter(&user_total_key(4), 6).await.unwrap();

        let svc = service(&cache, &store);
        assert_eq!(svc.read_user_stable(4).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn stable_read_degrades_to_volatile_on_durable_timeout() {
        let cache = Arc::new(MockCacheStore::default());
        let store = Arc::new(MockDurableStore::default().with_user(4, "dave_d", 100));
        store.slow_totals.store(true, Ordering::SeqCst);
        cache.set_counter(&user_total_key(4), 5).await.unwrap();

        let svc = service(&cache, &store).with_durable_timeout(Duration::from_millis(50));
        assert_eq!(svc.read_user_stable(4).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn stable_read_fails_only_when_both_stores_are_down() {
        let cache = Arc::new(MockCacheStore::default());
        let store = Arc::new(MockDurableStore::default());
        cache.set_failing(true);
        store.fail_all.store(true, Ordering::SeqCst);

        let svc = service(&cache, &store);
        assert!(svc.read_user_stable(4).await.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_increments_lose_nothing() {
        let cache = Arc::new(MockCacheStore::default());
        let store = Arc::new(MockDurableStore::default().with_user(42, "answer_42", 0));
        let svc = Arc::new(service(&cache, &store));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let svc = Arc::clone(&svc);
            handles.push(tokio::spawn(async move { svc.increment(42, 1).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(svc.read_user_stable(42).await.unwrap(), 5);
        assert_eq!(cache.counter(GLOBAL_TOTAL_KEY), Some(5));

        wait_for_durable_total(&store, 42, 5).await;
        let top = svc.get_top(1).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].user_id, 42);
        assert_eq!(top[0].total, 5);
    }

    #[tokio::test]
    async fn increment_coerces_non_positive_delta_to_one() {
        let cache = Arc::new(MockCacheStore::default());
        let store = Arc::new(MockDurableStore::default());
        let svc = service(&cache, &store);

        assert_eq!(svc.increment(5, 0).await.unwrap(), 1);
        assert_eq!(svc.increment(5, -8).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn increment_falls_back_to_durable_value_on_cache_outage() {
        let cache = Arc::new(MockCacheStore::default());
        let store = Arc::new(MockDurableStore::default().with_user(7, "grace_g", 3));
        cache.set_failing(true);

        let svc = service(&cache, &store);
        // Last-known durable value, not an error. The detached write may or
        // may not have landed by the time the fallback read runs.
        let returned = svc.increment(7, 1).await.unwrap();
        assert!(returned == 3 || returned == 4, "got {returned}");
        // The detached durable increment still fires.
        wait_for_durable_total(&store, 7, 4).await;
    }

    #[tokio::test]
    async fn increment_fails_when_no_fallback_is_obtainable() {
        let cache = Arc::new(MockCacheStore::default());
        let store = Arc::new(MockDurableStore::default());
        cache.set_failing(true);
        store.fail_all.store(true, Ordering::SeqCst);

        let svc = service(&cache, &store);
        assert!(svc.increment(7, 1).await.is_err());
    }

    #[tokio::test]
    async fn increment_persists_durably_in_the_background() {
        let cache = Arc::new(MockCacheStore::default());
        let store = Arc::new(MockDurableStore::default());
        let svc = service(&cache, &store);

        assert_eq!(svc.increment(11, 3).await.unwrap(), 3);
        wait_for_durable_total(&store, 11, 3).await;
    }

    #[tokio::test]
    async fn leaderboard_prefers_durable_rows_and_orders_descending() {
        let cache = Arc::new(MockCacheStore::default());
        let store = Arc::new(
            MockDurableStore::default()
                .with_user(1, "alice_a", 30)
                .with_user(2, "bob_bb", 20)
                .with_user(3, "carol_c", 10),
        );
        let svc = service(&cache, &store);

        let top = svc.get_top(2).await.unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].user_id, 1);
        assert_eq!(top[0].username.as_deref(), Some("alice_a"));
        assert!(top[0].total > top[1].total);

        // Stability: a second identical query returns the same order.
        assert_eq!(svc.get_top(2).await.unwrap(), top);
    }

    #[tokio::test]
    async fn leaderboard_falls_back_to_cache_with_name_lookup() {
        let cache = Arc::new(MockCacheStore::default());
        let store = Arc::new(
            MockDurableStore::default()
                .with_user(1, "alice_a", 0)
                .with_user(2, "bob_bb", 0),
        );
        store.fail_top.store(true, Ordering::SeqCst);
        cache.rank_member(LEADERBOARD_KEY, "1", 30).await.unwrap();
        cache.rank_member(LEADERBOARD_KEY, "2", 20).await.unwrap();

        let svc = service(&cache, &store);
        let top = svc.get_top(10).await.unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].user_id, 1);
        assert_eq!(top[0].total, 30);
        assert_eq!(top[0].username.as_deref(), Some("alice_a"));
        assert_eq!(top[1].username.as_deref(), Some("bob_bb"));
    }

    #[tokio::test]
    async fn leaderboard_fallback_tolerates_missing_names() {
        let cache = Arc::new(MockCacheStore::default());
        let store = Arc::new(MockDurableStore::default());
        store.fail_top.store(true, Ordering::SeqCst);
        store.fail_names.store(true, Ordering::SeqCst);
        cache.rank_member(LEADERBOARD_KEY, "1", 30).await.unwrap();

        let svc = service(&cache, &store);
        let top = svc.get_top(10).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].username, None);
    }

    #[tokio::test]
    async fn empty_state_returns_empty_leaderboard() {
        let cache = Arc::new(MockCacheStore::default());
        let store = Arc::new(MockDurableStore::default());
        let svc = service(&cache, &store);

        assert!(svc.get_top(20).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn seeding_is_idempotent_for_identical_usernames() {
        let cache = Arc::new(MockCacheStore::default());
        let store = Arc::new(MockDurableStore::default());
        let svc = service(&cache, &store);

        let first = svc.get_or_create_user(9, Some("zed_zzz")).await.unwrap();
        assert_eq!(first.username, "zed_zzz");
        assert_eq!(store.write_count(), 1);

        let second = svc.get_or_create_user(9, Some("zed_zzz")).await.unwrap();
        assert_eq!(second.username, "zed_zzz");
        // No second write for an unchanged username.
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn placeholder_never_overwrites_a_real_username() {
        let cache = Arc::new(MockCacheStore::default());
        let store = Arc::new(MockDurableStore::default().with_user(5, "realname", 0));
        let svc = service(&cache, &store);

        let user = svc.get_or_create_user(5, None).await.unwrap();
        assert_eq!(user.username, "realname");
        assert_eq!(store.write_count(), 0);

        // Too short to be valid - treated as absent, not as an update.
        let user = svc.get_or_create_user(5, Some("ab")).await.unwrap();
        assert_eq!(user.username, "realname");
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn new_user_gets_derived_placeholder() {
        let cache = Arc::new(MockCacheStore::default());
        let store = Arc::new(MockDurableStore::default());
        let svc = service(&cache, &store);

        let user = svc.get_or_create_user(1234, None).await.unwrap();
        assert_eq!(user.username, "user_1234");
        assert_eq!(user.total, 0);
        assert_eq!(store.username(1234).as_deref(), Some("user_1234"));
    }

    #[tokio::test]
    async fn explicit_username_change_is_stored() {
        let cache = Arc::new(MockCacheStore::default());
        let store = Arc::new(MockDurableStore::default().with_user(6, "before", 0));
        let svc = service(&cache, &store);

        let user = svc.get_or_create_user(6, Some("after_name")).await.unwrap();
        assert_eq!(user.username, "after_name");
        assert_eq!(store.username(6).as_deref(), Some("after_name"));
    }

    #[tokio::test]
    async fn global_read_seeds_cache_from_durable_summation() {
        let cache = Arc::new(MockCacheStore::default());
        let store = Arc::new(
            MockDurableStore::default()
                .with_user(1, "alice_a", 4)
                .with_user(2, "bob_bb", 6),
        );
        let svc = service(&cache, &store);

        assert_eq!(svc.read_global_stable().await.unwrap(), 10);
        assert_eq!(cache.counter(GLOBAL_TOTAL_KEY), Some(10));

        // Warm cache short-circuits the summation even when totals move.
        store.increment_total(1, 5).await.unwrap();
        assert_eq!(svc.read_global_stable().await.unwrap(), 10);
    }

    #[tokio::test]
    async fn warm_up_max_merges_the_global_total() {
        let cache = Arc::new(MockCacheStore::default());
        let store = Arc::new(MockDurableStore::default().with_user(1, "alice_a", 9));
        cache.set_counter(GLOBAL_TOTAL_KEY, 2).await.unwrap();

        let svc = service(&cache, &store);
        assert_eq!(svc.warm_up().await.unwrap(), 9);
        assert_eq!(cache.counter(GLOBAL_TOTAL_KEY), Some(9));

        // A cache already ahead of the summation is left alone.
        cache.set_counter(GLOBAL_TOTAL_KEY, 50).await.unwrap();
        assert_eq!(svc.warm_up().await.unwrap(), 50);
        assert_eq!(cache.counter(GLOBAL_TOTAL_KEY), Some(50));
    }
}
