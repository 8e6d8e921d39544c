//! The reconciliation rule between the volatile and durable stores.
//!
//! Durable writes are fire-and-forget, so the durable value can lag the
//! cache; a cache flush makes the cache lag the durable value. Either way
//! the larger of the two is the most recent truth, so the merge is a plain
//! maximum - never a sum, which would double-count.

/// Resolves a per-counter read against both stores.
pub fn reconcile_total(volatile: u64, durable: u64) -> u64 {
    volatile.max(durable)
}

#[cfg(test)]
mod tests {
    use super::reconcile_total;

    #[test]
    fn durable_lagging_cache_keeps_cache_value() {
        assert_eq!(reconcile_total(10, 7), 10);
    }

    #[test]
    fn flushed_cache_recovers_durable_value() {
        assert_eq!(reconcile_total(0, 42), 42);
    }

    #[test]
    fn equal_values_are_a_fixed_point() {
        assert_eq!(reconcile_total(5, 5), 5);
    }

    #[test]
    fn never_sums() {
        assert_ne!(reconcile_total(3, 4), 7);
    }
}
