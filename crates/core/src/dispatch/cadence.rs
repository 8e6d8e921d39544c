use std::sync::atomic::{AtomicU64, Ordering};

use super::dispatch_constants::{
    interval_for_load, BACKOFF_STEP_MS, DEFAULT_INTERVAL_MS, MAX_INTERVAL_MS, MIN_INTERVAL_MS,
};

/// Process-wide push cadence.
///
/// Two inputs mutate it: the load rule (which may raise or lower the base
/// interval) and rate-limit backoff (an upward-only floor that persists
/// until a push cycle completes with at least one success and no
/// rate-limiting). Both use atomic read-modify-write so concurrent pushes
/// within one tick lose no update.
pub struct DispatchCadence {
    base_ms: AtomicU64,
    backoff_ms: AtomicU64,
    min_ms: u64,
    max_ms: u64,
    step_ms: u64,
}

impl Default for DispatchCadence {
    fn default() -> Self {
        DispatchCadence {
            base_ms: AtomicU64::new(DEFAULT_INTERVAL_MS),
            backoff_ms: AtomicU64::new(0),
            min_ms: MIN_INTERVAL_MS,
            max_ms: MAX_INTERVAL_MS,
            step_ms: BACKOFF_STEP_MS,
        }
    }
}

impl DispatchCadence {
    pub fn new() -> Self {
        Self::default()
    }

    /// The interval the scheduling loop uses right now.
    pub fn current_interval_ms(&self) -> u64 {
        let base = self.base_ms.load(Ordering::SeqCst);
        let floor = self.backoff_ms.load(Ordering::SeqCst);
        base.max(floor).clamp(self.min_ms, self.max_ms)
    }

    /// Applies the load rule. May raise or lower the base interval; an
    /// active backoff floor still wins until cleared.
    pub fn apply_load(&self, active_sessions: usize) {
        let interval = interval_for_load(active_sessions).clamp(self.min_ms, self.max_ms);
        self.base_ms.store(interval, Ordering::SeqCst);
    }

    /// Raises the backoff floor one step above the current interval,
    /// saturating at the maximum. CAS loop so two pushes in the same tick
    /// both land their step.
    pub fn note_rate_limited(&self) {
        let base = self.base_ms.load(Ordering::SeqCst);
        let _ = self
            .backoff_ms
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |floor| {
                let current = floor.max(base);
                Some((current + self.step_ms).min(self.max_ms))
            });
    }

    /// Clears the backoff floor after a clean push cycle, letting the load
    /// rule lower the interval again.
    pub fn clear_backoff(&self) {
        self.backoff_ms.store(0, Ordering::SeqCst);
    }
}
