//! Dispatcher timing constants.
//!
//! The fixed tick decides *whether anything is due*; the adaptive cadence
//! decides *how due*. The two timers are deliberately distinct.

/// Fixed internal tick of the scheduling loop.
pub const TICK_MS: u64 = 300;

/// Push interval at process start, before any load signal arrives.
pub const DEFAULT_INTERVAL_MS: u64 = 1_000;

/// Lower bound on the push interval.
pub const MIN_INTERVAL_MS: u64 = 750;

/// Upper bound on the push interval; rate-limit backoff saturates here.
pub const MAX_INTERVAL_MS: u64 = 5_000;

/// Amount added to the interval per rate-limited push.
pub const BACKOFF_STEP_MS: u64 = 500;

/// Load thresholds: fewer subscribers get snappier updates, more
/// subscribers get a longer interval to bound total channel traffic.
pub fn interval_for_load(active_sessions: usize) -> u64 {
    if active_sessions < 1_000 {
        750
    } else if active_sessions < 2_500 {
        1_500
    } else {
        3_000
    }
}
