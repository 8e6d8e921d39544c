//! Crate-wide constants.

/// Default number of leaderboard entries rendered in broadcasts and API reads.
pub const DEFAULT_TOP_N: usize = 20;

/// Minimum accepted username length.
pub const USERNAME_MIN_LEN: usize = 3;

/// Maximum accepted username length.
pub const USERNAME_MAX_LEN: usize = 32;

/// Upper bound on a durable-store read before the caller degrades to
/// volatile-only data.
pub const DURABLE_READ_TIMEOUT_MS: u64 = 2_000;
