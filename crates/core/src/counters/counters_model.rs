//! Counter domain models.

use serde::{Deserialize, Serialize};

use crate::constants::{USERNAME_MAX_LEN, USERNAME_MIN_LEN};

/// Whether a supplied username is acceptable for storage. Anything outside
/// the accepted length is treated as absent by the seeding path, never as
/// an error.
pub fn is_valid_username(name: &str) -> bool {
    let len = name.chars().count();
    (USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len)
}

/// A user together with their reconciled click total.
///
/// `total` is non-decreasing over the lifetime of an id: the two stores are
/// reconciled by taking the maximum observed value, never by summation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserCounter {
    pub id: i64,
    pub username: String,
    pub total: u64,
}

/// Read-only leaderboard projection, ordered descending by total.
///
/// `username` is `None` only on the degraded path where the durable store
/// could not resolve display names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub user_id: i64,
    pub total: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}
