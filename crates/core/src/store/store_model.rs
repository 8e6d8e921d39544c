//! Row shapes returned by the durable backend.

use serde::{Deserialize, Serialize};

/// A user identity row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
}

/// One row of the ordered leaderboard view (totals pre-joined with
/// usernames by the backend).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LeaderboardRow {
    pub id: i64,
    pub username: String,
    pub total: u64,
}
