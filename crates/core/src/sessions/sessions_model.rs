//! Broadcast session domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One live subscriber: a chat and the message the dispatcher edits in
/// place. Deactivation is the terminal state; records are never removed
/// while the process lives, so `last_pushed` stays available for
/// diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastSession {
    pub chat_id: i64,
    pub message_id: i64,
    pub active: bool,
    pub last_pushed: Option<DateTime<Utc>>,
}

impl BroadcastSession {
    pub fn new(chat_id: i64, message_id: i64) -> Self {
        BroadcastSession {
            chat_id,
            message_id,
            active: true,
            last_pushed: None,
        }
    }

    /// Whether this session is owed a push at `now` given the current
    /// cadence. A session that has never been pushed is always due.
    pub fn is_due(&self, now: DateTime<Utc>, interval_ms: u64) -> bool {
        if !self.active {
            return false;
        }
        match self.last_pushed {
            None => true,
            Some(last) => {
                let elapsed = now.signed_duration_since(last).num_milliseconds();
                elapsed >= interval_ms as i64
            }
        }
    }
}
