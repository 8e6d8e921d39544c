use chrono::{DateTime, Utc};
use dashmap::DashMap;

use super::sessions_model::BroadcastSession;

/// In-memory table of broadcast subscriptions, keyed by chat id.
///
/// Mutation happens from the dispatcher's tick loop and from the
/// subscribe/unsubscribe calls of the messaging adapter; DashMap entry
/// locking serializes writers per chat, and since every subscriber drives
/// only its own chat, last-writer-wins is sufficient.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<i64, BroadcastSession>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or reactivates the session for `chat_id` and resets its edit
    /// target. Push history is preserved across re-subscribes.
    pub fn subscribe(&self, chat_id: i64, message_id: i64) {
        self.sessions
            .entry(chat_id)
            .and_modify(|session| {
                session.message_id = message_id;
                session.active = true;
            })
            .or_insert_with(|| BroadcastSession::new(chat_id, message_id));
    }

    /// Deactivates the session without deleting its record.
    pub fn unsubscribe(&self, chat_id: i64) {
        if let Some(mut session) = self.sessions.get_mut(&chat_id) {
            session.active = false;
        }
    }

    /// Marks a successful push.
    pub fn mark_pushed(&self, chat_id: i64, now: DateTime<Utc>) {
        if let Some(mut session) = self.sessions.get_mut(&chat_id) {
            session.last_pushed = Some(now);
        }
    }

    /// Terminal transition when the edit target no longer exists.
    pub fn deactivate(&self, chat_id: i64) {
        self.unsubscribe(chat_id);
    }

    /// Number of currently active sessions - the load signal for the
    /// cadence rule.
    pub fn active_count(&self) -> usize {
        self.sessions.iter().filter(|entry| entry.active).count()
    }

    /// Snapshot of the active sessions owed a push at `now`.
    pub fn due_sessions(&self, now: DateTime<Utc>, interval_ms: u64) -> Vec<BroadcastSession> {
        self.sessions
            .iter()
            .filter(|entry| entry.is_due(now, interval_ms))
            .map(|entry| entry.clone())
            .collect()
    }

    pub fn get(&self, chat_id: i64) -> Option<BroadcastSession> {
        self.sessions.get(&chat_id).map(|entry| entry.clone())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
