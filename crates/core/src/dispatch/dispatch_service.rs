use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use log::warn;
use tokio::task::JoinHandle;
use tokio::time::interval;

use super::cadence::DispatchCadence;
use super::dispatch_constants::TICK_MS;
use super::dispatch_render::{render_update, welcome_keyboard};
use super::dispatch_traits::{Keyboard, MessengerError, MessengerTrait};
use crate::constants::DEFAULT_TOP_N;
use crate::counters::{CounterServiceTrait, LeaderboardEntry};
use crate::sessions::{BroadcastSession, SessionRegistry};

/// Dispatcher configuration, resolved once at bootstrap.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Fixed internal tick of the scheduling loop.
    pub tick: Duration,
    /// Leaderboard size rendered into every broadcast.
    pub top_n: usize,
    /// URL behind the Mini App keyboard button.
    pub miniapp_url: String,
}

impl DispatchConfig {
    pub fn new(miniapp_url: impl Into<String>) -> Self {
        DispatchConfig {
            tick: Duration::from_millis(TICK_MS),
            top_n: DEFAULT_TOP_N,
            miniapp_url: miniapp_url.into(),
        }
    }
}

/// How a single push ended; drives session state and cadence updates.
enum PushOutcome {
    Delivered,
    RateLimited,
    Gone,
    Failed,
    Skipped,
}

/// The periodic loop that edits every subscriber's live message.
///
/// Owns the cadence and mutates the session registry; both are plain
/// constructor-injected state, shared by handle with the subscribe path.
pub struct DispatchService {
    counters: Arc<dyn CounterServiceTrait>,
    registry: Arc<SessionRegistry>,
    messenger: Arc<dyn MessengerTrait>,
    cadence: DispatchCadence,
    config: DispatchConfig,
}

impl DispatchService {
    pub fn new(
        counters: Arc<dyn CounterServiceTrait>,
        registry: Arc<SessionRegistry>,
        messenger: Arc<dyn MessengerTrait>,
        config: DispatchConfig,
    ) -> Self {
        DispatchService {
            counters,
            registry,
            messenger,
            cadence: DispatchCadence::new(),
            config,
        }
    }

    pub fn cadence(&self) -> &DispatchCadence {
        &self.cadence
    }

    /// Spawns the scheduling loop. Every tick is fully handled inside
    /// `tick`; nothing in the loop can take the process down.
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let dispatcher = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval(dispatcher.config.tick);
            loop {
                ticker.tick().await;
                dispatcher.tick(Utc::now()).await;
            }
        })
    }

    /// One pass of the loop: refresh the cadence from the load signal,
    /// select due sessions, push to all of them concurrently.
    pub async fn tick(&self, now: DateTime<Utc>) {
        self.cadence.apply_load(self.registry.active_count());

        let due = self
            .registry
            .due_sessions(now, self.cadence.current_interval_ms());
        if due.is_empty() {
            return;
        }

        // One shared snapshot per tick regardless of subscriber count.
        let (global, top) = tokio::join!(
            self.counters.read_global_stable(),
            self.counters.get_top(self.config.top_n)
        );
        let (global_total, top) = match (global, top) {
            (Ok(global_total), Ok(top)) => (global_total, top),
            (global, top) => {
                if let Err(e) = global {
                    warn!("global snapshot fetch failed, skipping tick: {e}");
                }
                if let Err(e) = top {
                    warn!("leaderboard snapshot fetch failed, skipping tick: {e}");
                }
                return;
            }
        };

        let keyboard = welcome_keyboard(&self.config.miniapp_url);
        let outcomes = join_all(
            due.iter()
                .map(|session| self.push_session(session, now, global_total, &top, &keyboard)),
        )
        .await;

        let any_delivered = outcomes
            .iter()
            .any(|outcome| matches!(outcome, PushOutcome::Delivered));
        let any_rate_limited = outcomes
            .iter()
            .any(|outcome| matches!(outcome, PushOutcome::RateLimited));
        if any_delivered && !any_rate_limited {
            self.cadence.clear_backoff();
        }
    }

    /// Pushes one session's update. Every failure is classified here and
    /// never escapes to sibling pushes or the loop.
    async fn push_session(
        &self,
        session: &BroadcastSession,
        now: DateTime<Utc>,
        global_total: u64,
        top: &[LeaderboardEntry],
        keyboard: &Keyboard,
    ) -> PushOutcome {
        // Broadcasts go to private chats, so the chat id is the user id.
        let user_total = match self.counters.read_user_stable(session.chat_id).await {
            Ok(total) => total,
            Err(e) => {
                warn!(
                    "subscriber total fetch failed for chat {}: {e}",
                    session.chat_id
                );
                return PushOutcome::Skipped;
            }
        };

        let text = render_update(user_total, global_total, top);
        match self
            .messenger
            .edit_message(session.chat_id, session.message_id, &text, keyboard)
            .await
        {
            Ok(()) => {
                self.registry.mark_pushed(session.chat_id, now);
                PushOutcome::Delivered
            }
            Err(MessengerError::RateLimited { .. }) => {
                self.cadence.note_rate_limited();
                PushOutcome::RateLimited
            }
            Err(MessengerError::MessageGone) => {
                self.registry.deactivate(session.chat_id);
                PushOutcome::Gone
            }
            Err(MessengerError::Delivery(reason)) => {
                warn!("push to chat {} failed: {reason}", session.chat_id);
                PushOutcome::Failed
            }
        }
    }
}
