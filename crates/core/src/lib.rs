//! Clickrace Core - counter consistency engine and broadcast dispatcher.
//!
//! This crate contains the core business logic for Clickrace. It is
//! transport-agnostic: the volatile and durable stores and the outbound
//! messaging channel are trait seams implemented by adapters (Redis, a
//! REST relational backend, the Telegram Bot API).

pub mod cache;
pub mod constants;
pub mod counters;
pub mod dispatch;
pub mod errors;
pub mod sessions;
pub mod store;

// Re-export common types
pub use counters::{CounterService, CounterServiceTrait, LeaderboardEntry, UserCounter};
pub use dispatch::{DispatchConfig, DispatchService, MessengerTrait};
pub use sessions::SessionRegistry;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
