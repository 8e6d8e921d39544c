//! Counters module - the consistency engine between the volatile cache and
//! the durable store.

mod counters_constants;
mod counters_errors;
mod counters_model;
mod counters_service;
mod counters_traits;
mod reconcile;

#[cfg(test)]
mod counters_service_tests;

// Re-export the public interface
pub use counters_constants::*;
pub use counters_errors::CounterError;
pub use counters_model::{is_valid_username, LeaderboardEntry, UserCounter};
pub use counters_service::CounterService;
pub use counters_traits::CounterServiceTrait;
pub use reconcile::reconcile_total;
