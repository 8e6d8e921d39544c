//! Durable store adapter - authoritative totals behind a remote REST backend.

mod rest_store;
mod store_errors;
mod store_model;
mod store_traits;

// Re-export the public interface
pub use rest_store::RestStore;
pub use store_errors::StoreError;
pub use store_model::{LeaderboardRow, UserRecord};
pub use store_traits::DurableStoreTrait;
