//! Sessions module - registry of live broadcast subscriptions.

mod sessions_model;
mod sessions_registry;

// Re-export the public interface
pub use sessions_model::BroadcastSession;
pub use sessions_registry::SessionRegistry;
