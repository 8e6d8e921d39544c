//! Root error type aggregating the per-module error enums.

use thiserror::Error;

use crate::cache::CacheError;
use crate::counters::CounterError;
use crate::store::StoreError;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the clickrace core.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Cache operation failed: {0}")]
    Cache(#[from] CacheError),

    #[error("Durable store operation failed: {0}")]
    Store(#[from] StoreError),

    #[error("Counter operation failed: {0}")]
    Counter(#[from] CounterError),

    #[error("Input validation failed: {0}")]
    Validation(String),
}
