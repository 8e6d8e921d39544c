//! Volatile store adapter - low-latency counters and ranked set over Redis.

mod cache_errors;
mod cache_traits;
mod redis_store;

// Re-export the public interface
pub use cache_errors::CacheError;
pub use cache_traits::{CacheStoreTrait, IncrementBatch};
pub use redis_store::RedisCacheStore;
