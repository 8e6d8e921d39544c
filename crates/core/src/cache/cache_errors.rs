use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Command failed: {0}")]
    Command(#[from] redis::RedisError),

    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid cached value: {0}")]
    InvalidValue(String),
}
