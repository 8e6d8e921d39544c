use thiserror::Error;

#[derive(Error, Debug)]
pub enum CounterError {
    /// Neither the volatile nor the durable store yielded a value.
    #[error("No store reachable: {0}")]
    Unavailable(String),
}
