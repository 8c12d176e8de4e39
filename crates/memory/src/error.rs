use thiserror::Error;

/// Errors surfaced by the memory store.
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("memory blob is malformed and was rejected: {0}")]
    Corrupt(String),

    #[error("persistence sink failed: {0}")]
    Persistence(String),
}
