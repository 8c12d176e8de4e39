use thiserror::Error;

#[derive(Debug, Error)]
pub enum LogError {
    #[error("log persistence failed: {0}")]
    Persistence(String),
}
