use thiserror::Error;

use conclave_llm::BackendError;

/// Errors a persona pipeline's `think` call can raise. Both variants are
/// surfaced to the orchestrator and logged; only `Backend` wraps a
/// retryable-after-exhaustion failure, since retries themselves are
/// handled inside `conclave-llm`'s `RetryingBackend`.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("bad input: {0}")]
    BadInput(String),

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

impl PipelineError {
    /// `true` for errors that originated as a retryable backend failure
    /// which still failed after retries — useful for the orchestrator to
    /// distinguish "this persona's turn failed" from "this request was
    /// malformed and will never succeed".
    pub fn is_backend(&self) -> bool {
        matches!(self, PipelineError::Backend(_))
    }
}
