use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::BackendError;
use crate::types::{ModelInfo, Request, Response};

/// Ambient call context threaded through `generate` — currently just
/// cancellation, but kept as its own type so new cross-cutting concerns
/// (deadlines, tracing spans) don't change the trait's signature.
#[derive(Debug, Clone, Default)]
pub struct GenerationContext {
    pub cancellation: Option<CancellationToken>,
}

impl GenerationContext {
    pub fn new(cancellation: CancellationToken) -> Self {
        Self { cancellation: Some(cancellation) }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.as_ref().is_some_and(|t| t.is_cancelled())
    }
}

/// A model backend: something that turns a [`Request`] into a [`Response`].
/// Implementations range from a deterministic offline stub to an HTTP call
/// to a hosted model.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn generate(&self, ctx: &GenerationContext, request: &Request) -> Result<Response, BackendError>;

    fn model_info(&self) -> ModelInfo;

    /// Check the backend is usable (credentials present, endpoint reachable
    /// in principle) without making a network call where avoidable.
    fn validate_config(&self) -> Result<(), BackendError>;

    fn name(&self) -> &str;
}

/// Precondition checks every backend's `generate` should run before doing
/// any work: non-empty prompt, temperature and token bounds, and token
/// budget against the backend's own ceiling.
pub fn validate_request(request: &Request, info: &ModelInfo) -> Result<(), BackendError> {
    if request.prompt.trim().is_empty() {
        return Err(BackendError::InvalidRequest("prompt must not be empty".into()));
    }
    if !(0.0..=2.0).contains(&request.temperature) {
        return Err(BackendError::InvalidRequest(format!(
            "temperature {} out of range [0, 2]",
            request.temperature
        )));
    }
    if request.max_tokens == 0 || request.max_tokens > 32_768 {
        return Err(BackendError::InvalidRequest(format!(
            "max_tokens {} out of range (0, 32768]",
            request.max_tokens
        )));
    }
    if request.max_tokens > info.max_tokens {
        return Err(BackendError::InvalidRequest(format!(
            "max_tokens {} exceeds model ceiling {}",
            request.max_tokens, info.max_tokens
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CostModel;

    fn info() -> ModelInfo {
        ModelInfo {
            name: "test-model".into(),
            provider: "test".into(),
            max_tokens: 4096,
            context_size: 8192,
            cost_per_1k: CostModel::free(),
            capabilities: vec![],
        }
    }

    #[test]
    fn rejects_empty_prompt() {
        let req = Request::new("   ", 0.5, 100);
        assert!(validate_request(&req, &info()).is_err());
    }

    #[test]
    fn rejects_temperature_out_of_range() {
        let req = Request::new("hi", 2.5, 100);
        assert!(validate_request(&req, &info()).is_err());
    }

    #[test]
    fn rejects_max_tokens_above_model_ceiling() {
        let req = Request::new("hi", 0.5, 5000);
        assert!(validate_request(&req, &info()).is_err());
    }

    #[test]
    fn accepts_well_formed_request() {
        let req = Request::new("hi", 0.5, 100);
        assert!(validate_request(&req, &info()).is_ok());
    }
}
