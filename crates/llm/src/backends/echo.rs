use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::backend::{validate_request, GenerationContext, ModelBackend};
use crate::error::BackendError;
use crate::types::{CostModel, ModelInfo, Request, Response, Usage};

/// A deterministic, offline backend: echoes the prompt back with a fixed
/// prefix. Used for tests and for running the board without network access.
#[derive(Debug, Clone)]
pub struct EchoBackend {
    model_name: String,
}

impl EchoBackend {
    pub fn new() -> Self {
        Self { model_name: "echo-1".to_string() }
    }
}

impl Default for EchoBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelBackend for EchoBackend {
    async fn generate(&self, ctx: &GenerationContext, request: &Request) -> Result<Response, BackendError> {
        if ctx.is_cancelled() {
            return Err(BackendError::Cancelled);
        }
        let info = self.model_info();
        validate_request(request, &info)?;

        let start = Instant::now();
        let content = format!("[echo] {}", request.prompt);
        let prompt_tokens = request.prompt.split_whitespace().count() as u32;
        let completion_tokens = content.split_whitespace().count() as u32;

        Ok(Response {
            content,
            tokens_used: prompt_tokens + completion_tokens,
            model: request.model.clone().unwrap_or(self.model_name.clone()),
            duration: start.elapsed(),
            finish_reason: "stop".to_string(),
            usage: Usage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            },
            metadata: Default::default(),
        })
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            name: self.model_name.clone(),
            provider: "echo".to_string(),
            max_tokens: 32_768,
            context_size: 32_768,
            cost_per_1k: CostModel::free(),
            capabilities: vec!["text".to_string()],
        }
    }

    fn validate_config(&self) -> Result<(), BackendError> {
        Ok(())
    }

    fn name(&self) -> &str {
        "echo"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echoes_prompt_back() {
        let backend = EchoBackend::new();
        let response = backend
            .generate(&GenerationContext::default(), &Request::new("hello board", 0.5, 100))
            .await
            .unwrap();
        assert!(response.content.contains("hello board"));
    }

    #[tokio::test]
    async fn rejects_invalid_request() {
        let backend = EchoBackend::new();
        let result = backend.generate(&GenerationContext::default(), &Request::new("", 0.5, 100)).await;
        assert!(matches!(result.unwrap_err(), BackendError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn cancellation_aborts_before_generation() {
        let token = tokio_util::sync::CancellationToken::new();
        token.cancel();
        let backend = EchoBackend::new();
        let result = backend
            .generate(&GenerationContext::new(token), &Request::new("hi", 0.5, 100))
            .await;
        assert!(matches!(result.unwrap_err(), BackendError::Cancelled));
    }
}
