use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::backend::{GenerationContext, ModelBackend};
use crate::error::BackendError;
use crate::types::{ModelInfo, Request, Response};

#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(10),
            backoff_factor: 2.0,
        }
    }
}

impl RetryConfig {
    /// Delay before retry attempt `n` (1-indexed), capped at `max_delay`.
    fn delay_for(&self, attempt: u32) -> Duration {
        let scaled = self.base_delay.as_secs_f64() * self.backoff_factor.powi(attempt as i32 - 1);
        Duration::from_secs_f64(scaled).min(self.max_delay)
    }
}

/// Wraps a [`ModelBackend`], retrying retryable errors with exponential
/// backoff. Cancellation aborts immediately, even mid-backoff.
pub struct RetryingBackend<B> {
    inner: B,
    config: RetryConfig,
}

impl<B: ModelBackend> RetryingBackend<B> {
    pub fn new(inner: B, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl<B: ModelBackend> ModelBackend for RetryingBackend<B> {
    async fn generate(&self, ctx: &GenerationContext, request: &Request) -> Result<Response, BackendError> {
        let mut attempt = 0u32;
        loop {
            if ctx.is_cancelled() {
                return Err(BackendError::Cancelled);
            }

            match self.inner.generate(ctx, request).await {
                Ok(response) => return Ok(response),
                Err(err) if err.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let delay = self.config.delay_for(attempt);
                    warn!(attempt, ?delay, %err, "retrying backend call");

                    if let Some(token) = &ctx.cancellation {
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => {}
                            _ = token.cancelled() => return Err(BackendError::Cancelled),
                        }
                    } else {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn model_info(&self) -> ModelInfo {
        self.inner.model_info()
    }

    fn validate_config(&self) -> Result<(), BackendError> {
        self.inner.validate_config()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
