use std::time::Instant;

use async_trait::async_trait;
use serde_json::json;

use crate::backend::{validate_request, GenerationContext, ModelBackend};
use crate::error::BackendError;
use crate::types::{CostModel, ModelInfo, Request, Response, Usage};

/// Talks to any OpenAI-compatible `/chat/completions` endpoint. Configured
/// entirely from environment variables so a persona board can point at a
/// local proxy, OpenRouter, or a hosted OpenAI-compatible provider without
/// a code change.
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    info: ModelInfo,
}

impl HttpBackend {
    /// Reads `CONCLAVE_LLM_BASE_URL` (default `https://api.openai.com/v1`),
    /// `CONCLAVE_LLM_API_KEY` and `CONCLAVE_LLM_MODEL` (default `gpt-4o-mini`).
    pub fn from_env() -> Self {
        let base_url = std::env::var("CONCLAVE_LLM_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let api_key = std::env::var("CONCLAVE_LLM_API_KEY").ok().filter(|k| !k.trim().is_empty());
        let model = std::env::var("CONCLAVE_LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
            model,
            info: ModelInfo {
                name: "gpt-4o-mini".to_string(),
                provider: "openai-compatible".to_string(),
                max_tokens: 16_384,
                context_size: 128_000,
                cost_per_1k: CostModel { prompt_per_1k: 0.00015, completion_per_1k: 0.0006 },
                capabilities: vec!["text".to_string(), "tool_calling".to_string()],
            },
        }
    }

    pub fn with_model_info(mut self, info: ModelInfo) -> Self {
        self.info = info;
        self
    }
}

#[async_trait]
impl ModelBackend for HttpBackend {
    async fn generate(&self, ctx: &GenerationContext, request: &Request) -> Result<Response, BackendError> {
        if ctx.is_cancelled() {
            return Err(BackendError::Cancelled);
        }
        validate_request(request, &self.info)?;
        self.validate_config()?;

        let model = request.model.as_deref().unwrap_or(&self.model);
        let mut messages = Vec::new();
        if let Some(system_msg) = &request.system_msg {
            messages.push(json!({ "role": "system", "content": system_msg }));
        }
        messages.push(json!({ "role": "user", "content": request.prompt }));

        let payload = json!({
            "model": model,
            "messages": messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });

        let endpoint = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let mut builder = self.client.post(&endpoint).json(&payload);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let start = Instant::now();
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() || e.is_connect() {
                BackendError::Network(e.to_string())
            } else {
                BackendError::Other(e.to_string())
            }
        })?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(BackendError::RateLimited);
        }
        if status.as_u16() == 503 {
            return Err(BackendError::ServiceUnavailable);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Http { status: status.as_u16(), body });
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| BackendError::Other(format!("invalid JSON response: {e}")))?;

        parse_response(&body, model, start.elapsed())
    }

    fn model_info(&self) -> ModelInfo {
        self.info.clone()
    }

    fn validate_config(&self) -> Result<(), BackendError> {
        if self.base_url.trim().is_empty() {
            return Err(BackendError::Config("base_url must not be empty".to_string()));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "http"
    }
}

fn parse_response(body: &serde_json::Value, model: &str, duration: std::time::Duration) -> Result<Response, BackendError> {
    let choice = body.get("choices").and_then(|c| c.get(0));
    let content = choice
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let finish_reason = choice
        .and_then(|c| c.get("finish_reason"))
        .and_then(|v| v.as_str())
        .unwrap_or("stop")
        .to_string();

    let usage_val = body.get("usage");
    let usage = Usage {
        prompt_tokens: usage_val.and_then(|u| u.get("prompt_tokens")).and_then(|v| v.as_u64()).unwrap_or(0) as u32,
        completion_tokens: usage_val.and_then(|u| u.get("completion_tokens")).and_then(|v| v.as_u64()).unwrap_or(0) as u32,
        total_tokens: usage_val.and_then(|u| u.get("total_tokens")).and_then(|v| v.as_u64()).unwrap_or(0) as u32,
    };

    Ok(Response {
        content,
        tokens_used: usage.total_tokens,
        model: model.to_string(),
        duration,
        finish_reason,
        usage,
        metadata: Default::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_response_extracts_content_and_usage() {
        let body = json!({
            "choices": [{"message": {"content": "hello"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        });
        let response = parse_response(&body, "gpt-4o-mini", std::time::Duration::from_millis(1)).unwrap();
        assert_eq!(response.content, "hello");
        assert_eq!(response.usage.total_tokens, 15);
    }

    #[test]
    fn validate_config_rejects_empty_base_url() {
        let mut backend = HttpBackend::from_env();
        backend.base_url = String::new();
        assert!(backend.validate_config().is_err());
    }
}
