use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A generation request. `model` overrides the backend's default model when
/// present; `context_map` carries free-form metadata a backend may choose
/// to log or forward (e.g. persona id, session id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub prompt: String,
    #[serde(default)]
    pub system_msg: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub context_map: BTreeMap<String, String>,
}

impl Request {
    pub fn new(prompt: impl Into<String>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            prompt: prompt.into(),
            system_msg: None,
            temperature,
            max_tokens,
            model: None,
            context_map: BTreeMap::new(),
        }
    }

    pub fn with_system_msg(mut self, msg: impl Into<String>) -> Self {
        self.system_msg = Some(msg.into());
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub content: String,
    pub tokens_used: u32,
    pub model: String,
    pub duration: Duration,
    pub finish_reason: String,
    pub usage: Usage,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// Per-1000-token pricing. Some providers charge completion tokens at a
/// multiple of the prompt price; that's captured here rather than hard-coded
/// at the call site.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CostModel {
    pub prompt_per_1k: f64,
    pub completion_per_1k: f64,
}

impl CostModel {
    pub fn free() -> Self {
        Self { prompt_per_1k: 0.0, completion_per_1k: 0.0 }
    }

    pub fn cost(&self, usage: &Usage) -> f64 {
        (usage.prompt_tokens as f64 / 1000.0) * self.prompt_per_1k
            + (usage.completion_tokens as f64 / 1000.0) * self.completion_per_1k
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub provider: String,
    pub max_tokens: u32,
    pub context_size: u32,
    pub cost_per_1k: CostModel,
    pub capabilities: Vec<String>,
}
