use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What happened to a model call once it finished (or didn't).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Ok,
    Retried,
    Failed,
}

/// One append-only record of a model call: inputs, output, timing, tokens,
/// and how it ended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionLogEntry {
    pub id: Uuid,
    pub persona_id: Option<Uuid>,
    pub session_id: Option<Uuid>,
    pub prompt: String,
    pub system_message: Option<String>,
    pub response: Option<String>,
    pub model_name: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub tokens_used: u32,
    pub duration_ms: u64,
    pub context_snapshot: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub outcome: Outcome,
}

impl InteractionLogEntry {
    pub fn new(prompt: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            persona_id: None,
            session_id: None,
            prompt: prompt.into(),
            system_message: None,
            response: None,
            model_name: model_name.into(),
            temperature: 0.0,
            max_tokens: 0,
            tokens_used: 0,
            duration_ms: 0,
            context_snapshot: BTreeMap::new(),
            created_at: Utc::now(),
            outcome: Outcome::Ok,
        }
    }

    pub fn with_persona(mut self, persona_id: Uuid) -> Self {
        self.persona_id = Some(persona_id);
        self
    }

    pub fn with_session(mut self, session_id: Uuid) -> Self {
        self.session_id = Some(session_id);
        self
    }

    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = outcome;
        self
    }
}
