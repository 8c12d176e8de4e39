use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use conclave_thinker::Persona;

/// The mode-specific protocol the orchestrator runs over a board (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Discussion,
    Simulation,
    Analysis,
    Comparison,
    Evaluation,
    Prediction,
}

impl Mode {
    /// The focus tag a parallel-turn mode passes to `ThinkingContext`.
    /// Discussion has no single focus tag — every round re-derives one from
    /// the conversation instead.
    pub fn focus_tag(self) -> Option<&'static str> {
        match self {
            Mode::Discussion => None,
            Mode::Simulation => Some("simulation"),
            Mode::Analysis => Some("analysis"),
            Mode::Comparison => Some("comparison"),
            Mode::Evaluation => Some("evaluation"),
            Mode::Prediction => Some("prediction"),
        }
    }

    pub fn is_sequential(self) -> bool {
        matches!(self, Mode::Discussion)
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "discussion" => Ok(Mode::Discussion),
            "simulation" => Ok(Mode::Simulation),
            "analysis" => Ok(Mode::Analysis),
            "comparison" => Ok(Mode::Comparison),
            "evaluation" => Ok(Mode::Evaluation),
            "prediction" => Ok(Mode::Prediction),
            other => Err(format!("unknown mode \"{other}\"")),
        }
    }
}

/// One persona's seat on a board: the shared, mutex-guarded persona plus an
/// optional role label. Wrapped in a mutex (rather than requiring `&mut
/// Persona` exclusivity at the board level) because the orchestrator's
/// per-persona memory writes must serialize through the *same* persona
/// across concurrent turns (§5) without blocking unrelated personas.
#[derive(Clone)]
pub struct BoardMember {
    pub persona: Arc<Mutex<Persona>>,
    pub role_tag: Option<String>,
}

/// An ordered collection of personas (§3).
#[derive(Clone)]
pub struct Board {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub is_template: bool,
    pub members: Vec<BoardMember>,
    pub metadata: BTreeMap<String, String>,
}

impl Board {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            is_template: false,
            members: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_member(mut self, persona: Persona, role_tag: Option<String>) -> Self {
        self.members.push(BoardMember { persona: Arc::new(Mutex::new(persona)), role_tag });
        self
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// The external collaborator that supplies a topic and context map to an
/// `AnalysisRequest`.
#[derive(Debug, Clone)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub topic: String,
    pub context: BTreeMap<String, String>,
}

impl Project {
    pub fn new(name: impl Into<String>, topic: impl Into<String>) -> Self {
        Self { id: Uuid::new_v4(), name: name.into(), topic: topic.into(), context: BTreeMap::new() }
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub request_id: Uuid,
    pub project_id: Uuid,
    pub board_id: Uuid,
    pub mode: Mode,
    pub config_map: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
}

impl AnalysisRequest {
    pub fn new(project_id: Uuid, board_id: Uuid, mode: Mode) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            project_id,
            board_id,
            mode,
            config_map: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    /// `max_rounds` for discussion mode, defaulting to a minimum of 2.
    pub fn max_rounds(&self) -> u32 {
        self.config_map
            .get("max_rounds")
            .and_then(|v| v.parse().ok())
            .unwrap_or(2)
            .max(2)
    }

    /// Named options for comparison mode, in `option_1`, `option_2`, ... order.
    pub fn comparison_options(&self) -> Vec<String> {
        let mut options: Vec<(usize, String)> = self
            .config_map
            .iter()
            .filter_map(|(k, v)| k.strip_prefix("option_").and_then(|n| n.parse::<usize>().ok()).map(|n| (n, v.clone())))
            .collect();
        options.sort_by_key(|(n, _)| *n);
        options.into_iter().map(|(_, v)| v).collect()
    }
}

/// §4.7: the lifecycle states of an `AnalysisSession`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Failed | SessionStatus::Cancelled)
    }
}

/// A single persona's accepted turn within a session (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub id: Uuid,
    pub session_id: Uuid,
    pub persona_id: Uuid,
    pub content: String,
    pub reasoning_tag: String,
    pub confidence: f32,
    pub emotional_tone: String,
    pub turn_order: u32,
    pub memories_used: Vec<Uuid>,
    pub traits_influence: BTreeMap<String, f32>,
    pub token_usage: u32,
    pub created_at: DateTime<Utc>,
    /// Lines the pipeline's post-processing flagged as insights (§4.4 step
    /// 7) — carried on the `Response` so the synthesizer can aggregate
    /// without re-deriving them from raw content.
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
}

/// A persona whose turn failed (after any internal retries) within a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaFailure {
    pub persona_id: Uuid,
    pub reason: String,
}

/// Aggregate metrics computed by the synthesizer (§4.8).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionMetrics {
    pub mean_confidence: f32,
    pub response_count: usize,
    pub total_tokens: u32,
    pub total_duration_ms: u64,
}

/// The full result of one orchestrator run (§3, §4.7, §4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSession {
    pub session_id: Uuid,
    pub request_id: Uuid,
    pub status: SessionStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: u64,
    pub responses: Vec<Response>,
    pub insights: Vec<String>,
    pub recommendations: BTreeMap<Uuid, Vec<String>>,
    pub summary: String,
    pub metrics: SessionMetrics,
    pub persona_errors: Vec<PersonaFailure>,
    pub error: Option<String>,
    /// Discussion-mode divergence flag (§4.8): confidence variance in the
    /// final round exceeded 0.25.
    pub divergence: bool,
    /// Evaluation-mode per-criterion scores, averaged across personas.
    pub evaluation_scores: BTreeMap<String, f32>,
    /// Prediction-mode forecast lines with an elicited probability, if any.
    pub forecasts: Vec<String>,
}

impl AnalysisSession {
    pub fn pending(request: &AnalysisRequest) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            request_id: request.request_id,
            status: SessionStatus::Pending,
            started_at: None,
            completed_at: None,
            duration_ms: 0,
            responses: Vec::new(),
            insights: Vec::new(),
            recommendations: BTreeMap::new(),
            summary: String::new(),
            metrics: SessionMetrics::default(),
            persona_errors: Vec::new(),
            error: None,
            divergence: false,
            evaluation_scores: BTreeMap::new(),
            forecasts: Vec::new(),
        }
    }
}
