//! Application configuration: every key in the configuration surface table
//! consumed by the core at construction, with `Default` impls and a
//! TOML-backed `load_from`/`save_to` pair. Secrets (model API keys) are
//! never stored here — they're read from the environment by the backend
//! that needs them (see `conclave-llm`'s `HttpBackend::from_env`).

use std::fs;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Board orchestrator settings: concurrency, default mode, deadlines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Orchestrator semaphore size (§5).
    pub max_concurrent: usize,
    /// Mode used when a request omits one.
    pub default_mode: String,
    /// Per-session deadline, in seconds.
    pub analysis_timeout_secs: u64,
    /// Grace period awaited after cancellation before abandoning in-flight tasks.
    pub grace_period_secs: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 5,
            default_mode: "discussion".to_string(),
            analysis_timeout_secs: 300,
            grace_period_secs: 2,
        }
    }
}

/// Per-persona memory capacity and decay tuning (§3, §4.2).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub short_term_limit: usize,
    pub long_term_limit: usize,
    pub decay_rate: f32,
    pub decay_floor: f32,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            short_term_limit: 50,
            long_term_limit: 200,
            decay_rate: 0.95,
            decay_floor: 0.1,
        }
    }
}

/// Backend retry policy (§4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 250,
            max_delay_ms: 10_000,
            backoff_factor: 2.0,
        }
    }
}

/// Model backend selection and per-call deadline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// `"echo"` for the offline deterministic backend, `"http"` for an
    /// OpenAI-compatible endpoint (see `CONCLAVE_LLM_*` env vars).
    pub backend: String,
    /// Per-backend-call deadline, in seconds.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self { backend: "echo".to_string(), timeout_secs: 60 }
    }
}

/// Logging verbosity, consumed by the CLI's `tracing-subscriber` setup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

/// The full application configuration tree. Immutable once constructed —
/// every component that needs a knob is handed a (cloned) copy or a
/// borrowed reference at construction time, never a live pointer into this
/// struct.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub orchestrator: OrchestratorConfig,
    pub memory: MemoryConfig,
    pub retry: RetryConfig,
    pub llm: LlmConfig,
    pub log: LogConfig,
}

impl AppConfig {
    /// Load from a TOML file at `path`, falling back to defaults for any
    /// key the file omits and for the file entirely when it doesn't exist.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::default();
        if let Ok(raw) = fs::read_to_string(path) {
            config = toml::from_str(&raw)?;
        }
        Ok(config)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        let rendered = toml::to_string_pretty(self)?;
        fs::write(path, rendered)?;
        Ok(())
    }
}
