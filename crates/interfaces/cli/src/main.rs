//! Thin CLI front-end: builds an in-memory advisory board, submits one
//! `AnalysisRequest` against it, and prints the synthesized
//! `AnalysisSession` as JSON. Demonstrates the core; not the deliverable.

use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use conclave_board::{AnalysisRequest, Board, BoardError, Mode, OrchestratorSettings, Project, SessionRegistry};
use conclave_config::AppConfig;
use conclave_llm::{EchoBackend, HttpBackend, ModelBackend, RetryConfig as LlmRetryConfig, RetryingBackend};
use conclave_log::InteractionLog;
use conclave_memory::{Memory, MemoryConfig};
use conclave_prompt::Identity;
use conclave_thinker::Persona;
use conclave_traits::{base_schema, merge, TraitOverlay};

#[derive(Debug, Parser)]
#[command(name = "conclave", version, about = "Persona reasoning and analysis orchestration engine")]
struct Cli {
    /// Path to a TOML config file; defaults in its absence (§6).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Submit an analysis request against the built-in demo board.
    Run {
        /// The subject the board reasons about.
        #[arg(long)]
        topic: String,
        /// discussion | simulation | analysis | comparison | evaluation | prediction
        #[arg(long, default_value = "discussion")]
        mode: String,
        /// Discussion-mode round count (min 2, ignored by other modes).
        #[arg(long)]
        max_rounds: Option<u32>,
        /// Force the deterministic offline backend regardless of config.
        #[arg(long)]
        offline: bool,
    },
    /// Write a default configuration file to the given path.
    Init {
        #[arg(long, default_value = "conclave.toml")]
        path: PathBuf,
    },
}

fn demo_board() -> Result<Board> {
    let schema = base_schema();

    let analyst_overlay = TraitOverlay::default()
        .with_numeric("core", "analytical", 9)
        .with_numeric("core", "creativity", 4)
        .with_numeric("stance", "data_vs_intuition", 9)
        .with_numeric("stance", "solution_orientation", 8);
    let analyst = merge(&schema, &analyst_overlay).context("building The Analyst's trait vector")?;

    let skeptic_overlay = TraitOverlay::default()
        .with_numeric("stance", "contrarian_level", 9)
        .with_numeric("behavior", "assertiveness", 8)
        .with_numeric("core", "risk_tolerance", 3);
    let skeptic = merge(&schema, &skeptic_overlay).context("building The Skeptic's trait vector")?;

    let optimist_overlay = TraitOverlay::default()
        .with_numeric("core", "optimism", 9)
        .with_numeric("core", "creativity", 8)
        .with_numeric("stance", "data_vs_intuition", 3);
    let optimist = merge(&schema, &optimist_overlay).context("building The Optimist's trait vector")?;

    let board = Board::new("Advisory Board", "A demo three-persona board")
        .with_member(
            Persona::new(
                Identity::new("The Analyst", "Grounds every claim in data and structure."),
                analyst,
                Memory::new(MemoryConfig::default()),
            ),
            Some("analyst".to_string()),
        )
        .with_member(
            Persona::new(
                Identity::new("The Skeptic", "Pressure-tests assumptions before they ship."),
                skeptic,
                Memory::new(MemoryConfig::default()),
            ),
            Some("skeptic".to_string()),
        )
        .with_member(
            Persona::new(
                Identity::new("The Optimist", "Finds the path forward others miss."),
                optimist,
                Memory::new(MemoryConfig::default()),
            ),
            Some("optimist".to_string()),
        );

    Ok(board)
}

fn build_backend(config: &AppConfig, offline: bool) -> Box<dyn ModelBackend> {
    let retry = LlmRetryConfig {
        max_retries: config.retry.max_retries,
        base_delay: std::time::Duration::from_millis(config.retry.base_delay_ms),
        max_delay: std::time::Duration::from_millis(config.retry.max_delay_ms),
        backoff_factor: config.retry.backoff_factor,
    };

    if offline || config.llm.backend == "echo" {
        Box::new(RetryingBackend::new(EchoBackend::new(), retry))
    } else {
        Box::new(RetryingBackend::new(HttpBackend::from_env(), retry))
    }
}

async fn run_command(config: AppConfig, topic: String, mode: String, max_rounds: Option<u32>, offline: bool) -> Result<ExitCode> {
    let mode = Mode::from_str(&mode).map_err(|e| anyhow::anyhow!(e))?;

    let board = demo_board()?;
    let project = Project::new("cli-session", topic);
    let mut request = AnalysisRequest::new(project.id, board.id, mode);
    if let Some(rounds) = max_rounds {
        request.config_map.insert("max_rounds".to_string(), rounds.to_string());
    }

    let backend = build_backend(&config, offline);
    let log = InteractionLog::new();
    let registry = SessionRegistry::new();
    let settings = OrchestratorSettings {
        max_concurrent: config.orchestrator.max_concurrent,
        analysis_timeout_secs: config.orchestrator.analysis_timeout_secs,
        grace_period_secs: config.orchestrator.grace_period_secs,
    };

    let result = conclave_board::run(
        request,
        &board,
        &project,
        backend.as_ref(),
        &log,
        &registry,
        None,
        settings,
        CancellationToken::new(),
    )
    .await;

    match result {
        Ok(session) => {
            println!("{}", serde_json::to_string_pretty(&session)?);
            Ok(ExitCode::from(0))
        }
        Err(err) => {
            eprintln!("{}: {err}", err.kind());
            Ok(exit_code_for(&err))
        }
    }
}

fn exit_code_for(err: &BoardError) -> ExitCode {
    let code: u8 = match err.kind() {
        "ErrBadInput" | "ErrConstraint" => 2,
        "ErrCancelled" => 2,
        "ErrBackendFatal" | "ErrPersistence" | "ErrMemoryCorrupt" | "ErrBusy" => 4,
        "ErrDeadlineExceeded" => 5,
        _ => 1,
    };
    ExitCode::from(code)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(|| PathBuf::from("conclave.toml"));
    let config = AppConfig::load_from(&config_path).context("loading configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.log.level).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match cli.command {
        Commands::Run { topic, mode, max_rounds, offline } => {
            if topic.trim().is_empty() {
                bail!("--topic must not be empty");
            }
            run_command(config, topic, mode, max_rounds, offline).await
        }
        Commands::Init { path } => {
            config.save_to(&path).with_context(|| format!("writing config to {}", path.display()))?;
            println!("wrote default configuration to {}", path.display());
            Ok(ExitCode::from(0))
        }
    }
}
