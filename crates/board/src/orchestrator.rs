//! Board orchestrator (C5, §4.5–§4.8): the single `run` entry point that
//! takes a request, a board, and a project, and drives the mode-specific
//! protocol through to a synthesized, checkpointed `AnalysisSession`.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use conclave_llm::ModelBackend;
use conclave_log::InteractionLog;

use crate::error::BoardError;
use crate::model::{AnalysisRequest, AnalysisSession, Board, Mode, Project};
use crate::persistence::SessionPersistence;
use crate::protocol::{run_discussion_round, run_parallel_round};
use crate::state::{cancel, complete, fail, transition_to_running, SessionRegistry};
use crate::synth::{
    build_summary, compute_metrics, confidence_variance_exceeds, extract_evaluation_scores, extract_forecasts,
    group_recommendations, has_converged, rank_insights,
};

/// Runtime knobs the orchestrator needs; populated by the caller from
/// `conclave_config::OrchestratorConfig` so this crate stays decoupled from
/// the config format itself.
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorSettings {
    pub max_concurrent: usize,
    pub analysis_timeout_secs: u64,
    pub grace_period_secs: u64,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self { max_concurrent: 5, analysis_timeout_secs: 300, grace_period_secs: 2 }
    }
}

/// Drive one `AnalysisRequest` against `board` and `project` to completion.
///
/// Re-issuing the same `request_id` against `registry` returns the already
/// recorded session rather than starting a second run (§4.7 idempotency).
/// A zero-member board is rejected before any state transition (§4.2,
/// "Non-goals" notwithstanding — an empty board can never produce quorum).
#[instrument(skip(board, project, backend, log, registry, sink, cancellation), fields(request_id = %request.request_id, mode = ?request.mode))]
#[allow(clippy::too_many_arguments)]
pub async fn run(
    request: AnalysisRequest,
    board: &Board,
    project: &Project,
    backend: &dyn ModelBackend,
    log: &InteractionLog,
    registry: &SessionRegistry,
    sink: Option<&dyn SessionPersistence>,
    settings: OrchestratorSettings,
    cancellation: CancellationToken,
) -> Result<AnalysisSession, BoardError> {
    if let Some(existing) = registry.existing(request.request_id).await {
        info!(session_id = %existing.session_id, "returning existing session for duplicate request_id");
        return Ok(existing);
    }

    if board.is_empty() {
        return Err(BoardError::NoPersonas);
    }

    let mut session = AnalysisSession::pending(&request);
    registry.insert(session.clone()).await;

    transition_to_running(&mut session, chrono::Utc::now());
    registry.update(session.clone()).await;

    let deadline = Duration::from_secs(settings.analysis_timeout_secs);
    let grace = Duration::from_secs(settings.grace_period_secs);

    let run_future = run_protocol(&request, board, project, backend, log, &session, settings, &cancellation);
    tokio::pin!(run_future);

    let outcome: Result<Assembled, BoardError> = tokio::select! {
        biased;
        _ = cancellation.cancelled() => {
            // Allow in-flight turns a grace period to land before declaring cancelled.
            match tokio::time::timeout(grace, &mut run_future).await {
                Ok(result) => result,
                Err(_) => Err(BoardError::Cancelled),
            }
        }
        result = tokio::time::timeout(deadline, &mut run_future) => {
            match result {
                Ok(inner) => inner,
                Err(_) => Err(BoardError::DeadlineExceeded),
            }
        }
    };

    let now = chrono::Utc::now();
    match outcome {
        Ok(assembled) => {
            session.responses = assembled.responses;
            session.persona_errors = assembled.failures;
            session.insights = assembled.insights;
            session.recommendations = assembled.recommendations;
            session.summary = assembled.summary;
            session.metrics = assembled.metrics;
            session.divergence = assembled.divergence;
            session.evaluation_scores = assembled.evaluation_scores;
            session.forecasts = assembled.forecasts;
            complete(&mut session, now);
        }
        Err(BoardError::Cancelled) => cancel(&mut session, now),
        Err(err) => fail(&mut session, err.to_string(), now),
    }

    registry.update(session.clone()).await;
    if let Some(sink) = sink {
        if let Err(err) = sink.checkpoint(&session).await {
            warn!(error = %err, "session checkpoint failed");
            return Err(err);
        }
    }

    if session.status == crate::model::SessionStatus::Failed {
        return Err(BoardError::AllPersonasFailed);
    }
    Ok(session)
}

struct Assembled {
    responses: Vec<crate::model::Response>,
    failures: Vec<crate::model::PersonaFailure>,
    insights: Vec<String>,
    recommendations: std::collections::BTreeMap<Uuid, Vec<String>>,
    summary: String,
    metrics: crate::model::SessionMetrics,
    divergence: bool,
    evaluation_scores: std::collections::BTreeMap<String, f32>,
    forecasts: Vec<String>,
}

/// Snapshot each member persona's expertise areas, keyed by persona id, for
/// the synthesizer's trait-weighted insight ranking (§4.8).
async fn board_expertise(board: &Board) -> std::collections::BTreeMap<Uuid, Vec<String>> {
    let mut expertise = std::collections::BTreeMap::new();
    for member in &board.members {
        let persona = member.persona.lock().await;
        expertise.insert(persona.id, persona.traits.expertise_areas.clone());
    }
    expertise
}

/// Comparison mode (§4.5): template the topic over the two-or-more named
/// options carried in the request's `config_map` (`option_1`, `option_2`,
/// ...). Other modes pass the project topic through unchanged.
fn comparison_topic(request: &AnalysisRequest, topic: &str) -> String {
    if !matches!(request.mode, Mode::Comparison) {
        return topic.to_string();
    }
    let options = request.comparison_options();
    if options.is_empty() {
        return topic.to_string();
    }
    let listed: Vec<String> = options.iter().enumerate().map(|(i, o)| format!("{}. {o}", i + 1)).collect();
    format!("{topic}\n\nCompare the following options and recommend one:\n{}", listed.join("\n"))
}

async fn run_protocol(
    request: &AnalysisRequest,
    board: &Board,
    project: &Project,
    backend: &dyn ModelBackend,
    log: &InteractionLog,
    session: &AnalysisSession,
    settings: OrchestratorSettings,
    cancellation: &CancellationToken,
) -> Result<Assembled, BoardError> {
    let session_id = session.session_id;

    let (responses, failures, divergence) = if request.mode.is_sequential() {
        run_discussion(request, board, project, backend, log, session_id, cancellation).await?
    } else {
        let topic = comparison_topic(request, &project.topic);
        let (responses, failures) = run_parallel_round(
            board,
            request.mode,
            &topic,
            &project.context,
            backend,
            log,
            session_id,
            settings.max_concurrent,
            cancellation,
        )
        .await;
        if responses.is_empty() {
            return Err(BoardError::AllPersonasFailed);
        }
        (responses, failures, false)
    };

    // turn_order must form a gap-free 0..k-1 sequence over *accepted*
    // responses (a failed persona must not leave a hole in the sequence).
    let mut responses = responses;
    for (index, response) in responses.iter_mut().enumerate() {
        response.turn_order = index as u32;
    }

    let persona_expertise = board_expertise(board).await;
    let insights = rank_insights(&responses, &persona_expertise, &project.topic, 10);
    let recommendations = group_recommendations(&responses);
    let summary = build_summary(&responses, insights.first().map(String::as_str));
    let metrics = compute_metrics(&responses);

    let evaluation_scores = if matches!(request.mode, Mode::Evaluation) {
        extract_evaluation_scores(&responses)
    } else {
        std::collections::BTreeMap::new()
    };
    let forecasts =
        if matches!(request.mode, Mode::Prediction) { extract_forecasts(&responses) } else { Vec::new() };

    Ok(Assembled {
        responses,
        failures,
        insights,
        recommendations,
        summary,
        metrics,
        divergence,
        evaluation_scores,
        forecasts,
    })
}

async fn run_discussion(
    request: &AnalysisRequest,
    board: &Board,
    project: &Project,
    backend: &dyn ModelBackend,
    log: &InteractionLog,
    session_id: Uuid,
    cancellation: &CancellationToken,
) -> Result<(Vec<crate::model::Response>, Vec<crate::model::PersonaFailure>, bool), BoardError> {
    let mut conversation = Vec::new();
    let mut all_responses = Vec::new();
    let mut all_failures = Vec::new();
    let mut previous_round: Vec<crate::model::Response> = Vec::new();
    let max_rounds = request.max_rounds();
    let mut divergence = false;

    for round in 0..max_rounds {
        let (round_responses, round_failures) = run_discussion_round(
            board,
            &project.topic,
            &project.context,
            &mut conversation,
            backend,
            log,
            session_id,
            round,
            cancellation,
        )
        .await;

        if round_responses.is_empty() {
            all_failures.extend(round_failures);
            return Err(BoardError::AllPersonasFailed);
        }

        divergence = confidence_variance_exceeds(&round_responses, 0.25);
        let converged = round > 0 && has_converged(&previous_round, &round_responses);

        all_failures.extend(round_failures);
        previous_round = round_responses.clone();
        all_responses.extend(round_responses);

        if converged {
            info!(round, "discussion converged before reaching max_rounds");
            break;
        }
    }

    Ok((all_responses, all_failures, divergence))
}
