//! Mode-specific turn protocols (§4.5): how a board moves from a request to
//! a set of per-persona responses. Parallel modes (simulation, analysis,
//! comparison, evaluation, prediction) fan every persona's turn out at once,
//! bounded by a semaphore; discussion is sequential round-robin, rotating
//! the speaking order by one seat each round so the same persona doesn't
//! always open.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};
use uuid::Uuid;

use conclave_llm::{GenerationContext, ModelBackend};
use conclave_log::InteractionLog;
use conclave_prompt::ConversationTurn;
use conclave_thinker::{think, DefaultInsightExtractor, ThinkingContext};

use crate::model::{Board, Mode, PersonaFailure, Response};

/// One persona's turn attempt: `Ok` on an accepted response, `Err` naming
/// the persona and the failure reason so the caller can decide whether the
/// session as a whole still has a quorum.
async fn run_one_turn(
    board_index: usize,
    board: &Board,
    thinking_ctx: ThinkingContext,
    backend: &dyn ModelBackend,
    log: &InteractionLog,
    session_id: Uuid,
    turn_order: u32,
    cancellation: &CancellationToken,
) -> Result<Response, PersonaFailure> {
    let member = &board.members[board_index];
    let mut persona = member.persona.lock().await;
    let persona_id = persona.id;

    let gen_ctx = GenerationContext::new(cancellation.clone());
    let result = think(
        &gen_ctx,
        &mut persona,
        &thinking_ctx.topic,
        &thinking_ctx,
        backend,
        log,
        &DefaultInsightExtractor,
        Some(session_id),
    )
    .await;

    match result {
        Ok(r) => Ok(Response {
            id: Uuid::new_v4(),
            session_id,
            persona_id,
            content: r.content,
            reasoning_tag: r.reasoning_tag,
            confidence: r.confidence,
            emotional_tone: r.emotional_tone,
            turn_order,
            memories_used: r.memories_used,
            traits_influence: r.traits_influence,
            token_usage: r.tokens_used,
            created_at: Utc::now(),
            insights: r.insights,
            recommendations: r.recommendations,
        }),
        Err(err) => {
            warn!(persona = %persona_id, error = %err, "persona turn failed");
            Err(PersonaFailure { persona_id, reason: err.to_string() })
        }
    }
}

/// Fan every persona's turn out at once, bounded by `max_concurrent`. Used
/// by every mode except discussion (§4.5). A cancelled token short-circuits
/// turns that haven't started yet but lets in-flight ones finish naturally
/// through the backend's own cancellation awareness.
#[instrument(skip(board, backend, log, cancellation), fields(board_id = %board.id))]
pub async fn run_parallel_round(
    board: &Board,
    mode: Mode,
    topic: &str,
    board_context: &std::collections::BTreeMap<String, String>,
    backend: &dyn ModelBackend,
    log: &InteractionLog,
    session_id: Uuid,
    max_concurrent: usize,
    cancellation: &CancellationToken,
) -> (Vec<Response>, Vec<PersonaFailure>) {
    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let mut handles = Vec::with_capacity(board.members.len());

    for (index, _) in board.members.iter().enumerate() {
        let semaphore = semaphore.clone();
        let mut ctx = ThinkingContext::new(topic.to_string());
        ctx.board_context = board_context.clone();
        if let Some(focus) = mode.focus_tag() {
            ctx = ctx.with_focus(focus);
        }

        let board = board.clone();
        let cancellation = cancellation.clone();
        handles.push(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore never closed");
            if cancellation.is_cancelled() {
                return None;
            }
            let result =
                run_one_turn(index, &board, ctx, backend, log, session_id, index as u32, &cancellation).await;
            Some(result)
        });
    }

    let results = futures::future::join_all(handles).await;

    let mut responses = Vec::new();
    let mut failures = Vec::new();
    for outcome in results.into_iter().flatten() {
        match outcome {
            Ok(response) => responses.push(response),
            Err(failure) => failures.push(failure),
        }
    }
    (responses, failures)
}

/// Sequential round-robin discussion turn (§4.5): every persona speaks once
/// per round, in an order that rotates by one seat each round, and each
/// persona's prompt carries the full conversation so far as
/// `recent_conversation`.
#[instrument(skip(board, backend, log, cancellation, conversation), fields(board_id = %board.id, round))]
#[allow(clippy::too_many_arguments)]
pub async fn run_discussion_round(
    board: &Board,
    topic: &str,
    board_context: &std::collections::BTreeMap<String, String>,
    conversation: &mut Vec<ConversationTurn>,
    backend: &dyn ModelBackend,
    log: &InteractionLog,
    session_id: Uuid,
    round: u32,
    cancellation: &CancellationToken,
) -> (Vec<Response>, Vec<PersonaFailure>) {
    let member_count = board.members.len();
    let mut responses = Vec::with_capacity(member_count);
    let mut failures = Vec::new();

    for seat in 0..member_count {
        if cancellation.is_cancelled() {
            break;
        }
        // Rotate the speaking order by `round` seats so the same persona
        // doesn't always lead.
        let index = (seat + round as usize) % member_count;

        let mut ctx = ThinkingContext::new(topic.to_string());
        ctx.board_context = board_context.clone();
        ctx.recent_conversation = conversation.clone();

        let turn_order = round * member_count as u32 + seat as u32;
        match run_one_turn(index, board, ctx, backend, log, session_id, turn_order, cancellation).await {
            Ok(response) => {
                let member = &board.members[index];
                let speaker = member
                    .role_tag
                    .clone()
                    .unwrap_or_else(|| response.persona_id.to_string());
                conversation.push(ConversationTurn {
                    speaker,
                    content: response.content.clone(),
                    timestamp: response.created_at,
                });
                responses.push(response);
            }
            Err(failure) => failures.push(failure),
        }
    }

    (responses, failures)
}
