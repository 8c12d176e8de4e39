use std::collections::BTreeMap;
use std::time::Instant;

use chrono::Utc;
use tracing::instrument;
use uuid::Uuid;

use conclave_llm::{GenerationContext, ModelBackend, Request};
use conclave_log::{InteractionLog, InteractionLogEntry, Outcome};
use conclave_memory::{MemoryEntry, MemoryEntryType};
use conclave_prompt::{build_system_message, build_user_prompt};

use crate::context::ThinkingContext;
use crate::error::PipelineError;
use crate::extract::InsightExtractor;
use crate::params::{derive_max_tokens, derive_temperature};
use crate::persona::Persona;
use crate::postprocess::{post_process, ThinkingResult};

/// Scan the last `limit` conversation turns (most recent first) for an
/// energizer or frustration trigger, case-insensitively. §4.4 step 1.
fn detect_emotional_state(persona: &Persona, thinking_ctx: &ThinkingContext, limit: usize) -> String {
    if let Some(explicit) = &thinking_ctx.explicit_emotional_state {
        return explicit.clone();
    }

    let recent = thinking_ctx.recent_conversation.iter().rev().take(limit);
    for turn in recent {
        let lower = turn.content.to_lowercase();
        if persona
            .traits
            .emotional_triggers
            .energizers
            .iter()
            .any(|e| lower.contains(&e.to_lowercase()))
        {
            return "excited".to_string();
        }
        if persona
            .traits
            .emotional_triggers
            .frustrations
            .iter()
            .any(|f| lower.contains(&f.to_lowercase()))
        {
            return "frustrated".to_string();
        }
    }
    "neutral".to_string()
}

fn merged_context(thinking_ctx: &ThinkingContext) -> BTreeMap<String, String> {
    let mut merged = thinking_ctx.board_context.clone();
    merged.extend(thinking_ctx.project_context.clone());
    merged
}

/// Run one persona's think step: emotional-state gating, contextual trait
/// modifiers, memory retrieval, prompt assembly, parameter derivation, the
/// backend call, response post-processing, and the resulting memory write.
/// `prompt` is the retrieval query — typically the session topic.
#[instrument(skip(gen_ctx, persona, backend, log, extractor), fields(persona = %persona.id))]
#[allow(clippy::too_many_arguments)]
pub async fn think(
    gen_ctx: &GenerationContext,
    persona: &mut Persona,
    prompt: &str,
    thinking_ctx: &ThinkingContext,
    backend: &dyn ModelBackend,
    log: &InteractionLog,
    extractor: &dyn InsightExtractor,
    session_id: Option<Uuid>,
) -> Result<ThinkingResult, PipelineError> {
    if prompt.trim().is_empty() {
        return Err(PipelineError::BadInput("prompt must not be empty".to_string()));
    }

    // Step 1: emotional state.
    let emotional_state = detect_emotional_state(persona, thinking_ctx, 3);

    // Step 2: contextual trait modifiers, emotional then focus.
    let mut traits = persona.traits.apply_modifier(&emotional_state);
    if let Some(focus) = &thinking_ctx.focus {
        traits = traits.apply_modifier(focus);
    }

    // Step 3: memory retrieval + working-memory rebuild.
    persona.memory.rebuild_working(prompt);
    let relevant_memories = persona.memory.retrieve(prompt, 5);
    let memories_used: Vec<Uuid> = relevant_memories.iter().map(|m| m.id).collect();
    let memory_lines: Vec<String> = relevant_memories.iter().map(|m| m.content.clone()).collect();

    // Step 4: prompt assembly.
    let system_message = build_system_message(&persona.identity, &traits, &emotional_state);
    let context = merged_context(thinking_ctx);
    let user_prompt = build_user_prompt(
        &thinking_ctx.recent_conversation,
        &memory_lines,
        &context,
        &thinking_ctx.topic,
        &traits,
        &emotional_state,
    );

    // Step 5: parameter derivation.
    let temperature = derive_temperature(&traits);
    let max_tokens = derive_max_tokens(&traits);

    let request = Request::new(user_prompt.clone(), temperature, max_tokens).with_system_msg(system_message.clone());

    // Step 6: backend call.
    let start = Instant::now();
    let outcome = backend.generate(gen_ctx, &request).await;
    let duration_ms = start.elapsed().as_millis() as u64;

    let mut log_entry = InteractionLogEntry::new(user_prompt.clone(), backend.model_info().name)
        .with_outcome(Outcome::Ok);
    log_entry.persona_id = Some(persona.id);
    log_entry.session_id = session_id;
    log_entry.system_message = Some(system_message);
    log_entry.temperature = temperature;
    log_entry.max_tokens = max_tokens;
    log_entry.duration_ms = duration_ms;
    log_entry.context_snapshot = context;

    let response = match outcome {
        Ok(response) => response,
        Err(err) => {
            log_entry.outcome = Outcome::Failed;
            log_entry.response = Some(err.to_string());
            log.append(log_entry).await;
            return Err(PipelineError::from(err));
        }
    };

    log_entry.response = Some(response.content.clone());
    log_entry.tokens_used = response.tokens_used;
    log.append(log_entry).await;

    // Step 7: post-processing.
    let result = post_process(response.content, &traits, extractor, memories_used, response.tokens_used);

    // Step 8: memory write.
    let topic = &thinking_ctx.topic;
    persona
        .memory
        .add(
            MemoryEntry::new(MemoryEntryType::Interaction, format!("[prompt] {user_prompt}"))
                .with_weight(0.8)
                .with_tags([topic.clone()]),
        )
        .await;
    persona
        .memory
        .add(
            MemoryEntry::new(MemoryEntryType::Interaction, format!("[response] {}", result.content))
                .with_weight(0.8)
                .with_tags([topic.clone()]),
        )
        .await;
    for insight in &result.insights {
        persona
            .memory
            .add(
                MemoryEntry::new(MemoryEntryType::Knowledge, insight.clone())
                    .with_weight(0.9)
                    .with_tags([topic.clone()]),
            )
            .await;
    }

    persona.memory.update_context("last_interaction_time", Utc::now().to_rfc3339());
    persona.memory.update_context("last_topic", topic.clone());
    persona.memory.update_context("last_emotional_state", emotional_state);

    Ok(result)
}

#[cfg(test)]
mod tests {
    use conclave_llm::EchoBackend;
    use conclave_memory::{Memory, MemoryConfig};
    use conclave_prompt::{ConversationTurn, Identity};
    use conclave_traits::{base_schema, merge, Modifier, TraitOverlay};

    use super::*;

    fn persona_with_overlay(overlay: TraitOverlay) -> Persona {
        let traits = merge(&base_schema(), &overlay).unwrap();
        Persona::new(
            Identity::new("Ada", "a systems thinker"),
            traits,
            Memory::new(MemoryConfig::default()),
        )
    }

    #[tokio::test]
    async fn think_rejects_empty_prompt() {
        let mut persona = persona_with_overlay(TraitOverlay::default());
        let backend = EchoBackend::new();
        let log = InteractionLog::new();
        let result = think(
            &GenerationContext::default(),
            &mut persona,
            "   ",
            &ThinkingContext::new("pricing"),
            &backend,
            &log,
            &crate::extract::DefaultInsightExtractor,
            None,
        )
        .await;
        assert!(matches!(result.unwrap_err(), PipelineError::BadInput(_)));
    }

    #[tokio::test]
    async fn think_writes_memory_and_logs_on_success() {
        let mut persona = persona_with_overlay(TraitOverlay::default());
        let backend = EchoBackend::new();
        let log = InteractionLog::new();
        let session_id = Uuid::new_v4();

        let result = think(
            &GenerationContext::default(),
            &mut persona,
            "pricing strategy",
            &ThinkingContext::new("pricing strategy"),
            &backend,
            &log,
            &crate::extract::DefaultInsightExtractor,
            Some(session_id),
        )
        .await
        .unwrap();

        assert!(result.content.contains("pricing strategy"));
        assert_eq!(persona.memory.get_stats().short_term, 2); // prompt + response
        assert_eq!(log.by_session(session_id).len(), 1);
    }

    #[tokio::test]
    async fn emotional_trigger_selects_excited_state() {
        let overlay = TraitOverlay::default();
        let mut persona = persona_with_overlay(overlay);
        persona.traits.emotional_triggers.energizers = vec!["breakthrough".to_string()];

        let ctx = ThinkingContext::new("topic").with_conversation(vec![ConversationTurn {
            speaker: "Bob".to_string(),
            content: "We just had a huge breakthrough!".to_string(),
            timestamp: Utc::now(),
        }]);
        let state = detect_emotional_state(&persona, &ctx, 3);
        assert_eq!(state, "excited");
    }

    #[tokio::test]
    async fn explicit_emotional_state_skips_detection() {
        let persona = persona_with_overlay(TraitOverlay::default());
        let mut ctx = ThinkingContext::new("topic");
        ctx.explicit_emotional_state = Some("frustrated".to_string());
        assert_eq!(detect_emotional_state(&persona, &ctx, 3), "frustrated");
    }

    #[tokio::test]
    async fn focus_modifier_applies_after_emotional_modifier() {
        let mut overlay = TraitOverlay::default();
        overlay.response_modifiers.insert(
            "neutral".to_string(),
            Modifier::default().with_numeric("core", "creativity", 2),
        );
        overlay.response_modifiers.insert(
            "analysis".to_string(),
            Modifier::default().with_numeric("core", "creativity", 9),
        );
        let mut persona = persona_with_overlay(overlay);
        let backend = EchoBackend::new();
        let log = InteractionLog::new();

        let ctx = ThinkingContext::new("topic").with_focus("analysis");
        think(
            &GenerationContext::default(),
            &mut persona,
            "topic",
            &ctx,
            &backend,
            &log,
            &crate::extract::DefaultInsightExtractor,
            None,
        )
        .await
        .unwrap();
        // Focus applied last, so creativity should read 9 afterward if re-derived.
        let after_focus = persona.traits.apply_modifier("neutral").apply_modifier("analysis");
        assert_eq!(after_focus.get_int("core", "creativity"), 9);
    }
}
