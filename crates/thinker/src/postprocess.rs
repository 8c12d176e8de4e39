//! Response post-processing (§4.4 step 7): turns a raw model response into
//! a [`ThinkingResult`] — reasoning tag, confidence, emotional tone, and
//! trait-influence map, alongside the extracted insights/questions/recs.

use std::collections::BTreeMap;

use uuid::Uuid;

use conclave_traits::TraitVector;

use crate::extract::{Extracted, InsightExtractor};
use crate::params::clamp;

const CORE_TRAITS: &[&str] = &["creativity", "analytical", "optimism", "risk_tolerance"];

/// The persona-pipeline's per-turn output, ready to hand to the board
/// orchestrator for assembly into a `Response`.
#[derive(Debug, Clone)]
pub struct ThinkingResult {
    pub content: String,
    pub insights: Vec<String>,
    pub questions: Vec<String>,
    pub recommendations: Vec<String>,
    pub reasoning_tag: String,
    pub confidence: f32,
    pub emotional_tone: String,
    pub traits_influence: BTreeMap<String, f32>,
    pub memories_used: Vec<Uuid>,
    pub tokens_used: u32,
}

fn reasoning_tag(content: &str) -> &'static str {
    let lower = content.to_lowercase();
    const LOGICAL: &[&str] = &["because", "therefore", "given that"];
    const INTUITIVE: &[&str] = &["i feel", "intuitively"];
    if LOGICAL.iter().any(|m| lower.contains(m)) {
        "Logical"
    } else if INTUITIVE.iter().any(|m| lower.contains(m)) {
        "Intuitive"
    } else {
        "Mixed"
    }
}

/// `confidence = clamp(0.7 + (len(content) > 200 ? 0.1 : 0) + (assertiveness + emotional_stability)/20 − 0.5, 0.1, 1.0)`.
fn confidence(content: &str, traits: &TraitVector) -> f32 {
    let length_bonus = if content.len() > 200 { 0.1 } else { 0.0 };
    let assertiveness = traits.get_int("behavior", "assertiveness") as f32;
    let emotional_stability = traits.get_int("behavior", "emotional_stability") as f32;
    let raw = 0.7 + length_bonus + (assertiveness + emotional_stability) / 20.0 - 0.5;
    clamp(raw, 0.1, 1.0)
}

fn emotional_tone(content: &str, traits: &TraitVector) -> String {
    let lower = content.to_lowercase();
    if lower.contains("excited") || lower.contains("amazing") {
        return "enthusiastic".to_string();
    }
    if lower.contains("concerned") || lower.contains("worried") {
        return "cautious".to_string();
    }
    if lower.contains("confident") || lower.contains("certain") {
        return "confident".to_string();
    }
    let optimism = traits.get_int("core", "optimism");
    if optimism >= 7 {
        "optimistic".to_string()
    } else if optimism <= 3 {
        "realistic".to_string()
    } else {
        "balanced".to_string()
    }
}

fn traits_influence(traits: &TraitVector) -> BTreeMap<String, f32> {
    CORE_TRAITS
        .iter()
        .map(|name| (name.to_string(), traits.get_int("core", name) as f32 / 10.0))
        .collect()
}

pub(crate) fn post_process(
    content: String,
    traits: &TraitVector,
    extractor: &dyn InsightExtractor,
    memories_used: Vec<Uuid>,
    tokens_used: u32,
) -> ThinkingResult {
    let Extracted { insights, questions, recommendations } = extractor.extract(&content);
    let reasoning_tag = reasoning_tag(&content).to_string();
    let confidence = confidence(&content, traits);
    let emotional_tone = emotional_tone(&content, traits);
    let traits_influence = traits_influence(traits);

    ThinkingResult {
        content,
        insights,
        questions,
        recommendations,
        reasoning_tag,
        confidence,
        emotional_tone,
        traits_influence,
        memories_used,
        tokens_used,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::DefaultInsightExtractor;
    use conclave_traits::{base_schema, merge, TraitOverlay};

    fn traits() -> TraitVector {
        merge(&base_schema(), &TraitOverlay::default()).unwrap()
    }

    #[test]
    fn reasoning_tag_prefers_logical_markers() {
        assert_eq!(reasoning_tag("This is true because the data shows it."), "Logical");
        assert_eq!(reasoning_tag("I feel this is the right call."), "Intuitive");
        assert_eq!(reasoning_tag("Plain statement."), "Mixed");
    }

    #[test]
    fn confidence_is_clamped() {
        let schema = base_schema();
        let extreme = TraitOverlay::default()
            .with_numeric("behavior", "assertiveness", 10)
            .with_numeric("behavior", "emotional_stability", 10);
        let t = merge(&schema, &extreme).unwrap();
        let c = confidence(&"x".repeat(300), &t);
        assert!(c <= 1.0);
    }

    #[test]
    fn emotional_tone_prefers_lexical_cue_over_trait() {
        let t = traits();
        assert_eq!(emotional_tone("This is amazing news!", &t), "enthusiastic");
    }

    #[test]
    fn post_process_carries_memories_used_through() {
        let id = Uuid::new_v4();
        let result = post_process("hello".to_string(), &traits(), &DefaultInsightExtractor, vec![id], 42);
        assert_eq!(result.memories_used, vec![id]);
        assert_eq!(result.tokens_used, 42);
    }
}
