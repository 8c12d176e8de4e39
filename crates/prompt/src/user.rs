use std::collections::BTreeMap;

use conclave_traits::TraitVector;

use crate::identity::ConversationTurn;

/// Build the user prompt block: recent conversation, retrieved memories,
/// project context, the topic, then a response-guidance suffix gated on
/// specific trait thresholds and the current emotional state.
pub fn build_user_prompt(
    recent: &[ConversationTurn],
    memories: &[String],
    project_context: &BTreeMap<String, String>,
    topic: &str,
    traits: &TraitVector,
    emotional_state: &str,
) -> String {
    let mut sections = Vec::new();

    if !recent.is_empty() {
        let lines: Vec<String> = recent.iter().map(|t| format!("{}: {}", t.speaker, t.content)).collect();
        sections.push(format!("Recent conversation:\n{}", lines.join("\n")));
    }

    if !memories.is_empty() {
        sections.push(format!("Relevant memories:\n{}", memories.join("\n")));
    }

    if !project_context.is_empty() {
        let lines: Vec<String> = project_context.iter().map(|(k, v)| format!("{k}: {v}")).collect();
        sections.push(format!("Project context:\n{}", lines.join("\n")));
    }

    sections.push(format!("Topic: {topic}"));

    sections.push(response_guidance(traits, emotional_state));

    sections.join("\n\n")
}

fn response_guidance(traits: &TraitVector, emotional_state: &str) -> String {
    let mut guidance = Vec::new();

    if traits.get_int("stance", "contrarian_level") >= 7 {
        guidance.push("Challenge the premise where you disagree.".to_string());
    }
    if traits.get_int("stance", "solution_orientation") >= 7 {
        guidance.push("Favor concrete next steps over open-ended discussion.".to_string());
    }
    let data_vs_intuition = traits.get_int("stance", "data_vs_intuition");
    if data_vs_intuition >= 8 {
        guidance.push("Ground your response in data and evidence.".to_string());
    } else if data_vs_intuition <= 3 {
        guidance.push("Trust your intuition over raw data.".to_string());
    }
    guidance.push(format!("Let your {emotional_state} state color your tone."));

    format!("Response guidance:\n{}", guidance.join(" "))
}
