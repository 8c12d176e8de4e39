use conclave_traits::TraitVector;

use crate::identity::Identity;

const HIGH_SALIENCE_CORE: &[(&str, &str)] = &[
    ("core", "creativity"),
    ("core", "analytical"),
    ("core", "optimism"),
    ("core", "risk_tolerance"),
];

/// Build the system message: identity, communication register, the core
/// traits salient enough to call out explicitly, expertise, phrasing
/// habits, current emotional state and threshold-gated behavioral
/// instructions.
pub fn build_system_message(identity: &Identity, traits: &TraitVector, emotional_state: &str) -> String {
    let mut sections = Vec::new();

    sections.push(format!("You are {}. {}", identity.name, identity.description));

    sections.push(format!(
        "Communication style: formality {}/10, directness {}/10, verbosity {}.",
        traits.get_int("communication", "formality"),
        traits.get_int("communication", "directness"),
        traits.get_str("communication", "verbosity"),
    ));

    let salient: Vec<String> = HIGH_SALIENCE_CORE
        .iter()
        .filter_map(|(category, name)| {
            let value = traits.get_int(category, name);
            (value >= 8 || value <= 3).then(|| format!("{name} {value}/10"))
        })
        .collect();
    if !salient.is_empty() {
        sections.push(format!("Notable traits: {}.", salient.join(", ")));
    }

    if !traits.expertise_areas.is_empty() {
        sections.push(format!("Your expertise: {}.", traits.expertise_areas.join(", ")));
    }

    let common: Vec<&String> = traits.speaking_patterns.common_phrases.iter().take(3).collect();
    if !common.is_empty() {
        let phrases: Vec<&str> = common.iter().map(|s| s.as_str()).collect();
        sections.push(format!("Phrases you favor: {}.", phrases.join(", ")));
    }
    let avoided: Vec<&String> = traits.speaking_patterns.avoided_phrases.iter().take(2).collect();
    if !avoided.is_empty() {
        let phrases: Vec<&str> = avoided.iter().map(|s| s.as_str()).collect();
        sections.push(format!("Phrases you avoid: {}.", phrases.join(", ")));
    }

    sections.push(format!("Your current emotional state is {emotional_state}."));

    let mut behaviors = Vec::new();
    if traits.get_int("behavior", "question_tendency") >= 7 {
        behaviors.push("Ask clarifying questions where useful.");
    }
    if traits.get_int("behavior", "example_usage") >= 7 {
        behaviors.push("Illustrate points with concrete examples.");
    }
    if !behaviors.is_empty() {
        sections.push(behaviors.join(" "));
    }

    sections.join("\n")
}

#[cfg(test)]
mod tests {
    use conclave_traits::{base_schema, merge, TraitOverlay};

    use super::*;

    #[test]
    fn high_salience_trait_is_mentioned_when_extreme() {
        let schema = base_schema();
        let overlay = TraitOverlay::default().with_numeric("core", "creativity", 9);
        let traits = merge(&schema, &overlay).unwrap();
        let identity = Identity::new("Ada", "a systems thinker");
        let message = build_system_message(&identity, &traits, "neutral");
        assert!(message.contains("creativity 9/10"));
    }

    #[test]
    fn mid_range_trait_is_not_mentioned() {
        let schema = base_schema();
        let overlay = TraitOverlay::default().with_numeric("core", "optimism", 5);
        let traits = merge(&schema, &overlay).unwrap();
        let identity = Identity::new("Ada", "a systems thinker");
        let message = build_system_message(&identity, &traits, "neutral");
        assert!(!message.contains("optimism"));
    }

    #[test]
    fn behavioral_instruction_gated_on_threshold() {
        let schema = base_schema();
        let overlay = TraitOverlay::default().with_numeric("behavior", "question_tendency", 8);
        let traits = merge(&schema, &overlay).unwrap();
        let identity = Identity::new("Ada", "a systems thinker");
        let message = build_system_message(&identity, &traits, "neutral");
        assert!(message.contains("clarifying questions"));
    }
}
