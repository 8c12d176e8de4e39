use std::collections::BTreeMap;

use conclave_prompt::ConversationTurn;

/// Everything a single `think` call needs beyond the persona itself: the
/// topic, ambient context maps, the conversation so far, and optional
/// overrides for emotional-state detection and trait-modifier focus.
#[derive(Debug, Clone, Default)]
pub struct ThinkingContext {
    pub topic: String,
    pub project_context: BTreeMap<String, String>,
    pub board_context: BTreeMap<String, String>,
    pub recent_conversation: Vec<ConversationTurn>,
    /// Skips emotional-state detection (step 1) when present.
    pub explicit_emotional_state: Option<String>,
    /// Applied as a second trait modifier after the emotional state (step 2).
    pub focus: Option<String>,
}

impl ThinkingContext {
    pub fn new(topic: impl Into<String>) -> Self {
        Self { topic: topic.into(), ..Default::default() }
    }

    pub fn with_focus(mut self, focus: impl Into<String>) -> Self {
        self.focus = Some(focus.into());
        self
    }

    pub fn with_conversation(mut self, turns: Vec<ConversationTurn>) -> Self {
        self.recent_conversation = turns;
        self
    }
}
