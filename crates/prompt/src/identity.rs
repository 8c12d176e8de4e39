/// Who a persona is, independent of its trait vector: the part of a
/// system message that never changes turn-to-turn.
#[derive(Debug, Clone)]
pub struct Identity {
    pub name: String,
    pub description: String,
}

impl Identity {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self { name: name.into(), description: description.into() }
    }
}

/// One turn of a conversation already in progress, in acceptance order.
#[derive(Debug, Clone)]
pub struct ConversationTurn {
    pub speaker: String,
    pub content: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}
