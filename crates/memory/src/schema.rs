use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The kind of thing a [`MemoryEntry`] records. Drives the `type_bonus` term
/// in the relevance-scoring formula and the similarity test used during
/// consolidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryEntryType {
    Interaction,
    Knowledge,
    Personal,
    Emotional,
    Pattern,
}

impl MemoryEntryType {
    pub(crate) fn type_bonus(self) -> f32 {
        match self {
            MemoryEntryType::Emotional => 1.15,
            MemoryEntryType::Pattern => 1.10,
            MemoryEntryType::Personal => 1.05,
            MemoryEntryType::Interaction | MemoryEntryType::Knowledge => 1.00,
        }
    }
}

/// A single unit of persona memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub id: Uuid,
    pub entry_type: MemoryEntryType,
    pub content: String,
    pub tags: Vec<String>,
    pub context_map: BTreeMap<String, String>,
    pub timestamp: DateTime<Utc>,
    /// How strongly this entry should influence recall, in `[0, 1]`.
    pub weight: f32,
    /// Survives consolidation's decay pass; entries below `decay_floor` are evicted.
    pub decay: f32,
}

impl MemoryEntry {
    pub fn new(entry_type: MemoryEntryType, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            entry_type,
            content: content.into(),
            tags: Vec::new(),
            context_map: BTreeMap::new(),
            timestamp: Utc::now(),
            weight: 0.5,
            decay: 1.0,
        }
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context_map.insert(key.into(), value.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Tuning knobs for consolidation and decay. Mirrors the `memory.*` keys of
/// the application configuration.
#[derive(Debug, Clone, Copy)]
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

/// Point-in-time counts returned by `get_stats`.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryStats {
    pub working: usize,
    pub short_term: usize,
    pub long_term: usize,
    pub context_keys: usize,
}
