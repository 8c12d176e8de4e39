use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::consolidation;
use crate::error::MemoryError;
use crate::persistence::PersistenceSink;
use crate::schema::{MemoryConfig, MemoryEntry, MemoryStats};
use crate::score;

/// The on-disk/exported shape of a persona's durable memory: everything
/// except working memory, which is rebuilt fresh on every `think` call.
#[derive(Debug, Serialize, Deserialize)]
struct MemorySnapshot {
    short_term: VecDeque<MemoryEntry>,
    long_term: Vec<MemoryEntry>,
    context: BTreeMap<String, String>,
}

/// One persona's three-tier memory store.
pub struct Memory {
    working: Vec<MemoryEntry>,
    short_term: VecDeque<MemoryEntry>,
    long_term: Vec<MemoryEntry>,
    context: BTreeMap<String, String>,
    config: MemoryConfig,
    sink: Option<Arc<dyn PersistenceSink>>,
}

impl Memory {
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            working: Vec::new(),
            short_term: VecDeque::new(),
            long_term: Vec::new(),
            context: BTreeMap::new(),
            config,
            sink: None,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn PersistenceSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Seed a freshly-created persona's memory with one knowledge entry per
    /// declared expertise area, so the first `retrieve` call already has
    /// something to surface.
    pub fn bootstrap(traits: &conclave_traits::TraitVector, config: MemoryConfig) -> Self {
        let mut memory = Self::new(config);
        for area in &traits.expertise_areas {
            let entry = MemoryEntry::new(
                crate::schema::MemoryEntryType::Knowledge,
                format!("Domain expertise: {area}"),
            )
            .with_weight(0.9)
            .with_tags([area.clone()]);
            memory.long_term.push(entry);
        }
        memory
    }

    /// Append `entry` to short-term memory, consolidating if the tier is
    /// now at or over `short_term_limit`. If a persistence sink is attached,
    /// mirrors the entry there on a best-effort basis — a sink failure is
    /// logged but does not fail the write.
    #[instrument(skip(self, entry), fields(entry_type = ?entry.entry_type))]
    pub async fn add(&mut self, entry: MemoryEntry) {
        if let Some(sink) = &self.sink {
            if let Err(err) = sink.append(&entry).await {
                tracing::warn!(%err, "persistence sink failed to record memory entry");
            }
        }

        self.short_term.push_back(entry);
        if self.short_term.len() >= self.config.short_term_limit {
            self.consolidate();
        }
    }

    fn consolidate(&mut self) {
        let promoted = consolidation::consolidate(&mut self.short_term);
        self.long_term.extend(promoted);
        consolidation::decay_pass(&mut self.long_term, &self.config);
    }

    /// Rank both short-term and long-term entries against `prompt`,
    /// returning the top `limit`.
    pub fn retrieve(&self, prompt: &str, limit: usize) -> Vec<MemoryEntry> {
        score::rank(self.short_term.iter().chain(self.long_term.iter()), prompt, limit)
    }

    /// Rebuild working memory: up to 5 most-recent short-term entries plus
    /// the top-3 `retrieve(prompt, 3)` results scored against long-term
    /// only, deduplicated by id. Called once per `think` invocation.
    pub fn rebuild_working(&mut self, prompt: &str) {
        let mut recent: Vec<MemoryEntry> = self.short_term.iter().rev().take(5).cloned().collect();
        let relevant = score::rank(self.long_term.iter(), prompt, 3);

        let mut seen: std::collections::HashSet<uuid::Uuid> =
            recent.iter().map(|e| e.id).collect();
        for entry in relevant {
            if seen.insert(entry.id) {
                recent.push(entry);
            }
        }
        self.working = recent;
    }

    pub fn working(&self) -> &[MemoryEntry] {
        &self.working
    }

    pub fn update_context(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.context.insert(key.into(), value.into());
    }

    pub fn context(&self) -> &BTreeMap<String, String> {
        &self.context
    }

    pub fn get_stats(&self) -> MemoryStats {
        MemoryStats {
            working: self.working.len(),
            short_term: self.short_term.len(),
            long_term: self.long_term.len(),
            context_keys: self.context.len(),
        }
    }

    /// Serialize short-term, long-term and context to an opaque byte blob.
    /// Working memory is not included — it's always rebuilt on the next
    /// `think` call.
    pub fn export(&self) -> Vec<u8> {
        let snapshot = MemorySnapshot {
            short_term: self.short_term.clone(),
            long_term: self.long_term.clone(),
            context: self.context.clone(),
        };
        serde_json::to_vec(&snapshot).expect("memory snapshot is always serializable")
    }

    /// Replace short-term, long-term and context from a blob produced by
    /// `export`. On a malformed blob, memory is left unchanged and
    /// `MemoryError::Corrupt` is returned.
    pub fn import(&mut self, blob: &[u8]) -> Result<(), MemoryError> {
        let snapshot: MemorySnapshot =
            serde_json::from_slice(blob).map_err(|e| MemoryError::Corrupt(e.to_string()))?;
        self.short_term = snapshot.short_term;
        self.long_term = snapshot.long_term;
        self.context = snapshot.context;
        Ok(())
    }
}
