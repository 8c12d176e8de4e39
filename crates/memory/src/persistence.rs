//! Optional durability hook. A [`Memory`](crate::Memory) works entirely
//! in-process without one; a sink lets a caller mirror entries to durable
//! storage on a best-effort basis without that storage sitting on the hot
//! path of `think`.

use async_trait::async_trait;

use crate::error::MemoryError;
use crate::schema::MemoryEntry;

#[async_trait]
pub trait PersistenceSink: Send + Sync {
    async fn append(&self, entry: &MemoryEntry) -> Result<(), MemoryError>;
}

/// An in-memory sink used by tests and by callers that don't need real
/// durability but want to observe what would have been written.
#[derive(Default)]
pub struct RecordingSink {
    entries: tokio::sync::Mutex<Vec<MemoryEntry>>,
}

#[async_trait]
impl PersistenceSink for RecordingSink {
    async fn append(&self, entry: &MemoryEntry) -> Result<(), MemoryError> {
        self.entries.lock().await.push(entry.clone());
        Ok(())
    }
}

impl RecordingSink {
    pub async fn recorded(&self) -> Vec<MemoryEntry> {
        self.entries.lock().await.clone()
    }
}
