use async_trait::async_trait;

use crate::entry::InteractionLogEntry;
use crate::error::LogError;

/// Durable sink for the interaction log. `append` itself is always
/// best-effort from the caller's point of view — see [`crate::InteractionLog::append`].
#[async_trait]
pub trait LogPersistence: Send + Sync {
    async fn write(&self, entry: &InteractionLogEntry) -> Result<(), LogError>;
}
