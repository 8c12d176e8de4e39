use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::Utc;
use tracing::{error, warn};
use uuid::Uuid;

use crate::entry::InteractionLogEntry;
use crate::persistence::LogPersistence;

/// Append-only log of every model call. Always holds entries in memory for
/// queries; when a [`LogPersistence`] sink is attached, mirrors each entry
/// there on a best-effort basis — a sink failure is retried once in the
/// background and never fails the caller's `append`.
#[derive(Clone)]
pub struct InteractionLog {
    entries: Arc<RwLock<Vec<InteractionLogEntry>>>,
    sink: Option<Arc<dyn LogPersistence>>,
    failure_count: Arc<AtomicU64>,
}

impl InteractionLog {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
            sink: None,
            failure_count: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn LogPersistence>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub async fn append(&self, entry: InteractionLogEntry) {
        self.entries.write().unwrap().push(entry.clone());

        let Some(sink) = self.sink.clone() else { return };
        let failure_count = self.failure_count.clone();
        tokio::spawn(async move {
            if let Err(err) = sink.write(&entry).await {
                warn!(%err, entry_id = %entry.id, "interaction log persistence failed, retrying once");
                tokio::time::sleep(Duration::from_millis(100)).await;
                if let Err(err) = sink.write(&entry).await {
                    error!(%err, entry_id = %entry.id, "interaction log persistence retry failed");
                    failure_count.fetch_add(1, Ordering::SeqCst);
                }
            }
        });
    }

    /// Count of entries whose background persistence retry also failed.
    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::SeqCst)
    }

    pub fn by_persona(&self, persona_id: Uuid, window: Duration) -> Vec<InteractionLogEntry> {
        let cutoff = Utc::now() - chrono::Duration::from_std(window).unwrap_or(chrono::Duration::zero());
        self.entries
            .read()
            .unwrap()
            .iter()
            .filter(|e| e.persona_id == Some(persona_id) && e.created_at >= cutoff)
            .cloned()
            .collect()
    }

    pub fn by_session(&self, session_id: Uuid) -> Vec<InteractionLogEntry> {
        self.entries
            .read()
            .unwrap()
            .iter()
            .filter(|e| e.session_id == Some(session_id))
            .cloned()
            .collect()
    }
}

impl Default for InteractionLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};

    use async_trait::async_trait;

    use super::*;
    use crate::error::LogError;

    #[tokio::test]
    async fn by_persona_filters_to_matching_id_and_window() {
        let log = InteractionLog::new();
        let persona = Uuid::new_v4();
        let other = Uuid::new_v4();

        log.append(InteractionLogEntry::new("hi", "echo-1").with_persona(persona)).await;
        log.append(InteractionLogEntry::new("hi", "echo-1").with_persona(other)).await;

        let found = log.by_persona(persona, Duration::from_secs(3600));
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn by_session_filters_to_matching_id() {
        let log = InteractionLog::new();
        let session = Uuid::new_v4();
        log.append(InteractionLogEntry::new("hi", "echo-1").with_session(session)).await;
        log.append(InteractionLogEntry::new("hi", "echo-1")).await;

        let found = log.by_session(session);
        assert_eq!(found.len(), 1);
    }

    struct AlwaysFailSink {
        attempts: Arc<AtomicU32>,
    }

    #[async_trait]
    impl LogPersistence for AlwaysFailSink {
        async fn write(&self, _entry: &InteractionLogEntry) -> Result<(), LogError> {
            self.attempts.fetch_add(1, AtomicOrdering::SeqCst);
            Err(LogError::Persistence("disk full".to_string()))
        }
    }

    #[tokio::test]
    async fn append_never_fails_even_when_sink_fails_twice() {
        let attempts = Arc::new(AtomicU32::new(0));
        let log = InteractionLog::new().with_sink(Arc::new(AlwaysFailSink { attempts: attempts.clone() }));

        log.append(InteractionLogEntry::new("hi", "echo-1")).await;
        // append() itself returned already; give the background retry a moment.
        tokio::time::sleep(Duration::from_millis(250)).await;

        assert_eq!(attempts.load(AtomicOrdering::SeqCst), 2);
        assert_eq!(log.failure_count(), 1);
    }
}
