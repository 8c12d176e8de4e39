//! A narrow durability hook for session-state checkpoints (§4.7, §6). The
//! in-memory `AnalysisSession` returned by `run` is always authoritative;
//! an attached sink mirrors each state transition, the same shape as
//! `conclave_memory::PersistenceSink` and `conclave_log::LogPersistence`.
//! Unlike those two, a checkpoint failure here is *not* best-effort: per
//! §7, a session-state persistence failure is surfaced and fails the
//! session.

use async_trait::async_trait;

use crate::error::BoardError;
use crate::model::AnalysisSession;

#[async_trait]
pub trait SessionPersistence: Send + Sync {
    async fn checkpoint(&self, session: &AnalysisSession) -> Result<(), BoardError>;
}

/// An in-memory sink used by tests to observe checkpoint history.
#[derive(Default)]
pub struct RecordingSessionSink {
    checkpoints: tokio::sync::Mutex<Vec<AnalysisSession>>,
}

#[async_trait]
impl SessionPersistence for RecordingSessionSink {
    async fn checkpoint(&self, session: &AnalysisSession) -> Result<(), BoardError> {
        self.checkpoints.lock().await.push(session.clone());
        Ok(())
    }
}

impl RecordingSessionSink {
    pub async fn checkpoints(&self) -> Vec<AnalysisSession> {
        self.checkpoints.lock().await.clone()
    }
}
