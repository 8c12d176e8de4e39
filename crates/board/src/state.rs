//! Session state machine (C7, §4.7): `pending -> running -> {completed,
//! failed, cancelled}`. Terminal states are sticky — once a session leaves
//! `running` it never re-enters it, and re-issuing the same `request_id`
//! against a completed session returns the same session rather than
//! re-running it.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::model::{AnalysisSession, SessionStatus};

/// Tracks sessions by `request_id` so a duplicate submission is idempotent
/// rather than kicking off a second orchestrator run.
#[derive(Default, Clone)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<BTreeMap<Uuid, AnalysisSession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the existing session for `request_id` if one was already
    /// registered (running or terminal); `None` means the caller should
    /// start a fresh run.
    pub async fn existing(&self, request_id: Uuid) -> Option<AnalysisSession> {
        self.sessions.lock().await.get(&request_id).cloned()
    }

    pub async fn insert(&self, session: AnalysisSession) {
        self.sessions.lock().await.insert(session.request_id, session);
    }

    pub async fn update(&self, session: AnalysisSession) {
        self.sessions.lock().await.insert(session.request_id, session);
    }
}

/// Transition helpers enforcing the legal edges of the state machine.
/// `transition_to_running`/`complete`/`fail`/`cancel` all assert the
/// precondition with a `debug_assert!` rather than silently coercing, since
/// an illegal transition indicates an orchestrator bug, not bad input.
#[instrument(skip(session), fields(session_id = %session.session_id))]
pub fn transition_to_running(session: &mut AnalysisSession, started_at: chrono::DateTime<chrono::Utc>) {
    debug_assert_eq!(session.status, SessionStatus::Pending, "sessions only start running from pending");
    session.status = SessionStatus::Running;
    session.started_at = Some(started_at);
}

#[instrument(skip(session), fields(session_id = %session.session_id))]
pub fn complete(session: &mut AnalysisSession, completed_at: chrono::DateTime<chrono::Utc>) {
    if session.status.is_terminal() {
        warn!(status = ?session.status, "ignoring completion of an already-terminal session");
        return;
    }
    session.status = SessionStatus::Completed;
    finish(session, completed_at);
}

#[instrument(skip(session, reason), fields(session_id = %session.session_id))]
pub fn fail(session: &mut AnalysisSession, reason: String, completed_at: chrono::DateTime<chrono::Utc>) {
    if session.status.is_terminal() {
        warn!(status = ?session.status, "ignoring failure of an already-terminal session");
        return;
    }
    session.status = SessionStatus::Failed;
    session.error = Some(reason);
    finish(session, completed_at);
}

#[instrument(skip(session), fields(session_id = %session.session_id))]
pub fn cancel(session: &mut AnalysisSession, completed_at: chrono::DateTime<chrono::Utc>) {
    if session.status.is_terminal() {
        warn!(status = ?session.status, "ignoring cancellation of an already-terminal session");
        return;
    }
    session.status = SessionStatus::Cancelled;
    finish(session, completed_at);
}

fn finish(session: &mut AnalysisSession, completed_at: chrono::DateTime<chrono::Utc>) {
    session.completed_at = Some(completed_at);
    session.duration_ms = session
        .started_at
        .map(|start| (completed_at - start).num_milliseconds().max(0) as u64)
        .unwrap_or(0);
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::model::{AnalysisRequest, Mode};

    fn pending_session() -> AnalysisSession {
        let request = AnalysisRequest::new(Uuid::new_v4(), Uuid::new_v4(), Mode::Discussion);
        AnalysisSession::pending(&request)
    }

    #[test]
    fn running_then_completed_computes_duration() {
        let mut session = pending_session();
        let t0 = chrono::Utc::now();
        transition_to_running(&mut session, t0);
        assert_eq!(session.status, SessionStatus::Running);

        let t1 = t0 + Duration::milliseconds(500);
        complete(&mut session, t1);
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.duration_ms, 500);
    }

    #[test]
    fn terminal_state_is_sticky() {
        let mut session = pending_session();
        let t0 = chrono::Utc::now();
        transition_to_running(&mut session, t0);
        fail(&mut session, "backend unavailable".to_string(), t0);
        assert_eq!(session.status, SessionStatus::Failed);

        // A late cancellation signal arriving after failure must not flip status.
        cancel(&mut session, t0 + Duration::seconds(1));
        assert_eq!(session.status, SessionStatus::Failed);
    }

    #[tokio::test]
    async fn registry_returns_existing_session_for_duplicate_request_id() {
        let registry = SessionRegistry::new();
        let session = pending_session();
        let request_id = session.request_id;
        registry.insert(session).await;

        let existing = registry.existing(request_id).await;
        assert!(existing.is_some());
        assert_eq!(existing.unwrap().request_id, request_id);
    }
}
