//! Board orchestration: the multi-persona layer above `conclave-thinker`.
//!
//! A [`Board`] of personas, given a [`Project`] and an [`AnalysisRequest`],
//! runs a mode-specific protocol (parallel fan-out or sequential
//! round-robin discussion) and synthesizes the results into an
//! [`AnalysisSession`] — tracked through a state machine and optionally
//! checkpointed to durable storage.

mod error;
mod model;
mod orchestrator;
mod persistence;
mod protocol;
mod state;
mod synth;

pub use error::BoardError;
pub use model::{
    AnalysisRequest, AnalysisSession, Board, BoardMember, Mode, PersonaFailure, Project, Response, SessionMetrics,
    SessionStatus,
};
pub use orchestrator::{run, OrchestratorSettings};
pub use persistence::{RecordingSessionSink, SessionPersistence};
pub use state::SessionRegistry;
pub use synth::{
    build_summary, compute_metrics, confidence_variance_exceeds, extract_evaluation_scores, extract_forecasts,
    group_recommendations, has_converged, rank_insights,
};

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;

    use conclave_llm::{BackendError, EchoBackend, GenerationContext, ModelBackend, ModelInfo};
    use conclave_llm::{Request, Response as LlmResponse};
    use conclave_log::InteractionLog;
    use conclave_memory::{Memory, MemoryConfig};
    use conclave_prompt::Identity;
    use conclave_traits::{base_schema, merge, TraitOverlay};
    use conclave_thinker::Persona;

    use super::*;

    /// Fails the call at a fixed position in call order, succeeds (via
    /// `EchoBackend`) otherwise — used to exercise the partial-failure path
    /// without depending on which persona happens to land there.
    struct FlakyBackend {
        inner: EchoBackend,
        fail_on_call: usize,
        calls: AtomicUsize,
    }

    impl FlakyBackend {
        fn new(fail_on_call: usize) -> Self {
            Self { inner: EchoBackend::new(), fail_on_call, calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl ModelBackend for FlakyBackend {
        async fn generate(&self, ctx: &GenerationContext, request: &Request) -> Result<LlmResponse, BackendError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call == self.fail_on_call {
                return Err(BackendError::Other("simulated persona failure".to_string()));
            }
            self.inner.generate(ctx, request).await
        }

        fn model_info(&self) -> ModelInfo {
            self.inner.model_info()
        }

        fn validate_config(&self) -> Result<(), BackendError> {
            Ok(())
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    /// Delays every call past its own caller's grace period — used to force
    /// the orchestrator's cancellation-vs-timeout race onto the "grace
    /// period expired" path rather than "in-flight work landed in time".
    struct SlowBackend {
        inner: EchoBackend,
        delay: std::time::Duration,
    }

    impl SlowBackend {
        fn new(delay: std::time::Duration) -> Self {
            Self { inner: EchoBackend::new(), delay }
        }
    }

    #[async_trait]
    impl ModelBackend for SlowBackend {
        async fn generate(&self, ctx: &GenerationContext, request: &Request) -> Result<LlmResponse, BackendError> {
            tokio::time::sleep(self.delay).await;
            self.inner.generate(ctx, request).await
        }

        fn model_info(&self) -> ModelInfo {
            self.inner.model_info()
        }

        fn validate_config(&self) -> Result<(), BackendError> {
            Ok(())
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    /// Fails every call, unconditionally — used to exercise the
    /// all-personas-failed path.
    struct AlwaysFailBackend {
        inner: EchoBackend,
    }

    impl AlwaysFailBackend {
        fn new() -> Self {
            Self { inner: EchoBackend::new() }
        }
    }

    #[async_trait]
    impl ModelBackend for AlwaysFailBackend {
        async fn generate(&self, _ctx: &GenerationContext, _request: &Request) -> Result<LlmResponse, BackendError> {
            Err(BackendError::Http { status: 401, body: "unauthorized".to_string() })
        }

        fn model_info(&self) -> ModelInfo {
            self.inner.model_info()
        }

        fn validate_config(&self) -> Result<(), BackendError> {
            Ok(())
        }

        fn name(&self) -> &str {
            "always-fail"
        }
    }

    fn persona(name: &str) -> Persona {
        let traits = merge(&base_schema(), &TraitOverlay::default()).unwrap();
        Persona::new(Identity::new(name, "a board member"), traits, Memory::new(MemoryConfig::default()))
    }

    fn board_with(n: usize) -> Board {
        let mut board = Board::new("advisory board", "test board");
        for i in 0..n {
            board = board.with_member(persona(&format!("Member{i}")), None);
        }
        board
    }

    #[tokio::test]
    async fn empty_board_is_rejected() {
        let board = Board::new("empty", "no members");
        let project = Project::new("proj", "topic");
        let request = AnalysisRequest::new(project.id, board.id, Mode::Analysis);
        let backend = EchoBackend::new();
        let log = InteractionLog::new();
        let registry = SessionRegistry::new();

        let result = run(
            request,
            &board,
            &project,
            &backend,
            &log,
            &registry,
            None,
            OrchestratorSettings::default(),
            CancellationToken::new(),
        )
        .await;
        assert!(matches!(result.unwrap_err(), BoardError::NoPersonas));
    }

    #[tokio::test]
    async fn parallel_mode_produces_one_response_per_persona() {
        let board = board_with(3);
        let project = Project::new("proj", "pricing strategy");
        let request = AnalysisRequest::new(project.id, board.id, Mode::Analysis);
        let backend = EchoBackend::new();
        let log = InteractionLog::new();
        let registry = SessionRegistry::new();

        let session = run(
            request,
            &board,
            &project,
            &backend,
            &log,
            &registry,
            None,
            OrchestratorSettings::default(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.responses.len(), 3);
    }

    #[tokio::test]
    async fn comparison_mode_templates_topic_over_named_options() {
        let board = board_with(1);
        let project = Project::new("proj", "vendor selection");
        let mut request = AnalysisRequest::new(project.id, board.id, Mode::Comparison);
        request.config_map.insert("option_1".to_string(), "Vendor A".to_string());
        request.config_map.insert("option_2".to_string(), "Vendor B".to_string());
        let backend = EchoBackend::new();
        let log = InteractionLog::new();
        let registry = SessionRegistry::new();

        let session = run(
            request,
            &board,
            &project,
            &backend,
            &log,
            &registry,
            None,
            OrchestratorSettings::default(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(session.status, SessionStatus::Completed);
        // EchoBackend echoes the prompt, so the comparison options it was
        // asked to weigh show up verbatim in the persona's response.
        assert!(session.responses[0].content.contains("Vendor A"));
        assert!(session.responses[0].content.contains("Vendor B"));
    }

    #[tokio::test]
    async fn duplicate_request_id_returns_same_session() {
        let board = board_with(1);
        let project = Project::new("proj", "topic");
        let request = AnalysisRequest::new(project.id, board.id, Mode::Simulation);
        let request_id = request.request_id;
        let backend = EchoBackend::new();
        let log = InteractionLog::new();
        let registry = SessionRegistry::new();

        let first = run(
            request.clone(),
            &board,
            &project,
            &backend,
            &log,
            &registry,
            None,
            OrchestratorSettings::default(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        let second = run(
            request,
            &board,
            &project,
            &backend,
            &log,
            &registry,
            None,
            OrchestratorSettings::default(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(first.session_id, second.session_id);
        assert_eq!(request_id, second.request_id);
    }

    #[tokio::test]
    async fn discussion_mode_builds_shared_conversation() {
        let board = board_with(2);
        let project = Project::new("proj", "roadmap priorities");
        let mut request = AnalysisRequest::new(project.id, board.id, Mode::Discussion);
        request.config_map.insert("max_rounds".to_string(), "2".to_string());
        let backend = EchoBackend::new();
        let log = InteractionLog::new();
        let registry = SessionRegistry::new();

        let session = run(
            request,
            &board,
            &project,
            &backend,
            &log,
            &registry,
            None,
            OrchestratorSettings::default(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.responses.len(), 4); // 2 personas x 2 rounds
    }

    #[tokio::test]
    async fn checkpoint_sink_observes_completed_session() {
        let board = board_with(1);
        let project = Project::new("proj", "topic");
        let request = AnalysisRequest::new(project.id, board.id, Mode::Analysis);
        let backend = EchoBackend::new();
        let log = InteractionLog::new();
        let registry = SessionRegistry::new();
        let sink = RecordingSessionSink::default();

        run(
            request,
            &board,
            &project,
            &backend,
            &log,
            &registry,
            Some(&sink),
            OrchestratorSettings::default(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        let checkpoints = sink.checkpoints().await;
        assert_eq!(checkpoints.len(), 1);
        assert_eq!(checkpoints[0].status, SessionStatus::Completed);
    }

    #[test]
    fn max_rounds_floors_at_two() {
        let mut request = AnalysisRequest::new(uuid::Uuid::new_v4(), uuid::Uuid::new_v4(), Mode::Discussion);
        request.config_map.insert("max_rounds".to_string(), "0".to_string());
        assert_eq!(request.max_rounds(), 2);
    }

    #[test]
    fn comparison_options_parsed_in_order() {
        let mut request = AnalysisRequest::new(uuid::Uuid::new_v4(), uuid::Uuid::new_v4(), Mode::Comparison);
        request.config_map.insert("option_2".to_string(), "Plan B".to_string());
        request.config_map.insert("option_1".to_string(), "Plan A".to_string());
        assert_eq!(request.comparison_options(), vec!["Plan A".to_string(), "Plan B".to_string()]);
    }

    #[tokio::test]
    async fn turn_order_stays_gap_free_when_one_persona_fails() {
        let board = board_with(4);
        let project = Project::new("proj", "market entry");
        let request = AnalysisRequest::new(project.id, board.id, Mode::Analysis);
        let backend = FlakyBackend::new(1);
        let log = InteractionLog::new();
        let registry = SessionRegistry::new();

        let session = run(
            request,
            &board,
            &project,
            &backend,
            &log,
            &registry,
            None,
            OrchestratorSettings::default(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.persona_errors.len(), 1);
        assert_eq!(session.responses.len(), 3);

        let mut turn_orders: Vec<u32> = session.responses.iter().map(|r| r.turn_order).collect();
        turn_orders.sort_unstable();
        assert_eq!(turn_orders, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn cancellation_reaches_terminal_state_within_grace_period() {
        let board = board_with(2);
        let project = Project::new("proj", "topic");
        let request = AnalysisRequest::new(project.id, board.id, Mode::Analysis);
        // Every turn takes far longer than the grace period, so cancellation
        // must win the race rather than letting in-flight work land.
        let backend = SlowBackend::new(std::time::Duration::from_secs(3));
        let log = InteractionLog::new();
        let registry = SessionRegistry::new();
        let settings = OrchestratorSettings { max_concurrent: 5, analysis_timeout_secs: 300, grace_period_secs: 1 };
        let cancellation = CancellationToken::new();

        let child = cancellation.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            child.cancel();
        });

        let session = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            run(request, &board, &project, &backend, &log, &registry, None, settings, cancellation),
        )
        .await
        .expect("orchestrator must reach a terminal state well within the test's own timeout")
        .expect("a cancelled session is a successful Ok(..) result carrying Cancelled status");

        assert_eq!(session.status, SessionStatus::Cancelled);
        assert!(session.completed_at.is_some());
    }

    #[tokio::test]
    async fn all_personas_failing_fails_the_session() {
        let board = board_with(3);
        let project = Project::new("proj", "topic");
        let request = AnalysisRequest::new(project.id, board.id, Mode::Analysis);
        let backend = AlwaysFailBackend::new();
        let log = InteractionLog::new();
        let registry = SessionRegistry::new();

        let result = run(
            request,
            &board,
            &project,
            &backend,
            &log,
            &registry,
            None,
            OrchestratorSettings::default(),
            CancellationToken::new(),
        )
        .await;

        assert!(matches!(result.unwrap_err(), BoardError::AllPersonasFailed));
    }
}
