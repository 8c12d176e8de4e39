use thiserror::Error;

/// The top-level error composing every leaf crate's error kind (§7). The
/// CLI binary maps variants here to the §6 exit codes.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("bad input: {0}")]
    BadInput(String),

    #[error("board has zero personas")]
    NoPersonas,

    #[error("all personas failed to produce a response")]
    AllPersonasFailed,

    #[error("session persistence failed: {0}")]
    Persistence(String),

    #[error("session cancelled")]
    Cancelled,

    #[error("session deadline exceeded")]
    DeadlineExceeded,

    #[error("orchestrator busy")]
    Busy,

    #[error(transparent)]
    Trait(#[from] conclave_traits::TraitError),

    #[error(transparent)]
    Memory(#[from] conclave_memory::MemoryError),

    #[error(transparent)]
    Backend(#[from] conclave_llm::BackendError),

    #[error(transparent)]
    Pipeline(#[from] conclave_thinker::PipelineError),
}

impl BoardError {
    /// A short, user-visible kind name — §7's "name the kind and a short
    /// reason" propagation policy. Internal detail stays in the `Display`
    /// impl / the log, not here.
    pub fn kind(&self) -> &'static str {
        match self {
            BoardError::BadInput(_) => "ErrBadInput",
            BoardError::NoPersonas => "ErrBadInput",
            BoardError::AllPersonasFailed => "ErrBackendFatal",
            BoardError::Persistence(_) => "ErrPersistence",
            BoardError::Cancelled => "ErrCancelled",
            BoardError::DeadlineExceeded => "ErrDeadlineExceeded",
            BoardError::Busy => "ErrBusy",
            BoardError::Trait(_) => "ErrConstraint",
            BoardError::Memory(_) => "ErrMemoryCorrupt",
            BoardError::Backend(_) => "ErrBackendFatal",
            BoardError::Pipeline(_) => "ErrBackendFatal",
        }
    }
}
