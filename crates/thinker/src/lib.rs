//! Persona Pipeline (C4): the single-persona "think" step — state gating,
//! memory retrieval, prompt assembly, parameter derivation, backend call,
//! response post-processing, and memory write.

mod context;
mod error;
mod extract;
mod params;
mod persona;
mod pipeline;
mod postprocess;

pub use context::ThinkingContext;
pub use conclave_prompt::ConversationTurn;
pub use error::PipelineError;
pub use extract::{DefaultInsightExtractor, InsightExtractor};
pub use persona::Persona;
pub use pipeline::think;
pub use postprocess::ThinkingResult;
