//! Model backend adapter: a uniform `ModelBackend` contract over whatever
//! actually produces a persona's text — an offline stub or a hosted model
//! behind an HTTP API — plus a retry wrapper shared by every implementation.

mod backend;
mod backends;
mod error;
mod retry;
mod types;

pub use backend::{validate_request, GenerationContext, ModelBackend};
pub use backends::{EchoBackend, HttpBackend};
pub use error::BackendError;
pub use retry::{RetryConfig, RetryingBackend};
pub use types::{CostModel, ModelInfo, Request, Response, Usage};
