//! Append-only interaction log: every model call, its timing and outcome,
//! queryable by persona or by session.

mod entry;
mod error;
mod persistence;
mod store;

pub use entry::{InteractionLogEntry, Outcome};
pub use error::LogError;
pub use persistence::LogPersistence;
pub use store::InteractionLog;
