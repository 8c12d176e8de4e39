//! System-message and user-prompt assembly for a persona's turn.
//!
//! Kept as a thin, trait-vector-only layer so it can be unit tested without
//! a backend, a memory store, or a board in scope.

mod identity;
mod system;
mod user;

pub use identity::{ConversationTurn, Identity};
pub use system::build_system_message;
pub use user::build_user_prompt;
