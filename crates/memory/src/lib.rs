//! Three-tier persona memory: working (ephemeral, rebuilt per `think`),
//! short-term (recent, bounded, consolidates under pressure) and long-term
//! (durable, decays over time).

mod consolidation;
mod error;
mod persistence;
mod schema;
mod score;
mod store;

pub use error::MemoryError;
pub use persistence::{PersistenceSink, RecordingSink};
pub use schema::{MemoryConfig, MemoryEntry, MemoryEntryType, MemoryStats};
pub use store::Memory;
