//! Trait Model: merges a base personality schema with a persona-specific
//! overlay into an immutable, validated trait vector.
//!
//! A [`TraitVector`] is the only thing the rest of the system ever sees —
//! schema and overlay are load-time concepts that disappear once `merge`
//! succeeds.

mod error;
mod modifier;
mod schema;
mod vector;

pub use error::TraitError;
pub use modifier::{Modifier, ResponseModifiers};
pub use schema::{Constraint, NumericSlot, StringSlot, TraitKey, TraitSchema};
pub use vector::{EmotionalTriggers, SpeakingPatterns, TraitOverlay, TraitVector};

/// Merge `overlay` onto `base`, producing a validated, immutable [`TraitVector`].
///
/// For every slot declared in `base`, the overlay's value is used when present
/// (after a type/range check) else the base default. `expertise_areas`,
/// `speaking_patterns`, `emotional_triggers` and `response_modifiers` pass
/// through from the overlay verbatim. Cross-slot constraints declared on the
/// schema are checked last; any violation is fatal.
pub fn merge(base: &TraitSchema, overlay: &TraitOverlay) -> Result<TraitVector, TraitError> {
    vector::merge(base, overlay)
}

/// Re-check a fully-built [`TraitVector`] against a schema's constraints.
///
/// `merge` already validates at construction time; this is exposed
/// separately so callers that reconstruct a vector from storage (or mutate
/// a schema afterward) can re-validate without going through an overlay.
pub fn validate(schema: &TraitSchema, vector: &TraitVector) -> Result<(), TraitError> {
    schema::check_constraints(schema, vector)
}

/// The default personality schema: the named slots the prompt-assembly and
/// parameter-derivation rules key off of.
pub fn base_schema() -> TraitSchema {
    schema::default_schema()
}
