use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::TraitError;
use crate::modifier::ResponseModifiers;
use crate::schema::{TraitKey, TraitSchema};

/// Common/avoided phrases and analogies a persona reaches for.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpeakingPatterns {
    pub common_phrases: Vec<String>,
    pub avoided_phrases: Vec<String>,
    pub analogies: Vec<String>,
}

/// Lexical cues that flip a persona's detected emotional state (§4.4 step 1).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmotionalTriggers {
    pub energizers: Vec<String>,
    pub frustrations: Vec<String>,
}

/// A persona-specific overlay: sparse numeric/string overrides plus the
/// verbatim blocks (expertise, speaking patterns, emotional triggers,
/// response modifiers) that pass through `merge` unvalidated.
#[derive(Debug, Clone, Default)]
pub struct TraitOverlay {
    pub numeric: BTreeMap<TraitKey, i32>,
    pub strings: BTreeMap<TraitKey, String>,
    pub expertise_areas: Vec<String>,
    pub speaking_patterns: SpeakingPatterns,
    pub emotional_triggers: EmotionalTriggers,
    pub response_modifiers: ResponseModifiers,
}

impl TraitOverlay {
    pub fn with_numeric(mut self, category: &str, name: &str, value: i32) -> Self {
        self.numeric.insert((category.to_string(), name.to_string()), value);
        self
    }

    pub fn with_string(mut self, category: &str, name: &str, value: impl Into<String>) -> Self {
        self.strings.insert((category.to_string(), name.to_string()), value.into());
        self
    }
}

/// An immutable, validated, merged trait vector. The only personality
/// representation the rest of the system consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraitVector {
    numeric: BTreeMap<TraitKey, i32>,
    strings: BTreeMap<TraitKey, String>,
    pub expertise_areas: Vec<String>,
    pub speaking_patterns: SpeakingPatterns,
    pub emotional_triggers: EmotionalTriggers,
    pub response_modifiers: ResponseModifiers,
}

impl TraitVector {
    /// Default 5 when the slot is absent (should only happen for keys not
    /// declared in the schema the vector was merged against).
    pub fn get_int(&self, category: &str, name: &str) -> i32 {
        self.numeric
            .get(&(category.to_string(), name.to_string()))
            .copied()
            .unwrap_or(5)
    }

    /// Empty string when the slot is absent.
    pub fn get_str(&self, category: &str, name: &str) -> &str {
        self.strings
            .get(&(category.to_string(), name.to_string()))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Re-express this vector as a fully-specified overlay: every slot this
    /// vector carries becomes an explicit overlay entry. Used to check
    /// merge idempotence (`merge(base, v.to_overlay()) == v`) and by callers
    /// that need to persist a vector and later re-merge it unchanged.
    pub fn to_overlay(&self) -> TraitOverlay {
        TraitOverlay {
            numeric: self.numeric.clone(),
            strings: self.strings.clone(),
            expertise_areas: self.expertise_areas.clone(),
            speaking_patterns: self.speaking_patterns.clone(),
            emotional_triggers: self.emotional_triggers.clone(),
            response_modifiers: self.response_modifiers.clone(),
        }
    }

    /// Apply the modifier registered for `context_tag`, returning a new,
    /// independent vector. `self` is never mutated. Applying the same tag
    /// twice in a row is idempotent: the second application overwrites the
    /// same keys with the same values.
    pub fn apply_modifier(&self, context_tag: &str) -> TraitVector {
        let mut out = self.clone();
        if let Some(modifier) = self.response_modifiers.get(context_tag) {
            for (k, v) in &modifier.numeric {
                out.numeric.insert(k.clone(), *v);
            }
            for (k, v) in &modifier.strings {
                out.strings.insert(k.clone(), v.clone());
            }
        }
        out
    }
}

/// Merge `overlay` onto `base`. See [`crate::merge`] for the contract.
pub fn merge(base: &TraitSchema, overlay: &TraitOverlay) -> Result<TraitVector, TraitError> {
    let mut numeric = BTreeMap::new();
    for (key, slot) in &base.numeric {
        let (category, name) = key;
        let value = match overlay.numeric.get(key) {
            Some(v) => {
                if *v < slot.min || *v > slot.max {
                    return Err(TraitError::OutOfRange {
                        category: category.clone(),
                        name: name.clone(),
                        value: *v,
                        min: slot.min,
                        max: slot.max,
                    });
                }
                *v
            }
            None => slot.default,
        };
        numeric.insert(key.clone(), value);
    }

    let mut strings = BTreeMap::new();
    for (key, slot) in &base.strings {
        let (category, name) = key;
        let value = match overlay.strings.get(key) {
            Some(v) => {
                if !slot.allowed.iter().any(|a| a == v) {
                    return Err(TraitError::NotAllowed {
                        category: category.clone(),
                        name: name.clone(),
                        value: v.clone(),
                        allowed: slot.allowed.clone(),
                    });
                }
                v.clone()
            }
            None => slot.default.clone(),
        };
        strings.insert(key.clone(), value);
    }

    let vector = TraitVector {
        numeric,
        strings,
        expertise_areas: overlay.expertise_areas.clone(),
        speaking_patterns: overlay.speaking_patterns.clone(),
        emotional_triggers: overlay.emotional_triggers.clone(),
        response_modifiers: overlay.response_modifiers.clone(),
    };

    crate::schema::check_constraints(base, &vector)?;
    Ok(vector)
}
