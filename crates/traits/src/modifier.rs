use std::collections::BTreeMap;

use crate::schema::TraitKey;

/// A sparse set of overrides applied on top of a [`TraitVector`](crate::TraitVector)
/// for one context tag (an emotional state or a focus tag).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Modifier {
    pub numeric: BTreeMap<TraitKey, i32>,
    pub strings: BTreeMap<TraitKey, String>,
}

impl Modifier {
    pub fn with_numeric(mut self, category: &str, name: &str, value: i32) -> Self {
        self.numeric.insert((category.to_string(), name.to_string()), value);
        self
    }

    pub fn with_string(mut self, category: &str, name: &str, value: impl Into<String>) -> Self {
        self.strings.insert((category.to_string(), name.to_string()), value.into());
        self
    }
}

/// Context tag → [`Modifier`] map, carried verbatim from a persona's overlay.
pub type ResponseModifiers = BTreeMap<String, Modifier>;
