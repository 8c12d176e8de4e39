use std::collections::BTreeMap;

use crate::error::TraitError;
use crate::vector::TraitVector;

/// `(category, name)` — the address of a single trait slot, e.g.
/// `("core", "creativity")` or `("communication", "verbosity")`.
pub type TraitKey = (String, String);

/// A numeric slot: an integer scale with a default and inclusive bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumericSlot {
    pub default: i32,
    pub min: i32,
    pub max: i32,
}

impl NumericSlot {
    pub fn scale_1_10(default: i32) -> Self {
        Self { default, min: 1, max: 10 }
    }
}

/// A string slot: an enumerated value with a default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringSlot {
    pub default: String,
    pub allowed: Vec<String>,
}

/// A cross-slot constraint: the sum of the named numeric slots must fall
/// within `[min_total, max_total]` when either bound is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub traits: Vec<TraitKey>,
    pub min_total: Option<i32>,
    pub max_total: Option<i32>,
}

/// The base personality schema: every numeric and string slot a
/// [`TraitVector`](crate::TraitVector) may carry, plus cross-slot constraints.
#[derive(Debug, Clone, Default)]
pub struct TraitSchema {
    pub numeric: BTreeMap<TraitKey, NumericSlot>,
    pub strings: BTreeMap<TraitKey, StringSlot>,
    pub constraints: Vec<Constraint>,
}

impl TraitSchema {
    pub fn numeric_slot(&self, category: &str, name: &str) -> Option<&NumericSlot> {
        self.numeric.get(&(category.to_string(), name.to_string()))
    }

    pub fn string_slot(&self, category: &str, name: &str) -> Option<&StringSlot> {
        self.strings.get(&(category.to_string(), name.to_string()))
    }
}

fn key(category: &str, name: &str) -> TraitKey {
    (category.to_string(), name.to_string())
}

/// Build the default schema named throughout §4.4's prompt-assembly and
/// parameter-derivation rules.
pub fn default_schema() -> TraitSchema {
    let mut numeric = BTreeMap::new();
    for (category, name, default) in [
        ("core", "creativity", 5),
        ("core", "analytical", 5),
        ("core", "optimism", 5),
        ("core", "risk_tolerance", 5),
        ("communication", "formality", 5),
        ("communication", "directness", 5),
        ("behavior", "assertiveness", 5),
        ("behavior", "emotional_stability", 5),
        ("behavior", "question_tendency", 5),
        ("behavior", "example_usage", 5),
        ("stance", "contrarian_level", 5),
        ("stance", "solution_orientation", 5),
        ("stance", "data_vs_intuition", 5),
    ] {
        numeric.insert(key(category, name), NumericSlot::scale_1_10(default));
    }

    let mut strings = BTreeMap::new();
    strings.insert(
        key("communication", "verbosity"),
        StringSlot {
            default: "balanced".to_string(),
            allowed: vec![
                "terse".to_string(),
                "concise".to_string(),
                "balanced".to_string(),
                "detailed".to_string(),
                "verbose".to_string(),
            ],
        },
    );

    let constraints = vec![Constraint {
        traits: vec![key("core", "creativity"), key("core", "analytical")],
        min_total: Some(4),
        max_total: Some(18),
    }];

    TraitSchema { numeric, strings, constraints }
}

/// Check a built vector's numeric slots against `schema`'s cross-slot
/// constraints. Slot-level range/enum checks happen during `merge`; this
/// only re-checks the aggregate constraints, e.g. after a caller rebuilds a
/// vector from storage.
pub fn check_constraints(schema: &TraitSchema, vector: &TraitVector) -> Result<(), TraitError> {
    for constraint in &schema.constraints {
        let total: i32 = constraint
            .traits
            .iter()
            .map(|(category, name)| vector.get_int(category, name))
            .sum();
        let min_ok = constraint.min_total.is_none_or(|min| total >= min);
        let max_ok = constraint.max_total.is_none_or(|max| total <= max);
        if !min_ok || !max_ok {
            return Err(TraitError::ConstraintViolated {
                traits: constraint
                    .traits
                    .iter()
                    .map(|(c, n)| format!("{c}.{n}"))
                    .collect(),
                total,
                min_total: constraint.min_total,
                max_total: constraint.max_total,
            });
        }
    }
    Ok(())
}
