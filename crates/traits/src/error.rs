use thiserror::Error;

/// Errors surfaced by trait merging and validation. All are fatal at
/// load time — a persona whose overlay fails to merge cannot be used.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TraitError {
    #[error("overlay value for {category}.{name} = {value} is out of range [{min}..{max}]")]
    OutOfRange {
        category: String,
        name: String,
        value: i32,
        min: i32,
        max: i32,
    },

    #[error("overlay value for {category}.{name} = \"{value}\" is not one of {allowed:?}")]
    NotAllowed {
        category: String,
        name: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("constraint over {traits:?} violated: total {total} not in [{min_total:?}..{max_total:?}]")]
    ConstraintViolated {
        traits: Vec<String>,
        total: i32,
        min_total: Option<i32>,
        max_total: Option<i32>,
    },
}
