//! Parameter derivation (§4.4 step 5): temperature from core traits,
//! max_tokens from the verbosity slot.

use conclave_traits::TraitVector;

pub(crate) fn clamp(value: f32, min: f32, max: f32) -> f32 {
    value.max(min).min(max)
}

/// `temperature = clamp(0.7 + 0.03·creativity − 0.02·analytical + 0.01·risk_tolerance, 0.1, 1.0)`.
pub(crate) fn derive_temperature(traits: &TraitVector) -> f32 {
    let creativity = traits.get_int("core", "creativity") as f32;
    let analytical = traits.get_int("core", "analytical") as f32;
    let risk_tolerance = traits.get_int("core", "risk_tolerance") as f32;
    let raw = 0.7 + 0.03 * creativity - 0.02 * analytical + 0.01 * risk_tolerance;
    clamp(raw, 0.1, 1.0)
}

/// `max_tokens` keyed off the `communication.verbosity` string slot.
pub(crate) fn derive_max_tokens(traits: &TraitVector) -> u32 {
    match traits.get_str("communication", "verbosity") {
        "terse" => 250,
        "concise" => 350,
        "detailed" => 750,
        "verbose" => 1000,
        _ => 500, // "balanced" and any unrecognized value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conclave_traits::{base_schema, merge, TraitOverlay};

    #[test]
    fn temperature_clamps_at_pathological_extremes() {
        let schema = base_schema();
        let high = TraitOverlay::default().with_numeric("core", "creativity", 10);
        let traits = merge(&schema, &high).unwrap();
        assert!(derive_temperature(&traits) <= 1.0);

        let low = TraitOverlay::default()
            .with_numeric("core", "creativity", 1)
            .with_numeric("core", "analytical", 10)
            .with_numeric("core", "risk_tolerance", 1);
        let traits = merge(&schema, &low).unwrap();
        assert!(derive_temperature(&traits) >= 0.1);
    }

    #[test]
    fn max_tokens_follows_verbosity_table() {
        let schema = base_schema();
        for (verbosity, expected) in [
            ("terse", 250),
            ("concise", 350),
            ("balanced", 500),
            ("detailed", 750),
            ("verbose", 1000),
        ] {
            let overlay = TraitOverlay::default().with_string("communication", "verbosity", verbosity);
            let traits = merge(&schema, &overlay).unwrap();
            assert_eq!(derive_max_tokens(&traits), expected);
        }
    }
}
