//! Canonical keys for structural deduplication.
//!
//! Floating point fields are never hashed directly. Each probability is
//! rounded onto a fixed integer lattice first, and the resulting integers are
//! used as ordinary map keys. The lattice is fine enough that it only absorbs
//! floating noise; it is not a probabilistic binning.

use serde::{Deserialize, Serialize};

/// Scale applied before rounding a probability to an integer.
pub const CANONICAL_SCALE: f64 = 1e15;

/// Rounds a probability onto the canonical lattice.
#[inline]
pub fn canonicalize(probability: f64) -> i64 {
    (probability * CANONICAL_SCALE).round() as i64
}

/// Canonical form of one belief field.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FieldKey {
    height: usize,
    width: usize,
    cells: Vec<i64>,
}

impl FieldKey {
    pub fn from_values(height: usize, width: usize, values: impl IntoIterator<Item = f64>) -> Self {
        Self {
            height,
            width,
            cells: values.into_iter().map(canonicalize).collect(),
        }
    }
}

/// Canonical form of a hypothesis: the multiset of its field keys.
///
/// Keys are sorted so that two hypotheses holding the same fields in a
/// different order map to the same key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HypothesisKey(Vec<FieldKey>);

impl HypothesisKey {
    pub fn new(mut fields: Vec<FieldKey>) -> Self {
        fields.sort_unstable();
        Self(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_absorbs_noise() {
        assert_eq!(canonicalize(0.1 + 0.2), canonicalize(0.3));
        assert_eq!(canonicalize(1.0 - 1e-17), canonicalize(1.0));
        assert_ne!(canonicalize(0.5), canonicalize(0.5 + 1e-12));
    }

    #[test]
    fn test_field_key_equality() {
        let a = FieldKey::from_values(1, 2, [0.5, 0.5]);
        let b = FieldKey::from_values(1, 2, [0.25 + 0.25, 0.5]);
        let c = FieldKey::from_values(2, 1, [0.5, 0.5]);

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_hypothesis_key_is_order_insensitive() {
        let a = FieldKey::from_values(1, 2, [1.0, 0.0]);
        let b = FieldKey::from_values(1, 2, [0.0, 1.0]);

        let left = HypothesisKey::new(vec![a.clone(), b.clone()]);
        let right = HypothesisKey::new(vec![b.clone(), a.clone()]);
        let other = HypothesisKey::new(vec![a.clone(), a]);
        let shorter = HypothesisKey::new(vec![b]);

        assert_eq!(left, right);
        assert_ne!(left, other);
        assert_ne!(left, shorter);
    }
}
