//! Error types for the belief tracking engine.

use thiserror::Error;

use crate::grid::Coord;

/// Errors raised by belief fields, hypotheses and the ensemble.
///
/// `EmptyArea`, `OutOfBounds` and `DimensionMismatch` reject malformed input.
/// The remaining variants signal a broken internal invariant and stop the
/// offending event.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BeliefError {
    #[error("Area must contain at least one cell")]
    EmptyArea,

    #[error("Cell {cell} is outside the {height}x{width} grid")]
    OutOfBounds {
        cell: Coord,
        height: usize,
        width: usize,
    },

    #[error("Grid dimensions do not match: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("Observation at {cell} excludes a field that is certain to be there")]
    InfeasibleObservation { cell: Coord },

    #[error("Cannot remove all probability mass at {cell}")]
    SingularRescale { cell: Coord },

    #[error("Cannot merge a hypothesis with {theirs} fields into one with {ours}")]
    ShapeMismatch { ours: usize, theirs: usize },

    #[error("Ensemble has no hypothesis with positive weight")]
    EmptyEnsemble,
}
