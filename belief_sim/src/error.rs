//! Errors raised by the simulation harness.

use belief_core::{BeliefError, Coord};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("Belief update rejected: {0}")]
    Belief(#[from] BeliefError),

    #[error("Unknown scenario '{0}' (available: confirmation, absence, deletion, random_walk, crowded, obstacle_course, all)")]
    UnknownScenario(String),

    #[error("World '{0}' not found in layout file")]
    UnknownWorld(String),

    #[error("Unknown cell code {code} at x={x}, y={y}")]
    InvalidCellCode { x: u64, y: u64, code: u64 },

    #[error("Layout cell x={x}, y={y} is outside the {height}x{width} board")]
    LayoutOutOfBounds {
        x: u64,
        y: u64,
        height: usize,
        width: usize,
    },

    #[error("Layout '{0}' has an empty board")]
    EmptyLayout(String),

    #[error("Cell {0} is a rock")]
    Blocked(Coord),

    #[error("Cell {0} holds a particle")]
    Occupied(Coord),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}
