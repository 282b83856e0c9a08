//! JSON exporter for offline inspection.
//!
//! Exports one frame per scenario action or time step: the ground truth, the
//! per-cell belief grid and the ensemble metrics.

use belief_core::{Coord, Ensemble, EnsembleMetrics};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::board::Board;
use crate::error::SimError;

/// A single frame of simulation data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimFrame {
    /// Frame index (0 = state after layout setup)
    pub step: usize,

    /// What produced this frame
    pub action: String,

    /// Ground truth particle counts
    pub particles: Vec<CellCount>,

    /// Rock cells
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rocks: Vec<Coord>,

    /// Visible cells
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub visible: Vec<Coord>,

    /// Occupancy belief, indexed `[row][col]`
    pub belief: Vec<Vec<f64>>,

    /// Ensemble health
    pub metrics: EnsembleMetrics,
}

/// Particle count at one cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellCount {
    pub row: usize,
    pub col: usize,
    pub count: usize,
}

impl SimFrame {
    /// Captures the current board and ensemble.
    pub fn capture(step: usize, action: &str, board: &Board, ensemble: &Ensemble) -> Self {
        let shape = board.shape();
        let map = ensemble.probability_map();

        Self {
            step,
            action: action.to_string(),
            particles: board
                .occupied_cells()
                .into_iter()
                .map(|cell| CellCount {
                    row: cell.row,
                    col: cell.col,
                    count: board.count_at(cell),
                })
                .collect(),
            rocks: board.rocks().collect(),
            visible: board.visible_cells().collect(),
            belief: (0..shape.height)
                .map(|row| (0..shape.width).map(|col| map[(row, col)]).collect())
                .collect(),
            metrics: ensemble.metrics(),
        }
    }
}

/// Complete simulation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Scenario or world name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// All frames
    pub frames: Vec<SimFrame>,

    /// Final results
    pub passed: bool,

    /// Final Brier score if the run completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_brier: Option<f64>,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            frames: Vec::new(),
            passed: false,
            final_brier: None,
        }
    }

    pub fn add_frame(&mut self, frame: SimFrame) {
        self.frames.push(frame);
    }

    pub fn finalize(&mut self, passed: bool, brier: Option<f64>) {
        self.passed = passed;
        self.final_brier = brier;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), SimError> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use belief_core::GridShape;

    #[test]
    fn test_frame_captures_truth_and_belief() {
        let shape = GridShape::new(2, 2);
        let mut board = Board::new(shape);
        board.toggle_particle(Coord::new(1, 0)).unwrap();
        board.toggle_rock(Coord::new(0, 1)).unwrap();

        let mut ensemble = Ensemble::new(shape);
        ensemble.new_particle_within(&[Coord::new(1, 0)]).unwrap();

        let frame = SimFrame::capture(3, "setup", &board, &ensemble);
        assert_eq!(frame.step, 3);
        assert_eq!(frame.particles, vec![CellCount { row: 1, col: 0, count: 1 }]);
        assert_eq!(frame.rocks, vec![Coord::new(0, 1)]);
        assert_eq!(frame.belief, vec![vec![0.0, 0.0], vec![1.0, 0.0]]);
        assert_eq!(frame.metrics.hypothesis_count, 1);
    }

    #[test]
    fn test_export_json_shape() {
        let shape = GridShape::new(1, 1);
        let mut export = SimExport::new("confirmation", 7);
        export.add_frame(SimFrame::capture(0, "setup", &Board::new(shape), &Ensemble::new(shape)));
        export.finalize(true, Some(0.0));

        let value = serde_json::to_value(&export).unwrap();
        assert_eq!(value["scenario"], "confirmation");
        assert_eq!(value["frames"].as_array().unwrap().len(), 1);
        // Empty rock and visibility lists are omitted.
        assert!(value["frames"][0].get("rocks").is_none());
        assert_eq!(value["final_brier"], 0.0);
    }
}
