//! Ground-truth validation of an ensemble's belief.
//!
//! Implements the checks the scenario runner applies after every action:
//! - **Brier score**: mean squared error of `probability(cell)` against true occupancy
//! - **Invariants**: weight normalization, bounded size, field mass, particle
//!   count agreement, and zero belief where the board rules particles out

use belief_core::{Coord, Ensemble};

use crate::board::Board;

/// Tolerance for floating sums that should equal exactly one.
const MASS_TOLERANCE: f64 = 1e-9;

/// Belief allowed on a cell the board rules out.
const RULED_OUT_TOLERANCE: f64 = 1e-12;

/// Mean `(p - occupied)^2` over every cell that is not a rock.
///
/// Returns 0 for a board made only of rocks.
pub fn brier_score(board: &Board, ensemble: &Ensemble) -> f64 {
    let cells: Vec<Coord> = board.shape().cells().filter(|c| !board.is_rock(*c)).collect();
    if cells.is_empty() {
        return 0.0;
    }

    let total: f64 = cells
        .iter()
        .map(|cell| {
            let truth = if board.is_particle(*cell) { 1.0 } else { 0.0 };
            (ensemble.probability(*cell) - truth).powi(2)
        })
        .sum();
    total / cells.len() as f64
}

/// Verifies that `ensemble` is a well-formed belief consistent with `board`.
///
/// Returns a description of the first violation found.
pub fn check_invariants(board: &Board, ensemble: &Ensemble) -> Result<(), String> {
    if ensemble.is_empty() {
        return Err("ensemble has no hypotheses".to_string());
    }

    let limit = ensemble.config().max_hypotheses;
    if ensemble.len() > limit {
        return Err(format!("{} hypotheses exceed the limit of {}", ensemble.len(), limit));
    }

    let total = ensemble.total_weight();
    if (total - 1.0).abs() > MASS_TOLERANCE {
        return Err(format!("hypothesis weights sum to {:.12}", total));
    }

    let particles = board.particle_count();
    for (index, hypothesis) in ensemble.hypotheses().iter().enumerate() {
        if hypothesis.field_count() != particles {
            return Err(format!(
                "hypothesis {} tracks {} particles, board has {}",
                index,
                hypothesis.field_count(),
                particles
            ));
        }
        for field in hypothesis.fields() {
            if (field.total() - 1.0).abs() > MASS_TOLERANCE {
                return Err(format!("hypothesis {} has a field of mass {:.12}", index, field.total()));
            }
        }
    }

    for cell in board.rocks() {
        let p = ensemble.probability(cell);
        if p > RULED_OUT_TOLERANCE {
            return Err(format!("rock {} believed occupied with p={:.6}", cell, p));
        }
    }

    for cell in board.visible_cells() {
        let p = ensemble.probability(cell);
        if board.is_particle(cell) && p <= 0.0 {
            return Err(format!("visible particle at {} has zero belief", cell));
        }
        if !board.is_particle(cell) && p > RULED_OUT_TOLERANCE {
            return Err(format!("empty visible cell {} believed occupied with p={:.6}", cell, p));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use belief_core::GridShape;

    #[test]
    fn test_brier_of_uniform_belief() {
        let shape = GridShape::new(1, 2);
        let mut board = Board::new(shape);
        board.toggle_particle(Coord::new(0, 0)).unwrap();

        let mut ensemble = Ensemble::new(shape);
        ensemble
            .new_particle_within(&[Coord::new(0, 0), Coord::new(0, 1)])
            .unwrap();

        // (0.5 - 1)^2 and (0.5 - 0)^2, averaged.
        assert_relative_eq!(brier_score(&board, &ensemble), 0.25);
        assert!(check_invariants(&board, &ensemble).is_ok());
    }

    #[test]
    fn test_brier_skips_rocks() {
        let shape = GridShape::new(1, 2);
        let mut board = Board::new(shape);
        board.toggle_rock(Coord::new(0, 1)).unwrap();
        let ensemble = Ensemble::new(shape);

        assert_eq!(brier_score(&board, &ensemble), 0.0);
    }

    #[test]
    fn test_particle_count_mismatch_is_reported() {
        let shape = GridShape::new(1, 2);
        let mut board = Board::new(shape);
        board.toggle_particle(Coord::new(0, 0)).unwrap();
        let ensemble = Ensemble::new(shape);

        let failure = check_invariants(&board, &ensemble).unwrap_err();
        assert!(failure.contains("tracks 0 particles"));
    }

    #[test]
    fn test_belief_on_empty_visible_cell_is_reported() {
        let shape = GridShape::new(1, 2);
        let mut board = Board::new(shape);
        board.toggle_particle(Coord::new(0, 0)).unwrap();
        board.toggle_visible(Coord::new(0, 1)).unwrap();

        let mut ensemble = Ensemble::new(shape);
        ensemble
            .new_particle_within(&[Coord::new(0, 0), Coord::new(0, 1)])
            .unwrap();

        let failure = check_invariants(&board, &ensemble).unwrap_err();
        assert!(failure.contains("empty visible cell"));
    }
}
