//! Grid geometry shared by every belief structure.
//!
//! - [`Coord`]: immutable (row, column) key for a grid cell
//! - [`GridShape`]: explicit height/width context threaded through constructors
//! - [`Topology`]: the movement contract consumed from the grid world model

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::BeliefError;

// ============================================================================
// COORDINATE
// ============================================================================

/// A single grid cell addressed by row and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub row: usize,
    pub col: usize,
}

impl Coord {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// The four cardinal neighbours in the order right, left, down, up.
    ///
    /// Cells that would leave the non-negative quadrant are omitted; the upper
    /// bounds are checked by the caller.
    pub fn cardinal(self) -> impl Iterator<Item = Coord> {
        let Coord { row, col } = self;
        [
            Some(Coord::new(row, col + 1)),
            col.checked_sub(1).map(|c| Coord::new(row, c)),
            Some(Coord::new(row + 1, col)),
            row.checked_sub(1).map(|r| Coord::new(r, col)),
        ]
        .into_iter()
        .flatten()
    }
}

impl From<(usize, usize)> for Coord {
    fn from((row, col): (usize, usize)) -> Self {
        Self::new(row, col)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

// ============================================================================
// GRID SHAPE
// ============================================================================

/// Dimensions of the grid a belief structure lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridShape {
    pub height: usize,
    pub width: usize,
}

impl GridShape {
    pub const fn new(height: usize, width: usize) -> Self {
        Self { height, width }
    }

    /// Number of cells on the grid.
    pub fn len(&self) -> usize {
        self.height * self.width
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, cell: Coord) -> bool {
        cell.row < self.height && cell.col < self.width
    }

    /// Enumerates every cell in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = Coord> {
        let width = self.width;
        (0..self.height).flat_map(move |row| (0..width).map(move |col| Coord::new(row, col)))
    }

    /// Returns `cell` unchanged if it lies on the grid.
    pub fn check(&self, cell: Coord) -> Result<Coord, BeliefError> {
        if self.contains(cell) {
            Ok(cell)
        } else {
            Err(BeliefError::OutOfBounds {
                cell,
                height: self.height,
                width: self.width,
            })
        }
    }
}

// ============================================================================
// TOPOLOGY
// ============================================================================

/// Movement contract of the grid world model.
///
/// `neighbors` returns the cells a particle may legally step into from `cell`;
/// out-of-bounds and blocked cells are excluded.
pub trait Topology {
    fn neighbors(&self, cell: Coord) -> Vec<Coord>;
}

/// An obstacle-free grid: every in-bounds cardinal neighbour is reachable.
impl Topology for GridShape {
    fn neighbors(&self, cell: Coord) -> Vec<Coord> {
        cell.cardinal().filter(|n| self.contains(*n)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cells_row_major() {
        let shape = GridShape::new(2, 3);
        let cells: Vec<Coord> = shape.cells().collect();

        assert_eq!(cells.len(), 6);
        assert_eq!(cells[0], Coord::new(0, 0));
        assert_eq!(cells[2], Coord::new(0, 2));
        assert_eq!(cells[3], Coord::new(1, 0));
    }

    #[test]
    fn test_open_grid_neighbors() {
        let shape = GridShape::new(3, 3);

        assert_eq!(shape.neighbors(Coord::new(1, 1)).len(), 4);
        assert_eq!(
            shape.neighbors(Coord::new(0, 0)),
            vec![Coord::new(0, 1), Coord::new(1, 0)]
        );
        assert_eq!(shape.neighbors(Coord::new(2, 2)).len(), 2);
    }

    #[test]
    fn test_check_rejects_outside() {
        let shape = GridShape::new(1, 2);
        assert!(shape.check(Coord::new(0, 1)).is_ok());
        assert!(matches!(
            shape.check(Coord::new(1, 0)),
            Err(BeliefError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_coord_ordering() {
        assert!(Coord::new(0, 5) < Coord::new(1, 0));
        assert_eq!(Coord::from((2, 3)), Coord::new(2, 3));
    }
}
