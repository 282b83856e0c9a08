//! The spatial belief for one presumed particle.
//!
//! A [`BeliefField`] is a normalized probability grid: every cell is
//! non-negative and the cells sum to one. It is only mutated through
//! diffusion, collapse, removal, merging and normalization, each of which
//! drops the cached information score.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;
use std::collections::BTreeSet;

use crate::canonical::FieldKey;
use crate::error::BeliefError;
use crate::grid::{Coord, GridShape, Topology};

/// Share of a cell's mass that moves into each reachable neighbour per step.
pub const DIFFUSION_SHARE: f64 = 0.25;

/// Keeps `p * ln(p + ε)` finite for empty cells.
const ENTROPY_EPSILON: f64 = 1e-60;

/// Probability field over the grid for a single particle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeliefField {
    /// Row-indexed probability grid (height x width)
    probs: DMatrix<f64>,

    /// Cached `1 - normalized entropy`
    #[serde(skip)]
    information: OnceCell<f64>,
}

impl BeliefField {
    /// Creates a field spread evenly over `area`, zero elsewhere.
    ///
    /// Duplicate cells in `area` are counted once.
    pub fn uniform(shape: GridShape, area: &[Coord]) -> Result<Self, BeliefError> {
        let cells = distinct_cells(shape, area)?;
        let share = 1.0 / cells.len() as f64;

        let mut probs = DMatrix::zeros(shape.height, shape.width);
        for cell in cells {
            probs[(cell.row, cell.col)] = share;
        }
        Ok(Self::from_matrix(probs))
    }

    /// Creates a field that is certain to be at `cell`.
    pub fn concentrated(shape: GridShape, cell: Coord) -> Result<Self, BeliefError> {
        let cell = shape.check(cell)?;
        let mut probs = DMatrix::zeros(shape.height, shape.width);
        probs[(cell.row, cell.col)] = 1.0;
        Ok(Self::from_matrix(probs))
    }

    /// Wraps a raw probability grid. The caller is responsible for its mass.
    pub fn from_matrix(probs: DMatrix<f64>) -> Self {
        Self {
            probs,
            information: OnceCell::new(),
        }
    }

    pub fn shape(&self) -> GridShape {
        GridShape::new(self.probs.nrows(), self.probs.ncols())
    }

    /// Probability mass at `cell`; cells outside the grid hold none.
    #[inline]
    pub fn probability(&self, cell: Coord) -> f64 {
        self.probs.get((cell.row, cell.col)).copied().unwrap_or(0.0)
    }

    /// Total mass inside `area`, each distinct cell counted once.
    pub fn mass_within(&self, area: &[Coord]) -> f64 {
        area.iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(|cell| self.probability(cell))
            .sum()
    }

    /// Total mass of the field (one, up to floating drift).
    pub fn total(&self) -> f64 {
        self.probs.sum()
    }

    // ========================================================================
    // MUTATION
    // ========================================================================

    /// One random-walk step.
    ///
    /// Every occupied cell hands `DIFFUSION_SHARE` of its mass to each
    /// neighbour reported by `topology`; mass aimed at blocked or off-grid
    /// cells stays put. Reads come from a snapshot taken before the pass.
    pub fn diffuse<T: Topology + ?Sized>(&mut self, topology: &T) {
        let shape = self.shape();
        let snapshot = self.probs.clone();

        for cell in shape.cells() {
            let mass = snapshot[(cell.row, cell.col)];
            if mass <= 0.0 {
                continue;
            }
            let moving = DIFFUSION_SHARE * mass;
            for next in topology.neighbors(cell) {
                if !shape.contains(next) {
                    continue;
                }
                self.probs[(cell.row, cell.col)] -= moving;
                self.probs[(next.row, next.col)] += moving;
            }
        }
        self.invalidate();
    }

    /// Collapses the field onto `cell`.
    pub fn concentrate_at(&mut self, cell: Coord) -> Result<(), BeliefError> {
        let cell = self.shape().check(cell)?;
        self.probs.fill(0.0);
        self.probs[(cell.row, cell.col)] = 1.0;
        self.invalidate();
        Ok(())
    }

    /// Removes all mass at `cell` and rescales the rest back to one.
    ///
    /// Fails when `cell` holds the whole mass, since nothing would remain.
    pub fn vanish_from(&mut self, cell: Coord) -> Result<(), BeliefError> {
        let cell = self.shape().check(cell)?;
        let remaining = 1.0 - self.probs[(cell.row, cell.col)];
        if remaining <= 0.0 {
            return Err(BeliefError::SingularRescale { cell });
        }

        self.probs /= remaining;
        self.probs[(cell.row, cell.col)] = 0.0;
        self.invalidate();
        Ok(())
    }

    /// Pointwise mix `(1 - proportion) * self + proportion * other`, then
    /// normalizes.
    pub fn merge_in(&mut self, other: &BeliefField, proportion: f64) -> Result<(), BeliefError> {
        if self.shape() != other.shape() {
            return Err(BeliefError::DimensionMismatch {
                expected: (self.probs.nrows(), self.probs.ncols()),
                actual: (other.probs.nrows(), other.probs.ncols()),
            });
        }

        self.probs
            .zip_apply(&other.probs, |mine, theirs| {
                *mine = (1.0 - proportion) * *mine + proportion * theirs
            });
        self.normalize();
        Ok(())
    }

    /// Clamps negative cells to zero and rescales the total to exactly one.
    ///
    /// A field with no positive mass left is only clamped.
    pub fn normalize(&mut self) {
        self.probs.apply(|p| *p = p.max(0.0));
        let total = self.total();
        if total > 0.0 {
            self.probs /= total;
        }
        self.invalidate();
    }

    #[inline]
    fn invalidate(&mut self) {
        self.information.take();
    }

    // ========================================================================
    // SCORES
    // ========================================================================

    /// `1 - entropy`, with entropy normalized by `ln(cells)`.
    ///
    /// A collapsed field scores 1, a uniform field over the whole grid 0.
    pub fn information(&self) -> f64 {
        *self.information.get_or_init(|| {
            let events = self.probs.len();
            if events <= 1 {
                return 1.0;
            }
            let norm = (events as f64).ln();
            let entropy: f64 = self
                .probs
                .iter()
                .map(|&p| -p * (p + ENTROPY_EPSILON).ln() / norm)
                .sum();
            1.0 - entropy
        })
    }

    /// Bhattacharyya coefficient `Σ sqrt(p·q)`: 1 for identical fields, 0 for
    /// disjoint supports. Fields on different grids share no cells and score 0.
    pub fn similarity(&self, other: &BeliefField) -> f64 {
        if self.shape() != other.shape() {
            return 0.0;
        }
        self.probs
            .iter()
            .zip(other.probs.iter())
            .map(|(p, q)| (p * q).sqrt())
            .sum()
    }

    /// Canonical key used for structural deduplication.
    pub fn key(&self) -> FieldKey {
        let shape = self.shape();
        FieldKey::from_values(
            shape.height,
            shape.width,
            shape.cells().map(|cell| self.probability(cell)),
        )
    }

    /// Read-only view of the raw grid.
    pub fn as_matrix(&self) -> &DMatrix<f64> {
        &self.probs
    }
}

/// Validates `area` against `shape` and removes duplicates.
pub(crate) fn distinct_cells(shape: GridShape, area: &[Coord]) -> Result<BTreeSet<Coord>, BeliefError> {
    if area.is_empty() {
        return Err(BeliefError::EmptyArea);
    }
    area.iter().map(|cell| shape.check(*cell)).collect()
}
