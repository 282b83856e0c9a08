//! Ground truth board for simulation.
//!
//! The Board is the reality the ensemble tries to track:
//! - Particle counts per cell (several particles may share a cell)
//! - Rocks, which particles can never enter
//! - Visible cells, whose particle count is reported after every change
//!
//! Board mutations never touch an ensemble directly. Each one returns the
//! [`BoardEvent`]s it caused, and the session feeds them to the ensemble.

use belief_core::{Coord, GridShape, Topology};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::SimError;
use crate::layout::{CellCode, WorldLayout};

/// Number of cardinal directions a particle may draw from.
const DIRECTIONS: u32 = 4;

/// What the ensemble is told about a board change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoardEvent {
    /// A particle appeared somewhere in `area`
    NewParticle { area: Vec<Coord> },

    /// A particle vanished from somewhere in `area`
    DeletedParticle { area: Vec<Coord> },

    /// Exactly `count` particles are at `cell`
    Observed { cell: Coord, count: usize },

    /// Every particle took one random-walk step
    TimeStep,
}

/// The Board - ground truth particles, rocks and visibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    shape: GridShape,

    /// Particle count per cell, row-major
    particles: Vec<u32>,

    rocks: BTreeSet<Coord>,

    visible: BTreeSet<Coord>,
}

impl Board {
    /// Creates an empty, fully hidden board.
    pub fn new(shape: GridShape) -> Self {
        Self {
            shape,
            particles: vec![0; shape.len()],
            rocks: BTreeSet::new(),
            visible: BTreeSet::new(),
        }
    }

    /// Builds a board from a layout, returning the events its setup produced.
    ///
    /// Codes are replayed in row-major order through the regular toggles.
    pub fn from_layout(layout: &WorldLayout) -> Result<(Self, Vec<BoardEvent>), SimError> {
        let mut board = Self::new(layout.shape);
        let events = board.initialize(layout)?;
        Ok((board, events))
    }

    /// Replays `layout` onto this board.
    pub fn initialize(&mut self, layout: &WorldLayout) -> Result<Vec<BoardEvent>, SimError> {
        let mut events = Vec::new();
        for cell in self.shape.cells() {
            let emitted = match layout.code_at(cell) {
                CellCode::Empty => continue,
                CellCode::Particle => self.toggle_particle(cell)?,
                CellCode::Rock => self.toggle_rock(cell)?,
                CellCode::Visible => self.toggle_visible(cell)?,
            };
            events.extend(emitted);
        }
        Ok(events)
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn shape(&self) -> GridShape {
        self.shape
    }

    pub fn count_at(&self, cell: Coord) -> usize {
        if self.shape.contains(cell) {
            self.particles[self.index(cell)] as usize
        } else {
            0
        }
    }

    pub fn is_particle(&self, cell: Coord) -> bool {
        self.count_at(cell) > 0
    }

    pub fn is_rock(&self, cell: Coord) -> bool {
        self.rocks.contains(&cell)
    }

    pub fn is_visible(&self, cell: Coord) -> bool {
        self.visible.contains(&cell)
    }

    /// Total number of particles on the board.
    pub fn particle_count(&self) -> usize {
        self.particles.iter().map(|n| *n as usize).sum()
    }

    /// Occupied cells in row-major order.
    pub fn occupied_cells(&self) -> Vec<Coord> {
        self.shape.cells().filter(|c| self.is_particle(*c)).collect()
    }

    pub fn rocks(&self) -> impl Iterator<Item = Coord> + '_ {
        self.rocks.iter().copied()
    }

    pub fn visible_cells(&self) -> impl Iterator<Item = Coord> + '_ {
        self.visible.iter().copied()
    }

    /// Where a particle toggled at `cell` may be, from the ensemble's view.
    fn uncertainty_area(&self, cell: Coord) -> Vec<Coord> {
        if self.is_visible(cell) {
            vec![cell]
        } else {
            self.shape
                .cells()
                .filter(|c| !self.is_visible(*c) && !self.is_rock(*c))
                .collect()
        }
    }

    fn index(&self, cell: Coord) -> usize {
        cell.row * self.shape.width + cell.col
    }

    // ========================================================================
    // MANIPULATION
    // ========================================================================

    /// Adds a particle to an empty cell, or removes one from an occupied cell.
    pub fn toggle_particle(&mut self, cell: Coord) -> Result<Vec<BoardEvent>, SimError> {
        self.shape.check(cell)?;
        if self.is_rock(cell) {
            return Err(SimError::Blocked(cell));
        }

        let area = self.uncertainty_area(cell);
        let index = self.index(cell);
        let event = if self.particles[index] > 0 {
            self.particles[index] -= 1;
            BoardEvent::DeletedParticle { area }
        } else {
            self.particles[index] = 1;
            BoardEvent::NewParticle { area }
        };
        Ok(vec![event])
    }

    /// Places or removes a rock. A new rock is known to hold no particle.
    pub fn toggle_rock(&mut self, cell: Coord) -> Result<Vec<BoardEvent>, SimError> {
        self.shape.check(cell)?;
        if self.is_particle(cell) {
            return Err(SimError::Occupied(cell));
        }

        if self.rocks.remove(&cell) {
            return Ok(Vec::new());
        }
        self.rocks.insert(cell);
        Ok(vec![BoardEvent::Observed { cell, count: 0 }])
    }

    /// Shows or hides a cell. A newly shown cell reports its count.
    pub fn toggle_visible(&mut self, cell: Coord) -> Result<Vec<BoardEvent>, SimError> {
        self.shape.check(cell)?;

        if self.visible.remove(&cell) {
            return Ok(Vec::new());
        }
        self.visible.insert(cell);
        Ok(vec![BoardEvent::Observed {
            cell,
            count: self.count_at(cell),
        }])
    }

    // ========================================================================
    // PHYSICS
    // ========================================================================

    /// Advances the board by one random-walk step.
    ///
    /// Each particle draws a direction in `0..4` and moves to that entry of
    /// its neighbour list, staying put when the entry does not exist. Moves
    /// are computed from the counts at the start of the step.
    pub fn step_in_time<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Vec<BoardEvent> {
        let mut events = vec![BoardEvent::TimeStep];

        let before = self.particles.clone();
        for cell in self.shape.cells() {
            for _ in 0..before[self.index(cell)] {
                let steps = self.neighbors(cell);
                let draw = rng.gen_range(0..DIRECTIONS) as usize;
                let Some(next) = steps.get(draw) else {
                    continue;
                };
                let (from, to) = (self.index(cell), self.index(*next));
                self.particles[from] -= 1;
                self.particles[to] += 1;
            }
        }

        events.extend(self.visible.iter().map(|cell| BoardEvent::Observed {
            cell: *cell,
            count: self.count_at(*cell),
        }));
        events
    }
}

/// Legal moves: in-bounds, rock-free cardinal cells, right/left/down/up.
impl Topology for Board {
    fn neighbors(&self, cell: Coord) -> Vec<Coord> {
        cell.cardinal()
            .filter(|n| self.shape.contains(*n) && !self.is_rock(*n))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn c(row: usize, col: usize) -> Coord {
        Coord::new(row, col)
    }

    #[test]
    fn test_hidden_particle_spreads_over_hidden_cells() {
        let mut board = Board::new(GridShape::new(2, 2));
        board.toggle_rock(c(0, 1)).unwrap();
        board.toggle_visible(c(1, 1)).unwrap();

        let events = board.toggle_particle(c(0, 0)).unwrap();
        assert_eq!(
            events,
            vec![BoardEvent::NewParticle {
                area: vec![c(0, 0), c(1, 0)]
            }]
        );
        assert_eq!(board.count_at(c(0, 0)), 1);
    }

    #[test]
    fn test_visible_particle_is_pinned() {
        let mut board = Board::new(GridShape::new(2, 2));
        board.toggle_visible(c(1, 1)).unwrap();

        let added = board.toggle_particle(c(1, 1)).unwrap();
        assert_eq!(added, vec![BoardEvent::NewParticle { area: vec![c(1, 1)] }]);

        let removed = board.toggle_particle(c(1, 1)).unwrap();
        assert_eq!(removed, vec![BoardEvent::DeletedParticle { area: vec![c(1, 1)] }]);
        assert_eq!(board.particle_count(), 0);
    }

    #[test]
    fn test_rock_rules() {
        let mut board = Board::new(GridShape::new(1, 3));
        board.toggle_particle(c(0, 0)).unwrap();

        assert!(matches!(board.toggle_rock(c(0, 0)), Err(SimError::Occupied(_))));
        assert_eq!(
            board.toggle_rock(c(0, 1)).unwrap(),
            vec![BoardEvent::Observed { cell: c(0, 1), count: 0 }]
        );
        assert!(matches!(board.toggle_particle(c(0, 1)), Err(SimError::Blocked(_))));

        // Removing a rock is silent.
        assert!(board.toggle_rock(c(0, 1)).unwrap().is_empty());
        assert!(!board.is_rock(c(0, 1)));
    }

    #[test]
    fn test_out_of_bounds_is_rejected() {
        let mut board = Board::new(GridShape::new(2, 2));
        assert!(matches!(board.toggle_particle(c(2, 0)), Err(SimError::Belief(_))));
        assert!(matches!(board.toggle_visible(c(0, 5)), Err(SimError::Belief(_))));
    }

    #[test]
    fn test_showing_reports_count_hiding_is_silent() {
        let mut board = Board::new(GridShape::new(1, 2));
        board.toggle_particle(c(0, 1)).unwrap();

        assert_eq!(
            board.toggle_visible(c(0, 1)).unwrap(),
            vec![BoardEvent::Observed { cell: c(0, 1), count: 1 }]
        );
        assert!(board.toggle_visible(c(0, 1)).unwrap().is_empty());
    }

    #[test]
    fn test_neighbors_avoid_rocks_and_borders() {
        let mut board = Board::new(GridShape::new(3, 3));
        board.toggle_rock(c(1, 2)).unwrap();

        assert_eq!(board.neighbors(c(1, 1)), vec![c(1, 0), c(2, 1), c(0, 1)]);
        assert_eq!(board.neighbors(c(0, 0)), vec![c(0, 1), c(1, 0)]);
    }

    #[test]
    fn test_step_conserves_particles() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut board = Board::new(GridShape::new(3, 3));
        board.toggle_particle(c(0, 0)).unwrap();
        board.toggle_particle(c(2, 2)).unwrap();
        board.toggle_rock(c(1, 1)).unwrap();

        for _ in 0..50 {
            board.step_in_time(&mut rng);
            assert_eq!(board.particle_count(), 2);
            assert!(!board.is_particle(c(1, 1)));
        }
    }

    #[test]
    fn test_step_events_order() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut board = Board::new(GridShape::new(2, 2));
        board.toggle_visible(c(0, 1)).unwrap();
        board.toggle_visible(c(1, 0)).unwrap();

        let events = board.step_in_time(&mut rng);
        assert_eq!(
            events,
            vec![
                BoardEvent::TimeStep,
                BoardEvent::Observed { cell: c(0, 1), count: 0 },
                BoardEvent::Observed { cell: c(1, 0), count: 0 },
            ]
        );
    }

    #[test]
    fn test_step_is_deterministic_per_seed() {
        let mut board = Board::new(GridShape::new(4, 4));
        board.toggle_particle(c(1, 1)).unwrap();
        board.toggle_particle(c(2, 3)).unwrap();

        let run = |mut board: Board| {
            let mut rng = ChaCha8Rng::seed_from_u64(99);
            for _ in 0..10 {
                board.step_in_time(&mut rng);
            }
            board.occupied_cells()
        };
        assert_eq!(run(board.clone()), run(board));
    }

    #[test]
    fn test_boxed_in_particle_never_moves() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut board = Board::new(GridShape::new(1, 3));
        board.toggle_particle(c(0, 1)).unwrap();
        board.toggle_rock(c(0, 0)).unwrap();
        board.toggle_rock(c(0, 2)).unwrap();

        for _ in 0..10 {
            board.step_in_time(&mut rng);
        }
        assert_eq!(board.occupied_cells(), vec![c(0, 1)]);
    }
}
