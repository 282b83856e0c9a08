//! Bounded history of board and ensemble snapshots.
//!
//! The memory keeps deep copies in chronological order plus a cursor on the
//! active snapshot. Stepping backward and forward moves the cursor; logging a
//! new snapshot always makes it the latest and active one.

use belief_core::Ensemble;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::board::Board;

/// Default number of snapshots remembered.
pub const HISTORY_DEPTH: usize = 20;

/// A frozen moment: ground truth and belief together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub board: Board,
    pub ensemble: Ensemble,
}

#[derive(Debug, Clone)]
pub struct Memory {
    history: VecDeque<Snapshot>,

    /// Index of the active snapshot
    cursor: usize,

    /// Maximum snapshots kept (at least 1)
    depth: usize,
}

impl Memory {
    pub fn new(initial: Snapshot, depth: usize) -> Self {
        Self {
            history: VecDeque::from([initial]),
            cursor: 0,
            depth: depth.max(1),
        }
    }

    pub fn active(&self) -> &Snapshot {
        &self.history[self.cursor]
    }

    pub fn active_mut(&mut self) -> &mut Snapshot {
        &mut self.history[self.cursor]
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Appends a snapshot and activates it, forgetting the oldest beyond depth.
    pub fn log(&mut self, snapshot: Snapshot) {
        self.history.push_back(snapshot);
        while self.history.len() > self.depth {
            self.history.pop_front();
        }
        self.cursor = self.history.len() - 1;
    }

    /// Moves to the next remembered snapshot, if there is one.
    pub fn step_forward(&mut self) -> bool {
        if self.cursor + 1 < self.history.len() {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    /// Moves to the previous remembered snapshot, if there is one.
    pub fn step_backward(&mut self) -> bool {
        if self.cursor > 0 {
            self.cursor -= 1;
            true
        } else {
            false
        }
    }

    /// Discards every snapshot after the active one.
    pub fn future_changed(&mut self) {
        self.history.truncate(self.cursor + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use belief_core::{Coord, GridShape};

    fn snapshot(particles: usize) -> Snapshot {
        let shape = GridShape::new(1, 4);
        let mut board = Board::new(shape);
        for col in 0..particles {
            board.toggle_particle(Coord::new(0, col)).unwrap();
        }
        Snapshot {
            board,
            ensemble: Ensemble::new(shape),
        }
    }

    fn active_count(memory: &Memory) -> usize {
        memory.active().board.particle_count()
    }

    #[test]
    fn test_log_activates_latest() {
        let mut memory = Memory::new(snapshot(0), HISTORY_DEPTH);
        memory.log(snapshot(1));
        memory.log(snapshot(2));

        assert_eq!(memory.len(), 3);
        assert_eq!(active_count(&memory), 2);
        assert!(!memory.step_forward());
    }

    #[test]
    fn test_step_back_and_forth() {
        let mut memory = Memory::new(snapshot(0), HISTORY_DEPTH);
        memory.log(snapshot(1));

        assert!(memory.step_backward());
        assert_eq!(active_count(&memory), 0);
        assert!(!memory.step_backward());

        assert!(memory.step_forward());
        assert_eq!(active_count(&memory), 1);
    }

    #[test]
    fn test_depth_bound_forgets_oldest() {
        let mut memory = Memory::new(snapshot(0), 2);
        memory.log(snapshot(1));
        memory.log(snapshot(2));

        assert_eq!(memory.len(), 2);
        assert!(memory.step_backward());
        assert_eq!(active_count(&memory), 1);
    }

    #[test]
    fn test_future_changed_drops_later_snapshots() {
        let mut memory = Memory::new(snapshot(0), HISTORY_DEPTH);
        memory.log(snapshot(1));
        memory.log(snapshot(2));
        memory.step_backward();
        memory.step_backward();

        memory.future_changed();
        assert_eq!(memory.len(), 1);
        assert!(!memory.step_forward());
        assert_eq!(active_count(&memory), 0);
    }

    #[test]
    fn test_snapshots_are_independent() {
        let mut memory = Memory::new(snapshot(1), HISTORY_DEPTH);
        let copy = memory.active().clone();
        memory.log(copy);
        memory.active_mut().board.toggle_particle(Coord::new(0, 0)).unwrap();

        assert_eq!(active_count(&memory), 0);
        memory.step_backward();
        assert_eq!(active_count(&memory), 1);
    }
}
