//! Session - ground truth, belief and history wired together.

use belief_core::{Coord, Ensemble, EnsembleConfig, GridShape, MAX_HYPOTHESES};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::board::{Board, BoardEvent};
use crate::error::SimError;
use crate::layout::WorldLayout;
use crate::memory::{Memory, Snapshot, HISTORY_DEPTH};

/// Configuration for a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Master seed for the board's random walk
    pub seed: u64,

    /// Hypotheses kept by the ensemble after each shrink
    pub max_hypotheses: usize,

    /// Random time steps per scenario run
    pub steps: usize,

    /// Snapshots remembered for stepping backward
    pub history_depth: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            max_hypotheses: MAX_HYPOTHESES,
            steps: 20,
            history_depth: HISTORY_DEPTH,
        }
    }
}

impl SimConfig {
    pub fn ensemble_config(&self) -> EnsembleConfig {
        EnsembleConfig {
            max_hypotheses: self.max_hypotheses,
        }
    }
}

/// Feeds board events to the ensemble in order.
pub fn apply_events(
    ensemble: &mut Ensemble,
    board: &Board,
    events: &[BoardEvent],
) -> Result<(), SimError> {
    for event in events {
        let outcome = match event {
            BoardEvent::NewParticle { area } => ensemble.new_particle_within(area),
            BoardEvent::DeletedParticle { area } => ensemble.deleted_particle_within(area),
            BoardEvent::Observed { cell, count } => ensemble.observe_particles(*cell, *count),
            BoardEvent::TimeStep => {
                ensemble.observe_time_step(board);
                Ok(())
            }
        };
        if let Err(e) = outcome {
            warn!("Rejected {:?}: {}", event, e);
            return Err(e.into());
        }
        trace!(?event, hypotheses = ensemble.len(), "applied board event");
    }
    Ok(())
}

/// An interactive run: manipulate the board, step through time, rewind.
///
/// Every action works on a copy of the active snapshot and only replaces it
/// once the ensemble accepted all resulting events.
pub struct Session {
    config: SimConfig,
    memory: Memory,
    rng: ChaCha8Rng,
}

impl Session {
    /// Starts with an empty board and a belief in no particles.
    pub fn new(shape: GridShape, config: SimConfig) -> Self {
        let snapshot = Snapshot {
            board: Board::new(shape),
            ensemble: Ensemble::with_config(shape, config.ensemble_config()),
        };
        Self {
            memory: Memory::new(snapshot, config.history_depth),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
        }
    }

    /// Starts from a world layout, replaying its setup into the ensemble.
    pub fn from_layout(layout: &WorldLayout, config: SimConfig) -> Result<Self, SimError> {
        let (board, events) = Board::from_layout(layout)?;
        let mut ensemble = Ensemble::with_config(layout.shape, config.ensemble_config());
        apply_events(&mut ensemble, &board, &events)?;

        Ok(Self {
            memory: Memory::new(Snapshot { board, ensemble }, config.history_depth),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn board(&self) -> &Board {
        &self.memory.active().board
    }

    pub fn ensemble(&self) -> &Ensemble {
        &self.memory.active().ensemble
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn probability(&self, cell: Coord) -> f64 {
        self.ensemble().probability(cell)
    }

    // ========================================================================
    // MANIPULATION
    // ========================================================================

    pub fn toggle_particle(&mut self, cell: Coord) -> Result<(), SimError> {
        self.manipulate(|board| board.toggle_particle(cell))
    }

    pub fn toggle_rock(&mut self, cell: Coord) -> Result<(), SimError> {
        self.manipulate(|board| board.toggle_rock(cell))
    }

    pub fn toggle_visible(&mut self, cell: Coord) -> Result<(), SimError> {
        self.manipulate(|board| board.toggle_visible(cell))
    }

    /// Applies a board change to the active snapshot and forgets the future.
    fn manipulate<F>(&mut self, change: F) -> Result<(), SimError>
    where
        F: FnOnce(&mut Board) -> Result<Vec<BoardEvent>, SimError>,
    {
        let mut next = self.memory.active().clone();
        let events = change(&mut next.board)?;
        apply_events(&mut next.ensemble, &next.board, &events)?;

        self.memory.future_changed();
        *self.memory.active_mut() = next;
        Ok(())
    }

    // ========================================================================
    // TIME
    // ========================================================================

    /// Moves one step forward, replaying the remembered future if there is one.
    ///
    /// Returns `true` when a new step was simulated.
    pub fn step_forward(&mut self) -> Result<bool, SimError> {
        if self.memory.step_forward() {
            return Ok(false);
        }

        let mut next = self.memory.active().clone();
        let events = next.board.step_in_time(&mut self.rng);
        apply_events(&mut next.ensemble, &next.board, &events)?;

        self.memory.log(next);
        Ok(true)
    }

    /// Moves one step back if history allows.
    pub fn step_backward(&mut self) -> bool {
        self.memory.step_backward()
    }
}
