//! Belief Simulation Harness
//!
//! A deterministic grid world that drives `belief_core` with the same event
//! stream an interactive user would produce, and checks the resulting belief
//! against ground truth.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                       Session                        │
//! │  ┌──────────────┐   BoardEvent   ┌────────────────┐  │
//! │  │    Board     │ ─────────────► │    Ensemble    │  │
//! │  │ (truth, RNG) │  list, in order│ (belief_core)  │  │
//! │  └──────────────┘                └────────────────┘  │
//! │          └────────── Snapshot ─────────┘             │
//! │                         │                            │
//! │                  Memory (history)                    │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use belief_sim::{ScenarioRunner, SimConfig};
//! use belief_sim::scenarios::ScenarioId;
//!
//! let runner = ScenarioRunner::new(SimConfig { seed: 7, ..Default::default() });
//! let result = runner.run(ScenarioId::RandomWalk);
//! assert!(result.passed);
//! ```

mod board;
mod error;
mod exporter;
mod layout;
mod memory;
mod runner;
mod session;
mod validation;
pub mod scenarios;

pub use board::{Board, BoardEvent};
pub use error::SimError;
pub use exporter::{CellCount, SimExport, SimFrame};
pub use layout::{CellCode, WorldLayout};
pub use memory::{Memory, Snapshot, HISTORY_DEPTH};
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner};
pub use session::{apply_events, Session, SimConfig};
pub use validation::{brier_score, check_invariants};
