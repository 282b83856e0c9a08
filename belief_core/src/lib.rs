//! Belief Core - Multi-Hypothesis Tracking of Indistinguishable Particles
//!
//! Tracks where an unknown number of identical particles may be on a grid
//! from partial, noiseless observations:
//! 1. **Belief Field**: one particle's probability over every cell
//! 2. **Hypothesis**: a weighted, self-consistent set of fields
//! 3. **Ensemble**: at most `MAX_HYPOTHESES` weighted hypotheses, kept bounded
//!    by deduplication, information ranking and similarity-based dissolving

pub mod belief_field;
pub mod canonical;
pub mod ensemble;
pub mod error;
pub mod grid;
pub mod hypothesis;
pub mod metrics;
pub mod selection;

// Re-export key types for convenience
pub use belief_field::BeliefField;
pub use ensemble::{Ensemble, EnsembleConfig, MAX_HYPOTHESES};
pub use error::BeliefError;
pub use grid::{Coord, GridShape, Topology};
pub use hypothesis::Hypothesis;
pub use metrics::EnsembleMetrics;
