//! The Ensemble Manager - bounded multi-hypothesis belief state.
//!
//! Receives the grid model's domain events and fans them out to every
//! hypothesis:
//! 1. **New particle**: every hypothesis gains a field (no splitting)
//! 2. **Deleted particle**: every hypothesis splits by "which one vanished"
//! 3. **Observation**: every hypothesis splits by "which ones were seen"
//! 4. **Time step**: every field diffuses (no splitting)
//!
//! Splitting events are followed by a shrink pass that deduplicates, ranks by
//! information, truncates to `max_hypotheses` and dissolves the discarded tail
//! into the most similar survivors before renormalizing the weights.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::{Entry, HashMap};
use tracing::debug;

use crate::belief_field::distinct_cells;
use crate::canonical::HypothesisKey;
use crate::error::BeliefError;
use crate::grid::{Coord, GridShape, Topology};
use crate::hypothesis::Hypothesis;
use crate::metrics::EnsembleMetrics;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Default bound on the number of hypotheses kept after a shrink.
pub const MAX_HYPOTHESES: usize = 15;

/// Configuration for the Ensemble
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnsembleConfig {
    /// Hypotheses kept after each shrink (default: 15, minimum 1)
    pub max_hypotheses: usize,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            max_hypotheses: MAX_HYPOTHESES,
        }
    }
}

// ============================================================================
// ENSEMBLE
// ============================================================================

/// Weight-normalized, bounded set of hypotheses.
///
/// Every completed event leaves the weights summing to one. An event that
/// fails leaves the previous hypothesis list in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ensemble {
    shape: GridShape,
    config: EnsembleConfig,
    hypotheses: Vec<Hypothesis>,
}

impl Ensemble {
    /// Starts from a single certain hypothesis that believes in no particles.
    pub fn new(shape: GridShape) -> Self {
        Self::with_config(shape, EnsembleConfig::default())
    }

    pub fn with_config(shape: GridShape, config: EnsembleConfig) -> Self {
        Self {
            shape,
            config: EnsembleConfig {
                max_hypotheses: config.max_hypotheses.max(1),
            },
            hypotheses: vec![Hypothesis::new(shape, 1.0)],
        }
    }

    /// Builds an ensemble from prepared hypotheses, shrinking them into shape.
    pub fn from_hypotheses(
        shape: GridShape,
        config: EnsembleConfig,
        hypotheses: Vec<Hypothesis>,
    ) -> Result<Self, BeliefError> {
        if let Some(stray) = hypotheses.iter().find(|h| h.shape() != shape) {
            return Err(BeliefError::DimensionMismatch {
                expected: (shape.height, shape.width),
                actual: (stray.shape().height, stray.shape().width),
            });
        }
        let mut ensemble = Self::with_config(shape, config);
        ensemble.hypotheses = ensemble.shrink(hypotheses)?;
        Ok(ensemble)
    }

    pub fn shape(&self) -> GridShape {
        self.shape
    }

    pub fn config(&self) -> &EnsembleConfig {
        &self.config
    }

    pub fn hypotheses(&self) -> &[Hypothesis] {
        &self.hypotheses
    }

    pub fn len(&self) -> usize {
        self.hypotheses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hypotheses.is_empty()
    }

    pub fn total_weight(&self) -> f64 {
        self.hypotheses.iter().map(Hypothesis::weight).sum()
    }

    pub fn metrics(&self) -> EnsembleMetrics {
        EnsembleMetrics::from_ensemble(self)
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    /// Belief that a particle occupies `cell`: `Σ weight * probability`.
    pub fn probability(&self, cell: Coord) -> f64 {
        let p: f64 = self
            .hypotheses
            .iter()
            .map(|h| h.weight() * h.probability(cell))
            .sum();
        p.clamp(0.0, 1.0)
    }

    /// Occupancy belief for every cell (height x width).
    pub fn probability_map(&self) -> DMatrix<f64> {
        DMatrix::from_fn(self.shape.height, self.shape.width, |row, col| {
            self.probability(Coord::new(row, col))
        })
    }

    // ========================================================================
    // EVENTS
    // ========================================================================

    /// A new particle appeared somewhere in `area`.
    pub fn new_particle_within(&mut self, area: &[Coord]) -> Result<(), BeliefError> {
        distinct_cells(self.shape, area)?;
        for hypothesis in &mut self.hypotheses {
            hypothesis.add_distribution(area)?;
        }
        Ok(())
    }

    /// A particle disappeared somewhere in `area`.
    pub fn deleted_particle_within(&mut self, area: &[Coord]) -> Result<(), BeliefError> {
        let mut children = Vec::new();
        for hypothesis in &self.hypotheses {
            children.extend(hypothesis.split_after_deletion(area)?);
        }
        self.hypotheses = self.shrink(children)?;
        Ok(())
    }

    /// Exactly `count` particles were seen at `cell`.
    pub fn observe_particles(&mut self, cell: Coord, count: usize) -> Result<(), BeliefError> {
        self.shape.check(cell)?;
        let mut children = Vec::new();
        for hypothesis in &self.hypotheses {
            children.extend(hypothesis.split_after_observation(cell, count)?);
        }
        self.hypotheses = self.shrink(children)?;
        Ok(())
    }

    /// One unit of time passed; every particle took a random-walk step.
    pub fn observe_time_step<T: Topology + ?Sized>(&mut self, topology: &T) {
        for hypothesis in &mut self.hypotheses {
            hypothesis.simulate_time_step(topology);
        }
    }

    // ========================================================================
    // SHRINK
    // ========================================================================

    /// Deduplicate, rank, truncate, dissolve, renormalize.
    fn shrink(&self, hypotheses: Vec<Hypothesis>) -> Result<Vec<Hypothesis>, BeliefError> {
        let produced = hypotheses.len();

        let mut retained = deduplicate(hypotheses);
        let distinct = retained.len();

        retained.sort_by(Hypothesis::by_information);
        let cut = retained.len().min(self.config.max_hypotheses);
        let dissolving = retained.split_off(cut);

        dissolve(&mut retained, &dissolving)?;
        normalize_weights(&mut retained)?;

        debug!(
            produced,
            distinct,
            dissolved = dissolving.len(),
            retained = retained.len(),
            "ensemble shrink"
        );
        Ok(retained)
    }
}

/// Collapses structurally identical hypotheses, summing their weights.
///
/// The first occurrence of each key is kept as the representative, so the
/// output order follows the input.
fn deduplicate(hypotheses: Vec<Hypothesis>) -> Vec<Hypothesis> {
    let mut representatives: Vec<Hypothesis> = Vec::with_capacity(hypotheses.len());
    let mut slots: HashMap<HypothesisKey, usize> = HashMap::new();

    for hypothesis in hypotheses {
        match slots.entry(hypothesis.key()) {
            Entry::Occupied(slot) => {
                let representative = &mut representatives[*slot.get()];
                representative.set_weight(representative.weight() + hypothesis.weight());
            }
            Entry::Vacant(slot) => {
                slot.insert(representatives.len());
                representatives.push(hypothesis);
            }
        }
    }
    representatives
}

/// Merges every dissolving hypothesis into its most similar survivor.
///
/// Targets are chosen against the survivors as they were before any merge.
fn dissolve(retained: &mut [Hypothesis], dissolving: &[Hypothesis]) -> Result<(), BeliefError> {
    let targets = dissolving
        .iter()
        .map(|h| most_similar(retained, h))
        .collect::<Option<Vec<usize>>>()
        .ok_or(BeliefError::EmptyEnsemble)?;

    for (hypothesis, target) in dissolving.iter().zip(targets) {
        retained[target].merge_in(hypothesis)?;
    }
    Ok(())
}

/// Index of the candidate most similar to `other`; ties go to the first.
fn most_similar(candidates: &[Hypothesis], other: &Hypothesis) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, candidate) in candidates.iter().enumerate() {
        let similarity = candidate.similarity(other);
        if best.map_or(true, |(_, top)| similarity > top) {
            best = Some((index, similarity));
        }
    }
    best.map(|(index, _)| index)
}

/// Rescales existence weights to sum to one.
fn normalize_weights(hypotheses: &mut [Hypothesis]) -> Result<(), BeliefError> {
    let total: f64 = hypotheses.iter().map(Hypothesis::weight).sum();
    if !total.is_finite() || total <= 0.0 {
        return Err(BeliefError::EmptyEnsemble);
    }
    for hypothesis in hypotheses {
        hypothesis.set_weight(hypothesis.weight() / total);
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
