//! Ensemble Metrics Module
//! =======================
//!
//! Summary statistics of an ensemble's belief state:
//! - **Weight profile**: count, total and dominant hypothesis weight
//! - **Expected particles**: `Σ weight * field_count` over the ensemble
//! - **Information**: weighted mean of per-field information
//! - **Weight entropy**: how evenly belief is spread over the hypotheses
//!
//! These drive the simulation's per-step telemetry and exports.

use serde::{Deserialize, Serialize};

use crate::ensemble::Ensemble;

/// Snapshot of an ensemble's health
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnsembleMetrics {
    /// Number of live hypotheses
    pub hypothesis_count: usize,
    /// Sum of existence weights (1.0 after every completed event)
    pub total_weight: f64,
    /// Weight of the most probable hypothesis
    pub max_weight: f64,
    /// Expected particle count across hypotheses
    pub expected_particles: f64,
    /// Weighted mean field information in [0, 1]
    pub mean_information: f64,
    /// Shannon entropy of the hypothesis weights (nats)
    pub weight_entropy: f64,
}

impl EnsembleMetrics {
    pub fn from_ensemble(ensemble: &Ensemble) -> Self {
        let hypotheses = ensemble.hypotheses();

        let mut metrics = Self {
            hypothesis_count: hypotheses.len(),
            ..Self::default()
        };

        for hypothesis in hypotheses {
            let w = hypothesis.weight();
            metrics.total_weight += w;
            metrics.max_weight = metrics.max_weight.max(w);
            metrics.expected_particles += w * hypothesis.field_count() as f64;

            let fields = hypothesis.fields();
            if !fields.is_empty() {
                let mean: f64 =
                    fields.iter().map(|f| f.information()).sum::<f64>() / fields.len() as f64;
                metrics.mean_information += w * mean;
            }

            if w > 0.0 {
                metrics.weight_entropy -= w * w.ln();
            }
        }

        metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Coord, GridShape};
    use approx::assert_relative_eq;

    #[test]
    fn test_metrics_of_fresh_ensemble() {
        let metrics = Ensemble::new(GridShape::new(2, 2)).metrics();
        assert_eq!(metrics.hypothesis_count, 1);
        assert_relative_eq!(metrics.total_weight, 1.0);
        assert_relative_eq!(metrics.max_weight, 1.0);
        assert_eq!(metrics.expected_particles, 0.0);
        assert_eq!(metrics.weight_entropy, 0.0);
    }

    #[test]
    fn test_metrics_after_split() {
        let shape = GridShape::new(1, 2);
        let mut ensemble = Ensemble::new(shape);
        let both = [Coord::new(0, 0), Coord::new(0, 1)];
        ensemble.new_particle_within(&both).unwrap();
        ensemble.new_particle_within(&[Coord::new(0, 0)]).unwrap();

        // Deleting from the 2-cell area splits into "first left" / "second left".
        ensemble.deleted_particle_within(&both).unwrap();
        let metrics = ensemble.metrics();

        assert_relative_eq!(metrics.total_weight, 1.0, epsilon = 1e-12);
        assert_relative_eq!(metrics.expected_particles, 1.0, epsilon = 1e-12);
        assert!(metrics.hypothesis_count >= 1);
        assert!(metrics.mean_information > 0.0 && metrics.mean_information <= 1.0);
    }
}
