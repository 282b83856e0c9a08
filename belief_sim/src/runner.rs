//! Scenario runner - executes tracking scenarios against ground truth.

use tracing::{debug, info, warn};

use crate::error::SimError;
use crate::exporter::{SimExport, SimFrame};
use crate::scenarios::{Action, ScenarioId, ScenarioPlan};
use crate::session::{SimConfig, Session};
use crate::validation::{brier_score, check_invariants};

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario or world that was run
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Actions and time steps executed
    pub total_steps: usize,

    /// Brier score of the final belief
    pub brier_score: Option<f64>,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default)]
pub struct ScenarioMetrics {
    /// Largest ensemble seen after any action
    pub peak_hypotheses: usize,

    /// Hypotheses at the end of the run
    pub final_hypotheses: usize,

    /// Mean Brier score over every checked frame
    pub mean_brier: f64,

    /// Expected particle count of the final belief
    pub expected_particles: f64,

    /// Ground truth particle count at the end
    pub true_particles: usize,
}

/// Runs tracking scenarios.
pub struct ScenarioRunner {
    config: SimConfig,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(config: SimConfig) -> Self {
        Self { config }
    }

    /// Sets the number of random steps for open-ended scenarios.
    pub fn with_steps(mut self, steps: usize) -> Self {
        self.config.steps = steps;
        self
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.config.seed);
        debug!("  {}", scenario.description());
        self.run_plan(scenario.name(), &scenario.plan(self.config.steps), None)
    }

    /// Runs a scenario, recording one frame per action into an export.
    pub fn run_with_export(&self, scenario: ScenarioId) -> (ScenarioResult, SimExport) {
        let mut export = SimExport::new(scenario.name(), self.config.seed);
        let result = self.run_plan(scenario.name(), &scenario.plan(self.config.steps), Some(&mut export));
        (result, export)
    }

    /// Runs an arbitrary plan, e.g. one built from a loaded world.
    pub fn run_plan(
        &self,
        name: &str,
        plan: &ScenarioPlan,
        mut export: Option<&mut SimExport>,
    ) -> ScenarioResult {
        let mut result = ScenarioResult {
            scenario: name.to_string(),
            seed: self.config.seed,
            passed: false,
            total_steps: 0,
            brier_score: None,
            failure_reason: None,
            metrics: ScenarioMetrics::default(),
        };

        let mut session = match Session::from_layout(&plan.layout, self.config.clone()) {
            Ok(session) => session,
            Err(e) => {
                result.failure_reason = Some(format!("setup failed: {}", e));
                return result;
            }
        };

        let script = plan
            .actions
            .iter()
            .copied()
            .chain(std::iter::repeat(Action::Step).take(plan.random_steps));

        let mut brier_sum = 0.0;
        let mut frames = 0usize;
        let mut failure = self.check(&session, "setup", &mut result.metrics, &mut brier_sum, &mut frames);
        if let Some(export) = export.as_deref_mut() {
            export.add_frame(SimFrame::capture(0, "setup", session.board(), session.ensemble()));
        }

        for (index, action) in script.enumerate() {
            if failure.is_some() {
                break;
            }
            let label = action.to_string();
            if let Err(e) = apply(&mut session, action) {
                failure = Some(format!("{} failed: {}", label, e));
                break;
            }
            result.total_steps += 1;

            failure = self.check(&session, &label, &mut result.metrics, &mut brier_sum, &mut frames);
            if let Some(export) = export.as_deref_mut() {
                export.add_frame(SimFrame::capture(index + 1, &label, session.board(), session.ensemble()));
            }
        }

        let final_brier = brier_score(session.board(), session.ensemble());
        let ensemble = session.ensemble();
        result.metrics.final_hypotheses = ensemble.len();
        result.metrics.expected_particles = ensemble.metrics().expected_particles;
        result.metrics.true_particles = session.board().particle_count();
        result.metrics.mean_brier = if frames > 0 { brier_sum / frames as f64 } else { 0.0 };
        result.brier_score = Some(final_brier);

        if failure.is_none() {
            if let Some(limit) = plan.max_brier {
                if final_brier > limit {
                    failure = Some(format!("Brier score {:.6} exceeds {:.6}", final_brier, limit));
                }
            }
        }

        result.passed = failure.is_none();
        if let Some(reason) = &failure {
            warn!("Scenario {} failed: {}", name, reason);
        }
        result.failure_reason = failure;

        if let Some(export) = export {
            export.finalize(result.passed, result.brier_score);
        }
        result
    }

    /// Validates the session after an action and folds it into the metrics.
    fn check(
        &self,
        session: &Session,
        label: &str,
        metrics: &mut ScenarioMetrics,
        brier_sum: &mut f64,
        frames: &mut usize,
    ) -> Option<String> {
        let ensemble = session.ensemble();
        metrics.peak_hypotheses = metrics.peak_hypotheses.max(ensemble.len());

        let brier = brier_score(session.board(), ensemble);
        *brier_sum += brier;
        *frames += 1;

        debug!(
            action = label,
            hypotheses = ensemble.len(),
            brier,
            "  checked"
        );

        check_invariants(session.board(), ensemble)
            .err()
            .map(|violation| format!("after {}: {}", label, violation))
    }
}

fn apply(session: &mut Session, action: Action) -> Result<(), SimError> {
    match action {
        Action::ToggleParticle(cell) => session.toggle_particle(cell),
        Action::ToggleRock(cell) => session.toggle_rock(cell),
        Action::ToggleVisible(cell) => session.toggle_visible(cell),
        Action::Step => session.step_forward().map(|_| ()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::WorldLayout;
    use approx::assert_relative_eq;
    use belief_core::{Coord, GridShape};
    use proptest::prelude::*;

    #[test]
    fn test_scripted_scenarios_pass_exactly() {
        let runner = ScenarioRunner::new(SimConfig::default());
        for scenario in [ScenarioId::Confirmation, ScenarioId::Absence] {
            let result = runner.run(scenario);
            assert!(result.passed, "{}: {:?}", scenario, result.failure_reason);
            assert_relative_eq!(result.brier_score.unwrap(), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_deletion_scenario() {
        let result = ScenarioRunner::new(SimConfig::default()).run(ScenarioId::Deletion);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.metrics.true_particles, 1);
        assert_relative_eq!(result.metrics.expected_particles, 1.0, epsilon = 1e-12);
        assert_relative_eq!(result.brier_score.unwrap(), 1.0 / 6.0, epsilon = 1e-9);
    }

    #[test]
    fn test_all_scenarios_pass() {
        let runner = ScenarioRunner::new(SimConfig::default()).with_steps(10);
        for scenario in ScenarioId::all() {
            let result = runner.run(scenario);
            assert!(result.passed, "{}: {:?}", scenario, result.failure_reason);
            assert!(result.metrics.peak_hypotheses <= runner.config().max_hypotheses);
        }
    }

    #[test]
    fn test_runs_are_deterministic() {
        let runner = ScenarioRunner::new(SimConfig { seed: 5, ..SimConfig::default() });
        let a = runner.run(ScenarioId::RandomWalk);
        let b = runner.run(ScenarioId::RandomWalk);
        assert_eq!(a.brier_score, b.brier_score);
        assert_eq!(a.metrics.final_hypotheses, b.metrics.final_hypotheses);
    }

    #[test]
    fn test_export_has_frame_per_action() {
        let runner = ScenarioRunner::new(SimConfig::default()).with_steps(4);
        let (result, export) = runner.run_with_export(ScenarioId::RandomWalk);

        assert!(result.passed);
        assert_eq!(export.frames.len(), 1 + result.total_steps);
        assert_eq!(export.frames[0].action, "setup");
        assert_eq!(export.frames[1].action, "step");
        assert!(export.passed);
    }

    #[test]
    fn test_rejected_action_fails_run() {
        let layout = WorldLayout::empty("tiny", GridShape::new(1, 2));
        let plan = ScenarioPlan {
            layout,
            actions: vec![
                Action::ToggleParticle(Coord::new(0, 0)),
                Action::ToggleRock(Coord::new(0, 0)),
            ],
            random_steps: 3,
            max_brier: None,
        };

        let result = ScenarioRunner::new(SimConfig::default()).run_plan("tiny", &plan, None);
        assert!(!result.passed);
        assert_eq!(result.total_steps, 1);
        assert!(result.failure_reason.unwrap().contains("toggle rock"));
    }

    #[test]
    fn test_bundled_worlds_hold_invariants() {
        let raw = include_str!("../../worlds/worlds.json");
        let runner = ScenarioRunner::new(SimConfig::default()).with_steps(10);
        for name in WorldLayout::world_names(raw).unwrap() {
            let layout = WorldLayout::from_json(raw, &name).unwrap();
            let plan = ScenarioPlan::from_layout(layout, runner.config().steps);
            let result = runner.run_plan(&name, &plan, None);
            assert!(result.passed, "{}: {:?}", name, result.failure_reason);
            assert_eq!(result.total_steps, 10);
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_random_walk_holds_invariants_for_any_seed(seed in any::<u64>()) {
            let runner = ScenarioRunner::new(SimConfig { seed, ..SimConfig::default() }).with_steps(8);
            for scenario in [ScenarioId::RandomWalk, ScenarioId::ObstacleCourse] {
                let result = runner.run(scenario);
                prop_assert!(result.passed, "{}: {:?}", scenario, result.failure_reason);
            }
        }
    }
}
