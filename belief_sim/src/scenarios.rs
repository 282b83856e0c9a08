//! Tracking scenarios for the simulation harness.

use belief_core::{Coord, GridShape};
use std::fmt;

use crate::layout::{CellCode, WorldLayout};

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// BEL-001: Hidden particle revealed where it is
    Confirmation,

    /// BEL-002: Hidden particle ruled out of the only other cell
    Absence,

    /// BEL-003: One of two hidden particles removed
    Deletion,

    /// BEL-004: Two particles wandering under corner cameras
    RandomWalk,

    /// BEL-005: Five particles on a small grid, ensemble at its limit
    Crowded,

    /// BEL-006: Particles walking a walled corridor
    ObstacleCourse,
}

/// A user action replayed by the runner before random steps begin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ToggleParticle(Coord),
    ToggleRock(Coord),
    ToggleVisible(Coord),
    Step,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::ToggleParticle(cell) => write!(f, "toggle particle {}", cell),
            Action::ToggleRock(cell) => write!(f, "toggle rock {}", cell),
            Action::ToggleVisible(cell) => write!(f, "toggle visible {}", cell),
            Action::Step => write!(f, "step"),
        }
    }
}

/// Everything the runner needs to execute one scenario.
#[derive(Debug, Clone)]
pub struct ScenarioPlan {
    /// Initial world
    pub layout: WorldLayout,

    /// Scripted actions applied after the layout
    pub actions: Vec<Action>,

    /// Random time steps after the script
    pub random_steps: usize,

    /// Highest acceptable final Brier score, if the outcome is exact enough to bound
    pub max_brier: Option<f64>,
}

impl ScenarioPlan {
    /// A plan that only walks a loaded world forward.
    pub fn from_layout(layout: WorldLayout, random_steps: usize) -> Self {
        Self {
            layout,
            actions: Vec::new(),
            random_steps,
            max_brier: None,
        }
    }
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Confirmation,
            ScenarioId::Absence,
            ScenarioId::Deletion,
            ScenarioId::RandomWalk,
            ScenarioId::Crowded,
            ScenarioId::ObstacleCourse,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Confirmation => "confirmation",
            ScenarioId::Absence => "absence",
            ScenarioId::Deletion => "deletion",
            ScenarioId::RandomWalk => "random_walk",
            ScenarioId::Crowded => "crowded",
            ScenarioId::ObstacleCourse => "obstacle_course",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Confirmation => "1x2 grid, hidden particle, its cell is revealed",
            ScenarioId::Absence => "1x2 grid, hidden particle, the empty cell is revealed",
            ScenarioId::Deletion => "1x3 grid, two hidden particles, one removed, middle revealed",
            ScenarioId::RandomWalk => "4x4 grid, 2 particles, 4 corner cameras, random walk",
            ScenarioId::Crowded => "3x3 grid, 5 particles, center camera, random walk",
            ScenarioId::ObstacleCourse => "5x5 grid, rock walls, 3 particles, corridor cameras",
        }
    }

    /// True if the final belief is exactly determined by the script.
    pub fn is_scripted(&self) -> bool {
        matches!(
            self,
            ScenarioId::Confirmation | ScenarioId::Absence | ScenarioId::Deletion
        )
    }

    /// Builds the plan; `steps` sets the random walk length of open-ended scenarios.
    pub fn plan(&self, steps: usize) -> ScenarioPlan {
        let c = Coord::new;
        match self {
            ScenarioId::Confirmation => ScenarioPlan {
                layout: WorldLayout::empty(self.name(), GridShape::new(1, 2)),
                actions: vec![
                    Action::ToggleParticle(c(0, 0)),
                    Action::ToggleVisible(c(0, 0)),
                ],
                random_steps: 0,
                max_brier: Some(1e-12),
            },
            ScenarioId::Absence => ScenarioPlan {
                layout: WorldLayout::empty(self.name(), GridShape::new(1, 2)),
                actions: vec![
                    Action::ToggleParticle(c(0, 0)),
                    Action::ToggleVisible(c(0, 1)),
                ],
                random_steps: 0,
                max_brier: Some(1e-12),
            },
            ScenarioId::Deletion => ScenarioPlan {
                layout: WorldLayout::empty(self.name(), GridShape::new(1, 3)),
                actions: vec![
                    Action::ToggleParticle(c(0, 0)),
                    Action::ToggleParticle(c(0, 2)),
                    Action::ToggleParticle(c(0, 0)),
                    Action::ToggleVisible(c(0, 1)),
                ],
                random_steps: 0,
                // The survivor is split evenly between the two hidden cells.
                max_brier: Some(1.0 / 6.0 + 1e-9),
            },
            ScenarioId::RandomWalk => ScenarioPlan::from_layout(
                WorldLayout::empty(self.name(), GridShape::new(4, 4))
                    .with_cell(c(1, 1), CellCode::Particle)
                    .with_cell(c(2, 2), CellCode::Particle)
                    .with_cell(c(0, 0), CellCode::Visible)
                    .with_cell(c(0, 3), CellCode::Visible)
                    .with_cell(c(3, 0), CellCode::Visible)
                    .with_cell(c(3, 3), CellCode::Visible),
                steps,
            ),
            ScenarioId::Crowded => ScenarioPlan::from_layout(
                [(0, 0), (0, 2), (1, 0), (2, 1), (2, 2)]
                    .into_iter()
                    .fold(WorldLayout::empty(self.name(), GridShape::new(3, 3)), |layout, (r, col)| {
                        layout.with_cell(c(r, col), CellCode::Particle)
                    })
                    .with_cell(c(1, 1), CellCode::Visible),
                steps,
            ),
            ScenarioId::ObstacleCourse => {
                let walls = [(1, 1), (1, 2), (1, 3), (3, 1), (3, 2), (3, 3)];
                let layout = walls
                    .into_iter()
                    .fold(WorldLayout::empty(self.name(), GridShape::new(5, 5)), |layout, (r, col)| {
                        layout.with_cell(c(r, col), CellCode::Rock)
                    })
                    .with_cell(c(0, 0), CellCode::Particle)
                    .with_cell(c(2, 2), CellCode::Particle)
                    .with_cell(c(4, 4), CellCode::Particle)
                    .with_cell(c(2, 0), CellCode::Visible)
                    .with_cell(c(2, 4), CellCode::Visible);
                ScenarioPlan::from_layout(layout, steps)
            }
        }
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "confirmation" | "bel-001" => Ok(ScenarioId::Confirmation),
            "absence" | "bel-002" => Ok(ScenarioId::Absence),
            "deletion" | "bel-003" => Ok(ScenarioId::Deletion),
            "random_walk" | "randomwalk" | "bel-004" => Ok(ScenarioId::RandomWalk),
            "crowded" | "bel-005" => Ok(ScenarioId::Crowded),
            "obstacle_course" | "obstaclecourse" | "bel-006" => Ok(ScenarioId::ObstacleCourse),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_parse_back() {
        for scenario in ScenarioId::all() {
            assert_eq!(scenario.name().parse::<ScenarioId>(), Ok(scenario));
            assert_eq!(scenario.to_string(), scenario.name());
        }
        assert_eq!("BEL-004".parse::<ScenarioId>(), Ok(ScenarioId::RandomWalk));
        assert!("split_brain".parse::<ScenarioId>().is_err());
    }

    #[test]
    fn test_scripted_plans_take_no_random_steps() {
        for scenario in ScenarioId::all() {
            let plan = scenario.plan(30);
            if scenario.is_scripted() {
                assert_eq!(plan.random_steps, 0);
                assert!(plan.max_brier.is_some());
            } else {
                assert_eq!(plan.random_steps, 30);
                assert!(plan.actions.is_empty());
            }
        }
    }

    #[test]
    fn test_obstacle_course_layout() {
        let plan = ScenarioId::ObstacleCourse.plan(10);
        assert_eq!(plan.layout.code_at(Coord::new(1, 2)), CellCode::Rock);
        assert_eq!(plan.layout.code_at(Coord::new(2, 2)), CellCode::Particle);
        assert_eq!(plan.layout.code_at(Coord::new(2, 4)), CellCode::Visible);
    }
}
