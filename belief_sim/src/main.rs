//! Belief Simulator CLI
//!
//! Run deterministic tracking scenarios, or walk a world from a worlds file.

use belief_sim::scenarios::{ScenarioId, ScenarioPlan};
use belief_sim::{ScenarioResult, ScenarioRunner, SimConfig, SimError, SimExport, WorldLayout};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Belief tracking simulation CLI
#[derive(Parser, Debug)]
#[command(name = "belief-sim")]
#[command(about = "Run deterministic belief tracking simulations", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Scenario to run (confirmation, absence, deletion, random_walk, crowded, obstacle_course, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Random time steps per open-ended scenario
    #[arg(long, default_value = "20")]
    steps: usize,

    /// Number of consecutive seeds to test (for CI mode)
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Hypotheses kept by the ensemble
    #[arg(long, default_value = "15")]
    max_hypotheses: usize,

    /// Worlds file to load instead of built-in scenarios
    #[arg(short, long)]
    world: Option<PathBuf>,

    /// World name inside the worlds file
    #[arg(short, long, requires = "world")]
    name: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Export frames of a single run to a JSON file
    #[arg(long)]
    export: Option<PathBuf>,
}

/// What a single run executes.
enum Target {
    Scenario(ScenarioId),
    World(WorldLayout),
}

impl Target {
    fn name(&self) -> &str {
        match self {
            Target::Scenario(id) => id.name(),
            Target::World(layout) => &layout.name,
        }
    }

    fn run(&self, runner: &ScenarioRunner, export: Option<&mut SimExport>) -> ScenarioResult {
        match self {
            Target::Scenario(id) => match export {
                Some(export) => runner.run_plan(id.name(), &id.plan(runner.config().steps), Some(export)),
                None => runner.run(*id),
            },
            Target::World(layout) => {
                info!("Starting world: {} (seed={})", layout.name, runner.config().seed);
                let plan = ScenarioPlan::from_layout(layout.clone(), runner.config().steps);
                runner.run_plan(&layout.name, &plan, export)
            }
        }
    }
}

fn targets(args: &Args) -> Result<Vec<Target>, SimError> {
    if let Some(path) = &args.world {
        let layouts = match &args.name {
            Some(name) => vec![WorldLayout::load(path, name)?],
            None => WorldLayout::load_all(path)?,
        };
        return Ok(layouts.into_iter().map(Target::World).collect());
    }

    if args.scenario == "all" {
        return Ok(ScenarioId::all().into_iter().map(Target::Scenario).collect());
    }
    let id = args
        .scenario
        .parse::<ScenarioId>()
        .map_err(|_| SimError::UnknownScenario(args.scenario.clone()))?;
    Ok(vec![Target::Scenario(id)])
}

fn main() {
    let args = Args::parse();

    // Initialize logging; RUST_LOG overrides the flag
    let level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    if !args.json {
        info!("Belief Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let targets = match targets(&args) {
        Ok(targets) => targets,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    // Determine base seed
    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42)
    } else {
        args.seed
    };

    let config_for = |seed: u64| SimConfig {
        seed,
        max_hypotheses: args.max_hypotheses,
        steps: args.steps,
        ..SimConfig::default()
    };

    // Handle --export mode
    if let Some(export_path) = &args.export {
        if targets.len() != 1 || args.seeds > 1 {
            eprintln!("Error: --export only supports a single scenario and seed");
            std::process::exit(1);
        }
        let target = &targets[0];
        let runner = ScenarioRunner::new(config_for(base_seed));
        let mut export = SimExport::new(target.name(), base_seed);
        let result = target.run(&runner, Some(&mut export));

        if let Err(e) = export.write_to_file(export_path) {
            error!("Failed to write export: {}", e);
            std::process::exit(1);
        }
        info!("Exported {} frames to {}", export.frames.len(), export_path.display());

        if !result.passed {
            error!(
                "✗ {} FAILED: {}",
                target.name(),
                result.failure_reason.as_deref().unwrap_or("unknown")
            );
            std::process::exit(1);
        }
        info!("✓ {} (seed={}) PASSED", target.name(), base_seed);
        return;
    }

    // Run simulations
    let mut all_results: Vec<ScenarioResult> = Vec::new();
    let mut failed_count = 0;

    for seed_offset in 0..args.seeds {
        let seed = base_seed.wrapping_add(seed_offset as u64);
        let runner = ScenarioRunner::new(config_for(seed));

        for target in &targets {
            let result = target.run(&runner, None);

            if !args.json {
                if result.passed {
                    info!(
                        "✓ {} (seed={}) PASSED | brier={:.4} | hypotheses peak={}",
                        target.name(),
                        seed,
                        result.brier_score.unwrap_or(f64::NAN),
                        result.metrics.peak_hypotheses
                    );
                } else {
                    error!(
                        "✗ {} (seed={}) FAILED: {}",
                        target.name(),
                        seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }

            if !result.passed {
                failed_count += 1;
            }
            all_results.push(result);
        }
    }

    // Summary
    let total = all_results.len();
    let passed = total - failed_count;

    if args.json {
        let summary = serde_json::json!({
            "total": total,
            "passed": passed,
            "failed": failed_count,
            "results": all_results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario,
                    "seed": r.seed,
                    "passed": r.passed,
                    "steps": r.total_steps,
                    "brier_score": r.brier_score,
                    "peak_hypotheses": r.metrics.peak_hypotheses,
                    "expected_particles": r.metrics.expected_particles,
                    "true_particles": r.metrics.true_particles,
                    "failure_reason": r.failure_reason,
                })
            }).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if failed_count == 0 {
            info!("✅ All {} scenario runs passed!", total);
        } else {
            error!("❌ {}/{} scenario runs failed!", failed_count, total);
            for result in all_results.iter().filter(|r| !r.passed) {
                error!(
                    "  - {} seed={}: {}",
                    result.scenario,
                    result.seed,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }
    }

    // Exit with proper code for CI
    if failed_count > 0 {
        std::process::exit(1);
    }
}
