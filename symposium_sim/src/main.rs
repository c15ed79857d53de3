//! Symposium CLI
//!
//! Pit fork-allocation strategies against each other and watch which
//! tables starve, deadlock, or hum along.

use clap::Parser;
use symposium_core::{default_names, DurationRange, RunContext, SimulationConfig, StrategyKind};
use symposium_sim::{
    render_outcome, render_table, RunMode, RunOutcome, SteppedSettings, SteppedSimulation,
    ThreadedSettings, ThreadedSimulation,
};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Dining-philosophers strategy laboratory
#[derive(Parser, Debug)]
#[command(name = "symposium-sim")]
#[command(about = "Run dining-philosophers allocation experiments", long_about = None)]
struct Args {
    /// Strategy to play (greedy, hierarchy, coordinated, all)
    #[arg(short, long, default_value = "greedy")]
    strategy: String,

    /// Driver (stepped, threaded)
    #[arg(short, long, default_value = "stepped")]
    mode: String,

    /// Number of philosophers
    #[arg(short = 'n', long, default_value = "5")]
    count: usize,

    /// Comma-separated philosopher names (overrides --count)
    #[arg(long)]
    names: Option<String>,

    /// Seed shared by every philosopher (omit for OS entropy)
    #[arg(long)]
    seed: Option<u64>,

    /// Number of seeded runs per strategy, fanned out from --seed
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Round cap for the stepped driver
    #[arg(long, default_value = "1000000")]
    rounds: u64,

    /// Wall-clock duration for the threaded driver, in milliseconds
    #[arg(long, default_value = "10000")]
    duration_ms: u64,

    /// Thinking range override, e.g. "3..10" or "7"
    #[arg(long)]
    thinking: Option<String>,

    /// Eating range override, e.g. "4..5"
    #[arg(long)]
    eating: Option<String>,

    /// Fork acquisition latency override, in time units
    #[arg(long)]
    latency: Option<u64>,

    /// JSON summary on stdout (for CI parsing)
    #[arg(long)]
    json: bool,

    /// Export the run journal to a JSON file (single run only)
    #[arg(long)]
    export: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn parse_range_or_exit(raw: &str, flag: &str) -> DurationRange {
    raw.parse().unwrap_or_else(|e| {
        eprintln!("Error in {flag}: {e}");
        std::process::exit(1);
    })
}

fn build_config(
    args: &Args,
    strategy: StrategyKind,
    mode: RunMode,
    seed: Option<u64>,
) -> SimulationConfig {
    let names = match &args.names {
        Some(list) => list
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect(),
        None => default_names(args.count),
    };

    let mut config = match mode {
        RunMode::Stepped => SimulationConfig::stepwise(names, strategy, seed),
        RunMode::Threaded => SimulationConfig::realtime(names, strategy, seed),
    };
    if let Some(raw) = &args.thinking {
        config.thinking = parse_range_or_exit(raw, "--thinking");
    }
    if let Some(raw) = &args.eating {
        config.eating = parse_range_or_exit(raw, "--eating");
    }
    if let Some(latency) = args.latency {
        config.acquisition_latency = latency;
    }
    config
}

fn write_export(ctx: &RunContext, path: &str) {
    let export = ctx.journal.export();
    if let Err(e) = export.write_to_file(path) {
        error!("Failed to write export: {:?}", e);
    } else {
        info!(
            "Exported {} philosopher and {} fork records to {}",
            export.philosophers.len(),
            export.forks.len(),
            path
        );
    }
}

/// Plays one run and returns its outcome plus the final table rendering.
async fn play(
    args: &Args,
    strategy: StrategyKind,
    mode: RunMode,
    seed: Option<u64>,
) -> (RunOutcome, String) {
    let config = build_config(args, strategy, mode, seed);

    match mode {
        RunMode::Stepped => {
            let settings = SteppedSettings {
                max_rounds: args.rounds,
                ..Default::default()
            };
            let mut sim = SteppedSimulation::new(config, settings).unwrap_or_else(|e| {
                eprintln!("Error: {e}");
                std::process::exit(1);
            });
            let outcome = sim.run();
            if let Some(path) = &args.export {
                write_export(sim.context(), path);
            }
            let table_text = render_table(
                &sim.table().philosopher_views(),
                &sim.table().fork_views(),
            );
            (outcome, table_text)
        }
        RunMode::Threaded => {
            let settings = ThreadedSettings {
                duration_ms: args.duration_ms,
                ..Default::default()
            };
            let mut sim = ThreadedSimulation::new(config, settings).unwrap_or_else(|e| {
                eprintln!("Error: {e}");
                std::process::exit(1);
            });
            let outcome = match sim.run().await {
                Ok(outcome) => outcome,
                Err(e) => {
                    eprintln!("Error: {e}");
                    std::process::exit(1);
                }
            };
            if let Some(path) = &args.export {
                write_export(sim.context(), path);
            }
            let table_text = render_table(&sim.philosopher_views(), &sim.fork_views());
            (outcome, table_text)
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    let mode: RunMode = args.mode.parse().unwrap_or_else(|e: String| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });

    let strategies: Vec<StrategyKind> = if args.strategy == "all" {
        StrategyKind::all()
    } else {
        vec![args.strategy.parse().unwrap_or_else(|e: String| {
            eprintln!("Error: {e}");
            eprintln!("Available strategies: greedy, hierarchy, coordinated, all");
            std::process::exit(1);
        })]
    };

    if args.export.is_some() && (strategies.len() > 1 || args.seeds > 1) {
        eprintln!("Error: --export supports a single run, not 'all' or --seeds > 1");
        std::process::exit(1);
    }

    let seeds: Vec<Option<u64>> = if args.seeds > 1 {
        let base = args.seed.unwrap_or_else(rand::random);
        (0..args.seeds as u64)
            .map(|i| Some(base.wrapping_add(i)))
            .collect()
    } else {
        vec![args.seed]
    };

    if !args.json {
        info!("Symposium strategy laboratory");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let mut outcomes: Vec<RunOutcome> = Vec::new();
    let mut failures = 0usize;

    for seed in &seeds {
        for strategy in &strategies {
            let (outcome, table_text) = play(&args, *strategy, mode, *seed).await;

            if !args.json {
                println!("{table_text}");
                println!("{}", render_outcome(&outcome));
            }

            if outcome.failed_liveness() {
                failures += 1;
                error!(
                    "✗ {} deadlocked at {:?} despite promising liveness",
                    strategy,
                    outcome.deadlock_at
                );
            } else if !args.json {
                info!("✓ {} finished with {} meals", strategy, outcome.score());
            }
            outcomes.push(outcome);
        }
    }

    // Summary
    if args.json {
        let summary = serde_json::json!({
            "total": outcomes.len(),
            "liveness_failures": failures,
            "results": outcomes,
        });
        println!("{}", serde_json::to_string_pretty(&summary).unwrap());
    } else if outcomes.len() > 1 {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        for strategy in &strategies {
            let meals: u64 = outcomes
                .iter()
                .filter(|o| o.strategy == *strategy)
                .map(RunOutcome::score)
                .sum();
            let deadlocks = outcomes
                .iter()
                .filter(|o| o.strategy == *strategy && o.deadlocked)
                .count();
            info!(
                "{:>12}: {} meals over {} runs, {} deadlocked",
                strategy.name(),
                meals,
                seeds.len(),
                deadlocks
            );
        }
        if failures == 0 {
            info!("✅ All {} runs honored their liveness promises", outcomes.len());
        } else {
            error!(
                "❌ {}/{} runs deadlocked under deadlock-free strategies",
                failures,
                outcomes.len()
            );
        }
    }

    // Exit with proper code for CI
    if failures > 0 {
        std::process::exit(1);
    }
}
