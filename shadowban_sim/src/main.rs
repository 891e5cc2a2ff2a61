//! Shadow-ban Simulator CLI
//!
//! Sweep suppression budgets and objectives over one network and export the
//! trajectories.

use clap::Parser;
use shadowban_core::{KernelKind, NetworkParams, SimParams};
use shadowban_env::{ObjectiveMode, SimError, SimResult};
use shadowban_sim::scenarios::ScenarioId;
use shadowban_sim::{load_network, write_run, SweepOutcome, SweepRunner, SimulationDriver};
use std::path::PathBuf;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Shadow-ban opinion dynamics simulator
#[derive(Parser, Debug)]
#[command(name = "shadowban-sim")]
#[command(about = "Simulate opinion dynamics under shadow-ban suppression", long_about = None)]
struct Args {
    /// Network parameter JSON file (num_vertices, edges, rates, opinions0)
    #[arg(short, long, conflicts_with = "scenario")]
    data: Option<PathBuf>,

    /// Synthetic network (triangle, ring, erdos_renyi, polarized)
    #[arg(short = 'S', long, default_value = "triangle")]
    scenario: String,

    /// Seed for synthetic networks
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Vertex count for synthetic networks
    #[arg(short = 'n', long, default_value = "50")]
    vertices: usize,

    /// Influence kernel
    #[arg(long, default_value = "shift_HK")]
    kernel: String,

    /// Confidence radius
    #[arg(long, default_value = "0.5")]
    tau: f64,

    /// Influence gain
    #[arg(long, default_value = "1.0")]
    omega: f64,

    /// Objectives to sweep (comma list of MEAN, VARMAX, VARMIN)
    #[arg(short, long, value_delimiter = ',', default_value = "MEAN")]
    objectives: Vec<String>,

    /// Average suppression budgets to sweep (comma list)
    #[arg(long, value_delimiter = ',', default_value = "0.0")]
    smax: Vec<f64>,

    /// Per-edge suppression depths to sweep (comma list)
    #[arg(long, value_delimiter = ',', default_value = "0.0")]
    sedge: Vec<f64>,

    /// Damp like-minded edges once at reset
    #[arg(long)]
    experiment: bool,

    /// Disable the suppression controller (all-ones control)
    #[arg(long)]
    no_ban: bool,

    /// Number of control intervals
    #[arg(short = 'T', long, default_value = "10")]
    control_steps: usize,

    /// RK4 steps per control interval
    #[arg(long, default_value = "24")]
    sim_steps: usize,

    /// Extremism threshold
    #[arg(long, default_value = "0.7")]
    thres: f64,

    /// Control-usage weight in the objective
    #[arg(long, default_value = "0.0")]
    alpha: f64,

    /// Directory for exported run files
    #[arg(long)]
    out: Option<PathBuf>,

    /// Run the sweep on the blocking thread pool
    #[arg(long)]
    parallel: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,
}

fn network(args: &Args) -> SimResult<NetworkParams> {
    match &args.data {
        Some(path) => {
            info!("Loading network from {}", path.display());
            load_network(path)
        }
        None => {
            let scenario: ScenarioId = args.scenario.parse().map_err(SimError::invalid)?;
            info!("Building {} network: {}", scenario.name(), scenario.description());
            scenario.build(args.seed, args.vertices)
        }
    }
}

fn sweep(args: &Args) -> SimResult<SweepRunner> {
    let net = network(args)?;
    let graph = net.graph()?;
    let opinions0 = net.initial_opinions()?;
    info!("Network: {} vertices, {} edges", graph.num_vertices(), graph.num_edges());

    let objectives = args
        .objectives
        .iter()
        .map(|s| s.parse::<ObjectiveMode>())
        .collect::<SimResult<Vec<_>>>()?;
    let kernel: KernelKind = args.kernel.parse()?;

    let mut base = SimParams::default()
        .with_kernel(args.tau, args.omega)
        .with_steps(args.control_steps, args.sim_steps)
        .with_shadowban(!args.no_ban)
        .with_experiment(args.experiment);
    base.kernel = kernel;
    base.thres = args.thres;

    Ok(SweepRunner::new(graph, opinions0, base)
        .with_objectives(objectives)
        .with_smax_range(args.smax.clone())
        .with_sedge_range(args.sedge.clone())
        .with_driver(SimulationDriver::new().with_alpha(args.alpha)))
}

fn edge_pairs(runner: &SweepRunner) -> Vec<(usize, usize)> {
    runner
        .graph()
        .edges()
        .iter()
        .map(|e| (e.source, e.target))
        .collect()
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    if !args.json {
        info!("Shadow-ban Simulator v0.1.0");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let runner = match sweep(&args) {
        Ok(runner) => runner,
        Err(e) => {
            error!("Setup failed: {}", e);
            std::process::exit(1);
        }
    };

    let outcomes: Vec<SweepOutcome> = if args.parallel {
        runner.run_parallel().await
    } else {
        runner.run()
    };

    let mut failed_count = 0;
    let mut exported = Vec::new();
    for outcome in &outcomes {
        match (&outcome.result, &args.out) {
            (Ok(result), Some(out)) => match write_run(out, result, edge_pairs(&runner)) {
                Ok(path) => exported.push(path),
                Err(e) => {
                    error!("Failed to write export: {}", e);
                    failed_count += 1;
                }
            },
            (Ok(_), None) => {}
            (Err(_), _) => failed_count += 1,
        }
    }

    let total = outcomes.len();
    if args.json {
        let summary = serde_json::json!({
            "total": total,
            "passed": total - failed_count,
            "failed": failed_count,
            "results": outcomes.iter().map(|o| {
                serde_json::json!({
                    "objective": o.params.objective.name(),
                    "smax": o.params.smax,
                    "sedge": o.params.sedge,
                    "objective_value": o.result.as_ref().ok().map(|r| r.objective_value),
                    "summary": o.result.as_ref().ok().map(|r| &r.summary),
                    "error": o.result.as_ref().err().map(|e| e.to_string()),
                })
            }).collect::<Vec<_>>(),
            "exported": exported,
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => error!("Failed to encode summary: {}", e),
        }
    } else {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        if failed_count == 0 {
            info!("✅ All {} runs completed", total);
        } else {
            error!("❌ {}/{} runs failed", failed_count, total);
            for outcome in &outcomes {
                if let Err(e) = &outcome.result {
                    error!("  - {} smax={} sedge={}: {}",
                        outcome.params.objective,
                        outcome.params.smax,
                        outcome.params.sedge,
                        e
                    );
                }
            }
        }
        for path in &exported {
            info!("Exported {}", path.display());
        }
    }

    // Exit with proper code for CI
    if failed_count > 0 {
        std::process::exit(1);
    }
}
