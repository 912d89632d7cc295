mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::allocation::{AllocateArgs, GlidePathArgs, ScoreArgs};
use commands::analytics::MetricsArgs;
use commands::monte_carlo::SimulateArgs;
use commands::planning::{DriftArgs, MicroPlanArgs, ProgressArgs, RebalanceArgs};
use commands::recommend::{PeersArgs, RecommendArgs};

/// Goal-based investment recommendations
#[derive(Parser)]
#[command(
    name = "finpilot",
    version,
    about = "Goal-based investment allocation and risk simulation",
    long_about = "Scores candidate instruments against an investor profile, allocates \
                  them across funds, stocks and deposits by time horizon, and reports \
                  portfolio risk metrics and Monte Carlo growth scenarios."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Engine configuration file (JSON, or YAML for .yaml/.yml)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Log progress at info level
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Full recommendation: portfolio, metrics, simulations and nudges
    Recommend(RecommendArgs),
    /// Funds most held by similar investors
    Peers(PeersArgs),
    /// Allocate a catalog for a profile
    Allocate(AllocateArgs),
    /// Score every instrument in a catalog
    Score(ScoreArgs),
    /// Portfolio return, risk, Sharpe and VaR
    Metrics(MetricsArgs),
    /// Monte Carlo growth simulation
    Simulate(SimulateArgs),
    /// Target Equity/Debt/Safe weights for months left to a goal
    GlidePath(GlidePathArgs),
    /// Holdings drifting from their target weights
    Drift(DriftArgs),
    /// Equity/debt rebalance check
    Rebalance(RebalanceArgs),
    /// Weekly micro-investment plan for a goal
    MicroPlan(MicroPlanArgs),
    /// XP, level, streak and badges from past contributions
    Progress(ProgressArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let config = match input::file::read_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    };

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Recommend(args) => commands::recommend::run_recommend(args, &config),
        Commands::Peers(args) => commands::recommend::run_peers(args),
        Commands::Allocate(args) => commands::allocation::run_allocate(args, &config),
        Commands::Score(args) => commands::allocation::run_score(args),
        Commands::Metrics(args) => commands::analytics::run_metrics(args, &config),
        Commands::Simulate(args) => commands::monte_carlo::run_simulate(args, &config),
        Commands::GlidePath(args) => commands::allocation::run_glide_path(args),
        Commands::Drift(args) => commands::planning::run_drift(args, &config),
        Commands::Rebalance(args) => commands::planning::run_rebalance(args, &config),
        Commands::MicroPlan(args) => commands::planning::run_micro_plan(args),
        Commands::Progress(args) => commands::planning::run_progress(args),
        Commands::Version => {
            println!("finpilot {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
