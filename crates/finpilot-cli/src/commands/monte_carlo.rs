use clap::Args;
use serde_json::Value;

use finpilot_engine::config::EngineConfig;
use finpilot_engine::monte_carlo::growth::{simulate_growth, GrowthSimulationInput};

use crate::input;

/// Arguments for Monte Carlo growth simulation
#[derive(Args)]
pub struct SimulateArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,

    /// Seed for reproducible runs; overrides the input and config seed
    #[arg(long)]
    pub seed: Option<u64>,
}

pub fn run_simulate(args: SimulateArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let mut sim_input: GrowthSimulationInput = input::load(args.input.as_deref(), "simulate")?;
    sim_input.seed = args.seed.or(sim_input.seed).or(config.seed);
    let result = simulate_growth(&sim_input);
    Ok(serde_json::to_value(result)?)
}
