use clap::Args;
use serde::Deserialize;
use serde_json::Value;

use finpilot_engine::allocation::allocator::AllocatedInstrument;
use finpilot_engine::analytics::metrics::portfolio_metrics;
use finpilot_engine::config::EngineConfig;

use crate::input;

/// Arguments for portfolio metrics
#[derive(Args)]
pub struct MetricsArgs {
    /// Path to JSON input file ({portfolio: [...]})
    #[arg(long)]
    pub input: Option<String>,
}

#[derive(Deserialize)]
struct MetricsRequest {
    portfolio: Vec<AllocatedInstrument>,
}

pub fn run_metrics(args: MetricsArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let req: MetricsRequest = input::load(args.input.as_deref(), "metrics")?;
    let result = portfolio_metrics(&req.portfolio, config);
    Ok(serde_json::to_value(result)?)
}
