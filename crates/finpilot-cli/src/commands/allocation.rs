use std::time::Instant;

use chrono::NaiveDate;
use clap::Args;
use serde::Deserialize;
use serde_json::Value;

use finpilot_engine::allocation::allocator::{allocate, AllocationContext};
use finpilot_engine::allocation::glide_path;
use finpilot_engine::allocation::scorer::score_catalog;
use finpilot_engine::config::EngineConfig;
use finpilot_engine::instrument::InstrumentCatalog;
use finpilot_engine::profile::UserProfile;
use finpilot_engine::types::with_metadata;

use crate::input;

/// Arguments for catalog allocation
#[derive(Args)]
pub struct AllocateArgs {
    /// Path to JSON input file ({profile, catalog, as_of?})
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for instrument scoring
#[derive(Args)]
pub struct ScoreArgs {
    /// Path to JSON input file ({profile, catalog, as_of?})
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for glide-path weights
#[derive(Args)]
pub struct GlidePathArgs {
    /// Months remaining to the goal
    #[arg(long)]
    pub months: u32,
}

#[derive(Deserialize)]
struct CatalogRequest {
    profile: UserProfile,
    #[serde(default)]
    catalog: InstrumentCatalog,
    #[serde(default)]
    as_of: Option<NaiveDate>,
}

pub fn run_allocate(args: AllocateArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let req: CatalogRequest = input::load(args.input.as_deref(), "allocate")?;
    let as_of = req.as_of.unwrap_or_else(super::today);
    req.profile.validate(as_of)?;

    let (catalog, mut warnings) = req.catalog.sanitize();
    let horizon = req.profile.horizon_months(as_of);
    let (scored, score_warnings) = score_catalog(&catalog, req.profile.risk_tolerance, horizon);
    warnings.extend(score_warnings);

    let ctx = AllocationContext::from_profile(&req.profile, as_of);
    let mut result = allocate(&scored, &ctx, config);
    warnings.append(&mut result.warnings);
    result.warnings = warnings;
    Ok(serde_json::to_value(result)?)
}

pub fn run_score(args: ScoreArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let req: CatalogRequest = input::load(args.input.as_deref(), "score")?;
    let as_of = req.as_of.unwrap_or_else(super::today);
    req.profile.validate(as_of)?;

    let (catalog, mut warnings) = req.catalog.sanitize();
    let horizon = req.profile.horizon_months(as_of);
    let (scored, score_warnings) = score_catalog(&catalog, req.profile.risk_tolerance, horizon);
    warnings.extend(score_warnings);

    let output = with_metadata(
        "Weighted risk, time and return suitability (0.4 / 0.3 / 0.3)",
        &serde_json::json!({
            "risk_tolerance": req.profile.risk_tolerance,
            "horizon_months": horizon,
        }),
        warnings,
        start.elapsed().as_micros() as u64,
        scored,
    );
    Ok(serde_json::to_value(output)?)
}

pub fn run_glide_path(args: GlidePathArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let weights = glide_path::weights_for(args.months);
    Ok(serde_json::json!({
        "months_left": args.months,
        "equity": weights.equity,
        "debt": weights.debt,
        "safe": weights.safe,
    }))
}
