use std::collections::BTreeMap;

use chrono::NaiveDate;
use clap::Args;
use serde::Deserialize;
use serde_json::Value;

use finpilot_engine::config::EngineConfig;
use finpilot_engine::planning::drift::{detect_drift, suggest_rebalance};
use finpilot_engine::planning::gamification::ContributionTracker;
use finpilot_engine::planning::micro_invest::suggest_micro_investments;
use finpilot_engine::profile::RiskTolerance;
use finpilot_engine::types::{Money, Weight};

use crate::input;

/// Arguments for drift detection
#[derive(Args)]
pub struct DriftArgs {
    /// Path to JSON input file ({target, current, threshold?})
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for a rebalance check
#[derive(Args)]
pub struct RebalanceArgs {
    /// Path to JSON input file ({current, years_remaining, risk_tolerance, threshold?})
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for a micro-investment plan
#[derive(Args)]
pub struct MicroPlanArgs {
    /// Path to JSON input file ({goal_amount, goal_date, spending_score?, as_of?})
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for contribution progress
#[derive(Args)]
pub struct ProgressArgs {
    /// Path to JSON input file ({contributions: [{amount, date}], weekly_amount?, as_of?})
    #[arg(long)]
    pub input: Option<String>,
}

#[derive(Deserialize)]
struct Contribution {
    amount: Money,
    date: NaiveDate,
}

#[derive(Deserialize)]
struct ProgressRequest {
    contributions: Vec<Contribution>,
    #[serde(default)]
    weekly_amount: Option<Money>,
    #[serde(default)]
    as_of: Option<NaiveDate>,
}

#[derive(Deserialize)]
struct DriftRequest {
    target: BTreeMap<String, Weight>,
    current: BTreeMap<String, Weight>,
    #[serde(default)]
    threshold: Option<f64>,
}

#[derive(Deserialize)]
struct RebalanceRequest {
    current: BTreeMap<String, Weight>,
    years_remaining: f64,
    risk_tolerance: RiskTolerance,
    #[serde(default)]
    threshold: Option<f64>,
}

#[derive(Deserialize)]
struct MicroPlanRequest {
    goal_amount: Money,
    goal_date: NaiveDate,
    #[serde(default)]
    spending_score: Option<f64>,
    #[serde(default)]
    as_of: Option<NaiveDate>,
}

pub fn run_drift(args: DriftArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let req: DriftRequest = input::load(args.input.as_deref(), "drift")?;
    let threshold = req.threshold.unwrap_or(config.drift_threshold);
    let alerts = detect_drift(&req.target, &req.current, threshold);
    Ok(serde_json::json!({
        "threshold": threshold,
        "alerts": alerts,
    }))
}

pub fn run_rebalance(args: RebalanceArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let req: RebalanceRequest = input::load(args.input.as_deref(), "rebalance")?;
    let threshold = req.threshold.unwrap_or(config.rebalance_threshold);
    let suggestion = suggest_rebalance(&req.current, req.years_remaining, req.risk_tolerance, threshold)?;
    Ok(serde_json::to_value(suggestion)?)
}

pub fn run_micro_plan(args: MicroPlanArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let req: MicroPlanRequest = input::load(args.input.as_deref(), "micro-plan")?;
    let as_of = req.as_of.unwrap_or_else(super::today);
    let plan = suggest_micro_investments(req.goal_amount, req.goal_date, as_of, req.spending_score)?;
    Ok(serde_json::to_value(plan)?)
}

pub fn run_progress(args: ProgressArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut req: ProgressRequest = input::load(args.input.as_deref(), "progress")?;
    req.contributions.sort_by_key(|c| c.date);
    let mut tracker = ContributionTracker::new();
    for c in &req.contributions {
        tracker.record_contribution(c.amount, c.date)?;
    }
    let as_of = req.as_of.unwrap_or_else(super::today);
    Ok(serde_json::json!({
        "xp": tracker.xp,
        "level": tracker.level,
        "streak": tracker.streak,
        "badges": tracker.badges,
        "last_contribution": tracker.last_contribution,
        "nudge": tracker.nudge(as_of, req.weekly_amount),
    }))
}
