use std::collections::BTreeMap;
use std::time::Instant;

use log::{error, info, warn};
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use statrs::distribution::StudentsT;

use crate::config::{MAX_SIMULATIONS, MAX_SIMULATION_WEEKS};
use crate::error::EngineError;
use crate::instrument::AssetType;
use crate::types::{with_metadata, ComputationOutput, MarketScenario, Weight};
use crate::EngineResult;

const WEEKS_PER_YEAR: f64 = 52.0;
/// Degrees of freedom of the weekly shock distribution.
const SHOCK_DF: f64 = 3.0;
/// Weekly growth of the linear fallback curve.
const FALLBACK_WEEKLY_GROWTH: f64 = 0.01;
/// Allocation sums further than this from one are renormalized with a warning.
const ALLOCATION_TOLERANCE: f64 = 0.01;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One holding to simulate. Return and volatility are annual decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationHolding {
    pub name: String,
    pub allocation: Weight,
    pub annual_return: f64,
    pub annual_volatility: f64,
    pub asset_type: AssetType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrowthSimulationInput {
    pub holdings: Vec<SimulationHolding>,
    #[serde(default = "default_weeks")]
    pub weeks: u32,
    #[serde(default = "default_scenarios")]
    pub scenarios: Vec<MarketScenario>,
    #[serde(default = "default_num_simulations")]
    pub num_simulations: u32,
    /// Optional seed for reproducibility.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_weeks() -> u32 {
    52
}

fn default_scenarios() -> Vec<MarketScenario> {
    MarketScenario::ALL.to_vec()
}

fn default_num_simulations() -> u32 {
    1000
}

/// Cross-simulation statistics of the final portfolio value (start = 1.0).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSummary {
    pub mean: f64,
    pub std_dev: f64,
    pub percentile_5: f64,
    pub percentile_95: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    #[serde(flatten)]
    pub summary: ScenarioSummary,
    /// Elementwise mean of all paths, `weeks + 1` points starting at 1.0.
    pub mean_curve: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthSimulationOutput {
    pub scenarios: BTreeMap<MarketScenario, ScenarioResult>,
    pub num_simulations: u32,
    pub weeks: u32,
    /// True when the linear fallback curve was returned.
    pub used_fallback: bool,
}

/// Deterministic shift a scenario applies to weekly parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioAdjustment {
    pub vol_multiplier: f64,
    /// Added to the weekly mean return.
    pub mean_shift: f64,
}

impl ScenarioAdjustment {
    pub fn for_scenario(scenario: MarketScenario) -> Self {
        let (vol_multiplier, mean_shift) = match scenario {
            MarketScenario::Normal => (1.0, 0.0),
            MarketScenario::Crash => (2.0, -0.02),
            MarketScenario::Boom => (1.5, 0.01),
        };
        Self {
            vol_multiplier,
            mean_shift,
        }
    }
}

/// Per-holding weekly parameters after the scenario adjustment.
struct WeeklyParams {
    allocation: f64,
    mean: f64,
    std: f64,
    /// Additive correlation term: sum over other holdings of
    /// `corr * other_allocation * std`.
    nudge: f64,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Percentile of a **sorted** slice using linear interpolation.
fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        len => {
            let rank = p / 100.0 * (len - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            if lower == upper {
                sorted[lower]
            } else {
                let frac = rank - lower as f64;
                sorted[lower] * (1.0 - frac) + sorted[upper] * frac
            }
        }
    }
}

fn summarize(final_values: &mut [f64]) -> ScenarioSummary {
    let n = final_values.len() as f64;
    let mean = final_values.iter().sum::<f64>() / n;
    let variance = final_values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    final_values.sort_by(|a, b| a.total_cmp(b));
    ScenarioSummary {
        mean,
        std_dev: variance.sqrt(),
        percentile_5: percentile_sorted(final_values, 5.0),
        percentile_95: percentile_sorted(final_values, 95.0),
    }
}

/// Check the holdings and return their allocations, rescaled to sum to one.
fn normalized_allocations(
    holdings: &[SimulationHolding],
    warnings: &mut Vec<String>,
) -> EngineResult<Vec<f64>> {
    if holdings.is_empty() {
        return Err(EngineError::InsufficientData(
            "at least one holding is required".into(),
        ));
    }
    for h in holdings {
        if !h.allocation.is_finite() || h.allocation < 0.0 {
            return Err(EngineError::invalid(
                "allocation",
                format!("'{}' has allocation {}", h.name, h.allocation),
            ));
        }
        if !h.annual_return.is_finite() || !h.annual_volatility.is_finite() || h.annual_volatility < 0.0 {
            return Err(EngineError::invalid(
                "annual_volatility",
                format!("'{}' has unusable return/volatility", h.name),
            ));
        }
    }
    let total: f64 = holdings.iter().map(|h| h.allocation).sum();
    if total <= 0.0 {
        return Err(EngineError::DivisionByZero {
            context: "allocation normalization".into(),
        });
    }
    if (total - 1.0).abs() > ALLOCATION_TOLERANCE {
        warn!("simulation allocations sum to {total:.4}; normalizing");
        warnings.push(format!("Allocations summed to {total:.4} and were normalized"));
    }
    Ok(holdings.iter().map(|h| h.allocation / total).collect())
}

fn weekly_params(
    holdings: &[SimulationHolding],
    allocations: &[f64],
    adj: ScenarioAdjustment,
) -> Vec<WeeklyParams> {
    holdings
        .iter()
        .zip(allocations)
        .enumerate()
        .map(|(i, (h, &allocation))| {
            let std = h.annual_volatility / WEEKS_PER_YEAR.sqrt() * adj.vol_multiplier;
            let corr_weight: f64 = holdings
                .iter()
                .zip(allocations)
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, (other, &other_alloc))| h.asset_type.correlation(other.asset_type) * other_alloc)
                .sum();
            WeeklyParams {
                allocation,
                mean: h.annual_return / WEEKS_PER_YEAR + adj.mean_shift,
                std,
                nudge: corr_weight * std,
            }
        })
        .collect()
}

fn simulate_scenario(
    rng: &mut StdRng,
    shocks: &StudentsT,
    params: &[WeeklyParams],
    weeks: usize,
    num_simulations: usize,
) -> ScenarioResult {
    let mut curve_sums = vec![0.0_f64; weeks + 1];
    let mut final_values = Vec::with_capacity(num_simulations);

    for _ in 0..num_simulations {
        let mut value = 1.0_f64;
        curve_sums[0] += value;
        for slot in curve_sums.iter_mut().skip(1) {
            let mut week_return = 0.0;
            for p in params {
                let t: f64 = rng.sample(shocks);
                week_return += p.allocation * (t * p.std + p.mean + p.nudge);
            }
            value *= (1.0 + week_return).max(0.0);
            *slot += value;
        }
        final_values.push(value);
    }

    let n = num_simulations as f64;
    let mean_curve = curve_sums.into_iter().map(|s| s / n).collect();
    ScenarioResult {
        summary: summarize(&mut final_values),
        mean_curve,
    }
}

/// Linear growth of 1% per week for every scenario.
pub fn linear_fallback(weeks: u32, scenarios: &[MarketScenario]) -> GrowthSimulationOutput {
    let mean_curve: Vec<f64> = (0..=weeks)
        .map(|i| 1.0 + i as f64 * FALLBACK_WEEKLY_GROWTH)
        .collect();
    let final_value = 1.0 + weeks as f64 * FALLBACK_WEEKLY_GROWTH;
    let summary = ScenarioSummary {
        mean: final_value,
        std_dev: 0.0,
        percentile_5: final_value,
        percentile_95: final_value,
    };
    GrowthSimulationOutput {
        scenarios: scenarios
            .iter()
            .map(|&s| {
                (
                    s,
                    ScenarioResult {
                        summary,
                        mean_curve: mean_curve.clone(),
                    },
                )
            })
            .collect(),
        num_simulations: 0,
        weeks,
        used_fallback: true,
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Monte Carlo growth of a portfolio worth 1.0 under each requested
/// scenario. Weekly shocks are Student-t with 3 degrees of freedom scaled by
/// the scenario-adjusted weekly volatility.
pub fn try_simulate_growth(
    input: &GrowthSimulationInput,
    warnings: &mut Vec<String>,
) -> EngineResult<GrowthSimulationOutput> {
    if !(1..=MAX_SIMULATION_WEEKS).contains(&input.weeks) {
        return Err(EngineError::invalid(
            "weeks",
            format!("must be between 1 and {MAX_SIMULATION_WEEKS}"),
        ));
    }
    if !(1..=MAX_SIMULATIONS).contains(&input.num_simulations) {
        return Err(EngineError::invalid(
            "num_simulations",
            format!("must be between 1 and {MAX_SIMULATIONS}"),
        ));
    }
    if input.scenarios.is_empty() {
        return Err(EngineError::invalid("scenarios", "at least one scenario is required"));
    }
    let allocations = normalized_allocations(&input.holdings, warnings)?;
    let shocks = StudentsT::new(0.0, 1.0, SHOCK_DF)
        .map_err(|e| EngineError::NumericalError(format!("shock distribution: {e}")))?;

    let mut rng = match input.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };

    let mut scenarios = BTreeMap::new();
    for &scenario in &input.scenarios {
        let params = weekly_params(
            &input.holdings,
            &allocations,
            ScenarioAdjustment::for_scenario(scenario),
        );
        let result = simulate_scenario(
            &mut rng,
            &shocks,
            &params,
            input.weeks as usize,
            input.num_simulations as usize,
        );
        if !result.summary.mean.is_finite() {
            return Err(EngineError::NumericalError(format!(
                "{} scenario produced a non-finite mean",
                scenario.as_str()
            )));
        }
        info!(
            "scenario {}: mean={:.3} std={:.3} p5={:.3} p95={:.3}",
            scenario.as_str(),
            result.summary.mean,
            result.summary.std_dev,
            result.summary.percentile_5,
            result.summary.percentile_95
        );
        scenarios.insert(scenario, result);
    }

    Ok(GrowthSimulationOutput {
        scenarios,
        num_simulations: input.num_simulations,
        weeks: input.weeks,
        used_fallback: false,
    })
}

/// Growth simulation that never fails: any error yields
/// [`linear_fallback`] and a warning.
pub fn simulate_growth(input: &GrowthSimulationInput) -> ComputationOutput<GrowthSimulationOutput> {
    let start = Instant::now();
    let mut warnings = Vec::new();

    let output = match try_simulate_growth(input, &mut warnings) {
        Ok(o) => o,
        Err(e) => {
            error!("growth simulation failed, using linear fallback: {e}");
            warnings.push(format!("Simulation failed ({e}); linear growth curve used"));
            let scenarios = if input.scenarios.is_empty() {
                default_scenarios()
            } else {
                input.scenarios.clone()
            };
            linear_fallback(input.weeks.min(MAX_SIMULATION_WEEKS), &scenarios)
        }
    };

    let elapsed = start.elapsed().as_micros() as u64;
    with_metadata(
        "Monte Carlo weekly compounding with Student-t(3) shocks",
        &serde_json::json!({
            "weeks": input.weeks,
            "num_simulations": input.num_simulations,
            "seed": input.seed,
            "shock_df": SHOCK_DF,
            "holdings": input.holdings.iter().map(|h| &h.name).collect::<Vec<_>>(),
        }),
        warnings,
        elapsed,
        output,
    )
}
