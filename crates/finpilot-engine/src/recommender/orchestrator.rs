use std::collections::BTreeMap;
use std::time::Instant;

use chrono::NaiveDate;
use log::{error, info, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::allocation::allocator::{
    allocate, enforce_experience_limits, renormalize, AllocatedInstrument, AllocationContext,
};
use crate::allocation::fallback::static_bundle_portfolio;
use crate::allocation::scorer::{score_catalog, ScoredInstrument};
use crate::analytics::metrics::{holding_estimate, portfolio_metrics, PortfolioMetrics};
use crate::analytics::nudges::{generate_nudges, DEFAULT_NUDGES};
use crate::config::EngineConfig;
use crate::instrument::{Instrument, InstrumentCatalog, InstrumentKind};
use crate::monte_carlo::growth::{
    simulate_growth, GrowthSimulationInput, ScenarioResult, ScenarioSummary, SimulationHolding,
};
use crate::planning::micro_invest::{suggest_micro_investments, MicroInvestmentPlan};
use crate::profile::UserProfile;
use crate::types::{with_metadata, ComputationOutput, MarketScenario, Percent, Weight};
use crate::EngineResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One entry of an externally revised portfolio. Untrusted: allocations may
/// be out of range and need not sum to one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisedHolding {
    pub name: String,
    pub allocation: Weight,
    /// Required for holdings not in the computed portfolio.
    #[serde(rename = "type", default)]
    pub kind: Option<InstrumentKind>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub expected_return: Option<Percent>,
    #[serde(default)]
    pub risk: Option<Percent>,
}

/// Everything one recommendation call needs, as read from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationRequest {
    pub profile: UserProfile,
    #[serde(default)]
    pub catalog: InstrumentCatalog,
    #[serde(default)]
    pub revised_portfolio: Option<Vec<RevisedHolding>>,
    /// Reference date for horizon and goal arithmetic; today when absent.
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
}

/// The final recommendation bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub recommended_portfolio: Vec<AllocatedInstrument>,
    pub portfolio_metrics: PortfolioMetrics,
    pub growth_simulations: BTreeMap<MarketScenario, ScenarioResult>,
    pub nudges: Vec<String>,
    pub micro_investment_plan: Option<MicroInvestmentPlan>,
    /// True when the whole-engine static bundle was returned.
    pub used_fallback: bool,
}

// ---------------------------------------------------------------------------
// Revised-portfolio merge
// ---------------------------------------------------------------------------

/// Replace the computed portfolio with a revised one. Known names keep their
/// scores; new names need a `type`, and new deposits an interest rate. Invalid entries are dropped, the result
/// is renormalized and stocks are removed again for restricted investors. If
/// nothing usable remains the computed portfolio is kept.
pub fn merge_revised_portfolio(
    computed: &[AllocatedInstrument],
    revised: &[RevisedHolding],
    profile: &UserProfile,
    warnings: &mut Vec<String>,
) -> Vec<AllocatedInstrument> {
    let mut merged: Vec<AllocatedInstrument> = Vec::with_capacity(revised.len());
    for entry in revised {
        let name = entry.name.trim();
        if name.is_empty() || !entry.allocation.is_finite() || entry.allocation < 0.0 {
            warn!("revised portfolio: dropping invalid entry '{name}' ({})", entry.allocation);
            warnings.push(format!("Dropped invalid revised holding '{name}'"));
            continue;
        }
        if merged.iter().any(|m| m.name() == name) {
            warnings.push(format!("Dropped duplicate revised holding '{name}'"));
            continue;
        }
        let holding = match computed.iter().find(|c| c.name() == name) {
            Some(known) => AllocatedInstrument {
                allocation: entry.allocation,
                ..known.clone()
            },
            None => match entry.kind {
                Some(InstrumentKind::FixedDeposit)
                    if !entry.expected_return.is_some_and(|r| r.is_finite() && r >= 0.0) =>
                {
                    warn!("revised portfolio: deposit '{name}' has no usable rate");
                    warnings.push(format!("Dropped revised deposit '{name}' with no interest rate"));
                    continue;
                }
                Some(kind) => {
                    let mut inst = Instrument::new(name, kind).with_category(entry.category.clone());
                    inst.expected_return = entry.expected_return;
                    inst.risk = entry.risk;
                    AllocatedInstrument {
                        scored: ScoredInstrument::new(inst, 0.0),
                        fit_multiplier: 1.0,
                        adjusted_score: 0.0,
                        allocation: entry.allocation,
                    }
                }
                None => {
                    warn!("revised portfolio: '{name}' is unknown and has no type");
                    warnings.push(format!("Dropped revised holding '{name}' with no type"));
                    continue;
                }
            },
        };
        merged.push(holding);
    }

    enforce_experience_limits(&mut merged, profile.investment_experience);
    if merged.is_empty() || !renormalize(&mut merged) {
        warn!("revised portfolio unusable; keeping computed portfolio");
        warnings.push("Revised portfolio was unusable; computed portfolio kept".to_string());
        return computed.to_vec();
    }
    info!("merged revised portfolio with {} holdings", merged.len());
    merged
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn simulation_input(
    portfolio: &[AllocatedInstrument],
    config: &EngineConfig,
    warnings: &mut Vec<String>,
) -> GrowthSimulationInput {
    let holdings = portfolio
        .iter()
        .filter_map(|h| match holding_estimate(h) {
            Ok(est) => Some(SimulationHolding {
                name: h.name().to_string(),
                allocation: h.allocation,
                annual_return: est.annual_return,
                annual_volatility: est.annual_volatility,
                asset_type: est.asset_type,
            }),
            Err(e) => {
                warn!("simulation: skipping '{}': {e}", h.name());
                warnings.push(format!("Simulation skipped '{}': {e}", h.name()));
                None
            }
        })
        .collect();
    GrowthSimulationInput {
        holdings,
        weeks: config.simulation_weeks,
        scenarios: config.scenarios.clone(),
        num_simulations: config.num_simulations,
        seed: config.seed,
    }
}

fn micro_plan(
    profile: &UserProfile,
    as_of: NaiveDate,
    warnings: &mut Vec<String>,
) -> Option<MicroInvestmentPlan> {
    let goal_date = profile.goal_date?;
    if profile.goal_amount <= Decimal::ZERO {
        return None;
    }
    match suggest_micro_investments(profile.goal_amount, goal_date, as_of, profile.spending_score) {
        Ok(plan) => Some(plan),
        Err(e) => {
            warn!("micro-investment plan skipped: {e}");
            warnings.push(format!("Micro-investment plan unavailable ({e})"));
            None
        }
    }
}

fn static_summary(scenario: MarketScenario) -> ScenarioSummary {
    let (mean, std_dev, percentile_5, percentile_95) = match scenario {
        MarketScenario::Normal => (1.5, 0.2, 1.2, 1.8),
        MarketScenario::Crash => (0.8, 0.1, 0.7, 0.9),
        MarketScenario::Boom => (2.0, 0.3, 1.5, 2.5),
    };
    ScenarioSummary {
        mean,
        std_dev,
        percentile_5,
        percentile_95,
    }
}

/// Canned bundle for an investor tier, returned when the pipeline fails.
pub fn static_recommendation(profile: &UserProfile, config: &EngineConfig) -> Recommendation {
    let weeks = config.simulation_weeks.max(1);
    let scenarios = if config.scenarios.is_empty() {
        MarketScenario::ALL.to_vec()
    } else {
        config.scenarios.clone()
    };
    let growth_simulations = scenarios
        .into_iter()
        .map(|s| {
            let summary = static_summary(s);
            let mean_curve = (0..=weeks)
                .map(|i| 1.0 + (summary.mean - 1.0) * i as f64 / weeks as f64)
                .collect();
            (s, ScenarioResult { summary, mean_curve })
        })
        .collect();
    Recommendation {
        recommended_portfolio: static_bundle_portfolio(
            profile.risk_tolerance,
            profile.investment_experience,
        ),
        portfolio_metrics: PortfolioMetrics::default(),
        growth_simulations,
        nudges: DEFAULT_NUDGES.iter().map(|s| s.to_string()).collect(),
        micro_investment_plan: None,
        used_fallback: true,
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run the full pipeline: sanitize, score, allocate, merge, measure,
/// simulate, advise. Stage-level failures already degrade inside each stage;
/// an error here means the inputs themselves were rejected.
pub fn try_recommend(
    profile: &UserProfile,
    catalog: &InstrumentCatalog,
    revised: Option<&[RevisedHolding]>,
    config: &EngineConfig,
    as_of: NaiveDate,
    warnings: &mut Vec<String>,
) -> EngineResult<Recommendation> {
    config.validate()?;
    profile.validate(as_of)?;

    let (catalog, sanitize_warnings) = catalog.sanitize();
    for w in &sanitize_warnings {
        warn!("catalog: {w}");
    }
    warnings.extend(sanitize_warnings);

    let horizon = profile.horizon_months(as_of);
    let (scored, score_warnings) = score_catalog(&catalog, profile.risk_tolerance, horizon);
    warnings.extend(score_warnings);

    let ctx = AllocationContext::from_profile(profile, as_of);
    let allocation = allocate(&scored, &ctx, config);
    warnings.extend(allocation.warnings);
    let mut portfolio = allocation.result.portfolio;

    if let Some(revised) = revised {
        portfolio = merge_revised_portfolio(&portfolio, revised, profile, warnings);
    }

    let metrics = portfolio_metrics(&portfolio, config);
    warnings.extend(metrics.warnings);

    let sim_input = simulation_input(&portfolio, config, warnings);
    let growth = simulate_growth(&sim_input);
    warnings.extend(growth.warnings);

    let nudges = generate_nudges(&portfolio, &metrics.result, profile.risk_tolerance, horizon);
    let micro_investment_plan = micro_plan(profile, as_of, warnings);

    Ok(Recommendation {
        recommended_portfolio: portfolio,
        portfolio_metrics: metrics.result,
        growth_simulations: growth.result.scenarios,
        nudges,
        micro_investment_plan,
        used_fallback: false,
    })
}

/// Recommendation that never fails. When the pipeline rejects its inputs the
/// static bundle for the investor's tier is returned and the cause is both
/// logged and recorded in the warnings.
pub fn recommend(
    profile: &UserProfile,
    catalog: &InstrumentCatalog,
    revised: Option<&[RevisedHolding]>,
    config: &EngineConfig,
    as_of: NaiveDate,
) -> ComputationOutput<Recommendation> {
    let start = Instant::now();
    let mut warnings = Vec::new();

    let recommendation = match try_recommend(profile, catalog, revised, config, as_of, &mut warnings) {
        Ok(r) => r,
        Err(e) => {
            error!("recommendation failed, returning static bundle: {e}");
            warnings.push(format!("Recommendation failed ({e}); static recommendation used"));
            static_recommendation(profile, config)
        }
    };

    let elapsed = start.elapsed().as_micros() as u64;
    with_metadata(
        "Score, bucket-allocate, correlation-adjusted metrics and Monte Carlo growth",
        &serde_json::json!({
            "as_of": as_of,
            "horizon_months": profile.horizon_months(as_of),
            "risk_tolerance": profile.risk_tolerance,
            "experience": profile.investment_experience,
            "catalog_size": catalog.len(),
            "revised": revised.map(|r| r.len()),
            "config": config,
        }),
        warnings,
        elapsed,
        recommendation,
    )
}

/// [`recommend`] driven by a deserialized request.
pub fn recommend_request(
    request: &RecommendationRequest,
    config: &EngineConfig,
    today: NaiveDate,
) -> ComputationOutput<Recommendation> {
    recommend(
        &request.profile,
        &request.catalog,
        request.revised_portfolio.as_deref(),
        config,
        request.as_of.unwrap_or(today),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{ExperienceLevel, RiskTolerance};
    use rust_decimal_macros::dec;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
    }

    fn config() -> EngineConfig {
        EngineConfig {
            num_simulations: 200,
            seed: Some(42),
            ..EngineConfig::default()
        }
    }

    fn catalog() -> InstrumentCatalog {
        InstrumentCatalog::from_instruments([
            Instrument::new("Gilt", InstrumentKind::MutualFund)
                .with_category("Debt Scheme - Gilt Fund")
                .with_return(7.5)
                .with_risk(4.0),
            Instrument::new("Bluechip", InstrumentKind::Stock)
                .with_market_cap(5e12)
                .with_return(14.0)
                .with_risk(18.0),
            Instrument::new("Bank FD", InstrumentKind::FixedDeposit).with_return(7.1),
        ])
    }

    fn computed() -> Vec<AllocatedInstrument> {
        let profile = UserProfile::new(RiskTolerance::Low, 24, ExperienceLevel::Advanced);
        let mut w = Vec::new();
        try_recommend(&profile, &catalog(), None, &config(), as_of(), &mut w)
            .unwrap()
            .recommended_portfolio
    }

    #[test]
    fn test_short_horizon_pipeline() {
        let profile = UserProfile::new(RiskTolerance::Low, 24, ExperienceLevel::Advanced);
        let out = recommend(&profile, &catalog(), None, &config(), as_of());
        let r = &out.result;
        assert!(!r.used_fallback);
        assert_eq!(r.recommended_portfolio.len(), 2);
        assert!(r.recommended_portfolio.iter().all(|h| h.kind() != InstrumentKind::Stock));
        assert_eq!(r.growth_simulations.len(), 3);
        assert!(!r.nudges.is_empty());
        assert!(r.micro_investment_plan.is_none());
    }

    #[test]
    fn test_invalid_profile_returns_static_bundle() {
        let mut profile = UserProfile::new(RiskTolerance::High, 24, ExperienceLevel::Advanced);
        profile.goal_amount = dec!(-5);
        let out = recommend(&profile, &catalog(), None, &config(), as_of());
        assert!(out.result.used_fallback);
        assert_eq!(out.result.recommended_portfolio.len(), 3);
        assert_eq!(out.result.portfolio_metrics, PortfolioMetrics::default());
        assert!(out.warnings.iter().any(|w| w.contains("static recommendation")));
    }

    #[test]
    fn test_micro_plan_included_with_goal() {
        let mut profile = UserProfile::new(RiskTolerance::Medium, 24, ExperienceLevel::Advanced);
        profile.goal_amount = dec!(52000);
        profile.goal_date = NaiveDate::from_ymd_opt(2027, 1, 1);
        let out = recommend(&profile, &catalog(), None, &config(), as_of());
        let plan = out.result.micro_investment_plan.unwrap();
        assert_eq!(plan.weeks_left, 52);
        assert_eq!(plan.suggested_weekly, dec!(1000));
    }

    #[test]
    fn test_merge_renormalizes_and_drops_invalid() {
        let profile = UserProfile::new(RiskTolerance::Low, 24, ExperienceLevel::Advanced);
        let revised = vec![
            RevisedHolding {
                name: "Gilt".into(),
                allocation: 3.0,
                kind: None,
                category: String::new(),
                expected_return: None,
                risk: None,
            },
            RevisedHolding {
                name: "Liquid Fund".into(),
                allocation: 1.0,
                kind: Some(InstrumentKind::MutualFund),
                category: "Debt Scheme - Liquid Fund".into(),
                expected_return: Some(6.5),
                risk: Some(1.0),
            },
            RevisedHolding {
                name: "Ghost".into(),
                allocation: f64::NAN,
                kind: Some(InstrumentKind::Stock),
                category: String::new(),
                expected_return: None,
                risk: None,
            },
        ];
        let mut warnings = Vec::new();
        let merged = merge_revised_portfolio(&computed(), &revised, &profile, &mut warnings);
        assert_eq!(merged.len(), 2);
        assert!((merged[0].allocation - 0.75).abs() < 1e-9);
        assert!(merged[0].scored.score > 0.0);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_merge_drops_new_deposit_without_rate() {
        let profile = UserProfile::new(RiskTolerance::Low, 24, ExperienceLevel::Advanced);
        let deposit = |name: &str, rate: Option<f64>| RevisedHolding {
            name: name.into(),
            allocation: 1.0,
            kind: Some(InstrumentKind::FixedDeposit),
            category: String::new(),
            expected_return: rate,
            risk: None,
        };
        let revised = vec![
            deposit("Rateless FD", None),
            deposit("Broken FD", Some(f64::NAN)),
            deposit("Post Office FD", Some(7.5)),
        ];
        let mut warnings = Vec::new();
        let merged = merge_revised_portfolio(&computed(), &revised, &profile, &mut warnings);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].name(), "Post Office FD");
        assert!((merged[0].allocation - 1.0).abs() < 1e-12);
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().all(|w| w.contains("no interest rate")));
    }

    #[test]
    fn test_merge_reapplies_stock_restriction() {
        let profile = UserProfile::new(RiskTolerance::High, 120, ExperienceLevel::Beginner);
        let revised = vec![RevisedHolding {
            name: "Hot Stock".into(),
            allocation: 1.0,
            kind: Some(InstrumentKind::Stock),
            category: String::new(),
            expected_return: None,
            risk: None,
        }];
        let mut warnings = Vec::new();
        let computed = computed();
        let merged = merge_revised_portfolio(&computed, &revised, &profile, &mut warnings);
        assert_eq!(merged, computed);
    }
}
