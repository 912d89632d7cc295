use finpilot_engine::allocation::allocator::AllocatedInstrument;
use finpilot_engine::allocation::scorer::ScoredInstrument;
use finpilot_engine::analytics::metrics::{portfolio_metrics, try_portfolio_metrics, Rating};
use finpilot_engine::config::EngineConfig;
use finpilot_engine::instrument::{AssetType, Instrument, InstrumentKind};
use finpilot_engine::monte_carlo::growth::{
    simulate_growth, try_simulate_growth, GrowthSimulationInput, SimulationHolding,
};
use finpilot_engine::types::MarketScenario;

const SEED: u64 = 42;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn held(inst: Instrument, allocation: f64) -> AllocatedInstrument {
    AllocatedInstrument {
        scored: ScoredInstrument::new(inst, 0.8),
        fit_multiplier: 1.0,
        adjusted_score: 0.8,
        allocation,
    }
}

fn sim_input(seed: u64) -> GrowthSimulationInput {
    GrowthSimulationInput {
        holdings: vec![
            SimulationHolding {
                name: "Large Cap Fund".into(),
                allocation: 0.5,
                annual_return: 0.12,
                annual_volatility: 0.15,
                asset_type: AssetType::Equity,
            },
            SimulationHolding {
                name: "Gilt Fund".into(),
                allocation: 0.3,
                annual_return: 0.07,
                annual_volatility: 0.05,
                asset_type: AssetType::Debt,
            },
            SimulationHolding {
                name: "Deposit".into(),
                allocation: 0.2,
                annual_return: 0.07,
                annual_volatility: 0.01,
                asset_type: AssetType::FixedDeposit,
            },
        ],
        weeks: 52,
        scenarios: MarketScenario::ALL.to_vec(),
        num_simulations: 1000,
        seed: Some(seed),
    }
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

#[test]
fn test_single_deposit_metrics() {
    for rate in [5.5, 7.0, 8.25] {
        let p = vec![held(
            Instrument::new("FD", InstrumentKind::FixedDeposit).with_return(rate),
            1.0,
        )];
        let m = try_portfolio_metrics(&p, &EngineConfig::default(), &mut Vec::new()).unwrap();
        assert!((m.expected_return - rate).abs() < 1e-9);
        assert!((m.risk - 1.0).abs() < 1e-9);
        assert_eq!(m.diversification_score, Rating::Low);
        assert_eq!(m.liquidity_score, Rating::Low);
    }
}

#[test]
fn test_metrics_are_idempotent() {
    let p = vec![
        held(
            Instrument::new("Eq", InstrumentKind::MutualFund)
                .with_category("Equity Scheme - Large Cap Fund")
                .with_return(12.0)
                .with_risk(16.0),
            0.5,
        ),
        held(Instrument::new("Stock", InstrumentKind::Stock), 0.2),
        held(
            Instrument::new("FD", InstrumentKind::FixedDeposit).with_return(7.0),
            0.3,
        ),
    ];
    let config = EngineConfig::default();
    let first = portfolio_metrics(&p, &config);
    let second = portfolio_metrics(&p, &config);
    assert_eq!(first.result, second.result);
    assert_eq!(first.result.diversification_score, Rating::High);
    assert!(first.result.var_95 < first.result.expected_return);
    assert!(first.result.expected_shortfall < first.result.var_95);
}

// ---------------------------------------------------------------------------
// Growth simulation
// ---------------------------------------------------------------------------

#[test]
fn test_crash_normal_boom_ordering() {
    for seed in [SEED, 7, 2026] {
        let out = try_simulate_growth(&sim_input(seed), &mut Vec::new()).unwrap();
        let mean = |s: MarketScenario| out.scenarios[&s].summary.mean;
        assert!(mean(MarketScenario::Crash) < mean(MarketScenario::Normal));
        assert!(mean(MarketScenario::Normal) < mean(MarketScenario::Boom));
    }
}

#[test]
fn test_seed_reproduces_exactly() {
    let a = simulate_growth(&sim_input(SEED)).result;
    let b = simulate_growth(&sim_input(SEED)).result;
    assert_eq!(a, b);
    let c = simulate_growth(&sim_input(SEED + 1)).result;
    assert_ne!(a, c);
}

#[test]
fn test_requested_scenarios_only() {
    let mut input = sim_input(SEED);
    input.scenarios = vec![MarketScenario::Crash];
    input.weeks = 10;
    let out = try_simulate_growth(&input, &mut Vec::new()).unwrap();
    assert_eq!(out.scenarios.len(), 1);
    assert_eq!(out.scenarios[&MarketScenario::Crash].mean_curve.len(), 11);
}

#[test]
fn test_invalid_input_falls_back_to_linear() {
    init_logging();
    let mut input = sim_input(SEED);
    input.holdings[0].allocation = -0.5;
    let out = simulate_growth(&input);
    assert!(out.result.used_fallback);
    for result in out.result.scenarios.values() {
        assert!((result.summary.mean - 1.52).abs() < 1e-9);
        assert!((result.mean_curve[1] - 1.01).abs() < 1e-12);
    }
}

#[test]
fn test_output_serializes_with_scenario_keys() {
    let out = simulate_growth(&sim_input(SEED));
    let json = serde_json::to_value(&out.result).unwrap();
    for key in ["normal", "crash", "boom"] {
        assert!(json["scenarios"][key]["percentile_5"].is_number(), "{key}");
    }
}
