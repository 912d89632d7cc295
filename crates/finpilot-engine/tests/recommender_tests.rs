use chrono::NaiveDate;
use finpilot_engine::config::EngineConfig;
use finpilot_engine::instrument::{Instrument, InstrumentCatalog, InstrumentKind};
use finpilot_engine::profile::{ExperienceLevel, RiskTolerance, UserProfile};
use finpilot_engine::recommender::orchestrator::{recommend, recommend_request, RecommendationRequest};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 1).unwrap()
}

fn config() -> EngineConfig {
    EngineConfig {
        num_simulations: 300,
        seed: Some(11),
        ..EngineConfig::default()
    }
}

fn catalog() -> InstrumentCatalog {
    InstrumentCatalog::from_instruments([
        Instrument::new("Index Fund", InstrumentKind::MutualFund)
            .with_category("Equity Scheme - Index Fund")
            .with_return(12.5)
            .with_risk(15.5),
        Instrument::new("Banking PSU Fund", InstrumentKind::MutualFund)
            .with_category("Debt Scheme - Banking and PSU Fund")
            .with_return(7.2)
            .with_risk(2.0),
        Instrument::new("Utility Co", InstrumentKind::Stock)
            .with_market_cap(3e12)
            .with_return(13.0)
            .with_risk(14.0),
        Instrument::new("Bank FD", InstrumentKind::FixedDeposit).with_return(7.1),
    ])
}

#[test]
fn test_beginner_bundle_is_stock_free_and_normalized() {
    init_logging();
    for months in [6, 48, 120] {
        for tol in [RiskTolerance::Low, RiskTolerance::Medium, RiskTolerance::High] {
            let profile = UserProfile::new(tol, months, ExperienceLevel::Beginner);
            let out = recommend(&profile, &catalog(), None, &config(), as_of());
            let p = &out.result.recommended_portfolio;
            assert!(p.iter().all(|h| h.kind() != InstrumentKind::Stock));
            let total: f64 = p.iter().map(|h| h.allocation).sum();
            assert!((total - 1.0).abs() < 1e-6);
        }
    }
}

#[test]
fn test_engine_never_fails_on_bad_input() {
    init_logging();
    let mut profile = UserProfile::new(RiskTolerance::Medium, 60, ExperienceLevel::Intermediate);
    profile.inflation_rate = f64::NAN;
    let out = recommend(&profile, &catalog(), None, &config(), as_of());
    assert!(out.result.used_fallback);
    assert!(!out.result.recommended_portfolio.is_empty());
    assert_eq!(out.result.nudges.len(), 3);
    assert!(!out.warnings.is_empty());

    let bad_config = EngineConfig {
        max_per_bucket: 0,
        ..config()
    };
    let out = recommend(&profile, &catalog(), None, &bad_config, as_of());
    assert!(out.result.used_fallback);
}

#[test]
fn test_empty_catalog_still_recommends() {
    init_logging();
    let profile = UserProfile::new(RiskTolerance::High, 120, ExperienceLevel::Advanced);
    let out = recommend(&profile, &InstrumentCatalog::default(), None, &config(), as_of());
    let r = &out.result;
    assert!(!r.used_fallback);
    let names: Vec<_> = r.recommended_portfolio.iter().map(|h| h.name()).collect();
    assert_eq!(names, vec!["HDFC Top 100 Fund", "Reliance Industries"]);
    assert_eq!(r.growth_simulations.len(), 3);
}

#[test]
fn test_request_from_json() {
    init_logging();
    let raw = r#"{
        "profile": {
            "risk_tolerance": "low",
            "investment_experience": "ADVANCED",
            "goal_amount": "26000",
            "goal_date": "2027-09-30"
        },
        "catalog": {
            "fixed_deposits": [
                {"name": "Bank FD", "type": "fixed_deposit", "expected_return": 7.0, "liquidity": 365}
            ]
        },
        "revised_portfolio": [
            {"name": "Bank FD", "allocation": 0.5},
            {"name": "Liquid Fund", "type": "mutual_fund", "category": "Debt Scheme - Liquid Fund", "allocation": 0.5}
        ],
        "as_of": "2026-10-01"
    }"#;
    let request: RecommendationRequest = serde_json::from_str(raw).unwrap();
    let out = recommend_request(&request, &config(), as_of());
    let r = &out.result;
    assert!(!r.used_fallback);
    assert_eq!(r.recommended_portfolio.len(), 2);
    assert!((r.recommended_portfolio[0].allocation - 0.5).abs() < 1e-9);
    let plan = r.micro_investment_plan.as_ref().unwrap();
    assert_eq!(plan.weeks_left, 52);
    assert_eq!(plan.suggested_weekly, dec!(500));
    let json = serde_json::to_value(r).unwrap();
    assert!(json["portfolio_metrics"]["sharpe_ratio"].is_number());
    assert!(json["growth_simulations"]["boom"]["mean_curve"].is_array());
}

#[test]
fn test_overflowing_goal_amount_never_panics() {
    init_logging();
    let mut profile = UserProfile::new(RiskTolerance::Medium, 24, ExperienceLevel::Advanced);
    profile.goal_amount = Decimal::MAX;
    profile.goal_date = as_of().checked_add_days(chrono::Days::new(7));
    let out = recommend(&profile, &InstrumentCatalog::default(), None, &config(), as_of());
    let r = &out.result;
    assert!(!r.recommended_portfolio.is_empty());
    assert!(r.micro_investment_plan.is_none());
    assert!(out.warnings.iter().any(|w| w.contains("Micro-investment plan unavailable")));
    let total: f64 = r.recommended_portfolio.iter().map(|h| h.allocation).sum();
    assert!((total - 1.0).abs() < 1e-6);
}

#[test]
fn test_out_of_range_simulation_size_uses_static_bundle() {
    init_logging();
    let profile = UserProfile::new(RiskTolerance::Medium, 60, ExperienceLevel::Advanced);
    for bad in [
        EngineConfig { simulation_weeks: 0, ..config() },
        EngineConfig { num_simulations: 0, ..config() },
        EngineConfig { simulation_weeks: 10_000, ..config() },
        EngineConfig { num_simulations: 10_000_000, ..config() },
    ] {
        let out = recommend(&profile, &catalog(), None, &bad, as_of());
        assert!(out.result.used_fallback);
        assert!(out.warnings.iter().any(|w| w.contains("static recommendation")));
    }
}
