use std::collections::BTreeSet;
use std::time::Instant;

use log::{error, warn};
use serde::{Deserialize, Serialize};

use crate::allocation::allocator::AllocatedInstrument;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::instrument::{AssetType, InstrumentKind};
use crate::types::{with_metadata, ComputationOutput, Percent};
use crate::EngineResult;

/// One-sided 95% normal quantile.
const Z_95: f64 = 1.645;
/// Normal expected-shortfall multiplier at 95%.
const ES_95: f64 = 2.063;

/// Volatility assumed for a fixed deposit (decimal).
pub const DEPOSIT_VOLATILITY: f64 = 0.01;

const DEFAULT_FUND_RETURN: f64 = 0.12;
const DEFAULT_FUND_VOLATILITY: f64 = 0.15;
const DEFAULT_STOCK_RETURN: f64 = 0.15;
const DEFAULT_STOCK_VOLATILITY: f64 = 0.25;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Coarse High/Medium/Low grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rating {
    High,
    Medium,
    Low,
}

/// Portfolio-level return and risk, all figures in percent except Sharpe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioMetrics {
    pub expected_return: Percent,
    pub risk: Percent,
    pub sharpe_ratio: f64,
    pub var_95: Percent,
    pub expected_shortfall: Percent,
    pub diversification_score: Rating,
    pub liquidity_score: Rating,
}

impl Default for PortfolioMetrics {
    /// Bundle reported when metrics cannot be computed.
    fn default() -> Self {
        Self {
            expected_return: 10.0,
            risk: 15.0,
            sharpe_ratio: 0.33,
            var_95: -14.0,
            expected_shortfall: -20.0,
            diversification_score: Rating::Medium,
            liquidity_score: Rating::Medium,
        }
    }
}

/// Annual return and volatility of one holding, as decimals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HoldingEstimate {
    pub annual_return: f64,
    pub annual_volatility: f64,
    pub asset_type: AssetType,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Return and risk estimate for a holding. Deposits use their quoted rate
/// and a fixed 1% volatility; funds and stocks fall back to class defaults
/// when the feed supplied nothing.
pub fn holding_estimate(holding: &AllocatedInstrument) -> EngineResult<HoldingEstimate> {
    let inst = &holding.scored.instrument;
    let pct = |v: Option<f64>| v.map(|x| x / 100.0);
    let (annual_return, annual_volatility) = match inst.kind {
        InstrumentKind::FixedDeposit => {
            let rate = pct(inst.expected_return).ok_or_else(|| {
                EngineError::InsufficientData(format!("deposit '{}' has no rate", inst.name))
            })?;
            (rate, DEPOSIT_VOLATILITY)
        }
        InstrumentKind::MutualFund => (
            pct(inst.expected_return).unwrap_or(DEFAULT_FUND_RETURN),
            pct(inst.risk).unwrap_or(DEFAULT_FUND_VOLATILITY),
        ),
        InstrumentKind::Stock => (
            pct(inst.expected_return).unwrap_or(DEFAULT_STOCK_RETURN),
            pct(inst.risk).unwrap_or(DEFAULT_STOCK_VOLATILITY),
        ),
    };
    if !annual_return.is_finite() || !annual_volatility.is_finite() {
        return Err(EngineError::NumericalError(format!(
            "non-finite estimate for '{}'",
            inst.name
        )));
    }
    Ok(HoldingEstimate {
        annual_return,
        annual_volatility,
        asset_type: inst.asset_type(),
    })
}

/// Grade by number of distinct instrument kinds held.
pub fn diversification_score(portfolio: &[AllocatedInstrument]) -> Rating {
    let kinds: BTreeSet<InstrumentKind> = portfolio.iter().map(|h| h.kind()).collect();
    match kinds.len() {
        n if n >= 3 => Rating::High,
        2 => Rating::Medium,
        _ => Rating::Low,
    }
}

/// Grade by the share of holdings (by count) that are funds or stocks.
pub fn liquidity_score(portfolio: &[AllocatedInstrument]) -> Rating {
    if portfolio.is_empty() {
        return Rating::Medium;
    }
    let liquid = portfolio.iter().filter(|h| h.kind().is_liquid()).count();
    let ratio = liquid as f64 / portfolio.len() as f64;
    if ratio >= 0.7 {
        Rating::High
    } else if ratio >= 0.4 {
        Rating::Medium
    } else {
        Rating::Low
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Compute portfolio metrics. A holding whose estimate fails is logged and
/// left out; the portfolio must keep at least one holding. The remaining
/// weights are used as given, not renormalized, so a skipped holding counts
/// as a zero-return, zero-risk slice of the portfolio.
pub fn try_portfolio_metrics(
    portfolio: &[AllocatedInstrument],
    config: &EngineConfig,
    warnings: &mut Vec<String>,
) -> EngineResult<PortfolioMetrics> {
    let mut rows: Vec<(f64, HoldingEstimate)> = Vec::with_capacity(portfolio.len());
    for holding in portfolio {
        match holding_estimate(holding) {
            Ok(est) => rows.push((holding.allocation, est)),
            Err(e) => {
                warn!("metrics: skipping '{}': {e}", holding.name());
                warnings.push(format!("Metrics skipped '{}': {e}", holding.name()));
            }
        }
    }
    if rows.is_empty() {
        return Err(EngineError::InsufficientData(
            "no holdings with usable return estimates".into(),
        ));
    }

    let expected_return: f64 = rows.iter().map(|(w, e)| w * e.annual_return).sum();

    let mut variance = 0.0;
    for (wi, ei) in &rows {
        for (wj, ej) in &rows {
            variance += wi
                * wj
                * ei.annual_volatility
                * ej.annual_volatility
                * ei.asset_type.correlation(ej.asset_type);
        }
    }
    if !variance.is_finite() || variance < -1e-12 {
        return Err(EngineError::NumericalError(format!(
            "portfolio variance {variance} is not usable"
        )));
    }
    let risk = variance.max(0.0).sqrt();

    let sharpe_ratio = if risk > 0.0 {
        (expected_return - config.risk_free_rate) / risk
    } else {
        0.0
    };

    Ok(PortfolioMetrics {
        expected_return: expected_return * 100.0,
        risk: risk * 100.0,
        sharpe_ratio,
        var_95: (expected_return - Z_95 * risk) * 100.0,
        expected_shortfall: (expected_return - ES_95 * risk) * 100.0,
        diversification_score: diversification_score(portfolio),
        liquidity_score: liquidity_score(portfolio),
    })
}

/// Portfolio metrics that never fail: any error yields
/// [`PortfolioMetrics::default`] and a warning. Skipped holdings are not
/// renormalized away; see [`try_portfolio_metrics`].
pub fn portfolio_metrics(
    portfolio: &[AllocatedInstrument],
    config: &EngineConfig,
) -> ComputationOutput<PortfolioMetrics> {
    let start = Instant::now();
    let mut warnings = Vec::new();

    let metrics = match try_portfolio_metrics(portfolio, config, &mut warnings) {
        Ok(m) => m,
        Err(e) => {
            error!("portfolio metrics failed, using defaults: {e}");
            warnings.push(format!("Metrics unavailable ({e}); default metrics used"));
            PortfolioMetrics::default()
        }
    };

    let elapsed = start.elapsed().as_micros() as u64;
    with_metadata(
        "Correlation-adjusted mean-variance with parametric normal VaR",
        &serde_json::json!({
            "risk_free_rate": config.risk_free_rate,
            "var_z": Z_95,
            "es_multiplier": ES_95,
            "deposit_volatility": DEPOSIT_VOLATILITY,
        }),
        warnings,
        elapsed,
        metrics,
    )
}
