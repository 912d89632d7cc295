use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::instrument::{Instrument, InstrumentCatalog, InstrumentKind};
use crate::profile::RiskTolerance;
use crate::types::Percent;
use crate::EngineResult;

const RISK_WEIGHT: f64 = 0.4;
const TIME_WEIGHT: f64 = 0.3;
const RETURN_WEIGHT: f64 = 0.3;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Components of a base suitability score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub risk_score: f64,
    pub time_score: f64,
    pub return_score: f64,
    /// 0.4 * risk + 0.3 * time + 0.3 * return.
    pub score: f64,
}

impl ScoreBreakdown {
    fn new(risk_score: f64, time_score: f64, return_score: f64) -> Self {
        Self {
            risk_score,
            time_score,
            return_score,
            score: RISK_WEIGHT * risk_score + TIME_WEIGHT * time_score + RETURN_WEIGHT * return_score,
        }
    }
}

/// Fund-style flags derived from the free-text category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryFlags {
    pub is_balanced_advantage: bool,
    pub is_multi_asset: bool,
    pub is_dynamic_asset: bool,
}

impl CategoryFlags {
    pub fn from_category(category: &str) -> Self {
        let c = category.to_lowercase();
        Self {
            is_balanced_advantage: c.contains("balanced advantage"),
            is_multi_asset: c.contains("multi asset"),
            is_dynamic_asset: c.contains("dynamic asset"),
        }
    }
}

/// An instrument annotated with its base suitability score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredInstrument {
    #[serde(flatten)]
    pub instrument: Instrument,
    /// Higher is more suitable; zero when the instrument could not be scored.
    pub score: f64,
    #[serde(flatten)]
    pub flags: CategoryFlags,
}

impl ScoredInstrument {
    pub fn new(instrument: Instrument, score: f64) -> Self {
        let flags = CategoryFlags::from_category(&instrument.category);
        Self {
            instrument,
            score,
            flags,
        }
    }
}

/// Scored instruments in the catalog's bucket layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoredCatalog {
    pub mutual_funds: Vec<ScoredInstrument>,
    pub stocks: Vec<ScoredInstrument>,
    pub fixed_deposits: Vec<ScoredInstrument>,
}

impl ScoredCatalog {
    pub fn bucket(&self, kind: InstrumentKind) -> &[ScoredInstrument] {
        match kind {
            InstrumentKind::MutualFund => &self.mutual_funds,
            InstrumentKind::Stock => &self.stocks,
            InstrumentKind::FixedDeposit => &self.fixed_deposits,
        }
    }

    fn bucket_mut(&mut self, kind: InstrumentKind) -> &mut Vec<ScoredInstrument> {
        match kind {
            InstrumentKind::MutualFund => &mut self.mutual_funds,
            InstrumentKind::Stock => &mut self.stocks,
            InstrumentKind::FixedDeposit => &mut self.fixed_deposits,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.mutual_funds.is_empty() && self.stocks.is_empty() && self.fixed_deposits.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Component scores
// ---------------------------------------------------------------------------

/// Highest volatility (percent) acceptable to each risk tolerance.
fn risk_ceiling(tolerance: RiskTolerance) -> Percent {
    match tolerance {
        RiskTolerance::Low => 15.0,
        RiskTolerance::Medium => 25.0,
        RiskTolerance::High => 35.0,
    }
}

fn risk_score(volatility: Percent, tolerance: RiskTolerance) -> f64 {
    if volatility < risk_ceiling(tolerance) {
        1.0
    } else {
        0.0
    }
}

fn time_score(volatility: Percent, horizon_months: u32) -> f64 {
    let fits = if horizon_months < 12 {
        volatility < 15.0
    } else if horizon_months <= 60 {
        volatility < 25.0
    } else {
        true
    };
    if fits {
        1.0
    } else {
        0.0
    }
}

/// (full credit above, 0.8 above, 0.5 above) in percent.
fn return_tiers(kind: InstrumentKind) -> (Percent, Percent, Percent) {
    match kind {
        InstrumentKind::MutualFund => (12.0, 8.0, 5.0),
        InstrumentKind::Stock => (15.0, 10.0, 5.0),
        InstrumentKind::FixedDeposit => (8.0, 6.0, 4.0),
    }
}

fn return_score(annual_return: Percent, kind: InstrumentKind) -> f64 {
    let (high, mid, floor) = return_tiers(kind);
    if annual_return > high {
        1.0
    } else if annual_return > mid {
        0.8
    } else if annual_return > floor {
        0.5
    } else {
        0.0
    }
}

fn require(value: Option<f64>, inst: &Instrument, field: &str) -> EngineResult<f64> {
    match value {
        Some(v) if v.is_finite() => Ok(v),
        Some(_) => Err(EngineError::InvalidInput {
            field: format!("{}.{}", inst.name, field),
            reason: "value is not finite".into(),
        }),
        None => Err(EngineError::InsufficientData(format!(
            "'{}' has no {} figure",
            inst.name, field
        ))),
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Score a mutual fund from its volatility and return.
pub fn score_mutual_fund(
    fund: &Instrument,
    tolerance: RiskTolerance,
    horizon_months: u32,
) -> EngineResult<ScoreBreakdown> {
    score_market_instrument(fund, tolerance, horizon_months, InstrumentKind::MutualFund)
}

/// Score a stock from its volatility and return. Stocks need a higher
/// return than funds for the same credit.
pub fn score_stock(
    stock: &Instrument,
    tolerance: RiskTolerance,
    horizon_months: u32,
) -> EngineResult<ScoreBreakdown> {
    score_market_instrument(stock, tolerance, horizon_months, InstrumentKind::Stock)
}

fn score_market_instrument(
    inst: &Instrument,
    tolerance: RiskTolerance,
    horizon_months: u32,
    kind: InstrumentKind,
) -> EngineResult<ScoreBreakdown> {
    let volatility = require(inst.risk, inst, "risk")?;
    let annual_return = require(inst.expected_return, inst, "expected_return")?;
    Ok(ScoreBreakdown::new(
        risk_score(volatility, tolerance),
        time_score(volatility, horizon_months),
        return_score(annual_return, kind),
    ))
}

/// Score a fixed deposit. Deposits are riskless for scoring purposes; the
/// time component checks the deposit term against the goal horizon.
pub fn score_fixed_deposit(deposit: &Instrument, horizon_months: u32) -> EngineResult<ScoreBreakdown> {
    let rate = require(deposit.expected_return, deposit, "expected_return")?;
    let term = deposit.term_months();
    let fits = if horizon_months < 12 {
        term <= 12
    } else if horizon_months <= 60 {
        term <= 60
    } else {
        true
    };
    Ok(ScoreBreakdown::new(
        1.0,
        if fits { 1.0 } else { 0.0 },
        return_score(rate, InstrumentKind::FixedDeposit),
    ))
}

/// Dispatch to the scorer for the instrument's kind.
pub fn score_instrument(
    inst: &Instrument,
    tolerance: RiskTolerance,
    horizon_months: u32,
) -> EngineResult<ScoreBreakdown> {
    match inst.kind {
        InstrumentKind::MutualFund => score_mutual_fund(inst, tolerance, horizon_months),
        InstrumentKind::Stock => score_stock(inst, tolerance, horizon_months),
        InstrumentKind::FixedDeposit => score_fixed_deposit(inst, horizon_months),
    }
}

/// Score every instrument in the catalog. An instrument that cannot be
/// scored is logged, reported in the returned warnings and kept with score
/// zero; the batch always completes.
pub fn score_catalog(
    catalog: &InstrumentCatalog,
    tolerance: RiskTolerance,
    horizon_months: u32,
) -> (ScoredCatalog, Vec<String>) {
    let mut scored = ScoredCatalog::default();
    let mut warnings = Vec::new();

    for kind in InstrumentKind::ALL {
        for inst in catalog.bucket(kind) {
            let score = match score_instrument(inst, tolerance, horizon_months) {
                Ok(b) => {
                    debug!(
                        "scored {} '{}': risk={} time={} return={} -> {:.3}",
                        kind.as_str(),
                        inst.name,
                        b.risk_score,
                        b.time_score,
                        b.return_score,
                        b.score
                    );
                    b.score
                }
                Err(e) => {
                    warn!("scoring skipped for '{}': {e}", inst.name);
                    warnings.push(format!("Could not score '{}': {e}", inst.name));
                    0.0
                }
            };
            scored.bucket_mut(kind).push(ScoredInstrument::new(inst.clone(), score));
        }
    }

    (scored, warnings)
}
