use std::cmp::Ordering;
use std::time::Instant;

use chrono::NaiveDate;
use log::{error, info, warn};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::fallback;
use super::glide_path::{self, AssetClass};
use super::scorer::{ScoredCatalog, ScoredInstrument};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::instrument::InstrumentKind;
use crate::profile::{ExperienceLevel, HorizonBand, RiskTolerance, UserProfile};
use crate::types::{normalize_weights, with_metadata, ComputationOutput, Weight};
use crate::EngineResult;

/// Large-cap threshold: market cap above one trillion.
const LARGE_CAP: f64 = 1e12;
/// Mid-cap threshold.
const MID_CAP: f64 = 1e10;

const MEDIUM_TERM_HYBRID_CATEGORIES: [&str; 6] = [
    "hybrid scheme - balanced advantage fund",
    "hybrid scheme - multi asset allocation fund",
    "hybrid scheme - dynamic asset allocation fund",
    "hybrid scheme - balanced fund",
    "hybrid scheme - conservative hybrid fund",
    "hybrid scheme - equity savings fund",
];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A scored instrument with its share of the portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocatedInstrument {
    #[serde(flatten)]
    pub scored: ScoredInstrument,
    /// Product of the category, risk and experience fit multipliers.
    #[serde(default = "one")]
    pub fit_multiplier: f64,
    /// Ranking score: `score * fit_multiplier`.
    #[serde(default)]
    pub adjusted_score: f64,
    /// Fraction of the portfolio in [0, 1].
    pub allocation: Weight,
}

fn one() -> f64 {
    1.0
}

impl AllocatedInstrument {
    pub fn name(&self) -> &str {
        &self.scored.instrument.name
    }

    pub fn kind(&self) -> InstrumentKind {
        self.scored.instrument.kind
    }
}

/// Coarse split of the portfolio across the three buckets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BucketSplit {
    pub mutual_funds: Weight,
    pub stocks: Weight,
    pub fixed_deposits: Weight,
}

impl BucketSplit {
    /// Split keyed by horizon band and tolerance. Short horizons hold no
    /// stocks; long horizons hold no deposits.
    pub fn for_profile(band: HorizonBand, tolerance: RiskTolerance) -> Self {
        let (fixed_deposits, mutual_funds, stocks) = match (band, tolerance) {
            (HorizonBand::Short, _) => (0.6, 0.4, 0.0),
            (HorizonBand::Medium, RiskTolerance::Low) => (0.3, 0.6, 0.1),
            (HorizonBand::Medium, RiskTolerance::Medium) => (0.2, 0.6, 0.2),
            (HorizonBand::Medium, RiskTolerance::High) => (0.1, 0.6, 0.3),
            (HorizonBand::Long, RiskTolerance::Low) => (0.0, 0.7, 0.3),
            (HorizonBand::Long, RiskTolerance::Medium) => (0.0, 0.6, 0.4),
            (HorizonBand::Long, RiskTolerance::High) => (0.0, 0.5, 0.5),
        };
        Self {
            mutual_funds,
            stocks,
            fixed_deposits,
        }
    }

    pub fn weight(&self, kind: InstrumentKind) -> Weight {
        match kind {
            InstrumentKind::MutualFund => self.mutual_funds,
            InstrumentKind::Stock => self.stocks,
            InstrumentKind::FixedDeposit => self.fixed_deposits,
        }
    }
}

/// Profile facts the allocator needs, resolved once.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AllocationContext {
    pub horizon_months: u32,
    pub risk_tolerance: RiskTolerance,
    pub experience: ExperienceLevel,
    /// Share of current holdings value per kind, in `InstrumentKind::ALL` order.
    pub current_shares: [f64; 3],
}

impl AllocationContext {
    pub fn from_profile(profile: &UserProfile, as_of: NaiveDate) -> Self {
        let mut values = [Decimal::ZERO; 3];
        for h in &profile.current_holdings {
            let slot = &mut values[kind_index(h.kind)];
            *slot = slot.saturating_add(h.value);
        }
        let total = values
            .iter()
            .fold(Decimal::ZERO, |acc, v| acc.saturating_add(*v));
        let mut current_shares = [0.0; 3];
        if total > Decimal::ZERO {
            for (share, value) in current_shares.iter_mut().zip(values) {
                *share = (value / total).to_f64().unwrap_or(0.0);
            }
        }
        Self {
            horizon_months: profile.horizon_months(as_of),
            risk_tolerance: profile.risk_tolerance,
            experience: profile.investment_experience,
            current_shares,
        }
    }

    pub fn band(&self) -> HorizonBand {
        HorizonBand::from_months(self.horizon_months)
    }
}

fn kind_index(kind: InstrumentKind) -> usize {
    match kind {
        InstrumentKind::MutualFund => 0,
        InstrumentKind::Stock => 1,
        InstrumentKind::FixedDeposit => 2,
    }
}

/// Output of one allocation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationResult {
    pub portfolio: Vec<AllocatedInstrument>,
    pub split: BucketSplit,
    /// True when the static fallback portfolio was returned.
    pub used_fallback: bool,
}

// ---------------------------------------------------------------------------
// Fit multipliers
// ---------------------------------------------------------------------------

/// Category, risk and experience fit of a fund.
pub fn fund_fit_multiplier(fund: &ScoredInstrument, ctx: &AllocationContext) -> f64 {
    let category = fund.instrument.category_lower();
    let risk = fund.instrument.risk.unwrap_or(0.0);
    let months = ctx.horizon_months;

    let category_multiplier = if (48..=84).contains(&months) {
        if fund.flags.is_balanced_advantage {
            2.0
        } else if fund.flags.is_multi_asset {
            1.8
        } else if fund.flags.is_dynamic_asset {
            1.6
        } else if category.contains("debt") {
            0.5
        } else {
            1.0
        }
    } else if months > 84 {
        if category.contains("equity") {
            1.5
        } else if category.contains("hybrid") {
            1.3
        } else {
            1.0
        }
    } else if category.contains("debt") {
        1.5
    } else if category.contains("liquid") {
        1.3
    } else {
        1.0
    };

    let risk_multiplier = match ctx.risk_tolerance {
        RiskTolerance::Low if risk > 15.0 => 0.8,
        RiskTolerance::Low => 1.2,
        RiskTolerance::High if risk > 15.0 => 1.2,
        RiskTolerance::High => 0.8,
        RiskTolerance::Medium => 1.0,
    };

    let experience_multiplier = match ctx.experience {
        ExperienceLevel::Beginner if risk > 20.0 => 0.5,
        ExperienceLevel::Beginner if risk > 15.0 => 0.8,
        ExperienceLevel::Beginner => 1.2,
        _ => 1.0,
    };

    category_multiplier * risk_multiplier * experience_multiplier
}

/// Market-cap, risk and experience fit of a stock.
pub fn stock_fit_multiplier(stock: &ScoredInstrument, ctx: &AllocationContext) -> f64 {
    let risk = stock.instrument.risk.unwrap_or(0.0);
    let cap = stock.instrument.market_cap.unwrap_or(0.0);

    let cap_multiplier = if cap > LARGE_CAP {
        1.2
    } else if cap > MID_CAP {
        1.0
    } else {
        0.8
    };

    let risk_multiplier = match ctx.risk_tolerance {
        RiskTolerance::Low if risk > 20.0 => 0.7,
        RiskTolerance::Low => 1.3,
        RiskTolerance::High if risk > 20.0 => 1.3,
        RiskTolerance::High => 0.7,
        RiskTolerance::Medium => 1.0,
    };

    let experience_multiplier = match ctx.experience {
        ExperienceLevel::Beginner if cap <= MID_CAP => 0.3,
        ExperienceLevel::Beginner if risk > 20.0 => 0.4,
        ExperienceLevel::Beginner if risk > 15.0 => 0.7,
        ExperienceLevel::Beginner => 1.2,
        _ => 1.0,
    };

    cap_multiplier * risk_multiplier * experience_multiplier
}

/// Term and experience fit of a deposit.
pub fn deposit_fit_multiplier(deposit: &ScoredInstrument, ctx: &AllocationContext) -> f64 {
    let term = deposit.instrument.term_months();
    let term_multiplier = if term <= 12 {
        1.2
    } else if term <= 36 {
        1.0
    } else {
        0.8
    };
    let experience_multiplier = if ctx.experience == ExperienceLevel::Beginner {
        1.2
    } else {
        1.0
    };
    term_multiplier * experience_multiplier
}

/// Damping for a kind that already dominates the investor's holdings.
pub fn holdings_damping(kind: InstrumentKind, ctx: &AllocationContext) -> f64 {
    let share = ctx.current_shares[kind_index(kind)];
    if share > 0.4 {
        0.5
    } else if share > 0.3 {
        0.7
    } else if share > 0.2 {
        0.85
    } else {
        1.0
    }
}

pub fn fit_multiplier(inst: &ScoredInstrument, ctx: &AllocationContext) -> f64 {
    let fit = match inst.instrument.kind {
        InstrumentKind::MutualFund => fund_fit_multiplier(inst, ctx),
        InstrumentKind::Stock => stock_fit_multiplier(inst, ctx),
        InstrumentKind::FixedDeposit => deposit_fit_multiplier(inst, ctx),
    };
    fit * holdings_damping(inst.instrument.kind, ctx)
}

// ---------------------------------------------------------------------------
// Eligibility
// ---------------------------------------------------------------------------

/// Whether a fund's category suits the horizon band.
pub fn fund_eligible(fund: &ScoredInstrument, band: HorizonBand) -> bool {
    let category = fund.instrument.category_lower();
    match band {
        HorizonBand::Short => category.contains("debt scheme"),
        HorizonBand::Medium => MEDIUM_TERM_HYBRID_CATEGORIES
            .iter()
            .any(|c| category.contains(c)),
        HorizonBand::Long => category.contains("equity scheme"),
    }
}

/// Whether a stock passes market-cap and risk screens for the investor.
pub fn stock_eligible(stock: &ScoredInstrument, ctx: &AllocationContext) -> bool {
    let cap = stock.instrument.market_cap.unwrap_or(0.0);
    let risk = stock.instrument.risk.unwrap_or(0.0);
    let band = ctx.band();
    if band == HorizonBand::Short {
        return false;
    }
    if ctx.experience.restricts_stocks() {
        return cap > LARGE_CAP
            && match ctx.risk_tolerance {
                RiskTolerance::Low => risk <= 15.0,
                RiskTolerance::Medium => risk <= 20.0,
                RiskTolerance::High => true,
            };
    }
    match band {
        HorizonBand::Medium => cap >= 1e9,
        _ => cap >= MID_CAP,
    }
}

/// Keep the instruments matching `keep`, in catalog order.
pub fn filter_bucket<F>(items: &[ScoredInstrument], keep: F) -> Vec<ScoredInstrument>
where
    F: Fn(&ScoredInstrument) -> bool,
{
    items.iter().filter(|i| keep(i)).cloned().collect()
}

// ---------------------------------------------------------------------------
// Allocation
// ---------------------------------------------------------------------------

/// Take the `max` best candidates by adjusted score. The sort is stable, so
/// ties keep catalog order.
fn select_top(
    candidates: Vec<ScoredInstrument>,
    ctx: &AllocationContext,
    max: usize,
) -> EngineResult<Vec<(ScoredInstrument, f64)>> {
    let mut ranked = Vec::with_capacity(candidates.len());
    for c in candidates {
        let fit = fit_multiplier(&c, ctx);
        if !(c.score * fit).is_finite() {
            return Err(EngineError::NumericalError(format!(
                "non-finite adjusted score for '{}'",
                c.instrument.name
            )));
        }
        ranked.push((c, fit));
    }
    ranked.sort_by(|(a, fa), (b, fb)| {
        (b.score * fb)
            .partial_cmp(&(a.score * fa))
            .unwrap_or(Ordering::Equal)
    });
    ranked.truncate(max);
    Ok(ranked)
}

/// Scale allocations so they sum to one. Returns false when the portfolio has
/// no weight to scale.
pub fn renormalize(portfolio: &mut [AllocatedInstrument]) -> bool {
    let mut weights: Vec<Weight> = portfolio.iter().map(|p| p.allocation).collect();
    if normalize_weights(&mut weights).is_none() {
        return false;
    }
    for (p, w) in portfolio.iter_mut().zip(weights) {
        p.allocation = w;
    }
    true
}

/// Drop every stock for beginner and intermediate investors and rescale the
/// remainder. Returns the number of holdings removed.
pub fn enforce_experience_limits(
    portfolio: &mut Vec<AllocatedInstrument>,
    experience: ExperienceLevel,
) -> usize {
    if !experience.restricts_stocks() {
        return 0;
    }
    let before = portfolio.len();
    portfolio.retain(|p| p.kind() != InstrumentKind::Stock);
    let removed = before - portfolio.len();
    if removed > 0 {
        warn!("removed {removed} stock holding(s) for {experience} investor");
    }
    renormalize(portfolio);
    removed
}

/// Build the portfolio from a scored catalog. Errors propagate; see
/// [`allocate`] for the never-failing form.
pub fn try_allocate(
    scored: &ScoredCatalog,
    ctx: &AllocationContext,
    config: &EngineConfig,
) -> EngineResult<AllocationResult> {
    if config.max_per_bucket == 0 {
        return Err(EngineError::invalid("max_per_bucket", "must be at least 1"));
    }
    let band = ctx.band();
    let split = BucketSplit::for_profile(band, ctx.risk_tolerance);
    info!(
        "allocating: horizon={}m band={:?} risk={} experience={} split={:?}",
        ctx.horizon_months, band, ctx.risk_tolerance, ctx.experience, split
    );

    let mut portfolio = Vec::new();
    for kind in InstrumentKind::ALL {
        let bucket_weight = split.weight(kind);
        if bucket_weight <= 0.0 {
            continue;
        }
        let candidates = match kind {
            InstrumentKind::MutualFund => {
                filter_bucket(scored.bucket(kind), |f| fund_eligible(f, band))
            }
            InstrumentKind::Stock => filter_bucket(scored.bucket(kind), |s| stock_eligible(s, ctx)),
            InstrumentKind::FixedDeposit => scored.bucket(kind).to_vec(),
        };
        if candidates.is_empty() {
            info!("no eligible {} instruments; bucket skipped", kind.as_str());
            continue;
        }
        let top = select_top(candidates, ctx, config.max_per_bucket)?;
        let each = bucket_weight / top.len() as f64;
        for (inst, fit) in top {
            let adjusted_score = inst.score * fit;
            portfolio.push(AllocatedInstrument {
                scored: inst,
                fit_multiplier: fit,
                adjusted_score,
                allocation: each,
            });
        }
    }

    enforce_experience_limits(&mut portfolio, ctx.experience);

    if portfolio.is_empty() || !renormalize(&mut portfolio) {
        warn!("no instruments survived filtering; using static fallback portfolio");
        return Ok(AllocationResult {
            portfolio: fallback::fallback_portfolio(band, ctx.risk_tolerance, ctx.experience),
            split,
            used_fallback: true,
        });
    }

    Ok(AllocationResult {
        portfolio,
        split,
        used_fallback: false,
    })
}

/// Allocate the scored catalog for the investor. Never fails: an allocation
/// error yields the static fallback portfolio for the investor's tier.
pub fn allocate(
    scored: &ScoredCatalog,
    ctx: &AllocationContext,
    config: &EngineConfig,
) -> ComputationOutput<AllocationResult> {
    let start = Instant::now();
    let mut warnings = Vec::new();

    let result = match try_allocate(scored, ctx, config) {
        Ok(r) => r,
        Err(e) => {
            error!("allocation failed, using static fallback portfolio: {e}");
            warnings.push(format!("Allocation failed ({e}); static portfolio used"));
            let band = ctx.band();
            AllocationResult {
                portfolio: fallback::fallback_portfolio(band, ctx.risk_tolerance, ctx.experience),
                split: BucketSplit::for_profile(band, ctx.risk_tolerance),
                used_fallback: true,
            }
        }
    };
    if result.used_fallback && warnings.is_empty() {
        warnings.push("No eligible instruments; static portfolio used".to_string());
    }

    let elapsed = start.elapsed().as_micros() as u64;
    with_metadata(
        "Horizon-banded bucket allocation with fit-adjusted top-N selection",
        &serde_json::json!({
            "horizon_months": ctx.horizon_months,
            "risk_tolerance": ctx.risk_tolerance,
            "experience": ctx.experience,
            "max_per_bucket": config.max_per_bucket,
        }),
        warnings,
        elapsed,
        result,
    )
}

/// Glide-path weighting: each instrument's allocation is proportional to its
/// score times the glide weight of its asset class, sorted largest first.
pub fn allocate_by_glide_path(
    scored: &[ScoredInstrument],
    months_left: u32,
) -> EngineResult<Vec<AllocatedInstrument>> {
    let weights = glide_path::weights_for(months_left);
    let mut portfolio: Vec<AllocatedInstrument> = scored
        .iter()
        .map(|s| {
            let class = match s.instrument.kind {
                InstrumentKind::Stock => AssetClass::Equity,
                InstrumentKind::FixedDeposit => AssetClass::Safe,
                InstrumentKind::MutualFund => glide_path::classify_category(&s.instrument.category),
            };
            let glide = weights.weight(class);
            AllocatedInstrument {
                scored: s.clone(),
                fit_multiplier: glide,
                adjusted_score: s.score * glide,
                allocation: s.score * glide,
            }
        })
        .collect();

    if !renormalize(&mut portfolio) {
        return Err(EngineError::DivisionByZero {
            context: "glide-path allocation (all weighted scores are zero)".into(),
        });
    }
    portfolio.sort_by(|a, b| {
        b.allocation
            .partial_cmp(&a.allocation)
            .unwrap_or(Ordering::Equal)
    });
    Ok(portfolio)
}
