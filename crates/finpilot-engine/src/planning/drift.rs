use std::collections::BTreeMap;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::profile::RiskTolerance;
use crate::types::Weight;
use crate::EngineResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A holding whose current weight has moved away from its target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftAlert {
    pub name: String,
    pub target: Weight,
    pub current: Weight,
    /// Absolute difference between target and current.
    pub drift: Weight,
}

/// Equity/debt split for a rebalance, rounded to two decimals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetAllocation {
    pub equity: Weight,
    pub debt: Weight,
}

impl TargetAllocation {
    fn as_map(&self) -> BTreeMap<String, Weight> {
        BTreeMap::from([
            ("equity".to_string(), self.equity),
            ("debt".to_string(), self.debt),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalanceSuggestion {
    pub target_allocation: TargetAllocation,
    /// Absolute drift per asset class, rounded to two decimals.
    pub drift: BTreeMap<String, Weight>,
    pub rebalance_required: bool,
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Holdings present in both maps whose weights differ by more than
/// `threshold`. Holdings missing from `current` are not reported.
pub fn detect_drift(
    target: &BTreeMap<String, Weight>,
    current: &BTreeMap<String, Weight>,
    threshold: f64,
) -> Vec<DriftAlert> {
    target
        .iter()
        .filter_map(|(name, &t)| {
            let &c = current.get(name)?;
            let drift = (t - c).abs();
            (drift > threshold).then(|| DriftAlert {
                name: name.clone(),
                target: t,
                current: c,
                drift,
            })
        })
        .collect()
}

/// Equity share for the years left to the goal. Shorter horizons lift the
/// share for low tolerance and lower it for medium and high.
pub fn target_allocation(years_remaining: f64, tolerance: RiskTolerance) -> EngineResult<TargetAllocation> {
    if !years_remaining.is_finite() || years_remaining < 0.0 {
        return Err(EngineError::invalid(
            "years_remaining",
            "must be a non-negative number",
        ));
    }
    let equity = match tolerance {
        RiskTolerance::Low => (0.6 - 0.05 * years_remaining).max(0.2),
        RiskTolerance::High => (0.8 - 0.02 * years_remaining).min(0.9),
        RiskTolerance::Medium => (0.7 - 0.03 * years_remaining).min(0.75),
    };
    Ok(TargetAllocation {
        equity: round2(equity),
        debt: round2(1.0 - equity),
    })
}

/// Compare a current equity/debt split with the target for the horizon.
/// Missing classes in `current` count as zero.
pub fn suggest_rebalance(
    current: &BTreeMap<String, Weight>,
    years_remaining: f64,
    tolerance: RiskTolerance,
    threshold: f64,
) -> EngineResult<RebalanceSuggestion> {
    let target = target_allocation(years_remaining, tolerance)?;
    let mut rebalance_required = false;
    let drift = target
        .as_map()
        .into_iter()
        .map(|(asset, t)| {
            let d = (current.get(&asset).copied().unwrap_or(0.0) - t).abs();
            if d > threshold {
                rebalance_required = true;
            }
            (asset, round2(d))
        })
        .collect();
    info!("rebalance check: target={target:?} required={rebalance_required}");
    Ok(RebalanceSuggestion {
        target_allocation: target,
        drift,
        rebalance_required,
    })
}
