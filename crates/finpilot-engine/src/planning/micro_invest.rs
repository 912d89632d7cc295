use chrono::NaiveDate;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::types::Money;
use crate::EngineResult;

/// Weekly amounts are rounded up to a multiple of this.
const ROUNDING_STEP: Decimal = dec!(50);
const DEFAULT_SPENDING_SCORE: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MicroInvestmentPlan {
    pub weeks_left: u32,
    pub suggested_weekly: Money,
    pub total_contribution: Money,
}

/// Whole weeks from `as_of` to the goal, at least one.
pub fn weeks_to_goal(goal_date: NaiveDate, as_of: NaiveDate) -> u32 {
    let days = (goal_date - as_of).num_days();
    u32::try_from(days.div_euclid(7)).unwrap_or(0).max(1)
}

/// Weekly contribution towards `goal_amount`. The base amount is scaled by
/// `0.6 + 0.8 * spending_score` (score clamped to [0, 1], default 0.5), then
/// rounded up to the next multiple of 50.
pub fn suggest_micro_investments(
    goal_amount: Money,
    goal_date: NaiveDate,
    as_of: NaiveDate,
    spending_score: Option<f64>,
) -> EngineResult<MicroInvestmentPlan> {
    if goal_amount < Decimal::ZERO {
        return Err(EngineError::invalid("goal_amount", "must be non-negative"));
    }
    let score = spending_score.unwrap_or(DEFAULT_SPENDING_SCORE);
    if !score.is_finite() {
        return Err(EngineError::invalid("spending_score", "must be finite"));
    }
    let score = Decimal::from_f64(score.clamp(0.0, 1.0))
        .ok_or_else(|| EngineError::invalid("spending_score", "not representable"))?;

    let weeks_left = weeks_to_goal(goal_date, as_of);
    let weeks = Decimal::from(weeks_left);
    let multiplier = dec!(0.6) + dec!(0.8) * score;
    let overflow = || EngineError::NumericalError(format!("weekly plan for {goal_amount} overflows"));
    let adjusted = goal_amount
        .checked_div(weeks)
        .and_then(|base| base.checked_mul(multiplier))
        .ok_or_else(overflow)?;
    let suggested_weekly = (adjusted / ROUNDING_STEP)
        .ceil()
        .checked_mul(ROUNDING_STEP)
        .ok_or_else(overflow)?;
    let total_contribution = suggested_weekly.checked_mul(weeks).ok_or_else(overflow)?;

    Ok(MicroInvestmentPlan {
        weeks_left,
        suggested_weekly,
        total_contribution,
    })
}
