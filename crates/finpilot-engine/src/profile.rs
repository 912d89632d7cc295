use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::instrument::InstrumentKind;
use crate::types::Money;
use crate::EngineResult;

/// Horizon assumed when neither `time_horizon_months` nor `goal_date` is given.
pub const DEFAULT_HORIZON_MONTHS: u32 = 60;

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// Self-declared appetite for volatility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum RiskTolerance {
    Low,
    Medium,
    High,
}

impl TryFrom<String> for RiskTolerance {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl std::str::FromStr for RiskTolerance {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(RiskTolerance::Low),
            "medium" | "moderate" => Ok(RiskTolerance::Medium),
            "high" => Ok(RiskTolerance::High),
            other => Err(EngineError::invalid(
                "risk_tolerance",
                format!("'{other}' is not one of Low, Medium, High"),
            )),
        }
    }
}

impl std::fmt::Display for RiskTolerance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RiskTolerance::Low => "Low",
            RiskTolerance::Medium => "Medium",
            RiskTolerance::High => "High",
        };
        f.write_str(s)
    }
}

/// Investing experience. Beginner and intermediate investors never hold
/// individual stocks in a recommended portfolio.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", rename_all = "lowercase")]
pub enum ExperienceLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl ExperienceLevel {
    /// Whether direct stock holdings are barred for this level.
    pub fn restricts_stocks(&self) -> bool {
        matches!(self, ExperienceLevel::Beginner | ExperienceLevel::Intermediate)
    }
}

impl TryFrom<String> for ExperienceLevel {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl std::str::FromStr for ExperienceLevel {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Ok(ExperienceLevel::Beginner),
            "intermediate" => Ok(ExperienceLevel::Intermediate),
            "advanced" | "expert" => Ok(ExperienceLevel::Advanced),
            other => Err(EngineError::invalid(
                "investment_experience",
                format!("'{other}' is not one of beginner, intermediate, advanced"),
            )),
        }
    }
}

impl std::fmt::Display for ExperienceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExperienceLevel::Beginner => "beginner",
            ExperienceLevel::Intermediate => "intermediate",
            ExperienceLevel::Advanced => "advanced",
        };
        f.write_str(s)
    }
}

/// Time-horizon band used to pick bucket splits and fallback portfolios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HorizonBand {
    /// Up to 36 months.
    Short,
    /// 37 to 84 months.
    Medium,
    /// More than 84 months.
    Long,
}

impl HorizonBand {
    pub fn from_months(months: u32) -> Self {
        if months <= 36 {
            HorizonBand::Short
        } else if months <= 84 {
            HorizonBand::Medium
        } else {
            HorizonBand::Long
        }
    }
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// Value currently held in one instrument type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentHolding {
    pub kind: InstrumentKind,
    pub value: Money,
}

/// Investor profile for one recommendation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub risk_tolerance: RiskTolerance,
    #[serde(default)]
    pub time_horizon_months: Option<u32>,
    #[serde(default = "default_goal")]
    pub investment_goal: String,
    #[serde(default)]
    pub investment_experience: ExperienceLevel,
    #[serde(default)]
    pub goal_amount: Money,
    #[serde(default)]
    pub goal_date: Option<NaiveDate>,
    #[serde(default)]
    pub monthly_investment: Money,
    #[serde(default)]
    pub current_investments: Money,
    /// Annual inflation in percent.
    #[serde(default = "default_inflation")]
    pub inflation_rate: f64,
    /// Affordability in [0, 1]; lower means a smaller weekly contribution.
    #[serde(default)]
    pub spending_score: Option<f64>,
    /// Existing holdings by type, used to damp over-represented types.
    #[serde(default)]
    pub current_holdings: Vec<CurrentHolding>,
}

fn default_goal() -> String {
    "Wealth Growth".to_string()
}

fn default_inflation() -> f64 {
    6.0
}

impl UserProfile {
    pub fn new(
        risk_tolerance: RiskTolerance,
        time_horizon_months: u32,
        investment_experience: ExperienceLevel,
    ) -> Self {
        Self {
            risk_tolerance,
            time_horizon_months: Some(time_horizon_months),
            investment_goal: default_goal(),
            investment_experience,
            goal_amount: Decimal::ZERO,
            goal_date: None,
            monthly_investment: Decimal::ZERO,
            current_investments: Decimal::ZERO,
            inflation_rate: default_inflation(),
            spending_score: None,
            current_holdings: Vec::new(),
        }
    }

    /// Months to the goal. An explicit positive `time_horizon_months` wins,
    /// then the distance from `as_of` to `goal_date` (at least one month),
    /// then [`DEFAULT_HORIZON_MONTHS`].
    pub fn horizon_months(&self, as_of: NaiveDate) -> u32 {
        match (self.time_horizon_months, self.goal_date) {
            (Some(m), _) if m >= 1 => m,
            (_, Some(goal)) => months_between(as_of, goal).max(1),
            _ => DEFAULT_HORIZON_MONTHS,
        }
    }

    pub fn horizon_band(&self, as_of: NaiveDate) -> HorizonBand {
        HorizonBand::from_months(self.horizon_months(as_of))
    }

    /// Reject malformed fields once, at the engine boundary.
    pub fn validate(&self, as_of: NaiveDate) -> EngineResult<()> {
        for (field, value) in [
            ("goal_amount", self.goal_amount),
            ("monthly_investment", self.monthly_investment),
            ("current_investments", self.current_investments),
        ] {
            if value < Decimal::ZERO {
                return Err(EngineError::invalid(field, "must be non-negative"));
            }
        }
        if !self.inflation_rate.is_finite() || !(0.0..=100.0).contains(&self.inflation_rate) {
            return Err(EngineError::invalid(
                "inflation_rate",
                "must be a percentage between 0 and 100",
            ));
        }
        if let Some(score) = self.spending_score {
            if !score.is_finite() {
                return Err(EngineError::invalid("spending_score", "must be finite"));
            }
        }
        let explicit = matches!(self.time_horizon_months, Some(m) if m >= 1);
        if !explicit {
            if let Some(goal) = self.goal_date {
                if goal < as_of {
                    return Err(EngineError::invalid(
                        "goal_date",
                        format!("{goal} is before {as_of}"),
                    ));
                }
            }
        }
        if self.current_holdings.iter().any(|h| h.value < Decimal::ZERO) {
            return Err(EngineError::invalid(
                "current_holdings",
                "holding values must be non-negative",
            ));
        }
        Ok(())
    }
}

/// Whole calendar months from `from` to `to`; zero when `to` is not later.
pub fn months_between(from: NaiveDate, to: NaiveDate) -> u32 {
    if to <= from {
        return 0;
    }
    let mut months = (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32;
    if to.day() < from.day() {
        months -= 1;
    }
    months.max(0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_risk_tolerance_any_case() {
        let low: RiskTolerance = serde_json::from_str("\"low\"").unwrap();
        let high: RiskTolerance = serde_json::from_str("\"HIGH\"").unwrap();
        assert_eq!(low, RiskTolerance::Low);
        assert_eq!(high, RiskTolerance::High);
        assert!(serde_json::from_str::<RiskTolerance>("\"extreme\"").is_err());
    }

    #[test]
    fn test_experience_any_case() {
        let e: ExperienceLevel = serde_json::from_str("\" Advanced \"").unwrap();
        assert_eq!(e, ExperienceLevel::Advanced);
        assert!(ExperienceLevel::Intermediate.restricts_stocks());
        assert!(!ExperienceLevel::Advanced.restricts_stocks());
    }

    #[test]
    fn test_minimal_profile_json_defaults() {
        let p: UserProfile = serde_json::from_str(r#"{"risk_tolerance": "Medium"}"#).unwrap();
        assert_eq!(p.investment_experience, ExperienceLevel::Beginner);
        assert_eq!(p.inflation_rate, 6.0);
        assert_eq!(p.horizon_months(date(2026, 1, 1)), DEFAULT_HORIZON_MONTHS);
    }

    #[test]
    fn test_explicit_horizon_wins_over_goal_date() {
        let mut p = UserProfile::new(RiskTolerance::Low, 24, ExperienceLevel::Beginner);
        p.goal_date = Some(date(2036, 1, 1));
        assert_eq!(p.horizon_months(date(2026, 1, 1)), 24);
    }

    #[test]
    fn test_horizon_derived_from_goal_date() {
        let mut p = UserProfile::new(RiskTolerance::Low, 0, ExperienceLevel::Beginner);
        p.time_horizon_months = None;
        p.goal_date = Some(date(2028, 3, 15));
        assert_eq!(p.horizon_months(date(2026, 1, 20)), 25);
    }

    #[test]
    fn test_horizon_never_below_one_month() {
        let mut p = UserProfile::new(RiskTolerance::Low, 0, ExperienceLevel::Beginner);
        p.goal_date = Some(date(2026, 1, 10));
        assert_eq!(p.horizon_months(date(2026, 1, 1)), 1);
    }

    #[test]
    fn test_horizon_bands() {
        assert_eq!(HorizonBand::from_months(1), HorizonBand::Short);
        assert_eq!(HorizonBand::from_months(36), HorizonBand::Short);
        assert_eq!(HorizonBand::from_months(37), HorizonBand::Medium);
        assert_eq!(HorizonBand::from_months(84), HorizonBand::Medium);
        assert_eq!(HorizonBand::from_months(85), HorizonBand::Long);
    }

    #[test]
    fn test_validation_negative_money() {
        let mut p = UserProfile::new(RiskTolerance::Low, 24, ExperienceLevel::Beginner);
        p.goal_amount = dec!(-1);
        assert!(p.validate(date(2026, 1, 1)).is_err());
    }

    #[test]
    fn test_validation_goal_in_past() {
        let mut p = UserProfile::new(RiskTolerance::Low, 0, ExperienceLevel::Beginner);
        p.goal_date = Some(date(2020, 1, 1));
        assert!(p.validate(date(2026, 1, 1)).is_err());
    }

    #[test]
    fn test_validation_inflation_range() {
        let mut p = UserProfile::new(RiskTolerance::Low, 24, ExperienceLevel::Beginner);
        p.inflation_rate = f64::NAN;
        assert!(p.validate(date(2026, 1, 1)).is_err());
    }

    #[test]
    fn test_months_between() {
        assert_eq!(months_between(date(2026, 1, 31), date(2026, 2, 28)), 0);
        assert_eq!(months_between(date(2026, 1, 1), date(2027, 1, 1)), 12);
        assert_eq!(months_between(date(2027, 1, 1), date(2026, 1, 1)), 0);
    }
}
