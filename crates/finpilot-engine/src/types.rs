use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Annualized percentage (7.0 = 7%). Instrument returns and volatilities
/// arrive from the market-data feed in this form.
pub type Percent = f64;

/// Fraction of a portfolio in [0, 1].
pub type Weight = f64;

/// Tolerance used when checking that a set of weights sums to one.
pub const WEIGHT_EPSILON: f64 = 1e-6;

/// Market regime applied to a growth simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketScenario {
    Normal,
    Crash,
    Boom,
}

impl MarketScenario {
    pub const ALL: [MarketScenario; 3] = [
        MarketScenario::Normal,
        MarketScenario::Crash,
        MarketScenario::Boom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MarketScenario::Normal => "normal",
            MarketScenario::Crash => "crash",
            MarketScenario::Boom => "boom",
        }
    }
}

impl std::str::FromStr for MarketScenario {
    type Err = crate::error::EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(MarketScenario::Normal),
            "crash" => Ok(MarketScenario::Crash),
            "boom" => Ok(MarketScenario::Boom),
            other => Err(crate::error::EngineError::UnknownScenario(other.to_string())),
        }
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "ieee754_f64".to_string(),
        },
    }
}

/// Scale `weights` in place so they sum to one. Returns the pre-normalization
/// total, or `None` when the total is zero or not finite (weights untouched).
pub fn normalize_weights(weights: &mut [Weight]) -> Option<f64> {
    let total: f64 = weights.iter().sum();
    if !total.is_finite() || total <= 0.0 {
        return None;
    }
    for w in weights.iter_mut() {
        *w /= total;
    }
    Some(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_weights_sums_to_one() {
        let mut w = vec![0.6, 0.3];
        let total = normalize_weights(&mut w).unwrap();
        assert!((total - 0.9).abs() < 1e-12);
        assert!((w.iter().sum::<f64>() - 1.0).abs() < WEIGHT_EPSILON);
        assert!((w[0] - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_normalize_weights_rejects_zero_total() {
        let mut w = vec![0.0, 0.0];
        assert!(normalize_weights(&mut w).is_none());
        assert_eq!(w, vec![0.0, 0.0]);
    }

    #[test]
    fn test_scenario_parse_is_case_insensitive() {
        assert_eq!("CRASH".parse::<MarketScenario>().unwrap(), MarketScenario::Crash);
        assert!("sideways".parse::<MarketScenario>().is_err());
    }

    #[test]
    fn test_with_metadata_precision() {
        let out = with_metadata("x", &serde_json::json!({}), vec![], 0, 1.0_f64);
        assert_eq!(out.metadata.precision, "ieee754_f64");
    }
}
