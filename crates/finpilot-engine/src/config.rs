use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::types::MarketScenario;
use crate::EngineResult;

/// Ten years of weekly steps.
pub const MAX_SIMULATION_WEEKS: u32 = 520;
/// Paths per scenario; each path keeps one f64 per week in flight.
pub const MAX_SIMULATIONS: u32 = 100_000;

/// Tunables for one recommendation run. Every field has a default, so an
/// empty JSON object is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Annual risk-free rate as a decimal (0.05 = 5%), used for Sharpe.
    pub risk_free_rate: f64,
    /// Maximum number of instruments taken from each bucket.
    pub max_per_bucket: usize,
    /// Growth simulation length in weeks.
    pub simulation_weeks: u32,
    /// Monte Carlo paths per scenario.
    pub num_simulations: u32,
    pub scenarios: Vec<MarketScenario>,
    /// Seed for the simulator. `None` draws from OS entropy.
    pub seed: Option<u64>,
    /// Per-holding drift threshold for drift alerts.
    pub drift_threshold: f64,
    /// Asset-class drift threshold for rebalance suggestions.
    pub rebalance_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.05,
            max_per_bucket: 3,
            simulation_weeks: 52,
            num_simulations: 1000,
            scenarios: MarketScenario::ALL.to_vec(),
            seed: None,
            drift_threshold: 0.15,
            rebalance_threshold: 0.10,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> EngineResult<()> {
        if !self.risk_free_rate.is_finite() {
            return Err(EngineError::invalid("risk_free_rate", "must be finite"));
        }
        if self.max_per_bucket == 0 {
            return Err(EngineError::invalid("max_per_bucket", "must be at least 1"));
        }
        if !(1..=MAX_SIMULATION_WEEKS).contains(&self.simulation_weeks) {
            return Err(EngineError::invalid(
                "simulation_weeks",
                format!("must be between 1 and {MAX_SIMULATION_WEEKS}"),
            ));
        }
        if !(1..=MAX_SIMULATIONS).contains(&self.num_simulations) {
            return Err(EngineError::invalid(
                "num_simulations",
                format!("must be between 1 and {MAX_SIMULATIONS}"),
            ));
        }
        if self.scenarios.is_empty() {
            return Err(EngineError::invalid("scenarios", "at least one scenario is required"));
        }
        for (field, value) in [
            ("drift_threshold", self.drift_threshold),
            ("rebalance_threshold", self.rebalance_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(EngineError::invalid(field, "must be a non-negative number"));
            }
        }
        Ok(())
    }
}
