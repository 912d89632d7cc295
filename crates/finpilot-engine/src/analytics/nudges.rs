use log::debug;

use super::metrics::PortfolioMetrics;
use crate::allocation::allocator::AllocatedInstrument;
use crate::instrument::InstrumentKind;
use crate::profile::{HorizonBand, RiskTolerance};

/// Said when no rule fires.
pub const DEFAULT_NUDGES: [&str; 3] = [
    "Consider increasing your equity exposure for better long-term returns",
    "Your portfolio is well-diversified across different asset classes",
    "Regular investments can help you achieve your financial goals faster",
];

/// Allocation held in equity-like instruments (funds and stocks), and in
/// deposits.
pub fn exposures(portfolio: &[AllocatedInstrument]) -> (f64, f64) {
    portfolio.iter().fold((0.0, 0.0), |(eq, fd), h| match h.kind() {
        InstrumentKind::FixedDeposit => (eq, fd + h.allocation),
        _ => (eq + h.allocation, fd),
    })
}

/// Advisory messages derived from composition, metrics and horizon.
pub fn generate_nudges(
    portfolio: &[AllocatedInstrument],
    metrics: &PortfolioMetrics,
    tolerance: RiskTolerance,
    horizon_months: u32,
) -> Vec<String> {
    let (equity, deposits) = exposures(portfolio);
    let mut nudges = Vec::new();

    if equity > 0.7 {
        nudges.push("Consider reducing equity exposure to manage risk better");
    } else if equity < 0.3 && tolerance == RiskTolerance::High {
        nudges.push("Consider increasing equity exposure for better growth potential");
    }
    if deposits > 0.5 {
        nudges.push("Consider diversifying into other asset classes for better returns");
    }
    if metrics.sharpe_ratio < 1.0 {
        nudges.push("Portfolio risk-adjusted returns could be improved");
    }
    if metrics.var_95 < -10.0 {
        nudges.push("Portfolio has high downside risk, consider adding defensive assets");
    }
    match HorizonBand::from_months(horizon_months) {
        HorizonBand::Long if equity < 0.5 => {
            nudges.push("For long-term goals, consider increasing equity allocation")
        }
        HorizonBand::Short if equity > 0.3 => {
            nudges.push("For short-term goals, consider reducing equity exposure")
        }
        _ => {}
    }

    debug!(
        "nudges: equity={equity:.2} deposits={deposits:.2} fired={}",
        nudges.len()
    );
    if nudges.is_empty() {
        return DEFAULT_NUDGES.iter().map(|s| s.to_string()).collect();
    }
    nudges.into_iter().map(String::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::scorer::ScoredInstrument;
    use crate::analytics::metrics::Rating;
    use crate::instrument::Instrument;

    fn held(kind: InstrumentKind, allocation: f64) -> AllocatedInstrument {
        AllocatedInstrument {
            scored: ScoredInstrument::new(Instrument::new("X", kind), 0.0),
            fit_multiplier: 1.0,
            adjusted_score: 0.0,
            allocation,
        }
    }

    fn calm_metrics() -> PortfolioMetrics {
        PortfolioMetrics {
            expected_return: 12.0,
            risk: 4.0,
            sharpe_ratio: 1.75,
            var_95: 5.4,
            expected_shortfall: 3.7,
            diversification_score: Rating::Medium,
            liquidity_score: Rating::Medium,
        }
    }

    #[test]
    fn test_heavy_equity_short_horizon() {
        let p = vec![held(InstrumentKind::Stock, 0.8), held(InstrumentKind::FixedDeposit, 0.2)];
        let n = generate_nudges(&p, &calm_metrics(), RiskTolerance::Medium, 24);
        assert_eq!(
            n,
            vec![
                "Consider reducing equity exposure to manage risk better".to_string(),
                "For short-term goals, consider reducing equity exposure".to_string(),
            ]
        );
    }

    #[test]
    fn test_deposit_heavy_high_tolerance() {
        let p = vec![held(InstrumentKind::FixedDeposit, 0.8), held(InstrumentKind::MutualFund, 0.2)];
        let mut m = calm_metrics();
        m.sharpe_ratio = 0.4;
        m.var_95 = -12.0;
        let n = generate_nudges(&p, &m, RiskTolerance::High, 120);
        assert_eq!(n.len(), 5);
        assert!(n[0].contains("increasing equity exposure"));
        assert!(n.iter().any(|s| s.contains("defensive assets")));
    }

    #[test]
    fn test_defaults_when_nothing_fires() {
        let p = vec![held(InstrumentKind::MutualFund, 0.5), held(InstrumentKind::FixedDeposit, 0.5)];
        let n = generate_nudges(&p, &calm_metrics(), RiskTolerance::Medium, 60);
        assert_eq!(n.len(), 3);
        assert_eq!(n[0], DEFAULT_NUDGES[0]);
    }
}
