//! Hand-authored portfolios returned when allocation cannot produce one.

use rust_decimal_macros::dec;

use super::allocator::{enforce_experience_limits, renormalize, AllocatedInstrument};
use super::scorer::ScoredInstrument;
use crate::instrument::{Instrument, InstrumentKind, Liquidity};
use crate::profile::{ExperienceLevel, HorizonBand, RiskTolerance};

fn sbi_fixed_deposit() -> Instrument {
    Instrument::new("SBI Fixed Deposit", InstrumentKind::FixedDeposit)
        .with_category("Fixed Deposit")
        .with_return(7.0)
        .with_liquidity(Liquidity::Days(360))
        .with_min_investment(dec!(1000))
}

fn hdfc_banking_psu_debt() -> Instrument {
    Instrument::new("HDFC Banking and PSU Debt Fund", InstrumentKind::MutualFund)
        .with_category("Debt Scheme - Banking and PSU Fund")
        .with_min_investment(dec!(500))
}

fn hdfc_balanced_advantage() -> Instrument {
    Instrument::new("HDFC Balanced Advantage Fund", InstrumentKind::MutualFund)
        .with_category("Hybrid Scheme - Balanced Fund")
        .with_min_investment(dec!(500))
}

fn hdfc_top_100() -> Instrument {
    Instrument::new("HDFC Top 100 Fund", InstrumentKind::MutualFund)
        .with_category("Equity Scheme - Large Cap Fund")
        .with_min_investment(dec!(500))
}

fn sbi_bluechip() -> Instrument {
    Instrument::new("SBI Bluechip Fund", InstrumentKind::MutualFund)
        .with_category("Equity Scheme - Large Cap Fund")
        .with_min_investment(dec!(500))
}

fn reliance_industries() -> Instrument {
    Instrument::new("Reliance Industries", InstrumentKind::Stock)
        .with_category("Energy")
        .with_market_cap(1e9)
}

fn holding(instrument: Instrument, allocation: f64) -> AllocatedInstrument {
    AllocatedInstrument {
        scored: ScoredInstrument::new(instrument, 0.0),
        fit_multiplier: 1.0,
        adjusted_score: 0.0,
        allocation,
    }
}

fn finish(mut portfolio: Vec<AllocatedInstrument>, experience: ExperienceLevel) -> Vec<AllocatedInstrument> {
    enforce_experience_limits(&mut portfolio, experience);
    renormalize(&mut portfolio);
    portfolio
}

/// Static portfolio for an investor tier, used when no catalog instrument
/// survives filtering or allocation fails. Stocks are removed for
/// beginner and intermediate investors; allocations always sum to one.
pub fn fallback_portfolio(
    band: HorizonBand,
    tolerance: RiskTolerance,
    experience: ExperienceLevel,
) -> Vec<AllocatedInstrument> {
    let portfolio = match (band, tolerance) {
        (HorizonBand::Short, _) => vec![
            holding(sbi_fixed_deposit(), 0.6),
            holding(hdfc_banking_psu_debt(), 0.4),
        ],
        (HorizonBand::Medium, RiskTolerance::Low) => vec![
            holding(sbi_fixed_deposit(), 0.4),
            holding(hdfc_balanced_advantage(), 0.5),
            holding(reliance_industries(), 0.1),
        ],
        (HorizonBand::Medium, _) => vec![
            holding(sbi_fixed_deposit(), 0.2),
            holding(hdfc_balanced_advantage(), 0.5),
            holding(reliance_industries(), 0.3),
        ],
        (HorizonBand::Long, RiskTolerance::Low) => vec![
            holding(hdfc_top_100(), 0.7),
            holding(reliance_industries(), 0.3),
        ],
        (HorizonBand::Long, _) => vec![
            holding(hdfc_top_100(), 0.5),
            holding(reliance_industries(), 0.5),
        ],
    };
    finish(portfolio, experience)
}

/// Portfolio of the whole-engine static recommendation. Keyed by experience
/// first: every beginner and intermediate investor gets the same
/// deposit-heavy mix.
pub fn static_bundle_portfolio(
    tolerance: RiskTolerance,
    experience: ExperienceLevel,
) -> Vec<AllocatedInstrument> {
    let portfolio = if experience.restricts_stocks() {
        vec![
            holding(sbi_fixed_deposit(), 0.6),
            holding(sbi_bluechip(), 0.3),
        ]
    } else {
        let (fd, mf, st) = match tolerance {
            RiskTolerance::Low => (0.6, 0.3, 0.1),
            RiskTolerance::Medium => (0.4, 0.4, 0.2),
            RiskTolerance::High => (0.2, 0.4, 0.4),
        };
        vec![
            holding(sbi_fixed_deposit(), fd),
            holding(sbi_bluechip(), mf),
            holding(reliance_industries(), st),
        ]
    };
    finish(portfolio, experience)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WEIGHT_EPSILON;

    const BANDS: [HorizonBand; 3] = [HorizonBand::Short, HorizonBand::Medium, HorizonBand::Long];
    const TOLERANCES: [RiskTolerance; 3] =
        [RiskTolerance::Low, RiskTolerance::Medium, RiskTolerance::High];
    const LEVELS: [ExperienceLevel; 3] = [
        ExperienceLevel::Beginner,
        ExperienceLevel::Intermediate,
        ExperienceLevel::Advanced,
    ];

    #[test]
    fn test_every_tier_sums_to_one_and_respects_experience() {
        for band in BANDS {
            for tol in TOLERANCES {
                for exp in LEVELS {
                    let p = fallback_portfolio(band, tol, exp);
                    assert!(!p.is_empty(), "{band:?}/{tol}/{exp}");
                    let total: f64 = p.iter().map(|h| h.allocation).sum();
                    assert!((total - 1.0).abs() < WEIGHT_EPSILON);
                    if exp.restricts_stocks() {
                        assert!(p.iter().all(|h| h.kind() != InstrumentKind::Stock));
                    }
                }
            }
        }
    }

    #[test]
    fn test_long_beginner_is_all_equity_fund() {
        let p = fallback_portfolio(HorizonBand::Long, RiskTolerance::High, ExperienceLevel::Beginner);
        assert_eq!(p.len(), 1);
        assert_eq!(p[0].name(), "HDFC Top 100 Fund");
        assert!((p[0].allocation - 1.0).abs() < WEIGHT_EPSILON);
    }

    #[test]
    fn test_static_bundle_beginner_renormalized() {
        let p = static_bundle_portfolio(RiskTolerance::High, ExperienceLevel::Beginner);
        assert_eq!(p.len(), 2);
        assert!((p[0].allocation - 2.0 / 3.0).abs() < 1e-9);
        assert!((p[1].allocation - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_static_bundle_advanced_high() {
        let p = static_bundle_portfolio(RiskTolerance::High, ExperienceLevel::Advanced);
        let weights: Vec<f64> = p.iter().map(|h| h.allocation).collect();
        assert_eq!(p[2].kind(), InstrumentKind::Stock);
        assert!((weights[0] - 0.2).abs() < 1e-9);
        assert!((weights[2] - 0.4).abs() < 1e-9);
    }
}
