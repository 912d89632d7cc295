use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Money, Percent};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The three instrument buckets the market-data feed supplies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentKind {
    MutualFund,
    Stock,
    FixedDeposit,
}

impl InstrumentKind {
    /// Bucket order used by the allocator.
    pub const ALL: [InstrumentKind; 3] = [
        InstrumentKind::MutualFund,
        InstrumentKind::Stock,
        InstrumentKind::FixedDeposit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InstrumentKind::MutualFund => "mutual_fund",
            InstrumentKind::Stock => "stock",
            InstrumentKind::FixedDeposit => "fixed_deposit",
        }
    }

    /// Fund and stock holdings can be sold on any trading day.
    pub fn is_liquid(&self) -> bool {
        matches!(self, InstrumentKind::MutualFund | InstrumentKind::Stock)
    }
}

/// Qualitative liquidity when no redemption period is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiquidityTier {
    High,
    Medium,
    Low,
}

/// Liquidity as a redemption/lock-in period in days, or a qualitative tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Liquidity {
    Days(u32),
    Tier(LiquidityTier),
}

/// Term assumed for a deposit quoted without a period.
pub const DEFAULT_DEPOSIT_TERM_MONTHS: u32 = 12;

/// Coarse asset type used for correlation lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    Equity,
    Debt,
    FixedDeposit,
}

impl AssetType {
    /// Fixed pairwise correlation between asset types. Symmetric.
    pub fn correlation(self, other: AssetType) -> f64 {
        use AssetType::*;
        match (self, other) {
            (Equity, Equity) | (Debt, Debt) | (FixedDeposit, FixedDeposit) => 1.0,
            (Equity, Debt) | (Debt, Equity) => -0.2,
            (Equity, FixedDeposit) | (FixedDeposit, Equity) => 0.0,
            (Debt, FixedDeposit) | (FixedDeposit, Debt) => 0.1,
        }
    }
}

/// A candidate instrument as supplied by the market-data feed. Read-only to
/// the engine; scoring and allocation annotate copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: InstrumentKind,
    /// Free-text classification, e.g. "Equity Scheme - Large Cap Fund".
    #[serde(default)]
    pub category: String,
    /// Annualized return in percent. For deposits, the quoted rate.
    #[serde(default)]
    pub expected_return: Option<Percent>,
    /// Annualized volatility in percent.
    #[serde(default)]
    pub risk: Option<Percent>,
    /// Market capitalisation (stocks only).
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub min_investment: Money,
    #[serde(default)]
    pub liquidity: Option<Liquidity>,
}

impl Instrument {
    pub fn new(name: impl Into<String>, kind: InstrumentKind) -> Self {
        Self {
            name: name.into(),
            kind,
            category: String::new(),
            expected_return: None,
            risk: None,
            market_cap: None,
            min_investment: Decimal::ZERO,
            liquidity: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_return(mut self, expected_return: Percent) -> Self {
        self.expected_return = Some(expected_return);
        self
    }

    pub fn with_risk(mut self, risk: Percent) -> Self {
        self.risk = Some(risk);
        self
    }

    pub fn with_market_cap(mut self, market_cap: f64) -> Self {
        self.market_cap = Some(market_cap);
        self
    }

    pub fn with_liquidity(mut self, liquidity: Liquidity) -> Self {
        self.liquidity = Some(liquidity);
        self
    }

    pub fn with_min_investment(mut self, min_investment: Money) -> Self {
        self.min_investment = min_investment;
        self
    }

    /// Lock-in term in months, rounded up from days.
    pub fn term_months(&self) -> u32 {
        match self.liquidity {
            Some(Liquidity::Days(days)) => days.div_ceil(30),
            _ => DEFAULT_DEPOSIT_TERM_MONTHS,
        }
    }

    pub fn category_lower(&self) -> String {
        self.category.to_lowercase()
    }

    /// Asset type for correlation purposes. Funds without a category are
    /// treated as equity; hybrid and other funds as debt.
    pub fn asset_type(&self) -> AssetType {
        match self.kind {
            InstrumentKind::FixedDeposit => AssetType::FixedDeposit,
            InstrumentKind::Stock => AssetType::Equity,
            InstrumentKind::MutualFund => {
                let category = self.category_lower();
                if category.is_empty() || category.contains("equity") {
                    AssetType::Equity
                } else {
                    AssetType::Debt
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Candidate instruments grouped into the three typed buckets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentCatalog {
    pub mutual_funds: Vec<Instrument>,
    pub stocks: Vec<Instrument>,
    pub fixed_deposits: Vec<Instrument>,
}

impl InstrumentCatalog {
    /// Group a flat instrument list by kind, keeping input order.
    pub fn from_instruments(instruments: impl IntoIterator<Item = Instrument>) -> Self {
        let mut catalog = InstrumentCatalog::default();
        for inst in instruments {
            catalog.bucket_mut(inst.kind).push(inst);
        }
        catalog
    }

    pub fn bucket(&self, kind: InstrumentKind) -> &[Instrument] {
        match kind {
            InstrumentKind::MutualFund => &self.mutual_funds,
            InstrumentKind::Stock => &self.stocks,
            InstrumentKind::FixedDeposit => &self.fixed_deposits,
        }
    }

    fn bucket_mut(&mut self, kind: InstrumentKind) -> &mut Vec<Instrument> {
        match kind {
            InstrumentKind::MutualFund => &mut self.mutual_funds,
            InstrumentKind::Stock => &mut self.stocks,
            InstrumentKind::FixedDeposit => &mut self.fixed_deposits,
        }
    }

    pub fn len(&self) -> usize {
        self.mutual_funds.len() + self.stocks.len() + self.fixed_deposits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate every instrument in bucket order.
    pub fn iter(&self) -> impl Iterator<Item = &Instrument> {
        self.mutual_funds
            .iter()
            .chain(self.stocks.iter())
            .chain(self.fixed_deposits.iter())
    }

    /// Validate the catalog once at ingestion. Returns a cleaned copy and one
    /// warning per dropped or coerced field:
    /// - unnamed and duplicate-named instruments are dropped
    /// - an instrument filed under the wrong bucket takes the bucket's kind
    /// - non-finite returns, negative or non-finite risk and negative market
    ///   caps become missing
    pub fn sanitize(&self) -> (InstrumentCatalog, Vec<String>) {
        let mut warnings = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut clean = InstrumentCatalog::default();

        for kind in InstrumentKind::ALL {
            for inst in self.bucket(kind) {
                let name = inst.name.trim();
                if name.is_empty() {
                    warnings.push(format!("Dropped unnamed {} instrument", kind.as_str()));
                    continue;
                }
                if !seen.insert(name.to_string()) {
                    warnings.push(format!("Dropped duplicate instrument '{name}'"));
                    continue;
                }

                let mut inst = inst.clone();
                inst.name = name.to_string();
                if inst.kind != kind {
                    warnings.push(format!(
                        "'{}' declared as {} but listed under {}; treating as {}",
                        inst.name,
                        inst.kind.as_str(),
                        kind.as_str(),
                        kind.as_str()
                    ));
                    inst.kind = kind;
                }
                if matches!(inst.expected_return, Some(r) if !r.is_finite()) {
                    warnings.push(format!("'{}' has a non-finite return; ignoring it", inst.name));
                    inst.expected_return = None;
                }
                if matches!(inst.risk, Some(r) if !r.is_finite() || r < 0.0) {
                    warnings.push(format!("'{}' has an invalid risk figure; ignoring it", inst.name));
                    inst.risk = None;
                }
                if matches!(inst.market_cap, Some(c) if !c.is_finite() || c < 0.0) {
                    warnings.push(format!("'{}' has an invalid market cap; ignoring it", inst.name));
                    inst.market_cap = None;
                }
                clean.bucket_mut(kind).push(inst);
            }
        }

        (clean, warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correlation_table_symmetric() {
        let types = [AssetType::Equity, AssetType::Debt, AssetType::FixedDeposit];
        for a in types {
            for b in types {
                assert_eq!(a.correlation(b), b.correlation(a));
            }
        }
        assert_eq!(AssetType::Equity.correlation(AssetType::Debt), -0.2);
        assert_eq!(AssetType::Debt.correlation(AssetType::FixedDeposit), 0.1);
    }

    #[test]
    fn test_liquidity_untagged_json() {
        let days: Liquidity = serde_json::from_str("365").unwrap();
        let tier: Liquidity = serde_json::from_str("\"High\"").unwrap();
        assert_eq!(days, Liquidity::Days(365));
        assert_eq!(tier, Liquidity::Tier(LiquidityTier::High));
    }

    #[test]
    fn test_term_months_rounds_up() {
        let fd = Instrument::new("FD", InstrumentKind::FixedDeposit).with_liquidity(Liquidity::Days(400));
        assert_eq!(fd.term_months(), 14);
        let plain = Instrument::new("FD2", InstrumentKind::FixedDeposit);
        assert_eq!(plain.term_months(), DEFAULT_DEPOSIT_TERM_MONTHS);
    }

    #[test]
    fn test_fund_asset_type_from_category() {
        let eq = Instrument::new("A", InstrumentKind::MutualFund)
            .with_category("Equity Scheme - Large Cap Fund");
        let debt = Instrument::new("B", InstrumentKind::MutualFund)
            .with_category("Debt Scheme - Banking and PSU Fund");
        let hybrid = Instrument::new("C", InstrumentKind::MutualFund)
            .with_category("Hybrid Scheme - Balanced Advantage Fund");
        let unknown = Instrument::new("D", InstrumentKind::MutualFund);
        assert_eq!(eq.asset_type(), AssetType::Equity);
        assert_eq!(debt.asset_type(), AssetType::Debt);
        assert_eq!(hybrid.asset_type(), AssetType::Debt);
        assert_eq!(unknown.asset_type(), AssetType::Equity);
    }

    #[test]
    fn test_catalog_from_instruments_groups_by_kind() {
        let catalog = InstrumentCatalog::from_instruments(vec![
            Instrument::new("S1", InstrumentKind::Stock),
            Instrument::new("F1", InstrumentKind::MutualFund),
            Instrument::new("S2", InstrumentKind::Stock),
        ]);
        assert_eq!(catalog.stocks.len(), 2);
        assert_eq!(catalog.mutual_funds.len(), 1);
        assert_eq!(catalog.stocks[1].name, "S2");
    }

    #[test]
    fn test_sanitize_drops_and_coerces() {
        let mut catalog = InstrumentCatalog::default();
        catalog.mutual_funds.push(Instrument::new("  ", InstrumentKind::MutualFund));
        catalog.mutual_funds.push(Instrument::new("Fund", InstrumentKind::MutualFund).with_risk(-3.0));
        catalog.stocks.push(Instrument::new("Fund", InstrumentKind::Stock));
        catalog
            .stocks
            .push(Instrument::new("Misfiled", InstrumentKind::FixedDeposit).with_return(f64::NAN));

        let (clean, warnings) = catalog.sanitize();
        assert_eq!(clean.mutual_funds.len(), 1);
        assert_eq!(clean.mutual_funds[0].risk, None);
        assert_eq!(clean.stocks.len(), 1);
        assert_eq!(clean.stocks[0].kind, InstrumentKind::Stock);
        assert_eq!(clean.stocks[0].expected_return, None);
        assert_eq!(warnings.len(), 5);
    }
}
