use std::collections::HashMap;

use chrono::NaiveDate;
use log::{debug, warn};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::profile::{RiskTolerance, UserProfile};
use crate::EngineResult;

pub const DEFAULT_TOP_N: usize = 3;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The traits investors are compared on. `risk` is in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InvestorTraits {
    pub risk: f64,
    /// Monthly investable income.
    pub income: f64,
    pub timeline_months: f64,
}

impl InvestorTraits {
    /// Low, Medium and High tolerance map to risk 0.0, 0.5 and 1.0; income is
    /// the profile's monthly investment.
    pub fn from_profile(profile: &UserProfile, as_of: NaiveDate) -> Self {
        let risk = match profile.risk_tolerance {
            RiskTolerance::Low => 0.0,
            RiskTolerance::Medium => 0.5,
            RiskTolerance::High => 1.0,
        };
        Self {
            risk,
            income: profile.monthly_investment.to_f64().unwrap_or(0.0),
            timeline_months: f64::from(profile.horizon_months(as_of)),
        }
    }

    fn validate(&self, field: &str) -> EngineResult<()> {
        if !(0.0..=1.0).contains(&self.risk) {
            return Err(EngineError::invalid(field, "risk must be in [0, 1]"));
        }
        if !self.income.is_finite() || self.income < 0.0 {
            return Err(EngineError::invalid(field, "income must be non-negative"));
        }
        if !self.timeline_months.is_finite() || self.timeline_months < 0.0 {
            return Err(EngineError::invalid(field, "timeline must be non-negative"));
        }
        Ok(())
    }
}

/// Another investor and the funds they hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerPortfolio {
    #[serde(flatten)]
    pub traits: InvestorTraits,
    pub invested_funds: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundVote {
    pub name: String,
    /// Sum of the similarities of the peers holding the fund.
    pub score: f64,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Mean of the risk, income and timeline closeness of `peer` to `user`.
/// Income and timeline gaps are relative to the user's value (at least 1),
/// so a distant peer can score below zero.
pub fn similarity(user: &InvestorTraits, peer: &InvestorTraits) -> f64 {
    let risk = 1.0 - (user.risk - peer.risk).abs();
    let income = 1.0 - (user.income - peer.income).abs() / user.income.max(1.0);
    let time = 1.0 - (user.timeline_months - peer.timeline_months).abs() / user.timeline_months.max(1.0);
    (risk + income + time) / 3.0
}

/// Funds most held by similar investors. Each peer adds its similarity to
/// every distinct fund it holds. The `top_n` highest totals are returned;
/// ties keep the order in which funds were first seen. Invalid peers are
/// skipped.
pub fn recommend_collaborative(
    user: &InvestorTraits,
    peers: &[PeerPortfolio],
    top_n: usize,
) -> EngineResult<Vec<FundVote>> {
    user.validate("user")?;

    let mut votes: Vec<FundVote> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for (i, peer) in peers.iter().enumerate() {
        if let Err(e) = peer.traits.validate("peer") {
            warn!("collaborative: skipping peer {i}: {e}");
            continue;
        }
        let sim = similarity(user, &peer.traits);
        debug!("collaborative: peer {i} similarity {sim:.3}");

        let mut seen: Vec<&str> = Vec::with_capacity(peer.invested_funds.len());
        for fund in &peer.invested_funds {
            let fund = fund.trim();
            if fund.is_empty() || seen.contains(&fund) {
                continue;
            }
            seen.push(fund);
            match index.get(fund) {
                Some(&slot) => votes[slot].score += sim,
                None => {
                    index.insert(fund.to_string(), votes.len());
                    votes.push(FundVote {
                        name: fund.to_string(),
                        score: sim,
                    });
                }
            }
        }
    }

    votes.sort_by(|a, b| b.score.total_cmp(&a.score));
    votes.truncate(top_n);
    Ok(votes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::ExperienceLevel;
    use rust_decimal_macros::dec;

    fn traits(risk: f64, income: f64, timeline_months: f64) -> InvestorTraits {
        InvestorTraits {
            risk,
            income,
            timeline_months,
        }
    }

    fn peer(risk: f64, income: f64, timeline: f64, funds: &[&str]) -> PeerPortfolio {
        PeerPortfolio {
            traits: traits(risk, income, timeline),
            invested_funds: funds.iter().map(|f| f.to_string()).collect(),
        }
    }

    #[test]
    fn test_identical_peer_is_fully_similar() {
        let u = traits(0.5, 20000.0, 60.0);
        assert!((similarity(&u, &u) - 1.0).abs() < 1e-12);
        let far = traits(0.0, 60000.0, 180.0);
        // (0.5 + (1 - 2) + (1 - 2)) / 3
        assert!((similarity(&u, &far) + 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_votes_are_similarity_weighted() {
        let user = traits(0.5, 20000.0, 60.0);
        let peers = vec![
            peer(0.5, 20000.0, 60.0, &["Index Fund", "Gilt Fund"]),
            peer(0.5, 20000.0, 60.0, &["Index Fund"]),
            peer(1.0, 40000.0, 120.0, &["Small Cap Fund", "Small Cap Fund"]),
            peer(0.4, 22000.0, 66.0, &["Liquid Fund", "Gilt Fund"]),
        ];
        let picks = recommend_collaborative(&user, &peers, DEFAULT_TOP_N).unwrap();
        let names: Vec<_> = picks.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["Index Fund", "Gilt Fund", "Liquid Fund"]);
        assert!((picks[0].score - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_duplicate_holding_votes_once() {
        let user = traits(1.0, 40000.0, 120.0);
        let peers = vec![peer(1.0, 40000.0, 120.0, &["Small Cap Fund", "Small Cap Fund"])];
        let picks = recommend_collaborative(&user, &peers, 3).unwrap();
        assert_eq!(picks.len(), 1);
        assert!((picks[0].score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let user = traits(0.5, 0.0, 0.0);
        let peers = vec![peer(0.5, 0.0, 0.0, &["B Fund", "A Fund", "C Fund"])];
        let picks = recommend_collaborative(&user, &peers, 2).unwrap();
        let names: Vec<_> = picks.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["B Fund", "A Fund"]);
    }

    #[test]
    fn test_invalid_peers_are_skipped_and_invalid_user_rejected() {
        let user = traits(0.5, 1000.0, 12.0);
        let peers = vec![
            peer(f64::NAN, 1000.0, 12.0, &["Bad Fund"]),
            peer(0.5, 1000.0, 12.0, &["Good Fund"]),
        ];
        let picks = recommend_collaborative(&user, &peers, 3).unwrap();
        assert_eq!(picks.len(), 1);
        assert_eq!(picks[0].name, "Good Fund");

        assert!(recommend_collaborative(&traits(2.0, 0.0, 0.0), &peers, 3).is_err());
        assert!(recommend_collaborative(&user, &[], 3).unwrap().is_empty());
    }

    #[test]
    fn test_traits_from_profile() {
        let mut profile = UserProfile::new(RiskTolerance::High, 36, ExperienceLevel::Advanced);
        profile.monthly_investment = dec!(15000);
        let as_of = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let t = InvestorTraits::from_profile(&profile, as_of);
        assert_eq!(t, traits(1.0, 15000.0, 36.0));
    }

    #[test]
    fn test_peer_json_is_flat() {
        let raw = r#"{"risk": 0.2, "income": 50000, "timeline_months": 24, "invested_funds": ["Gilt Fund"]}"#;
        let p: PeerPortfolio = serde_json::from_str(raw).unwrap();
        assert_eq!(p.traits.timeline_months, 24.0);
        assert_eq!(p.invested_funds, vec!["Gilt Fund".to_string()]);
    }
}
