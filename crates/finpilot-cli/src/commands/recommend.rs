use chrono::NaiveDate;
use clap::Args;
use serde::Deserialize;
use serde_json::Value;

use finpilot_engine::config::EngineConfig;
use finpilot_engine::profile::UserProfile;
use finpilot_engine::recommender::collaborative::{
    recommend_collaborative, InvestorTraits, PeerPortfolio, DEFAULT_TOP_N,
};
use finpilot_engine::recommender::orchestrator::{recommend_request, RecommendationRequest};

use crate::input;

/// Arguments for a full recommendation
#[derive(Args)]
pub struct RecommendArgs {
    /// Path to JSON input file ({profile, catalog, revised_portfolio?, as_of?})
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for peer-based fund picks
#[derive(Args)]
pub struct PeersArgs {
    /// Path to JSON input file ({profile | traits, peers, as_of?})
    #[arg(long)]
    pub input: Option<String>,
    /// Number of funds to return
    #[arg(long, default_value_t = DEFAULT_TOP_N)]
    pub top: usize,
}

#[derive(Deserialize)]
struct PeersRequest {
    #[serde(default)]
    profile: Option<UserProfile>,
    #[serde(default)]
    traits: Option<InvestorTraits>,
    peers: Vec<PeerPortfolio>,
    #[serde(default)]
    as_of: Option<NaiveDate>,
}

pub fn run_recommend(args: RecommendArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let request: RecommendationRequest = input::load(args.input.as_deref(), "recommend")?;
    let result = recommend_request(&request, config, super::today());
    Ok(serde_json::to_value(result)?)
}

pub fn run_peers(args: PeersArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let req: PeersRequest = input::load(args.input.as_deref(), "peers")?;
    let as_of = req.as_of.unwrap_or_else(super::today);
    let traits = match (req.traits, &req.profile) {
        (Some(t), _) => t,
        (None, Some(profile)) => InvestorTraits::from_profile(profile, as_of),
        (None, None) => return Err("peers request needs either `profile` or `traits`".into()),
    };
    let picks = recommend_collaborative(&traits, &req.peers, args.top)?;
    Ok(serde_json::json!({
        "traits": traits,
        "peer_count": req.peers.len(),
        "portfolio": picks,
    }))
}
