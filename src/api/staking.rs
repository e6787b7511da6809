//! Staking module: APR lookups plus stake/unstake call plans.

use super::ApiClient;
use crate::error::Result;
use ethers::types::{Address, Bytes};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StakeRequest {
    pub token: Address,
    /// Human-readable amount (e.g. "100.25").
    pub amount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validator: Option<String>,
}

/// Call plan returned by the staking backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakingCallPlan {
    pub contract_address: Address,
    pub call_data: Bytes,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakingApr {
    pub token: Address,
    /// Annualized rate in basis points.
    pub apr_bps: u32,
}

pub async fn get_stake_call(api: &ApiClient, req: &StakeRequest) -> Result<StakingCallPlan> {
    api.post("staking", "/v2/staking/stake", req).await
}

pub async fn get_unstake_call(api: &ApiClient, req: &StakeRequest) -> Result<StakingCallPlan> {
    api.post("staking", "/v2/staking/unstake", req).await
}

pub async fn get_apr(api: &ApiClient, token: Address) -> Result<StakingApr> {
    api.get(
        "staking",
        "/v2/staking/apr",
        &[("token", format!("{token:?}"))],
    )
    .await
}
