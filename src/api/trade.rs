//! Trade module: swap quotes resolved into an executable call plan.

use super::ApiClient;
use crate::error::Result;
use ethers::types::{Address, Bytes};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapQuoteRequest {
    pub from_token: Address,
    pub to_token: Address,
    /// Human-readable amount of the input token (e.g. "1.5").
    pub amount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slippage_bps: Option<u32>,
}

/// Call plan returned by the trade backend: the router to call and the
/// pre-encoded swap calldata.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapCallPlan {
    pub router: Address,
    pub call_data: Bytes,
    #[serde(default)]
    pub expected_out: Option<String>,
    #[serde(default)]
    pub price_impact_bps: Option<u32>,
}

pub async fn get_swap_quote(api: &ApiClient, req: &SwapQuoteRequest) -> Result<SwapCallPlan> {
    api.post("trade", "/v2/trade/quote", req).await
}
