//! Explorer module: portfolio and transaction history lookups.

use super::ApiClient;
use crate::error::Result;
use ethers::types::Address;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioEntry {
    pub token: Address,
    pub symbol: String,
    /// Base-unit balance as a decimal string.
    pub balance: String,
    #[serde(default)]
    pub usd_value: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub hash: String,
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<u64>,
}

pub async fn get_portfolio(api: &ApiClient, owner: Address) -> Result<Vec<PortfolioEntry>> {
    api.get(
        "explorer",
        "/v2/explorer/portfolio",
        &[("address", format!("{owner:?}"))],
    )
    .await
}

pub async fn get_transactions(api: &ApiClient, owner: Address) -> Result<Vec<TransactionRecord>> {
    api.get(
        "explorer",
        "/v2/explorer/transactions",
        &[("address", format!("{owner:?}"))],
    )
    .await
}
