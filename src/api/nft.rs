//! NFT module: listing of tokens held by an address.

use super::ApiClient;
use crate::error::Result;
use ethers::types::Address;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NftItem {
    pub contract_address: Address,
    pub token_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

pub async fn list(api: &ApiClient, owner: Address) -> Result<Vec<NftItem>> {
    api.get("nft", "/v2/nft/list", &[("address", format!("{owner:?}"))])
        .await
}
