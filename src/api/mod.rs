//! REST module clients for the platform backend.
//!
//! These are thin typed pass-throughs to an external HTTP API; business
//! failures surface as `SdkError::Module` values for the caller to branch on.

pub mod explorer;
pub mod nft;
pub mod staking;
pub mod trade;

use crate::error::{Result, SdkError};
use ethers::types::Address;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Shared HTTP client for the REST API: base URL, `apiKey` query parameter,
/// and the bearer token obtained from authentication.
pub struct ApiClient {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
    auth_token: Mutex<Option<String>>,
}

/// Standard response envelope used by every module endpoint.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
struct ApiEnvelope<T> {
    #[serde(default)]
    data: Option<T>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRequest {
    pub owner: Address,
    pub smart_wallet: Address,
    /// Hex-encoded EOA signature over the auth challenge.
    pub signature: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    #[serde(default)]
    pub expires_at: Option<u64>,
}

impl ApiClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            base_url,
            api_key,
            http: reqwest::Client::new(),
            auth_token: Mutex::new(None),
        }
    }

    /// Exchanges a signed challenge for a JWT and stores it for subsequent
    /// authorized calls. A backend rejection becomes `SdkError::Auth`.
    pub async fn authenticate(&self, req: &AuthRequest) -> Result<AuthResponse> {
        let res: Result<AuthResponse> = self.post("auth", "/v2/smart-wallets/auth", req).await;
        match res {
            Ok(auth) => {
                *self.auth_token.lock().expect("auth token poisoned") = Some(auth.token.clone());
                Ok(auth)
            }
            Err(SdkError::Module { message, .. }) => Err(SdkError::Auth(message)),
            Err(e) => Err(e),
        }
    }

    pub fn auth_token(&self) -> Option<String> {
        self.auth_token.lock().expect("auth token poisoned").clone()
    }

    pub(crate) async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        module: &'static str,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let req = self
            .http
            .post(self.url(path))
            .query(&[("apiKey", self.api_key.as_str())])
            .json(body);
        self.dispatch(module, req).await
    }

    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        module: &'static str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let req = self
            .http
            .get(self.url(path))
            .query(&[("apiKey", self.api_key.as_str())])
            .query(query);
        self.dispatch(module, req).await
    }

    async fn dispatch<T: DeserializeOwned>(
        &self,
        module: &'static str,
        req: reqwest::RequestBuilder,
    ) -> Result<T> {
        let req = match self.auth_token() {
            Some(token) => req.bearer_auth(token),
            None => req,
        };

        let resp = req.send().await?;
        let status = resp.status();
        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| SdkError::Decode(format!("{module}: failed to decode JSON: {e}")))?;

        let envelope: ApiEnvelope<T> = serde_json::from_value(body.clone())
            .map_err(|e| SdkError::Decode(format!("{module}: unexpected response shape: {e}")))?;

        if let Some(err) = envelope.error {
            return Err(module_error(module, err));
        }
        if !status.is_success() {
            return Err(SdkError::Module {
                module,
                code: status.as_u16().to_string(),
                message: body.to_string(),
            });
        }

        envelope
            .data
            .ok_or_else(|| SdkError::Decode(format!("{module}: missing data field")))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

fn module_error(module: &'static str, err: ApiErrorBody) -> SdkError {
    let code = match err.code {
        Some(serde_json::Value::String(s)) => s,
        Some(v) => v.to_string(),
        None => "unknown".to_string(),
    };
    SdkError::Module {
        module,
        code,
        message: err.message.unwrap_or_else(|| "unspecified error".to_string()),
    }
}
