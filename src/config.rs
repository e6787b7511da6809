use crate::error::{default_fee_classifier, FeeErrorClassifier, Result, SdkError};
use ethers::types::{Address, U256};
use std::time::Duration;

/// Platform configuration for one wallet session.
///
/// The bundler and paymaster JSON-RPC endpoints are derived from `base_url`
/// and authenticated with the `apiKey` query parameter; the chain RPC is a
/// plain node endpoint used for contract reads and signing support calls.
#[derive(Clone)]
pub struct SdkConfig {
    pub base_url: String,
    pub api_key: String,
    pub chain_rpc_url: String,
    pub entry_point: Address,
    pub factory: Address,
    /// CREATE2 salt for the smart account.
    pub salt: U256,
    /// Inject paymaster sponsorship data into every user operation.
    pub sponsor_gas: bool,
    /// Optional gas-sponsorship policy forwarded to the paymaster service.
    pub sponsorship_policy: Option<String>,
    pub receipt_poll_interval: Duration,
    pub receipt_timeout: Duration,
    pub fee_classifier: FeeErrorClassifier,
}

impl std::fmt::Debug for SdkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SdkConfig")
            .field("base_url", &self.base_url)
            .field("chain_rpc_url", &self.chain_rpc_url)
            .field("entry_point", &self.entry_point)
            .field("factory", &self.factory)
            .field("salt", &self.salt)
            .field("sponsorship_policy", &self.sponsorship_policy)
            .field("receipt_poll_interval", &self.receipt_poll_interval)
            .field("receipt_timeout", &self.receipt_timeout)
            .finish()
    }
}

impl SdkConfig {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        chain_rpc_url: impl Into<String>,
        entry_point: Address,
        factory: Address,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            chain_rpc_url: chain_rpc_url.into(),
            entry_point,
            factory,
            salt: U256::zero(),
            sponsor_gas: true,
            sponsorship_policy: None,
            receipt_poll_interval: Duration::from_millis(1500),
            receipt_timeout: Duration::from_secs(180),
            fee_classifier: default_fee_classifier(),
        }
    }

    pub fn with_salt(mut self, salt: U256) -> Self {
        self.salt = salt;
        self
    }

    pub fn with_sponsor_gas(mut self, enabled: bool) -> Self {
        self.sponsor_gas = enabled;
        self
    }

    pub fn with_sponsorship_policy(mut self, policy: impl Into<String>) -> Self {
        self.sponsorship_policy = Some(policy.into());
        self
    }

    pub fn with_receipt_timeout(mut self, timeout: Duration) -> Self {
        self.receipt_timeout = timeout;
        self
    }

    /// Replaces the default substring-based fee-too-low classifier.
    pub fn with_fee_classifier(mut self, classifier: FeeErrorClassifier) -> Self {
        self.fee_classifier = classifier;
        self
    }

    /// Bundler JSON-RPC endpoint for this platform/key.
    pub fn bundler_url(&self) -> String {
        format!(
            "{}/api/v0/bundler?apiKey={}",
            self.base_url.trim_end_matches('/'),
            self.api_key
        )
    }

    /// Paymaster JSON-RPC endpoint for this platform/key.
    pub fn paymaster_url(&self) -> String {
        format!(
            "{}/api/v0/paymaster?apiKey={}",
            self.base_url.trim_end_matches('/'),
            self.api_key
        )
    }

    /// Rejects malformed URLs and missing credentials before any network use.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(SdkError::Config("api key must not be empty".to_string()));
        }
        for (label, url) in [
            ("base url", self.base_url.as_str()),
            ("chain rpc url", self.chain_rpc_url.as_str()),
        ] {
            reqwest::Url::parse(url)
                .map_err(|e| SdkError::Config(format!("invalid {label} {url:?}: {e}")))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SdkConfig {
        SdkConfig::new(
            "https://platform.example.com/",
            "test-key",
            "https://rpc.example.com",
            Address::repeat_byte(0x01),
            Address::repeat_byte(0x02),
        )
    }

    #[test]
    fn derived_endpoints_carry_api_key() {
        let cfg = config();
        assert_eq!(
            cfg.bundler_url(),
            "https://platform.example.com/api/v0/bundler?apiKey=test-key"
        );
        assert_eq!(
            cfg.paymaster_url(),
            "https://platform.example.com/api/v0/paymaster?apiKey=test-key"
        );
    }

    #[test]
    fn validate_rejects_malformed_urls() {
        let mut cfg = config();
        assert!(cfg.validate().is_ok());

        cfg.chain_rpc_url = "not a url".to_string();
        assert!(matches!(cfg.validate(), Err(SdkError::Config(_))));
    }

    #[test]
    fn validate_rejects_empty_api_key() {
        let mut cfg = config();
        cfg.api_key = "  ".to_string();
        assert!(matches!(cfg.validate(), Err(SdkError::Config(_))));
    }
}
