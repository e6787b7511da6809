use std::fmt::Display;
use std::sync::Arc;
use thiserror::Error;

pub type Result<T, E = SdkError> = std::result::Result<T, E>;

/// Error taxonomy for the SDK.
///
/// Everything fallible returns `Result<_, SdkError>`; provider/transport
/// errors are converted into the matching variant at the boundary so callers
/// only ever branch on this enum.
#[derive(Error, Debug)]
pub enum SdkError {
    /// The backend rejected the authentication signature or credentials.
    #[error("authentication rejected: {0}")]
    Auth(String),

    /// Bundler or chain JSON-RPC failure. The message carries the backend's
    /// error text so it can be inspected by a fee-too-low classifier.
    #[error("rpc error: {0}")]
    Rpc(String),

    /// A REST module (trade/staking/nft/explorer) reported a business error.
    #[error("{module} module error ({code}): {message}")]
    Module {
        module: &'static str,
        code: String,
        message: String,
    },

    /// A contract read returned no or malformed results.
    #[error("decode error: {0}")]
    Decode(String),

    /// Bad initialization parameters (malformed URL, bad address, empty batch).
    #[error("invalid configuration: {0}")]
    Config(String),

    /// HTTP transport failure before any JSON-RPC/REST body was understood.
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// Signing with the owner key failed.
    #[error("signer error: {0}")]
    Signer(String),
}

impl SdkError {
    pub fn rpc(err: impl Display) -> Self {
        SdkError::Rpc(err.to_string())
    }

    pub fn decode(err: impl Display) -> Self {
        SdkError::Decode(err.to_string())
    }

    pub fn config(err: impl Display) -> Self {
        SdkError::Config(err.to_string())
    }

    pub fn signer(err: impl Display) -> Self {
        SdkError::Signer(err.to_string())
    }
}

/// Classifies whether an error is the bundler's "fee too low" rejection,
/// i.e. whether a fee-bumped retry is worth attempting.
///
/// Supplied at configuration time; [`default_fee_classifier`] is the default.
pub type FeeErrorClassifier = Arc<dyn Fn(&SdkError) -> bool + Send + Sync>;

/// Default fee-too-low detection: substring match on the RPC error text.
///
/// Known limitation: this couples to backend error wording. Bundlers do not
/// expose a stable error code for underpriced operations, so the substrings
/// below cover the common phrasings; callers with a stricter backend should
/// install their own classifier via `SdkConfig::with_fee_classifier`.
pub fn default_fee_classifier() -> FeeErrorClassifier {
    Arc::new(|err: &SdkError| match err {
        SdkError::Rpc(msg) => {
            let msg = msg.to_ascii_lowercase();
            msg.contains("fee too low")
                || msg.contains("underpriced")
                || msg.contains("maxfeepergas")
                || msg.contains("max fee per gas")
        }
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifier_matches_known_underpriced_messages() {
        let classify = default_fee_classifier();
        for msg in [
            "replacement transaction underpriced",
            "maxFeePerGas too low to be included",
            "userOp fee too low: expected at least 12 gwei",
        ] {
            assert!(classify(&SdkError::Rpc(msg.to_string())), "{msg}");
        }
    }

    #[test]
    fn classifier_ignores_other_errors() {
        let classify = default_fee_classifier();
        assert!(!classify(&SdkError::Rpc("nonce too low".to_string())));
        assert!(!classify(&SdkError::Auth("bad signature".to_string())));
        assert!(!classify(&SdkError::Decode("empty result".to_string())));
    }
}
