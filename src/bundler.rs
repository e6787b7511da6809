use crate::encoding::{fmt_address, fmt_h256, parse_h256, parse_u256_quantity};
use crate::error::{Result, SdkError};
use crate::types::{GasEstimates, SmartWalletEvent, UserOperationReceipt};
use ethers::types::{Address, H256, U256};
use futures::stream::{self, Stream};
use serde_json::Value;
use std::time::{Duration, Instant};

/// JSON-RPC client for an ERC-4337 bundler endpoint.
#[derive(Debug, Clone)]
pub struct BundlerClient {
    url: String,
    http: reqwest::Client,
}

impl BundlerClient {
    pub fn new(url: String) -> Self {
        Self {
            url,
            http: reqwest::Client::new(),
        }
    }

    pub async fn estimate_user_operation_gas(
        &self,
        user_op: Value,
        entry_point: Address,
    ) -> Result<GasEstimates> {
        let params = serde_json::json!([user_op, fmt_address(entry_point)]);
        let res = self.rpc("eth_estimateUserOperationGas", params).await?;

        Ok(GasEstimates {
            call_gas_limit: parse_u256_field(&res, "callGasLimit")?,
            verification_gas_limit: parse_u256_field(&res, "verificationGasLimit")?,
            pre_verification_gas: parse_u256_field(&res, "preVerificationGas")?,
        })
    }

    pub async fn send_user_operation(&self, user_op: Value, entry_point: Address) -> Result<H256> {
        let params = serde_json::json!([user_op, fmt_address(entry_point)]);
        let res = self.rpc("eth_sendUserOperation", params).await?;
        parse_userop_hash(&res)
    }

    /// One receipt poll. `Ok(None)` while the operation is still pending.
    pub async fn get_user_operation_receipt(
        &self,
        user_op_hash: H256,
    ) -> Result<Option<UserOperationReceipt>> {
        let params = serde_json::json!([fmt_h256(user_op_hash)]);
        let res = self.rpc("eth_getUserOperationReceipt", params).await?;
        if res.is_null() {
            return Ok(None);
        }
        serde_json::from_value(res).map(Some).map_err(SdkError::decode)
    }

    async fn rpc(&self, method: &str, params: Value) -> Result<Value> {
        let req = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let resp = self.http.post(&self.url).json(&req).send().await?;

        let status = resp.status();
        let body: Value = resp
            .json()
            .await
            .map_err(|e| SdkError::Decode(format!("{method}: failed to decode JSON: {e}")))?;

        if !status.is_success() {
            return Err(SdkError::Rpc(format!("{method}: HTTP {status}: {body}")));
        }

        if let Some(err) = body.get("error") {
            return Err(SdkError::Rpc(format!("{method}: {err}")));
        }

        body.get("result")
            .cloned()
            .ok_or_else(|| SdkError::Rpc(format!("{method}: missing result field")))
    }
}

/// Handle for a submitted user operation.
///
/// Created by the orchestrator after `eth_sendUserOperation`; exposes the
/// userOpHash plus inclusion polling.
#[derive(Debug, Clone)]
pub struct PendingUserOperation {
    pub user_op_hash: H256,
    bundler: BundlerClient,
    poll_interval: Duration,
    timeout: Duration,
}

impl PendingUserOperation {
    pub fn new(
        bundler: BundlerClient,
        user_op_hash: H256,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            user_op_hash,
            bundler,
            poll_interval,
            timeout,
        }
    }

    /// Polls until the operation is mined or the timeout elapses.
    ///
    /// A timeout resolves to `Ok(None)` (absent receipt), not an error.
    /// A zero timeout disables the deadline and polls until mined.
    pub async fn wait(&self) -> Result<Option<UserOperationReceipt>> {
        let start = Instant::now();
        loop {
            if !self.timeout.is_zero() && start.elapsed() > self.timeout {
                tracing::info!(
                    user_op_hash = %fmt_h256(self.user_op_hash),
                    timeout_s = self.timeout.as_secs(),
                    "no userOp receipt within timeout; operation may still land"
                );
                return Ok(None);
            }

            match self.bundler.get_user_operation_receipt(self.user_op_hash).await {
                Ok(Some(receipt)) => return Ok(Some(receipt)),
                Ok(None) => {}
                Err(e) => {
                    // transient errors are common on free-tier bundlers; keep polling
                    tracing::warn!(error = %e, "bundler receipt poll error");
                }
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Lazy lifecycle event stream over the same polling loop.
    ///
    /// Emits `Started`, then `HashAssigned`, then a terminal `Succeeded` or
    /// `Failed` once mined. If the poll window closes first, the stream ends
    /// without a terminal event. Nothing runs in the background: dropping the
    /// stream is the cancellation signal.
    pub fn events(&self) -> impl Stream<Item = SmartWalletEvent> {
        let bundler = self.bundler.clone();
        let hash = self.user_op_hash;
        let poll_interval = self.poll_interval;
        let timeout = self.timeout;

        stream::unfold(WatchState::Start, move |state| {
            let bundler = bundler.clone();
            async move {
                match state {
                    WatchState::Start => {
                        Some((SmartWalletEvent::Started, WatchState::Announce))
                    }
                    WatchState::Announce => Some((
                        SmartWalletEvent::HashAssigned(hash),
                        WatchState::Poll {
                            deadline: Instant::now() + timeout,
                        },
                    )),
                    WatchState::Poll { deadline } => loop {
                        if !timeout.is_zero() && Instant::now() > deadline {
                            return None;
                        }
                        match bundler.get_user_operation_receipt(hash).await {
                            Ok(Some(receipt)) => {
                                let event = if receipt.success {
                                    SmartWalletEvent::Succeeded(receipt)
                                } else {
                                    let reason = receipt
                                        .reason
                                        .unwrap_or_else(|| "user operation reverted".to_string());
                                    SmartWalletEvent::Failed(reason)
                                };
                                return Some((event, WatchState::Done));
                            }
                            Ok(None) => {}
                            Err(e) => {
                                tracing::warn!(error = %e, "bundler receipt poll error");
                            }
                        }
                        tokio::time::sleep(poll_interval).await;
                    },
                    WatchState::Done => None,
                }
            }
        })
    }
}

enum WatchState {
    Start,
    Announce,
    Poll { deadline: Instant },
    Done,
}

fn parse_u256_field(v: &Value, key: &str) -> Result<U256> {
    let s = v
        .get(key)
        .and_then(|x| x.as_str())
        .ok_or_else(|| SdkError::Decode(format!("missing or invalid field {key}")))?;
    parse_u256_quantity(s)
}

fn parse_userop_hash(res: &Value) -> Result<H256> {
    // Most bundlers return the userOpHash directly as a JSON string; some
    // wrap it in an object. Accept the known shapes for compatibility.
    let hash_str = if let Some(s) = res.as_str() {
        s
    } else if let Some(s) = res.get("result").and_then(|v| v.as_str()) {
        s
    } else if let Some(s) = res.get("userOpHash").and_then(|v| v.as_str()) {
        s
    } else if let Some(s) = res.get("userOperationHash").and_then(|v| v.as_str()) {
        s
    } else {
        return Err(SdkError::Decode(format!(
            "unexpected eth_sendUserOperation result shape (expected string or {{result: ...}}): {res}"
        )));
    };

    parse_h256(hash_str)
}

#[cfg(test)]
mod tests {
    use super::{parse_u256_field, parse_userop_hash};
    use crate::encoding::parse_h256;
    use ethers::types::U256;
    use serde_json::json;

    const HASH: &str = "0x1111111111111111111111111111111111111111111111111111111111111111";

    #[test]
    fn parse_userop_hash_from_string() {
        let res = json!(HASH);
        let hash = parse_userop_hash(&res).unwrap();
        assert_eq!(hash, parse_h256(HASH).unwrap());
    }

    #[test]
    fn parse_userop_hash_from_result_object() {
        let res = json!({ "result": HASH });
        let hash = parse_userop_hash(&res).unwrap();
        assert_eq!(hash, parse_h256(HASH).unwrap());
    }

    #[test]
    fn parse_userop_hash_from_userop_hash_object() {
        let res = json!({ "userOpHash": HASH });
        let hash = parse_userop_hash(&res).unwrap();
        assert_eq!(hash, parse_h256(HASH).unwrap());
    }

    #[test]
    fn parse_userop_hash_from_useroperation_hash_object() {
        let res = json!({ "userOperationHash": HASH });
        let hash = parse_userop_hash(&res).unwrap();
        assert_eq!(hash, parse_h256(HASH).unwrap());
    }

    #[test]
    fn parse_userop_hash_rejects_unknown_shape() {
        let res = json!({ "foo": "bar" });
        assert!(parse_userop_hash(&res).is_err());
    }

    #[test]
    fn gas_estimate_fields_parse_as_quantities() {
        let res = json!({
            "callGasLimit": "0x5208",
            "verificationGasLimit": "0x186a0",
            "preVerificationGas": "0xb798"
        });
        assert_eq!(
            parse_u256_field(&res, "callGasLimit").unwrap(),
            U256::from(21_000)
        );
        assert!(parse_u256_field(&res, "missing").is_err());
    }
}
