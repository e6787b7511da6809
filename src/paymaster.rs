use crate::encoding::{fmt_address, fmt_u256};
use crate::error::{Result, SdkError};
use ethers::types::{Address, Bytes, U256};
use serde_json::Value;

/// Minimal ERC-7677 paymaster web service client.
///
/// The sponsorship flow is two-phase: `pm_getPaymasterStubData` before gas
/// estimation, `pm_getPaymasterData` once gas limits are final. Implementing
/// the ERC-7677 methods directly keeps the SDK vendor-portable.
#[derive(Debug, Clone)]
pub struct PaymasterClient {
    url: String,
    http: reqwest::Client,
}

impl PaymasterClient {
    pub fn new(url: String) -> Self {
        Self {
            url,
            http: reqwest::Client::new(),
        }
    }

    pub async fn get_paymaster_stub_data(
        &self,
        user_op: Value,
        entry_point: Address,
        chain_id: u64,
        policy: Option<&str>,
    ) -> Result<Bytes> {
        let params = build_params(user_op, entry_point, chain_id, policy);
        let res = self.rpc("pm_getPaymasterStubData", params).await?;
        parse_v06_paymaster_and_data(&res)
    }

    pub async fn get_paymaster_data(
        &self,
        user_op: Value,
        entry_point: Address,
        chain_id: u64,
        policy: Option<&str>,
    ) -> Result<Bytes> {
        let params = build_params(user_op, entry_point, chain_id, policy);
        let res = self.rpc("pm_getPaymasterData", params).await?;
        parse_v06_paymaster_and_data(&res)
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

fn build_params(user_op: Value, entry_point: Address, chain_id: u64, policy: Option<&str>) -> Value {
    // context is free-form per ERC-7677; a sponsorship policy id is the only
    // thing this platform's paymaster understands.
    let mut ctx = serde_json::json!({});
    if let Some(policy) = policy {
        if let Some(obj) = ctx.as_object_mut() {
            obj.insert("policyId".to_string(), Value::String(policy.to_string()));
        }
    }

    serde_json::json!([
        user_op,
        fmt_address(entry_point),
        fmt_u256(U256::from(chain_id)),
        ctx
    ])
}

fn parse_v06_paymaster_and_data(result: &Value) -> Result<Bytes> {
    // ERC-7677 examples return v0.6 data at the top level:
    //   { "paymasterAndData": "0x..." }
    // Some services wrap it:
    //   { "entrypointV06Response": { "paymasterAndData": "0x..." }, ... }
    // Be liberal in what we accept so the SDK stays vendor-portable.
    if let Some(s) = result.get("paymasterAndData").and_then(|x| x.as_str()) {
        return decode_hex_bytes(s);
    }

    let v06 = result
        .get("entrypointV06Response")
        .or_else(|| result.get("entryPointV06Response"))
        .ok_or_else(|| {
            SdkError::Decode(
                "missing paymasterAndData (expected top-level paymasterAndData or entrypointV06Response.paymasterAndData)"
                    .to_string(),
            )
        })?;

    let s = v06
        .get("paymasterAndData")
        .and_then(|x| x.as_str())
        .ok_or_else(|| SdkError::Decode("missing paymasterAndData field".to_string()))?;

    decode_hex_bytes(s)
}

fn decode_hex_bytes(s: &str) -> Result<Bytes> {
    let hex_str = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(hex_str)
        .map_err(|e| SdkError::Decode(format!("invalid hex in paymasterAndData: {e}")))?;
    Ok(Bytes::from(bytes))
}

#[cfg(test)]
mod tests {
    use super::{build_params, parse_v06_paymaster_and_data};
    use crate::error::SdkError;
    use ethers::types::{Address, Bytes};
    use serde_json::json;

    #[test]
    fn accepts_all_known_v06_response_shapes() {
        let expected = Bytes::from(vec![0x0b, 0xad, 0xf0, 0x0d]);
        for res in [
            json!({ "paymasterAndData": "0x0badf00d" }),
            json!({ "entrypointV06Response": { "paymasterAndData": "0x0badf00d" } }),
            json!({ "entryPointV06Response": { "paymasterAndData": "0x0badf00d" } }),
        ] {
            assert_eq!(parse_v06_paymaster_and_data(&res).unwrap(), expected, "{res}");
        }
    }

    #[test]
    fn rejects_v07_only_responses() {
        let res = json!({ "entrypointV07Response": { "paymaster": "0x00" } });
        assert!(matches!(
            parse_v06_paymaster_and_data(&res),
            Err(SdkError::Decode(_))
        ));
    }

    #[test]
    fn rejects_non_hex_paymaster_data() {
        let res = json!({ "paymasterAndData": "0xnot-hex" });
        assert!(matches!(
            parse_v06_paymaster_and_data(&res),
            Err(SdkError::Decode(_))
        ));
    }

    #[test]
    fn params_carry_policy_only_when_configured() {
        let op = json!({ "sender": "0x0000000000000000000000000000000000000001" });
        let entry_point = Address::repeat_byte(0x06);

        let with = build_params(op.clone(), entry_point, 8453, Some("sponsored-default"));
        assert_eq!(with[2], "0x2105");
        assert_eq!(with[3]["policyId"], "sponsored-default");

        let without = build_params(op, entry_point, 8453, None);
        assert_eq!(without[3], json!({}));
    }
}
