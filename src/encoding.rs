//! Pure call-data encoders and wire-format helpers.
//!
//! Everything here is deterministic and side-effect free except the generic
//! contract-read helpers at the bottom, which perform a single `eth_call`.

use crate::error::{Result, SdkError};
use crate::types::UserOperation;
use ethers::abi::{AbiParser, Token};
use ethers::providers::Middleware;
use ethers::types::{transaction::eip2718::TypedTransaction, Address, Bytes, TransactionRequest};
use ethers::types::{H256, U256};
use std::sync::Arc;

pub fn fmt_address(addr: Address) -> String {
    format!("0x{}", hex::encode(addr.as_bytes()))
}

pub fn fmt_h256(h: H256) -> String {
    format!("0x{}", hex::encode(h.as_bytes()))
}

/// JSON-RPC "quantity" encoding.
pub fn fmt_u256(v: U256) -> String {
    if v.is_zero() {
        "0x0".to_string()
    } else {
        format!("0x{:x}", v)
    }
}

pub fn fmt_bytes(b: &Bytes) -> String {
    format!("0x{}", hex::encode(b.as_ref()))
}

pub fn parse_u256_quantity(s: &str) -> Result<U256> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    if s.is_empty() {
        return Ok(U256::zero());
    }
    U256::from_str_radix(s, 16).map_err(SdkError::decode)
}

pub fn parse_h256(s: &str) -> Result<H256> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(s).map_err(SdkError::decode)?;
    if bytes.len() != 32 {
        return Err(SdkError::Decode(format!(
            "expected 32-byte hex, got {} bytes",
            bytes.len()
        )));
    }
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&bytes);
    Ok(H256(arr))
}

/// Wire form accepted by `eth_sendUserOperation`, `eth_estimateUserOperationGas`
/// and the ERC-7677 paymaster methods.
pub fn user_op_to_json(op: &UserOperation) -> serde_json::Value {
    serde_json::json!({
        "sender": fmt_address(op.sender),
        "nonce": fmt_u256(op.nonce),
        "initCode": fmt_bytes(&op.init_code),
        "callData": fmt_bytes(&op.call_data),
        "callGasLimit": fmt_u256(op.call_gas_limit),
        "verificationGasLimit": fmt_u256(op.verification_gas_limit),
        "preVerificationGas": fmt_u256(op.pre_verification_gas),
        "maxFeePerGas": fmt_u256(op.max_fee_per_gas),
        "maxPriorityFeePerGas": fmt_u256(op.max_priority_fee_per_gas),
        "paymasterAndData": fmt_bytes(&op.paymaster_and_data),
        "signature": fmt_bytes(&op.signature),
    })
}

fn encode_call(signature: &str, method: &str, args: &[Token]) -> Result<Bytes> {
    let abi = AbiParser::default()
        .parse(&[signature])
        .map_err(SdkError::decode)?;
    let function = abi.function(method).map_err(SdkError::decode)?;
    let data = function.encode_input(args).map_err(SdkError::decode)?;
    Ok(Bytes::from(data))
}

/// `transfer(address,uint256)` calldata for an ERC-20 token.
pub fn encode_erc20_transfer(recipient: Address, amount: U256) -> Result<Bytes> {
    encode_call(
        "function transfer(address to, uint256 amount) returns (bool)",
        "transfer",
        &[Token::Address(recipient), Token::Uint(amount)],
    )
}

/// `approve(address,uint256)` calldata for an ERC-20 token.
pub fn encode_erc20_approve(spender: Address, amount: U256) -> Result<Bytes> {
    encode_call(
        "function approve(address spender, uint256 amount) returns (bool)",
        "approve",
        &[Token::Address(spender), Token::Uint(amount)],
    )
}

/// `safeTransferFrom(address,address,uint256)` calldata for an ERC-721 token.
pub fn encode_erc721_safe_transfer(
    from: Address,
    recipient: Address,
    token_id: U256,
) -> Result<Bytes> {
    encode_call(
        "function safeTransferFrom(address from, address to, uint256 tokenId)",
        "safeTransferFrom",
        &[
            Token::Address(from),
            Token::Address(recipient),
            Token::Uint(token_id),
        ],
    )
}

/// `approve(address,uint256)` calldata for an ERC-721 token.
pub fn encode_erc721_approve(spender: Address, token_id: U256) -> Result<Bytes> {
    encode_call(
        "function approve(address to, uint256 tokenId)",
        "approve",
        &[Token::Address(spender), Token::Uint(token_id)],
    )
}

/// Converts a human-readable decimal amount into integer base units.
///
/// Exact string arithmetic only; amounts with more fractional digits than the
/// token supports are rejected rather than rounded.
pub fn to_base_units(amount: &str, decimals: u8) -> Result<U256> {
    let amount = amount.trim();
    let (int_part, frac_part) = match amount.split_once('.') {
        Some((i, f)) => (i, f),
        None => (amount, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(SdkError::Decode(format!("invalid amount: {amount:?}")));
    }
    if !int_part.chars().all(|c| c.is_ascii_digit())
        || !frac_part.chars().all(|c| c.is_ascii_digit())
    {
        return Err(SdkError::Decode(format!(
            "invalid amount (expected non-negative decimal): {amount:?}"
        )));
    }
    if frac_part.len() > decimals as usize {
        return Err(SdkError::Decode(format!(
            "amount {amount} has more fractional digits than token decimals ({decimals})"
        )));
    }

    let mut digits = String::with_capacity(int_part.len() + decimals as usize);
    digits.push_str(if int_part.is_empty() { "0" } else { int_part });
    digits.push_str(frac_part);
    for _ in frac_part.len()..decimals as usize {
        digits.push('0');
    }

    U256::from_dec_str(&digits).map_err(SdkError::decode)
}

/// Generic contract read: encodes `method(args)` against a human-readable ABI,
/// performs `eth_call`, and decodes the outputs.
pub async fn read_from_contract<M: Middleware + 'static>(
    client: Arc<M>,
    abi: &[&str],
    address: Address,
    method: &str,
    args: &[Token],
) -> Result<Vec<Token>> {
    let abi = AbiParser::default().parse(abi).map_err(SdkError::decode)?;
    let function = abi.function(method).map_err(SdkError::decode)?;
    let data = function.encode_input(args).map_err(SdkError::decode)?;

    let tx: TypedTransaction = TransactionRequest::new().to(address).data(data).into();
    let output = client.call(&tx, None).await.map_err(SdkError::rpc)?;

    function
        .decode_output(output.as_ref())
        .map_err(SdkError::decode)
}

/// Like [`read_from_contract`] but takes the first decoded value; a read that
/// returns zero values is a `Decode` error.
pub async fn read_from_contract_first<M: Middleware + 'static>(
    client: Arc<M>,
    abi: &[&str],
    address: Address,
    method: &str,
    args: &[Token],
) -> Result<Token> {
    read_from_contract(client, abi, address, method, args)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| SdkError::Decode(format!("contract read {method} returned no values")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::providers::Provider;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    #[test]
    fn erc20_transfer_selector_and_round_trip() {
        let recipient = addr(0x11);
        let amount = U256::from(1_234_567u64);
        let data = encode_erc20_transfer(recipient, amount).unwrap();

        // keccak256("transfer(address,uint256)")[..4]
        assert_eq!(&data[..4], &[0xa9, 0x05, 0x9c, 0xbb]);

        let abi = AbiParser::default()
            .parse(&["function transfer(address to, uint256 amount) returns (bool)"])
            .unwrap();
        let decoded = abi
            .function("transfer")
            .unwrap()
            .decode_input(&data[4..])
            .unwrap();
        assert_eq!(decoded[0], Token::Address(recipient));
        assert_eq!(decoded[1], Token::Uint(amount));
    }

    #[test]
    fn erc20_approve_selector() {
        let data = encode_erc20_approve(addr(0x22), U256::max_value()).unwrap();
        // keccak256("approve(address,uint256)")[..4]
        assert_eq!(&data[..4], &[0x09, 0x5e, 0xa7, 0xb3]);
    }

    #[test]
    fn erc721_safe_transfer_selector() {
        let data = encode_erc721_safe_transfer(addr(0x01), addr(0x02), U256::from(7)).unwrap();
        // keccak256("safeTransferFrom(address,address,uint256)")[..4]
        assert_eq!(&data[..4], &[0x42, 0x84, 0x2e, 0x0e]);
    }

    #[test]
    fn encoders_are_deterministic() {
        let a = encode_erc20_transfer(addr(0x11), U256::from(5)).unwrap();
        let b = encode_erc20_transfer(addr(0x11), U256::from(5)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn base_units_conversion_is_exact() {
        assert_eq!(to_base_units("1.5", 6).unwrap(), U256::from(1_500_000u64));
        assert_eq!(to_base_units("0.000001", 6).unwrap(), U256::from(1u64));
        assert_eq!(to_base_units("42", 0).unwrap(), U256::from(42u64));
        assert_eq!(
            to_base_units("1", 18).unwrap(),
            U256::exp10(18)
        );
        assert_eq!(to_base_units(".5", 1).unwrap(), U256::from(5u64));
    }

    #[test]
    fn base_units_rejects_bad_inputs() {
        assert!(to_base_units("1.2345678", 6).is_err());
        assert!(to_base_units("-1", 6).is_err());
        assert!(to_base_units("1,5", 6).is_err());
        assert!(to_base_units("", 6).is_err());
        assert!(to_base_units(".", 6).is_err());
    }

    #[test]
    fn quantity_parse_accepts_rpc_shapes() {
        assert_eq!(parse_u256_quantity("0x0").unwrap(), U256::zero());
        assert_eq!(parse_u256_quantity("0x10").unwrap(), U256::from(16));
        assert_eq!(parse_u256_quantity("0x").unwrap(), U256::zero());
        assert!(parse_u256_quantity("0xzz").is_err());
    }

    #[tokio::test]
    async fn contract_read_first_decodes_single_output() {
        let (provider, mock) = Provider::mocked();
        // abi-encoded uint8(18)
        let mut word = [0u8; 32];
        word[31] = 18;
        mock.push::<Bytes, _>(Bytes::from(word.to_vec())).unwrap();

        let out = read_from_contract_first(
            Arc::new(provider),
            &["function decimals() view returns (uint8)"],
            addr(0x44),
            "decimals",
            &[],
        )
        .await
        .unwrap();
        assert_eq!(out, Token::Uint(U256::from(18)));
    }

    #[tokio::test]
    async fn contract_read_with_no_outputs_yields_empty_list() {
        let (provider, mock) = Provider::mocked();
        mock.push::<Bytes, _>(Bytes::default()).unwrap();

        let out = read_from_contract(
            Arc::new(provider),
            &["function ping()"],
            addr(0x44),
            "ping",
            &[],
        )
        .await
        .unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn contract_read_first_rejects_zero_outputs() {
        let (provider, mock) = Provider::mocked();
        mock.push::<Bytes, _>(Bytes::default()).unwrap();

        let err = read_from_contract_first(
            Arc::new(provider),
            &["function ping()"],
            addr(0x44),
            "ping",
            &[],
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SdkError::Decode(_)));
    }

    #[test]
    fn user_op_json_uses_camel_case_quantities() {
        let op = UserOperation {
            sender: addr(0x33),
            nonce: U256::from(1),
            init_code: Bytes::default(),
            call_data: Bytes::from(vec![0xde, 0xad]),
            call_gas_limit: U256::zero(),
            verification_gas_limit: U256::zero(),
            pre_verification_gas: U256::zero(),
            max_fee_per_gas: U256::from(2_000_000_000u64),
            max_priority_fee_per_gas: U256::from(2_000_000_000u64),
            paymaster_and_data: Bytes::default(),
            signature: Bytes::from(vec![0u8; 65]),
        };
        let json = user_op_to_json(&op);
        assert_eq!(json["nonce"], "0x1");
        assert_eq!(json["callData"], "0xdead");
        assert_eq!(json["callGasLimit"], "0x0");
        assert_eq!(json["maxFeePerGas"], "0x77359400");
    }
}
