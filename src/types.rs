use ethers::types::{Address, Bytes, H256, U256};
use serde::{Deserialize, Serialize};

/// Well-known sentinel address for the chain's native token.
///
/// Token parameters equal to this address select the native-transfer paths
/// (no approval, value carried directly on the call).
pub const NATIVE_TOKEN: Address = Address::repeat_byte(0xee);

/// One EVM message executed by the smart wallet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Call {
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
}

impl Call {
    /// Plain contract call with no native value attached.
    pub fn new(to: Address, data: Bytes) -> Self {
        Self {
            to,
            value: U256::zero(),
            data,
        }
    }

    /// Native-token transfer: value only, empty calldata.
    pub fn native_transfer(to: Address, value: U256) -> Self {
        Self {
            to,
            value,
            data: Bytes::default(),
        }
    }
}

/// ERC-4337 UserOperation (EntryPoint v0.6 layout).
///
/// Note: EntryPoint v0.7 uses a *different* packed struct layout.
///
/// Built unsigned by the wallet proxy, signed just before submission, and
/// consumed within a single orchestrator call; never persisted.
#[derive(Clone, Debug)]
pub struct UserOperation {
    pub sender: Address,
    pub nonce: U256,
    pub init_code: Bytes,
    pub call_data: Bytes,
    pub call_gas_limit: U256,
    pub verification_gas_limit: U256,
    pub pre_verification_gas: U256,
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
    pub paymaster_and_data: Bytes,
    pub signature: Bytes,
}

impl UserOperation {
    /// Returns a tuple matching the Solidity struct layout, suitable for
    /// calling `EntryPoint.getUserOpHash((...))`.
    pub fn as_abi_tuple(
        &self,
    ) -> (
        Address,
        U256,
        Bytes,
        Bytes,
        U256,
        U256,
        U256,
        U256,
        U256,
        Bytes,
        Bytes,
    ) {
        (
            self.sender,
            self.nonce,
            self.init_code.clone(),
            self.call_data.clone(),
            self.call_gas_limit,
            self.verification_gas_limit,
            self.pre_verification_gas,
            self.max_fee_per_gas,
            self.max_priority_fee_per_gas,
            self.paymaster_and_data.clone(),
            self.signature.clone(),
        )
    }
}

/// Per-operation submission options.
///
/// `max_fee_per_gas` is a decimal wei string so callers never round through
/// floats; it is parsed into a `U256` at submission time.
#[derive(Clone, Debug)]
pub struct TxOptions {
    pub max_fee_per_gas: String,
    pub fee_increment_percentage: u64,
    pub with_retry: bool,
}

impl Default for TxOptions {
    fn default() -> Self {
        Self {
            // 2 gwei; bundlers overwrite gas *limits* during estimation, the
            // fee price itself stays caller-controlled.
            max_fee_per_gas: "2000000000".to_string(),
            fee_increment_percentage: 10,
            with_retry: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TokenKind {
    Native,
    Erc20,
}

/// Descriptor for a token, derived from contract reads (or the native
/// sentinel without any network call).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenDetails {
    pub contract_address: Address,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub balance: U256,
    pub kind: TokenKind,
}

/// Gas limits returned by `eth_estimateUserOperationGas`.
#[derive(Debug, Clone)]
pub struct GasEstimates {
    pub call_gas_limit: U256,
    pub verification_gas_limit: U256,
    pub pre_verification_gas: U256,
}

/// Receipt returned by `eth_getUserOperationReceipt` once the operation is
/// mined. The inner chain receipt is kept as raw JSON; its shape varies
/// between bundlers.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationReceipt {
    pub user_op_hash: H256,
    pub sender: Address,
    pub nonce: U256,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub actual_gas_cost: U256,
    #[serde(default)]
    pub actual_gas_used: U256,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub receipt: serde_json::Value,
}

/// Transaction lifecycle event, produced as a stream while polling for
/// inclusion. A stream ends after `Succeeded`/`Failed`, or without a terminal
/// event when the poll window closes; dropping the stream cancels polling.
#[derive(Clone, Debug)]
pub enum SmartWalletEvent {
    Started,
    HashAssigned(H256),
    Succeeded(UserOperationReceipt),
    Failed(String),
}
