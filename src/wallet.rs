//! Smart wallet proxy: counterfactual address derivation, nonce and init-code
//! management, and unsigned/signed user-operation construction.

use crate::config::SdkConfig;
use crate::error::{Result, SdkError};
use crate::fees::FeeState;
use crate::types::{Call, UserOperation};
use ethers::abi::{Abi, AbiParser};
use ethers::prelude::*;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// One smart-wallet session: an owner EOA key plus the derived counterfactual
/// account on a specific chain.
///
/// Owns the wallet-scoped fee state. Not safe against *logically* concurrent
/// operations on the same instance; callers serialize per wallet.
#[derive(Debug)]
pub struct SmartWallet<M> {
    client: Arc<M>,
    signer: LocalWallet,
    owner: Address,
    sender: Address,
    entry_point: Address,
    factory: Address,
    salt: U256,
    chain_id: u64,
    fees: FeeState,
}

impl SmartWallet<Provider<Http>> {
    /// Connects over plain HTTP using the configured chain RPC.
    ///
    /// Fails with `Config` on a malformed RPC URL or an unreachable endpoint
    /// (the chain id fetch doubles as the eager reachability check).
    pub async fn connect(private_key: &str, config: &SdkConfig) -> Result<Self> {
        config.validate()?;
        let provider = Provider::<Http>::try_from(config.chain_rpc_url.as_str())
            .map_err(|e| SdkError::Config(format!("invalid chain rpc url: {e}")))?
            .interval(Duration::from_millis(350));
        Self::init(Arc::new(provider), private_key, config).await
    }
}

impl<M: Middleware + 'static> SmartWallet<M> {
    /// Derives the wallet from an existing chain client. Deterministic given
    /// identical credentials and config.
    pub async fn init(client: Arc<M>, private_key: &str, config: &SdkConfig) -> Result<Self> {
        let chain_id = client
            .get_chainid()
            .await
            .map_err(|e| SdkError::Config(format!("chain rpc unreachable: {e}")))?
            .as_u64();

        let signer = LocalWallet::from_str(private_key)
            .map_err(|e| SdkError::Signer(format!("invalid owner private key: {e}")))?
            .with_chain_id(chain_id);
        let owner = signer.address();

        let sender =
            compute_account_address(client.clone(), config.factory, owner, config.salt).await?;

        tracing::debug!(
            owner = ?owner,
            sender = ?sender,
            chain_id,
            "smart wallet session initialized"
        );

        Ok(Self {
            client,
            signer,
            owner,
            sender,
            entry_point: config.entry_point,
            factory: config.factory,
            salt: config.salt,
            chain_id,
            fees: FeeState::default(),
        })
    }

    /// The smart wallet's own address (distinct from the signer EOA).
    pub fn sender(&self) -> Address {
        self.sender
    }

    /// The signer EOA address.
    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn entry_point(&self) -> Address {
        self.entry_point
    }

    /// Underlying chain-read client, for balance and contract reads.
    pub fn client(&self) -> Arc<M> {
        self.client.clone()
    }

    pub fn fees(&self) -> &FeeState {
        &self.fees
    }

    /// Unsigned user operation wrapping one call via `SimpleAccount.execute`.
    pub async fn execute(&self, call: &Call) -> Result<UserOperation> {
        let account_abi = AbiParser::default()
            .parse(&["function execute(address dest, uint256 value, bytes func)"])
            .map_err(SdkError::decode)?;
        let account = Contract::new(self.sender, account_abi, self.client.clone());
        let call_data = account
            .method::<_, ()>("execute", (call.to, call.value, call.data.clone()))
            .map_err(SdkError::decode)?
            .calldata()
            .ok_or_else(|| SdkError::Decode("failed to build execute calldata".to_string()))?;

        self.build_user_operation(call_data).await
    }

    /// Unsigned user operation bundling all calls into a single on-chain
    /// transaction (atomic once included). The list must be non-empty.
    ///
    /// Uses the three-array `executeBatch` so per-call native value survives
    /// batching.
    pub async fn execute_batch(&self, calls: &[Call]) -> Result<UserOperation> {
        if calls.is_empty() {
            return Err(SdkError::Config(
                "executeBatch requires at least one call".to_string(),
            ));
        }

        let dests: Vec<Address> = calls.iter().map(|c| c.to).collect();
        let values: Vec<U256> = calls.iter().map(|c| c.value).collect();
        let funcs: Vec<Bytes> = calls.iter().map(|c| c.data.clone()).collect();

        let account_abi = AbiParser::default()
            .parse(&["function executeBatch(address[] dest, uint256[] value, bytes[] func)"])
            .map_err(SdkError::decode)?;
        let account = Contract::new(self.sender, account_abi, self.client.clone());
        let call_data = account
            .method::<_, ()>("executeBatch", (dests, values, funcs))
            .map_err(SdkError::decode)?
            .calldata()
            .ok_or_else(|| SdkError::Decode("failed to build executeBatch calldata".to_string()))?;

        self.build_user_operation(call_data).await
    }

    /// Signs an arbitrary message (EIP-191 personal_sign) with the owner EOA.
    /// Used for authentication challenges, not for user operations.
    pub async fn sign_challenge(&self, message: &str) -> Result<Bytes> {
        let sig = self
            .signer
            .sign_message(message.as_bytes())
            .await
            .map_err(|e| SdkError::Signer(format!("failed to sign challenge: {e}")))?;
        Ok(Bytes::from(sig.to_vec()))
    }

    /// Signs (or re-signs) using the on-chain `EntryPoint.getUserOpHash` for
    /// correctness across EntryPoint deployments.
    pub async fn sign_user_operation(&self, op: &mut UserOperation) -> Result<()> {
        let entry_point_abi: Abi = serde_json::from_str(
            r#"[{"inputs":[{"components":[{"internalType":"address","name":"sender","type":"address"},{"internalType":"uint256","name":"nonce","type":"uint256"},{"internalType":"bytes","name":"initCode","type":"bytes"},{"internalType":"bytes","name":"callData","type":"bytes"},{"internalType":"uint256","name":"callGasLimit","type":"uint256"},{"internalType":"uint256","name":"verificationGasLimit","type":"uint256"},{"internalType":"uint256","name":"preVerificationGas","type":"uint256"},{"internalType":"uint256","name":"maxFeePerGas","type":"uint256"},{"internalType":"uint256","name":"maxPriorityFeePerGas","type":"uint256"},{"internalType":"bytes","name":"paymasterAndData","type":"bytes"},{"internalType":"bytes","name":"signature","type":"bytes"}],"internalType":"struct UserOperation","name":"userOp","type":"tuple"}],"name":"getUserOpHash","outputs":[{"internalType":"bytes32","name":"","type":"bytes32"}],"stateMutability":"view","type":"function"}]"#,
        )
        .map_err(|e| SdkError::Decode(format!("failed to parse EntryPoint ABI: {e}")))?;

        let entry_point = Contract::new(self.entry_point, entry_point_abi, self.client.clone());

        let user_op_hash: H256 = entry_point
            .method("getUserOpHash", (op.as_abi_tuple(),))
            .map_err(SdkError::decode)?
            .call()
            .await
            .map_err(|e| SdkError::Rpc(format!("entryPoint.getUserOpHash failed: {e}")))?;

        let sig = self
            .signer
            .sign_message(user_op_hash.as_bytes())
            .await
            .map_err(|e| SdkError::Signer(format!("failed to sign userOpHash: {e}")))?;

        op.signature = Bytes::from(sig.to_vec());
        Ok(())
    }

    async fn build_user_operation(&self, call_data: Bytes) -> Result<UserOperation> {
        // Deployment status is probed per build: the first included operation
        // deploys the account, after which init code must be empty.
        let deployed = self.is_deployed().await?;
        let nonce = self.entry_point_nonce().await?;
        let init_code = self.init_code(deployed).await?;
        let fees = self.fees.get();

        // Zero initial gas fields; the bundler fills these during
        // eth_estimateUserOperationGas, and ERC-7677 paymasters accept stub
        // data for estimation.
        Ok(UserOperation {
            sender: self.sender,
            nonce,
            init_code,
            call_data,
            call_gas_limit: U256::zero(),
            verification_gas_limit: U256::zero(),
            pre_verification_gas: U256::zero(),
            max_fee_per_gas: fees.max_fee_per_gas,
            max_priority_fee_per_gas: fees.max_priority_fee_per_gas,
            paymaster_and_data: Bytes::default(),
            signature: Bytes::from(vec![0u8; 65]),
        })
    }

    async fn is_deployed(&self) -> Result<bool> {
        let code = self
            .client
            .get_code(self.sender, None)
            .await
            .map_err(|e| SdkError::Rpc(format!("eth_getCode failed: {e}")))?;
        Ok(!code.as_ref().is_empty())
    }

    async fn entry_point_nonce(&self) -> Result<U256> {
        let entry_point_abi = AbiParser::default()
            .parse(&["function getNonce(address sender, uint192 key) view returns (uint256)"])
            .map_err(SdkError::decode)?;
        let entry_point = Contract::new(self.entry_point, entry_point_abi, self.client.clone());

        entry_point
            .method("getNonce", (self.sender, U256::zero()))
            .map_err(SdkError::decode)?
            .call()
            .await
            .map_err(|e| SdkError::Rpc(format!("entryPoint.getNonce failed: {e}")))
    }

    async fn init_code(&self, deployed: bool) -> Result<Bytes> {
        if deployed {
            return Ok(Bytes::default());
        }
        let factory_abi = AbiParser::default()
            .parse(&["function createAccount(address owner, uint256 salt) returns (address)"])
            .map_err(SdkError::decode)?;
        let factory = Contract::new(self.factory, factory_abi, self.client.clone());
        let create_calldata = factory
            .method::<_, Address>("createAccount", (self.owner, self.salt))
            .map_err(SdkError::decode)?
            .calldata()
            .ok_or_else(|| {
                SdkError::Decode("failed to build createAccount calldata".to_string())
            })?;

        let mut v = Vec::with_capacity(20 + create_calldata.len());
        v.extend_from_slice(self.factory.as_bytes());
        v.extend_from_slice(create_calldata.as_ref());
        Ok(Bytes::from(v))
    }
}

async fn compute_account_address<M: Middleware + 'static>(
    client: Arc<M>,
    factory: Address,
    owner: Address,
    salt: U256,
) -> Result<Address> {
    let factory_abi = AbiParser::default()
        .parse(&["function getAddress(address owner, uint256 salt) view returns (address)"])
        .map_err(SdkError::decode)?;
    let factory = Contract::new(factory, factory_abi, client);

    factory
        .method("getAddress", (owner, salt))
        .map_err(SdkError::decode)?
        .call()
        .await
        .map_err(|e| SdkError::Rpc(format!("factory.getAddress failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::abi::AbiEncode;
    use ethers::providers::MockProvider;

    const OWNER_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    /// Wallet over a mocked provider. Responses are popped LIFO, so the
    /// factory.getAddress read is pushed before the chain id.
    async fn mocked_wallet(sender: Address) -> SmartWallet<Provider<MockProvider>> {
        let (provider, mock) = Provider::mocked();
        mock.push::<Bytes, _>(Bytes::from(sender.encode())).unwrap();
        mock.push(U256::from(31337)).unwrap();

        let config = SdkConfig::new(
            "https://platform.example.com",
            "test-key",
            "https://rpc.example.com",
            Address::repeat_byte(0x01),
            Address::repeat_byte(0x02),
        );
        SmartWallet::init(Arc::new(provider), OWNER_KEY, &config)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn init_derives_counterfactual_sender() {
        let sender = Address::repeat_byte(0x42);
        let wallet = mocked_wallet(sender).await;
        assert_eq!(wallet.sender(), sender);
        assert_eq!(wallet.chain_id(), 31337);
        // the smart account is never the signer EOA
        assert_ne!(wallet.owner(), wallet.sender());
    }

    #[tokio::test]
    async fn empty_batch_is_rejected_before_any_network_call() {
        let wallet = mocked_wallet(Address::repeat_byte(0x42)).await;
        // no responses are queued past init: a rejected batch must not
        // reach the provider at all
        let err = wallet.execute_batch(&[]).await.unwrap_err();
        assert!(matches!(err, SdkError::Config(_)));
    }

    #[tokio::test]
    async fn init_rejects_malformed_private_key() {
        let (provider, mock) = Provider::mocked();
        mock.push(U256::from(31337)).unwrap();

        let config = SdkConfig::new(
            "https://platform.example.com",
            "test-key",
            "https://rpc.example.com",
            Address::repeat_byte(0x01),
            Address::repeat_byte(0x02),
        );
        let err = SmartWallet::init(Arc::new(provider), "0xnot-a-key", &config)
            .await
            .unwrap_err();
        assert!(matches!(err, SdkError::Signer(_)));
    }
}
