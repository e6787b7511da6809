//! SDK facade: composes the wallet proxy, bundler, paymaster and REST
//! modules into the user-facing operations.
//!
//! Every operation that spends tokens funnels into a single submission path,
//! so one logical request produces at most one on-chain transaction (the
//! fee-bumped retry replaces the rejected submission, it never duplicates an
//! accepted one).

use crate::api::{self, ApiClient, AuthRequest};
use crate::bundler::{BundlerClient, PendingUserOperation};
use crate::config::SdkConfig;
use crate::contracts::Erc20;
use crate::encoding::{
    self, encode_erc20_approve, encode_erc20_transfer, encode_erc721_approve,
    encode_erc721_safe_transfer, to_base_units,
};
use crate::error::{Result, SdkError};
use crate::fees::retry_on_underpriced;
use crate::paymaster::PaymasterClient;
use crate::types::{Call, TokenDetails, TokenKind, TxOptions, NATIVE_TOKEN};
use crate::wallet::SmartWallet;
use ethers::prelude::*;
use ethers::providers::{Http, Provider};

pub use crate::api::staking::StakeRequest;
pub use crate::api::trade::SwapQuoteRequest;

/// Parameters for the allowance-aware spend dispatch.
#[derive(Debug, Clone)]
pub struct TokenOperation {
    /// Token being spent; the native sentinel selects the direct-value path.
    pub token: Address,
    /// Contract that will pull the tokens (and target of `call_data`).
    pub spender: Address,
    /// Pre-encoded calldata for the spender contract.
    pub call_data: Bytes,
    /// Base-unit amount being spent.
    pub amount: U256,
}

/// The SDK entry point: one authenticated smart-wallet session.
pub struct SmartWalletSdk {
    wallet: SmartWallet<Provider<Http>>,
    bundler: BundlerClient,
    paymaster: PaymasterClient,
    api: ApiClient,
    config: SdkConfig,
}

impl SmartWalletSdk {
    /// Builds a session from an owner private key and platform config.
    /// Deterministic given identical credentials and config.
    pub async fn init(private_key: &str, config: SdkConfig) -> Result<Self> {
        let wallet = SmartWallet::connect(private_key, &config).await?;
        let bundler = BundlerClient::new(config.bundler_url());
        let paymaster = PaymasterClient::new(config.paymaster_url());
        let api = ApiClient::new(config.base_url.clone(), config.api_key.clone());

        Ok(Self {
            wallet,
            bundler,
            paymaster,
            api,
            config,
        })
    }

    /// The smart wallet's address (distinct from the signer EOA).
    pub fn get_sender(&self) -> Address {
        self.wallet.sender()
    }

    pub fn wallet(&self) -> &SmartWallet<Provider<Http>> {
        &self.wallet
    }

    /// Signs the challenge binding the smart-wallet address and exchanges it
    /// for a JWT used by subsequent module calls.
    pub async fn authenticate(&self) -> Result<String> {
        let challenge = auth_challenge(self.wallet.sender());
        let signature = self.wallet.sign_challenge(&challenge).await?;

        let auth = self
            .api
            .authenticate(&AuthRequest {
                owner: self.wallet.owner(),
                smart_wallet: self.wallet.sender(),
                signature: encoding::fmt_bytes(&signature),
            })
            .await?;

        tracing::info!(smart_wallet = ?self.wallet.sender(), "authenticated");
        Ok(auth.token)
    }

    /// Transfers `amount` base units of `token` to `recipient`.
    pub async fn transfer_token(
        &self,
        token: Address,
        recipient: Address,
        amount: U256,
        opts: Option<TxOptions>,
    ) -> Result<PendingUserOperation> {
        let call = if token == NATIVE_TOKEN {
            Call::native_transfer(recipient, amount)
        } else {
            Call::new(token, encode_erc20_transfer(recipient, amount)?)
        };
        self.execute_with_retry(vec![call], opts.unwrap_or_default())
            .await
    }

    pub async fn transfer_nft(
        &self,
        contract: Address,
        recipient: Address,
        token_id: U256,
        opts: Option<TxOptions>,
    ) -> Result<PendingUserOperation> {
        let data = encode_erc721_safe_transfer(self.wallet.sender(), recipient, token_id)?;
        self.execute_with_retry(vec![Call::new(contract, data)], opts.unwrap_or_default())
            .await
    }

    pub async fn approve_token(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
        opts: Option<TxOptions>,
    ) -> Result<PendingUserOperation> {
        let data = encode_erc20_approve(spender, amount)?;
        self.execute_with_retry(vec![Call::new(token, data)], opts.unwrap_or_default())
            .await
    }

    pub async fn approve_nft_token(
        &self,
        contract: Address,
        spender: Address,
        token_id: U256,
        opts: Option<TxOptions>,
    ) -> Result<PendingUserOperation> {
        let data = encode_erc721_approve(spender, token_id)?;
        self.execute_with_retry(vec![Call::new(contract, data)], opts.unwrap_or_default())
            .await
    }

    /// Submits the calls as one atomic user operation, with the one-shot
    /// fee-bumped retry on an underpriced rejection.
    pub async fn execute_batch(
        &self,
        calls: Vec<Call>,
        opts: Option<TxOptions>,
    ) -> Result<PendingUserOperation> {
        self.execute_with_retry(calls, opts.unwrap_or_default())
            .await
    }

    /// Force-approve path: always emits the `[approve, call]` batch, even if
    /// the current allowance already covers `value`. Use
    /// [`process_operation`](Self::process_operation) for allowance-aware
    /// skipping; both entry points are intentionally kept separate.
    pub async fn approve_token_and_call_contract(
        &self,
        token: Address,
        spender: Address,
        value: U256,
        call_data: Bytes,
        opts: Option<TxOptions>,
    ) -> Result<PendingUserOperation> {
        let calls = force_approve_calls(token, spender, value, call_data)?;
        self.execute_with_retry(calls, opts.unwrap_or_default())
            .await
    }

    /// The canonical smart-spend dispatch, reused by swap/stake/unstake:
    /// native tokens execute directly with the value attached; an already
    /// sufficient allowance executes directly with value zero; otherwise an
    /// approval is prepended in the same atomic batch.
    pub async fn process_operation(
        &self,
        op: TokenOperation,
        opts: Option<TxOptions>,
    ) -> Result<PendingUserOperation> {
        let allowance = if op.token == NATIVE_TOKEN {
            None
        } else {
            Some(self.get_allowance(op.token, op.spender).await?)
        };
        let calls = plan_spend(&op, allowance)?;
        self.execute_with_retry(calls, opts.unwrap_or_default())
            .await
    }

    /// Fetches a swap call plan from the trade module and executes it through
    /// the allowance-aware dispatch.
    pub async fn swap_tokens(
        &self,
        request: SwapQuoteRequest,
        opts: Option<TxOptions>,
    ) -> Result<PendingUserOperation> {
        let plan = api::trade::get_swap_quote(&self.api, &request).await?;
        let decimals = self.token_decimals(request.from_token).await?;
        let amount = to_base_units(&request.amount, decimals)?;

        self.process_operation(
            TokenOperation {
                token: request.from_token,
                spender: plan.router,
                call_data: plan.call_data,
                amount,
            },
            opts,
        )
        .await
    }

    pub async fn stake_token(
        &self,
        request: StakeRequest,
        opts: Option<TxOptions>,
    ) -> Result<PendingUserOperation> {
        let plan = api::staking::get_stake_call(&self.api, &request).await?;
        self.execute_staking_plan(request, plan, opts).await
    }

    pub async fn unstake_token(
        &self,
        request: StakeRequest,
        opts: Option<TxOptions>,
    ) -> Result<PendingUserOperation> {
        let plan = api::staking::get_unstake_call(&self.api, &request).await?;
        self.execute_staking_plan(request, plan, opts).await
    }

    async fn execute_staking_plan(
        &self,
        request: StakeRequest,
        plan: api::staking::StakingCallPlan,
        opts: Option<TxOptions>,
    ) -> Result<PendingUserOperation> {
        let decimals = self.token_decimals(request.token).await?;
        let amount = to_base_units(&request.amount, decimals)?;

        self.process_operation(
            TokenOperation {
                token: request.token,
                spender: plan.contract_address,
                call_data: plan.call_data,
                amount,
            },
            opts,
        )
        .await
    }

    /// Native chain balance, or `balanceOf` for ERC-20 tokens.
    pub async fn get_balance(&self, token: Address, address: Address) -> Result<U256> {
        if token == NATIVE_TOKEN {
            return self
                .wallet
                .client()
                .get_balance(address, None)
                .await
                .map_err(|e| SdkError::Rpc(format!("eth_getBalance failed: {e}")));
        }
        let erc20 = Erc20::new(token, self.wallet.client());
        erc20
            .balance_of(address)
            .call()
            .await
            .map_err(|e| SdkError::Rpc(format!("balanceOf failed: {e}")))
    }

    /// `allowance(owner = smart wallet, spender)` for an ERC-20 token.
    pub async fn get_allowance(&self, token: Address, spender: Address) -> Result<U256> {
        let erc20 = Erc20::new(token, self.wallet.client());
        erc20
            .allowance(self.wallet.sender(), spender)
            .call()
            .await
            .map_err(|e| SdkError::Rpc(format!("allowance failed: {e}")))
    }

    /// Token descriptor. The native sentinel short-circuits without any
    /// network call; ERC-20 details are resolved with concurrent reads.
    pub async fn get_token_details(&self, token: Address) -> Result<TokenDetails> {
        if token == NATIVE_TOKEN {
            return Ok(native_token_details());
        }

        let erc20 = Erc20::new(token, self.wallet.client());
        let owner = self.wallet.sender();
        let (name, symbol, decimals, balance) = tokio::try_join!(
            async {
                erc20
                    .name()
                    .call()
                    .await
                    .map_err(|e| SdkError::Rpc(format!("name failed: {e}")))
            },
            async {
                erc20
                    .symbol()
                    .call()
                    .await
                    .map_err(|e| SdkError::Rpc(format!("symbol failed: {e}")))
            },
            async {
                erc20
                    .decimals()
                    .call()
                    .await
                    .map_err(|e| SdkError::Rpc(format!("decimals failed: {e}")))
            },
            async {
                erc20
                    .balance_of(owner)
                    .call()
                    .await
                    .map_err(|e| SdkError::Rpc(format!("balanceOf failed: {e}")))
            },
        )?;

        Ok(TokenDetails {
            contract_address: token,
            name,
            symbol,
            decimals,
            balance,
            kind: TokenKind::Erc20,
        })
    }

    pub async fn list_nfts(&self) -> Result<Vec<api::nft::NftItem>> {
        api::nft::list(&self.api, self.wallet.sender()).await
    }

    pub async fn get_portfolio(&self) -> Result<Vec<api::explorer::PortfolioEntry>> {
        api::explorer::get_portfolio(&self.api, self.wallet.sender()).await
    }

    pub async fn get_transactions(&self) -> Result<Vec<api::explorer::TransactionRecord>> {
        api::explorer::get_transactions(&self.api, self.wallet.sender()).await
    }

    pub async fn get_staking_apr(&self, token: Address) -> Result<api::staking::StakingApr> {
        api::staking::get_apr(&self.api, token).await
    }

    async fn token_decimals(&self, token: Address) -> Result<u8> {
        if token == NATIVE_TOKEN {
            return Ok(18);
        }
        let erc20 = Erc20::new(token, self.wallet.client());
        erc20
            .decimals()
            .call()
            .await
            .map_err(|e| SdkError::Rpc(format!("decimals failed: {e}")))
    }

    async fn execute_with_retry(
        &self,
        calls: Vec<Call>,
        opts: TxOptions,
    ) -> Result<PendingUserOperation> {
        let initial_fee = U256::from_dec_str(opts.max_fee_per_gas.trim()).map_err(|e| {
            SdkError::Config(format!(
                "invalid maxFeePerGas {:?}: {e}",
                opts.max_fee_per_gas
            ))
        })?;

        let calls = &calls[..];
        retry_on_underpriced(
            &opts,
            &self.config.fee_classifier,
            self.wallet.fees(),
            initial_fee,
            |_fee| self.submit(calls),
        )
        .await
    }

    /// Builds, sponsors, signs, estimates and sends one user operation.
    ///
    /// Order matters: stub paymaster data before gas estimation, final data
    /// after, and a re-sign whenever the signed fields change.
    async fn submit(&self, calls: &[Call]) -> Result<PendingUserOperation> {
        let mut op = if calls.len() == 1 {
            self.wallet.execute(&calls[0]).await?
        } else {
            self.wallet.execute_batch(calls).await?
        };

        let policy = self.config.sponsorship_policy.as_deref();
        if self.config.sponsor_gas {
            let stub = self
                .paymaster
                .get_paymaster_stub_data(
                    encoding::user_op_to_json(&op),
                    self.wallet.entry_point(),
                    self.wallet.chain_id(),
                    policy,
                )
                .await?;
            op.paymaster_and_data = stub;
        }

        // Sign for estimation.
        self.wallet.sign_user_operation(&mut op).await?;

        let est = self
            .bundler
            .estimate_user_operation_gas(encoding::user_op_to_json(&op), self.wallet.entry_point())
            .await?;
        op.call_gas_limit = est.call_gas_limit;
        op.verification_gas_limit = est.verification_gas_limit;
        op.pre_verification_gas = est.pre_verification_gas;

        if self.config.sponsor_gas {
            let final_pm = self
                .paymaster
                .get_paymaster_data(
                    encoding::user_op_to_json(&op),
                    self.wallet.entry_point(),
                    self.wallet.chain_id(),
                    policy,
                )
                .await?;
            op.paymaster_and_data = final_pm;
        }

        // Re-sign with final gas limits + final paymasterAndData.
        self.wallet.sign_user_operation(&mut op).await?;

        let hash = self
            .bundler
            .send_user_operation(encoding::user_op_to_json(&op), self.wallet.entry_point())
            .await?;

        tracing::info!(
            user_op_hash = %encoding::fmt_h256(hash),
            calls = calls.len(),
            "user operation submitted"
        );

        Ok(PendingUserOperation::new(
            self.bundler.clone(),
            hash,
            self.config.receipt_poll_interval,
            self.config.receipt_timeout,
        ))
    }
}

/// Challenge message signed by the owner EOA during authentication. Binds
/// the smart-wallet address so a stolen signature cannot authorize another
/// wallet.
fn auth_challenge(smart_wallet: Address) -> String {
    format!("smart-wallet-auth:{}", encoding::fmt_address(smart_wallet))
}

/// Pure spend planner behind [`SmartWalletSdk::process_operation`].
/// `allowance` is `None` for the native token.
fn plan_spend(op: &TokenOperation, allowance: Option<U256>) -> Result<Vec<Call>> {
    match allowance {
        // Native: value rides on the call itself, calldata unchanged.
        None => Ok(vec![Call {
            to: op.spender,
            value: op.amount,
            data: op.call_data.clone(),
        }]),
        // Spend already authorized.
        Some(current) if current >= op.amount => {
            Ok(vec![Call::new(op.spender, op.call_data.clone())])
        }
        // Approve then call, atomically.
        Some(_) => Ok(vec![
            Call::new(op.token, encode_erc20_approve(op.spender, op.amount)?),
            Call::new(op.spender, op.call_data.clone()),
        ]),
    }
}

fn force_approve_calls(
    token: Address,
    spender: Address,
    value: U256,
    call_data: Bytes,
) -> Result<Vec<Call>> {
    Ok(vec![
        Call::new(token, encode_erc20_approve(spender, value)?),
        Call::new(spender, call_data),
    ])
}

fn native_token_details() -> TokenDetails {
    TokenDetails {
        contract_address: NATIVE_TOKEN,
        name: "Native Token".to_string(),
        symbol: "NATIVE".to_string(),
        decimals: 18,
        balance: U256::zero(),
        kind: TokenKind::Native,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(token: Address, amount: u64) -> TokenOperation {
        TokenOperation {
            token,
            spender: Address::repeat_byte(0xab),
            call_data: Bytes::from(vec![0x01, 0x02, 0x03]),
            amount: U256::from(amount),
        }
    }

    #[test]
    fn plan_native_is_single_call_with_value_and_original_calldata() {
        let op = op(NATIVE_TOKEN, 500);
        let calls = plan_spend(&op, None).unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].to, op.spender);
        assert_eq!(calls[0].value, U256::from(500));
        assert_eq!(calls[0].data, op.call_data);
    }

    #[test]
    fn plan_sufficient_allowance_skips_approval() {
        let op = op(Address::repeat_byte(0x10), 500);
        for allowance in [500u64, 501, u64::MAX] {
            let calls = plan_spend(&op, Some(U256::from(allowance))).unwrap();
            assert_eq!(calls.len(), 1, "allowance={allowance}");
            assert_eq!(calls[0].to, op.spender);
            assert_eq!(calls[0].value, U256::zero());
            assert_eq!(calls[0].data, op.call_data);
        }
    }

    #[test]
    fn plan_insufficient_allowance_prepends_approval() {
        let token = Address::repeat_byte(0x10);
        let op = op(token, 500);
        let calls = plan_spend(&op, Some(U256::from(499))).unwrap();
        assert_eq!(calls.len(), 2);

        // approve(spender, amount) comes first, addressed to the token.
        assert_eq!(calls[0].to, token);
        assert_eq!(calls[0].value, U256::zero());
        assert_eq!(
            calls[0].data,
            encode_erc20_approve(op.spender, op.amount).unwrap()
        );

        assert_eq!(calls[1].to, op.spender);
        assert_eq!(calls[1].data, op.call_data);
    }

    #[test]
    fn plan_zero_amount_never_needs_approval() {
        let op = op(Address::repeat_byte(0x10), 0);
        let calls = plan_spend(&op, Some(U256::zero())).unwrap();
        assert_eq!(calls.len(), 1);
    }

    #[test]
    fn force_approve_always_emits_two_calls() {
        let token = Address::repeat_byte(0x10);
        let spender = Address::repeat_byte(0x20);
        let data = Bytes::from(vec![0xaa]);
        let calls = force_approve_calls(token, spender, U256::from(7), data.clone()).unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].to, token);
        assert_eq!(calls[1].to, spender);
        assert_eq!(calls[1].data, data);
    }

    #[test]
    fn native_details_need_no_network() {
        let details = native_token_details();
        assert_eq!(details.contract_address, NATIVE_TOKEN);
        assert_eq!(details.kind, TokenKind::Native);
        assert_eq!(details.balance, U256::zero());
        assert_eq!(details.decimals, 18);
    }

    #[test]
    fn auth_challenge_binds_wallet_address() {
        let a = auth_challenge(Address::repeat_byte(0x11));
        let b = auth_challenge(Address::repeat_byte(0x22));
        assert_ne!(a, b);
        assert!(a.contains("0x1111111111111111111111111111111111111111"));
    }
}
