//! Client SDK for ERC-4337 smart wallets.
//!
//! The crate wraps the full account-abstraction pipeline behind
//! [`SmartWalletSdk`]: counterfactual wallet derivation, user-operation
//! construction and signing, ERC-7677 gas sponsorship, bundler submission with
//! a one-shot fee-bumped retry, and receipt tracking. On top of the pipeline
//! sit the platform REST modules (trade, staking, nft, explorer), whose call
//! plans are executed through the same allowance-aware dispatch.
//!
//! ```no_run
//! use aa_wallet_sdk::{SdkConfig, SmartWalletSdk};
//! use ethers::types::{Address, U256};
//!
//! # async fn demo() -> aa_wallet_sdk::Result<()> {
//! let config = SdkConfig::new(
//!     "https://platform.example",
//!     "api-key",
//!     "https://rpc.example",
//!     "0x5FF137D4b0FDCD49DcA30c7CF57E578a026d2789".parse().unwrap(),
//!     "0x9406Cc6185a346906296840746125a0E44976454".parse().unwrap(),
//! );
//! let sdk = SmartWalletSdk::init("0xabc...", config).await?;
//! let pending = sdk
//!     .transfer_token(
//!         aa_wallet_sdk::NATIVE_TOKEN,
//!         Address::zero(),
//!         U256::from(1_000u64),
//!         None,
//!     )
//!     .await?;
//! let receipt = pending.wait().await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod bundler;
pub mod config;
pub mod contracts;
pub mod encoding;
pub mod error;
pub mod fees;
pub mod orchestrator;
pub mod paymaster;
pub mod types;
pub mod wallet;

pub use bundler::{BundlerClient, PendingUserOperation};
pub use config::SdkConfig;
pub use error::{Result, SdkError};
pub use orchestrator::{SmartWalletSdk, StakeRequest, SwapQuoteRequest, TokenOperation};
pub use paymaster::PaymasterClient;
pub use types::{
    Call, GasEstimates, SmartWalletEvent, TokenDetails, TokenKind, TxOptions, UserOperation,
    UserOperationReceipt, NATIVE_TOKEN,
};
pub use wallet::SmartWallet;
