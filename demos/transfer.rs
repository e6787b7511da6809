//! Minimal end-to-end walkthrough: derive the smart wallet, transfer a token
//! (native or ERC-20), and wait for the user-operation receipt.
//!
//! ```text
//! cargo run --example transfer -- \
//!     --recipient 0x... --amount 1000000000000000
//! ```

use aa_wallet_sdk::{NATIVE_TOKEN, Result, SdkConfig, SdkError, SmartWalletSdk, TxOptions};
use clap::Parser;
use ethers::types::{Address, U256};

#[derive(Parser, Debug)]
#[command(name = "transfer", version)]
struct Cli {
    /// Platform base URL.
    #[arg(long, env = "WALLET_SDK_BASE_URL")]
    base_url: String,

    /// Platform API key.
    #[arg(long, env = "WALLET_SDK_API_KEY")]
    api_key: String,

    /// Chain RPC URL for contract reads.
    #[arg(long, env = "WALLET_SDK_RPC_URL")]
    rpc: String,

    /// EntryPoint address (v0.6).
    #[arg(long, env = "WALLET_SDK_ENTRY_POINT")]
    entry_point: Address,

    /// SimpleAccountFactory address.
    #[arg(long, env = "WALLET_SDK_FACTORY")]
    factory: Address,

    /// Owner EOA private key (hex).
    #[arg(long, env = "WALLET_SDK_PRIVATE_KEY")]
    private_key: String,

    /// Token to send; omit for the native token.
    #[arg(long)]
    token: Option<Address>,

    /// Transfer recipient.
    #[arg(long)]
    recipient: Address,

    /// Amount in base units (decimal).
    #[arg(long)]
    amount: String,

    /// Starting maxFeePerGas in wei.
    #[arg(long, default_value = "2000000000")]
    max_fee_per_gas: String,

    /// Disable the one-shot fee-bumped retry.
    #[arg(long)]
    no_retry: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = SdkConfig::new(
        cli.base_url,
        cli.api_key,
        cli.rpc,
        cli.entry_point,
        cli.factory,
    );
    let sdk = SmartWalletSdk::init(&cli.private_key, config).await?;
    tracing::info!(smart_wallet = ?sdk.get_sender(), "wallet ready");

    let token = cli.token.unwrap_or(NATIVE_TOKEN);
    let amount = U256::from_dec_str(&cli.amount)
        .map_err(|e| SdkError::config(format!("invalid --amount {:?}: {e}", cli.amount)))?;
    let opts = TxOptions {
        max_fee_per_gas: cli.max_fee_per_gas,
        with_retry: !cli.no_retry,
        ..TxOptions::default()
    };

    let pending = sdk
        .transfer_token(token, cli.recipient, amount, Some(opts))
        .await?;
    println!("userOpHash: {:#x}", pending.user_op_hash);

    match pending.wait().await? {
        Some(receipt) => {
            println!(
                "included: success={} actualGasUsed={}",
                receipt.success, receipt.actual_gas_used
            );
            Ok(())
        }
        None => Err(SdkError::rpc("timed out waiting for the receipt")),
    }
}
