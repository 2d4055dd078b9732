// src/main.rs
use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use ethers::types::{Address, U256};
use ethers::utils::format_units;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use permit_paymaster::{
    config, ClaimOutcome, GaslessClient, LocalOwnerAccount, NetworkConfig, PipelineError,
};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Owner private key; falls back to the OWNER_PRIVATE_KEY env var.
    #[clap(short, long)]
    private_key: Option<String>,

    /// Smart account address when it differs from the owner address.
    #[clap(long)]
    account: Option<String>,

    #[clap(long, default_value_t = config::ARBITRUM_SEPOLIA_CHAIN_ID)]
    chain_id: u64,

    #[clap(long, default_value = config::ARBITRUM_SEPOLIA_RPC_URL)]
    rpc_url: String,

    #[clap(long, default_value = config::ARBITRUM_SEPOLIA_BUNDLER_URL)]
    bundler_url: String,

    #[clap(long, default_value = config::ARBITRUM_SEPOLIA_USDC)]
    fee_token: String,

    #[clap(long, default_value = config::ARBITRUM_SEPOLIA_PAYMASTER)]
    paymaster: String,

    #[clap(long)]
    claim_contract: String,

    #[clap(long, default_value = config::ENTRY_POINT_V07)]
    entry_point: String,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Transfer fee tokens, paying gas in the same token.
    Transfer {
        #[clap(long)]
        to: String,
        /// Human-readable amount, e.g. "3.50".
        #[clap(long)]
        amount: String,
    },
    /// Claim the airdrop, paying gas in the fee token.
    Claim,
    /// Read-only eligibility probe, no operation submitted.
    CheckEligibility,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Parse command line arguments
    let args = Args::parse();

    let config = NetworkConfig::new(
        args.chain_id,
        args.rpc_url.clone(),
        args.bundler_url.clone(),
        parse_address(&args.fee_token, "fee token")?,
        parse_address(&args.paymaster, "paymaster")?,
        parse_address(&args.claim_contract, "claim contract")?,
        parse_address(&args.entry_point, "entry point")?,
    );

    let private_key = args
        .private_key
        .or_else(|| std::env::var("OWNER_PRIVATE_KEY").ok())
        .ok_or_else(|| anyhow!("pass --private-key or set OWNER_PRIVATE_KEY"))?;

    let mut account = LocalOwnerAccount::from_owner_key(&private_key, args.chain_id)?;
    if let Some(address) = &args.account {
        account = account.with_account_address(parse_address(address, "account")?);
    }

    let decimals = config.token_decimals;
    let client = GaslessClient::new(config, account)?;

    match args.command {
        Command::Transfer { to, amount } => {
            let recipient = parse_address(&to, "recipient")?;
            let amount: U256 = ethers::utils::parse_units(amount.as_str(), decimals)
                .context("transfer amount")?
                .into();

            match client.transfer(recipient, amount).await {
                Ok(receipt) => {
                    if receipt.success {
                        info!(
                            "transfer confirmed in tx {:?}, gas used {}",
                            receipt.receipt.transaction_hash, receipt.actual_gas_used
                        );
                        println!("Transfer completed successfully.");
                    } else {
                        println!("Transfer reverted on-chain. Please try again.");
                    }
                }
                Err(e) => report_failure(e, decimals)?,
            }
        }
        Command::Claim => match client.claim().await {
            Ok(ClaimOutcome::Claimed(receipt)) => {
                if receipt.success {
                    info!(
                        "claim confirmed in tx {:?}, gas used {}",
                        receipt.receipt.transaction_hash, receipt.actual_gas_used
                    );
                    println!("Airdrop claimed successfully!");
                } else {
                    println!("Claim reverted on-chain. Please try again.");
                }
            }
            Ok(ClaimOutcome::AlreadyClaimed) => {
                println!("You have already claimed your airdrop.");
            }
            Ok(ClaimOutcome::NotEligible) => {
                println!("This account is not eligible for the airdrop.");
            }
            Err(e) => report_failure(e, decimals)?,
        },
        Command::CheckEligibility => {
            let eligible = client.check_eligibility().await?;
            println!(
                "{}",
                if eligible {
                    "Eligible for the airdrop."
                } else {
                    "Not eligible (or already claimed)."
                }
            );
        }
    }

    Ok(())
}

fn parse_address(value: &str, what: &str) -> anyhow::Result<Address> {
    value
        .parse::<Address>()
        .map_err(|e| anyhow!("invalid {what} address {value}: {e}"))
}

/// Renders pipeline failures with token amounts at display precision.
fn report_failure(failure: PipelineError, decimals: u32) -> anyhow::Result<()> {
    error!("operation failed: {failure}");
    if let PipelineError::InsufficientBalance {
        balance,
        requested,
        buffer,
        max_transferable,
    } = &failure
    {
        println!("Insufficient balance for this action.");
        println!("  Current balance:      {}", format_units(*balance, decimals)?);
        println!("  Requested amount:     {}", format_units(*requested, decimals)?);
        println!("  Gas buffer needed:    {}", format_units(*buffer, decimals)?);
        println!(
            "  Maximum transferable: {}",
            format_units(*max_transferable, decimals)?
        );
        return Err(failure.into());
    }
    Err(failure.into())
}
