//! Custodial wallet gateway CLI
//!
//! Command-line access to the wallet façade, mostly for operating and
//! debugging a deployment against the backend's test environment.

use clap::{Parser, Subcommand};
use custody_wallet::wallet::UserKeychain;
use custody_wallet::{Error, Result, WalletConfig, WalletFacade, WalletInfo};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// How long rate-dependent commands wait for the first table
const FIRST_RATES_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Parser)]
#[command(name = "custody-wallet")]
#[command(about = "Multi-provider custodial bitcoin wallet gateway")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file (JSON); environment variables otherwise
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show current configuration (secrets redacted)
    Config,

    /// Fetch the exchange-rate table once and print it
    Rates,

    /// Wallet balances in satoshis
    Balances {
        /// Provider identifier (bitgo)
        #[arg(short, long, default_value = "bitgo")]
        provider: String,

        /// Backend wallet id
        #[arg(short, long)]
        address: String,
    },

    /// Checkout link for funding a wallet
    PaymentInfo {
        #[arg(short, long, default_value = "bitgo")]
        provider: String,

        #[arg(short, long)]
        address: String,

        /// Fiat amount
        #[arg(long)]
        amount: f64,

        #[arg(long, default_value = "USD")]
        currency: String,
    },

    /// Build an unsigned transaction paying a fiat amount to escrow
    UnsignedTx {
        #[arg(short, long, default_value = "bitgo")]
        provider: String,

        #[arg(short, long)]
        address: String,

        /// Fiat amount
        #[arg(long)]
        amount: f64,

        #[arg(long, default_value = "USD")]
        currency: String,

        /// Spendable satoshis to bound the transaction by
        #[arg(long)]
        balance: u64,
    },

    /// Submit a signed transaction
    SubmitTx {
        #[arg(short, long, default_value = "bitgo")]
        provider: String,

        #[arg(short, long)]
        address: String,

        /// Signed transaction (hex)
        #[arg(long)]
        tx: String,
    },

    /// Create a 2-of-3 custodial wallet
    Create {
        /// Callback URL prefix for the transaction webhook
        #[arg(long)]
        prefix: String,

        #[arg(long)]
        label: String,

        /// User keychain public key
        #[arg(long)]
        xpub: String,

        /// User keychain encrypted private key
        #[arg(long)]
        encrypted_xprv: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json);

    let config = match &cli.config {
        Some(path) => WalletConfig::from_file(path)?,
        None => WalletConfig::from_env()?,
    };

    let facade = WalletFacade::from_config(config)?;

    match cli.command {
        Commands::Config => {
            print_json(&facade.config().summary())?;
        }
        Commands::Rates => {
            let refresher = facade.rate_refresher()?;
            if !refresher.refresh().await {
                return Err(Error::RateFeed("rate refresh failed".to_string()));
            }
            print_json(facade.rates().snapshot().as_ref())?;
        }
        Commands::Balances { provider, address } => {
            let info = WalletInfo::new(provider, address);
            print_json(&facade.balances(&info).await?)?;
        }
        Commands::PaymentInfo {
            provider,
            address,
            amount,
            currency,
        } => {
            let info = WalletInfo::new(provider, address);
            print_json(&facade.payment_info(&info, amount, &currency)?)?;
        }
        Commands::UnsignedTx {
            provider,
            address,
            amount,
            currency,
            balance,
        } => {
            wait_for_rates(&facade).await?;
            let info = WalletInfo::new(provider, address);
            let tx = facade
                .unsigned_tx(&info, amount, &currency, balance)
                .await?;
            if tx.is_none() {
                tracing::warn!(amount, currency = %currency, balance, "No transaction proposed");
            }
            print_json(&tx)?;
        }
        Commands::SubmitTx {
            provider,
            address,
            tx,
        } => {
            let info = WalletInfo::new(provider, address);
            print_json(&facade.submit_tx(&info, &tx).await?)?;
        }
        Commands::Create {
            prefix,
            label,
            xpub,
            encrypted_xprv,
        } => {
            let keychain = UserKeychain {
                xpub,
                encrypted_xprv,
            };
            print_json(&facade.create(&prefix, &label, &keychain).await?)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}

/// Start the refresh task and wait for its first table
async fn wait_for_rates(facade: &WalletFacade) -> Result<()> {
    let mut updates = facade.rates().subscribe();
    let _task = facade.rate_refresher()?.spawn();

    tokio::time::timeout(FIRST_RATES_TIMEOUT, updates.changed())
        .await
        .map_err(|_| Error::RateFeed("timed out waiting for exchange rates".to_string()))?
        .map_err(|_| Error::RateFeed("rate refresh task stopped".to_string()))?;
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
