//! Environment-based configuration
//!
//! Reads the same settings as the JSON config file from environment
//! variables (a `.env` file is honoured by the CLI):
//!
//! ```bash
//! export BITGO_ACCESS_TOKEN="v2x..."
//! export BITGO_ENVIRONMENT="test"
//! export BITGO_ESCROW_ADDRESS="2N..."
//! export BITGO_UNSPENDABLE_XPUB="xpub..."
//! export COINBASE_WIDGET_CODE="..."
//! ```

use super::{
    BitGoConfig, CoinbaseConfig, Environment, RateFeedConfig, VelocityPolicy, WalletConfig,
    DEFAULT_BACKEND_TIMEOUT_SECS,
};
use crate::{Error, Result};
use secrecy::SecretString;

/// Environment variable names
pub mod env_vars {
    pub const BITGO_ACCESS_TOKEN: &str = "BITGO_ACCESS_TOKEN";
    pub const BITGO_ENVIRONMENT: &str = "BITGO_ENVIRONMENT";
    pub const BITGO_BASE_URL: &str = "BITGO_BASE_URL";
    pub const BITGO_UNSPENDABLE_XPUB: &str = "BITGO_UNSPENDABLE_XPUB";
    pub const BITGO_ENTERPRISE_ID: &str = "BITGO_ENTERPRISE_ID";
    pub const BITGO_ESCROW_ADDRESS: &str = "BITGO_ESCROW_ADDRESS";
    pub const COINBASE_WIDGET_CODE: &str = "COINBASE_WIDGET_CODE";
    pub const RATE_FEED_URL: &str = "RATE_FEED_URL";
}

impl WalletConfig {
    /// Build configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let access_token = lookup(env_vars::BITGO_ACCESS_TOKEN).ok_or_else(|| {
            Error::Config(format!(
                "Environment variable {} not set",
                env_vars::BITGO_ACCESS_TOKEN
            ))
        })?;

        let environment = match lookup(env_vars::BITGO_ENVIRONMENT) {
            Some(value) => value.parse()?,
            None => Environment::default(),
        };

        let coinbase = lookup(env_vars::COINBASE_WIDGET_CODE).map(|widget_code| {
            tracing::debug!("Using COINBASE_WIDGET_CODE for fiat checkout links");
            CoinbaseConfig { widget_code }
        });

        let mut rates = RateFeedConfig::default();
        if let Some(url) = lookup(env_vars::RATE_FEED_URL) {
            tracing::debug!("Using RATE_FEED_URL for exchange rates");
            rates.url = url;
        }

        let config = WalletConfig {
            bitgo: BitGoConfig {
                access_token: SecretString::from(access_token),
                environment,
                base_url: lookup(env_vars::BITGO_BASE_URL),
                unspendable_xpub: lookup(env_vars::BITGO_UNSPENDABLE_XPUB),
                enterprise_id: lookup(env_vars::BITGO_ENTERPRISE_ID),
                escrow_address: lookup(env_vars::BITGO_ESCROW_ADDRESS).unwrap_or_default(),
                timeout_secs: DEFAULT_BACKEND_TIMEOUT_SECS,
            },
            coinbase,
            rates,
            policy: VelocityPolicy::default(),
        };
        config.validate()?;

        tracing::debug!(environment = config.bitgo.environment.name(), "Wallet configuration loaded from environment");
        Ok(config)
    }
}
