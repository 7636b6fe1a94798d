//! Configuration for the custodial wallet gateway

mod env;

pub use env::env_vars;

use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use std::path::Path;
use std::str::FromStr;

/// Exchange-rate feed polled by the rate cache
pub const DEFAULT_RATE_FEED_URL: &str = "https://api.bitcoinaverage.com/ticker/global/all";

/// Rate refresh period (5 minutes)
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 300;

/// HTTP timeout for custodial backend calls
pub const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 30;

/// Per-request timeout for the exchange-rate feed
pub const DEFAULT_RATE_FEED_TIMEOUT_SECS: u64 = 30;

/// Custodial backend environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Prod,
    Test,
}

impl Environment {
    pub fn name(&self) -> &'static str {
        match self {
            Environment::Prod => "prod",
            Environment::Test => "test",
        }
    }

    /// REST root of the custodial backend for this environment
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Environment::Prod => "https://www.bitgo.com/api/v1",
            Environment::Test => "https://test.bitgo.com/api/v1",
        }
    }
}

impl FromStr for Environment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "prod" | "production" => Ok(Environment::Prod),
            "test" | "testnet" => Ok(Environment::Test),
            other => Err(Error::Config(format!("unknown environment: {}", other))),
        }
    }
}

fn secret_string<'de, D>(deserializer: D) -> std::result::Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

/// Custodial bitcoin backend settings
#[derive(Debug, Deserialize)]
pub struct BitGoConfig {
    /// Bearer token for the backend API
    #[serde(alias = "accessToken", deserialize_with = "secret_string")]
    pub access_token: SecretString,
    #[serde(default)]
    pub environment: Environment,
    /// Overrides the environment's default REST root
    #[serde(default, alias = "baseUrl")]
    pub base_url: Option<String>,
    /// Public key of the unspendable third keychain in created wallets
    #[serde(default, alias = "unspendableXpub")]
    pub unspendable_xpub: Option<String>,
    #[serde(default, alias = "enterpriseId")]
    pub enterprise_id: Option<String>,
    /// Destination of every constructed transaction
    #[serde(default, alias = "escrowAddress")]
    pub escrow_address: String,
    #[serde(default = "default_timeout_secs", alias = "timeoutSecs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_BACKEND_TIMEOUT_SECS
}

impl BitGoConfig {
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.environment.default_base_url())
    }
}

/// Hosted fiat checkout settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoinbaseConfig {
    #[serde(alias = "widgetCode")]
    pub widget_code: String,
}

/// Exchange-rate feed settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateFeedConfig {
    pub url: String,
    pub refresh_interval_secs: u64,
    /// Per-fetch timeout
    pub timeout_secs: u64,
}

impl Default for RateFeedConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_RATE_FEED_URL.to_string(),
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            timeout_secs: DEFAULT_RATE_FEED_TIMEOUT_SECS,
        }
    }
}

/// Spending-velocity rule attached to every created wallet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VelocityPolicy {
    /// Rule identifier on the backend
    pub id: String,
    /// Aggregate spend (satoshis) that triggers the deny action
    pub amount: u64,
    /// Rolling window in seconds
    pub time_window_secs: u64,
}

impl Default for VelocityPolicy {
    fn default() -> Self {
        Self {
            id: "com.brave.limit.velocity.30d".to_string(),
            amount: 7_000_000,
            time_window_secs: 5 * 86_400,
        }
    }
}

/// Main configuration
#[derive(Debug, Deserialize)]
pub struct WalletConfig {
    /// Custodial backend
    pub bitgo: BitGoConfig,
    /// Fiat checkout link (optional)
    #[serde(default)]
    pub coinbase: Option<CoinbaseConfig>,
    /// Exchange-rate feed
    #[serde(default)]
    pub rates: RateFeedConfig,
    /// Policy attached on wallet creation
    #[serde(default)]
    pub policy: VelocityPolicy,
}

impl WalletConfig {
    /// Parse and validate a configuration document.
    ///
    /// A document without a `bitgo` section is taken to be the backend
    /// section itself.
    pub fn from_value(value: Value) -> Result<Self> {
        let value = match value {
            Value::Object(map) if !map.contains_key("bitgo") => json!({ "bitgo": map }),
            Value::Object(map) => Value::Object(map),
            _ => {
                return Err(Error::Config(
                    "wallet configuration must be an object".to_string(),
                ))
            }
        };

        let config: WalletConfig =
            serde_json::from_value(value).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;

        tracing::debug!(environment = config.bitgo.environment.name(), "Wallet configuration loaded");
        Ok(config)
    }

    /// Load a JSON configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        let value: Value = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_value(value)
    }

    pub fn validate(&self) -> Result<()> {
        if self.bitgo.access_token.expose_secret().trim().is_empty() {
            return Err(Error::Config("bitgo.access_token is required".to_string()));
        }
        if self.bitgo.escrow_address.trim().is_empty() {
            return Err(Error::Config("bitgo.escrow_address is required".to_string()));
        }
        if let Some(base_url) = &self.bitgo.base_url {
            url::Url::parse(base_url)
                .map_err(|e| Error::Config(format!("bitgo.base_url: {}", e)))?;
        }
        if let Some(coinbase) = &self.coinbase {
            if coinbase.widget_code.trim().is_empty() {
                return Err(Error::Config("coinbase.widget_code is empty".to_string()));
            }
        }
        url::Url::parse(&self.rates.url).map_err(|e| Error::Config(format!("rates.url: {}", e)))?;
        if self.rates.refresh_interval_secs == 0 {
            return Err(Error::Config(
                "rates.refresh_interval_secs must be positive".to_string(),
            ));
        }
        if self.rates.timeout_secs == 0 {
            return Err(Error::Config("rates.timeout_secs must be positive".to_string()));
        }
        Ok(())
    }

    /// Printable view with the access token redacted
    pub fn summary(&self) -> Value {
        json!({
            "bitgo": {
                "access_token": "[REDACTED]",
                "environment": self.bitgo.environment,
                "base_url": self.bitgo.base_url(),
                "unspendable_xpub": self.bitgo.unspendable_xpub,
                "enterprise_id": self.bitgo.enterprise_id,
                "escrow_address": self.bitgo.escrow_address,
                "timeout_secs": self.bitgo.timeout_secs,
            },
            "coinbase": self.coinbase,
            "rates": self.rates,
            "policy": self.policy,
        })
    }
}
