//! Custodial bitcoin provider
//!
//! Wallet creation, balances, fee-bid transaction construction and
//! submission with confirmation polling, all against a [`CustodialBackend`].

use super::{Sleeper, BITGO};
use crate::backend::{
    CustodialBackend, Keychain, NewKeychain, NewWallet, PolicyRule, TransactionRequest,
    WalletKind, Webhook,
};
use crate::config::{VelocityPolicy, WalletConfig};
use crate::rates::RateCache;
use crate::wallet::{
    Balances, CreatedWallet, SubmittedTransaction, UnsignedTransaction, UserKeychain, WalletInfo,
};
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Duration;

/// How far a requested spend may exceed the balance before it is refused
pub const DRIFT_SATOSHIS: u64 = 50_000;

/// Construction attempts while converging on the backend's fee
pub const FEE_BID_ROUNDS: usize = 2;

/// Block target for the fee estimate
const FEE_ESTIMATE_BLOCKS: u32 = 6;

/// Transaction detail lookups after submission
pub const CONFIRMATION_ATTEMPTS: usize = 5;

pub const CONFIRMATION_PAUSE: Duration = Duration::from_secs(1);

/// Satoshis reported when no chain detail could be fetched
const PLACEHOLDER_SATOSHIS: i64 = 100;

const SATOSHIS_PER_BTC: f64 = 1e8;

const WEBHOOK_PATH: &str = "/callbacks/bitgo/sink";

/// Provider settings taken from the wallet configuration
#[derive(Debug, Clone)]
pub struct BitcoinSettings {
    pub escrow_address: String,
    pub unspendable_xpub: Option<String>,
    pub enterprise_id: Option<String>,
    pub policy: VelocityPolicy,
}

impl BitcoinSettings {
    pub fn from_config(config: &WalletConfig) -> Self {
        Self {
            escrow_address: config.bitgo.escrow_address.clone(),
            unspendable_xpub: config.bitgo.unspendable_xpub.clone(),
            enterprise_id: config.bitgo.enterprise_id.clone(),
            policy: config.policy.clone(),
        }
    }
}

/// Chain detail merged into a submission result
struct ChainDetail {
    fee: u64,
    address: String,
    satoshis: i64,
}

/// Convert a fiat amount into satoshis at `rate` (fiat per BTC)
fn fiat_to_satoshis(amount: f64, rate: f64) -> u64 {
    // Float-to-int casts saturate; negatives and NaN become 0
    ((amount / rate) * SATOSHIS_PER_BTC).round() as u64
}

/// Spendable amount for a desired spend, or `None` past the drift band
fn clamp_to_balance(desired: u64, balance: u64) -> Option<u64> {
    if desired > balance.saturating_add(DRIFT_SATOSHIS) {
        None
    } else {
        Some(desired.min(balance))
    }
}

pub struct BitcoinProvider {
    backend: Arc<dyn CustodialBackend>,
    rates: RateCache,
    settings: BitcoinSettings,
    sleeper: Arc<dyn Sleeper>,
}

impl BitcoinProvider {
    pub fn new(
        backend: Arc<dyn CustodialBackend>,
        rates: RateCache,
        settings: BitcoinSettings,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            backend,
            rates,
            settings,
            sleeper,
        }
    }

    /// Create a 2-of-3 wallet from the user's key, the unspendable key and a
    /// backend-held key, then register its webhook and velocity policy.
    ///
    /// Webhook and policy failures are logged; the wallet is returned as soon
    /// as it exists.
    pub async fn create_wallet(
        &self,
        prefix: &str,
        label: &str,
        user: &UserKeychain,
    ) -> Result<CreatedWallet> {
        let unspendable_xpub = self.settings.unspendable_xpub.as_deref().ok_or_else(|| {
            Error::Config("bitgo.unspendable_xpub is required to create wallets".to_string())
        })?;

        let user_key = self
            .backend
            .add_keychain(&NewKeychain {
                label: "user".to_string(),
                xpub: user.xpub.clone(),
                encrypted_xprv: user.encrypted_xprv.clone(),
            })
            .await?;
        let unspendable_key = self
            .backend
            .add_keychain(&NewKeychain {
                label: "unspendable".to_string(),
                xpub: unspendable_xpub.to_string(),
                encrypted_xprv: None,
            })
            .await?;
        let backend_key = self.backend.create_backend_keychain().await?;

        let keychains: Vec<Keychain> = vec![user_key, unspendable_key, backend_key];
        let wallet = self
            .backend
            .add_wallet(&NewWallet {
                label: label.to_string(),
                m: 2,
                n: 3,
                keychains: keychains.clone(),
                enterprise: self.settings.enterprise_id.clone(),
                disable_transaction_notifications: true,
            })
            .await?;

        tracing::info!(wallet = %wallet.id, label, backend = self.backend.name(), "Wallet created");

        let webhook = Webhook::transaction(format!("{}{}", prefix, WEBHOOK_PATH));
        if let Err(e) = self.backend.add_webhook(&wallet.id, &webhook).await {
            tracing::warn!(label, error = %e, "Wallet webhook registration failed");
        }

        let rule = PolicyRule::velocity_limit(&self.settings.policy);
        if let Err(e) = self.backend.set_policy_rule(&wallet.id, &rule).await {
            tracing::warn!(label, rule = %rule.id, error = %e, "Wallet policy rule failed");
        }

        Ok(CreatedWallet {
            info: WalletInfo::new(BITGO, wallet.id.clone()),
            wallet,
            keychains,
        })
    }

    pub async fn balances(&self, info: &WalletInfo) -> Result<Balances> {
        let wallet = self
            .backend
            .get_wallet(WalletKind::Bitcoin, &info.address)
            .await?;
        Ok(Balances::from(&wallet))
    }

    /// Submit a signed transaction and enrich the result with chain detail.
    ///
    /// Submission success does not depend on the detail lookup: if the
    /// indexer never answers, placeholder detail is reported instead.
    pub async fn submit_tx(
        &self,
        info: &WalletInfo,
        signed_tx: &str,
    ) -> Result<SubmittedTransaction> {
        let wallet = self
            .backend
            .get_wallet(WalletKind::Bitcoin, &info.address)
            .await?;
        let sent = self.backend.send_transaction(&wallet.id, signed_tx).await?;

        tracing::info!(wallet = %wallet.id, hash = %sent.hash, "Transaction submitted");

        let (detail, confirmed_detail) = match self.poll_transaction(&sent.hash).await {
            Some(detail) => (detail, true),
            None => (
                ChainDetail {
                    fee: 0,
                    address: self.settings.escrow_address.clone(),
                    satoshis: PLACEHOLDER_SATOSHIS,
                },
                false,
            ),
        };

        Ok(SubmittedTransaction {
            hash: sent.hash,
            status: sent.status,
            fee: detail.fee,
            address: detail.address,
            satoshis: detail.satoshis,
            confirmed_detail,
        })
    }

    async fn poll_transaction(&self, hash: &str) -> Option<ChainDetail> {
        for attempt in 1..=CONFIRMATION_ATTEMPTS {
            match self.backend.get_transaction(hash).await {
                Ok(detail) => match detail.entries.first() {
                    Some(entry) => {
                        return Some(ChainDetail {
                            fee: detail.fee,
                            address: entry.account.clone(),
                            satoshis: entry.value,
                        })
                    }
                    None => tracing::warn!(
                        hash,
                        attempt,
                        max = CONFIRMATION_ATTEMPTS,
                        "Transaction detail has no entries"
                    ),
                },
                Err(e) => tracing::warn!(
                    hash,
                    attempt,
                    max = CONFIRMATION_ATTEMPTS,
                    error = %e,
                    "Transaction detail not available"
                ),
            }

            if attempt < CONFIRMATION_ATTEMPTS {
                self.sleeper.sleep(CONFIRMATION_PAUSE).await;
            }
        }

        tracing::warn!(hash, "Giving up on transaction detail, reporting placeholder");
        None
    }

    /// Build an unsigned transaction paying the fiat `amount` (converted at
    /// the cached rate) to the escrow address.
    ///
    /// Returns `Ok(None)` when the spend exceeds `balance` beyond the drift
    /// band or when the backend cannot construct the transaction.
    pub async fn unsigned_tx(
        &self,
        info: &WalletInfo,
        amount: f64,
        currency: &str,
        balance: u64,
    ) -> Result<Option<UnsignedTransaction>> {
        let estimate = self.backend.estimate_fee(FEE_ESTIMATE_BLOCKS).await?;
        let mut fee = estimate.fee_per_kb.div_ceil(2);

        let rate = self
            .rates
            .get(currency)
            .ok_or_else(|| Error::UnsupportedCurrency(currency.to_string()))?;

        let desired = fiat_to_satoshis(amount, rate);
        tracing::debug!(available = balance, desired, currency, rate, "unsignedTx");

        let Some(satoshis) = clamp_to_balance(desired, balance) else {
            tracing::info!(
                available = balance,
                desired,
                drift = DRIFT_SATOSHIS,
                "Requested spend exceeds balance, no transaction"
            );
            return Ok(None);
        };

        let wallet = self
            .backend
            .get_wallet(WalletKind::Bitcoin, &info.address)
            .await?;

        let mut proposal = None;
        for round in 1..=FEE_BID_ROUNDS {
            let Some(pay) = satoshis.checked_sub(fee).filter(|pay| *pay > 0) else {
                tracing::warn!(satoshis, fee, "Amount does not cover the fee, no transaction");
                return Ok(None);
            };

            let request =
                TransactionRequest::pay_to(&self.settings.escrow_address, pay, estimate.fee_per_kb);
            let built = match self.backend.create_transaction(&wallet.id, &request).await {
                Ok(built) => built,
                Err(e) => {
                    tracing::warn!(round, error = %e, "Transaction construction failed");
                    return Ok(None);
                }
            };

            tracing::debug!(round, satoshis, estimate = fee, actual = built.fee, "Fee bid");

            let accepted = built.fee <= fee;
            fee = built.fee.max(fee);
            proposal = Some(built);
            if accepted {
                break;
            }
        }

        let Some(built) = proposal else {
            return Ok(None);
        };
        let Some(xpub) = built.wallet_keychains.first().map(|k| k.xpub.clone()) else {
            tracing::warn!("Constructed transaction lists no wallet keychains");
            return Ok(None);
        };

        Ok(Some(UnsignedTransaction {
            transaction_hex: built.transaction_hex,
            unspents: built.unspents,
            fee: built.fee,
            xpub,
        }))
    }
}
