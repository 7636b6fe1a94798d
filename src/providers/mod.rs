//! Wallet providers
//!
//! Each provider implements some subset of the wallet operations. The set of
//! providers is closed: dispatch matches on [`Provider`], and an operation a
//! provider does not implement yields `None` rather than a runtime lookup
//! failure. The façade turns `None` into the caller-facing error (or, for
//! payment info, a fallback).

mod bitcoin;
mod fiat_link;
mod registry;
mod sleep;

pub use bitcoin::{BitcoinProvider, BitcoinSettings};
pub use fiat_link::FiatLinkProvider;
pub use registry::ProviderRegistry;
pub use sleep::{Sleeper, TokioSleeper};

#[cfg(test)]
pub(crate) use sleep::RecordingSleeper;

use crate::wallet::{
    Balances, CreatedWallet, PaymentInfo, SubmittedTransaction, UnsignedTransaction,
    UserKeychain, WalletInfo,
};
use crate::Result;

/// Custodial bitcoin backend
pub const BITGO: &str = "bitgo";
/// Hosted fiat checkout link
pub const COINBASE: &str = "coinbase";

/// Operation names used in "not supported" errors
pub mod ops {
    pub const CREATE: &str = "create";
    pub const BALANCES: &str = "balances";
    pub const PAYMENT_INFO: &str = "paymentInfo";
    pub const SUBMIT_TX: &str = "submitTx";
    pub const UNSIGNED_TX: &str = "unsignedTx";
}

pub enum Provider {
    Bitcoin(BitcoinProvider),
    FiatLink(FiatLinkProvider),
}

impl Provider {
    /// Registry identifier
    pub fn id(&self) -> &'static str {
        match self {
            Provider::Bitcoin(_) => BITGO,
            Provider::FiatLink(_) => COINBASE,
        }
    }

    pub async fn create_wallet(
        &self,
        prefix: &str,
        label: &str,
        user: &UserKeychain,
    ) -> Option<Result<CreatedWallet>> {
        match self {
            Provider::Bitcoin(p) => Some(p.create_wallet(prefix, label, user).await),
            Provider::FiatLink(_) => None,
        }
    }

    pub async fn balances(&self, info: &WalletInfo) -> Option<Result<Balances>> {
        match self {
            Provider::Bitcoin(p) => Some(p.balances(info).await),
            Provider::FiatLink(_) => None,
        }
    }

    pub fn payment_info(
        &self,
        info: &WalletInfo,
        amount: f64,
        currency: &str,
    ) -> Option<Result<PaymentInfo>> {
        match self {
            Provider::Bitcoin(_) => None,
            Provider::FiatLink(p) => Some(p.payment_info(info, amount, currency)),
        }
    }

    pub async fn submit_tx(
        &self,
        info: &WalletInfo,
        signed_tx: &str,
    ) -> Option<Result<SubmittedTransaction>> {
        match self {
            Provider::Bitcoin(p) => Some(p.submit_tx(info, signed_tx).await),
            Provider::FiatLink(_) => None,
        }
    }

    pub async fn unsigned_tx(
        &self,
        info: &WalletInfo,
        amount: f64,
        currency: &str,
        balance: u64,
    ) -> Option<Result<Option<UnsignedTransaction>>> {
        match self {
            Provider::Bitcoin(p) => Some(p.unsigned_tx(info, amount, currency, balance).await),
            Provider::FiatLink(_) => None,
        }
    }
}
