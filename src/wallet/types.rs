//! Caller-facing wallet types

use crate::backend::{BackendWallet, Keychain};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which backend wallet, and which provider's operations, a call targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletInfo {
    pub provider: String,
    pub address: String,
}

impl WalletInfo {
    pub fn new(provider: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            address: address.into(),
        }
    }
}

/// Wallet balances in satoshis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balances {
    pub balance: u64,
    pub spendable: u64,
    pub confirmed: u64,
    pub unconfirmed: u64,
}

impl From<&BackendWallet> for Balances {
    fn from(wallet: &BackendWallet) -> Self {
        Self {
            balance: wallet.balance,
            spendable: wallet.spendable_balance,
            confirmed: wallet.confirmed_balance,
            unconfirmed: wallet.unconfirmed_receives,
        }
    }
}

/// Hosted checkout link for buying into a wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfo {
    #[serde(rename = "buyURL")]
    pub buy_url: String,
}

/// Transaction proposal awaiting an external signer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsignedTransaction {
    pub transaction_hex: String,
    pub unspents: Vec<Value>,
    /// Satoshis
    pub fee: u64,
    /// Public key of the first wallet keychain
    pub xpub: String,
}

/// Submission result merged with chain detail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedTransaction {
    pub hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub fee: u64,
    pub address: String,
    pub satoshis: i64,
    /// False when the detail is the placeholder used after polling gave up
    pub confirmed_detail: bool,
}

/// Caller-held key material for a new wallet
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserKeychain {
    pub xpub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted_xprv: Option<String>,
}

/// Newly created multi-signature wallet
#[derive(Debug, Clone, Serialize)]
pub struct CreatedWallet {
    pub info: WalletInfo,
    pub wallet: BackendWallet,
    /// User, unspendable and backend keychains, in signing order
    pub keychains: Vec<Keychain>,
}
