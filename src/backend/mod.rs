//! Custodial wallet backend abstraction
//!
//! The backend is a remote service that owns keys, wallets and chain
//! indexing. This module defines the capabilities the gateway needs from it
//! as a trait, plus the wire types exchanged with it. `BitGoClient` is the
//! HTTP implementation.

mod bitgo;
#[cfg(test)]
pub(crate) mod testing;

pub use bitgo::BitGoClient;

use crate::config::VelocityPolicy;
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Wallet family used for lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletKind {
    Bitcoin,
}

impl WalletKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WalletKind::Bitcoin => "bitcoin",
        }
    }
}

/// Public half of a registered keychain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keychain {
    pub xpub: String,
}

/// Keychain registration request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewKeychain {
    pub label: String,
    pub xpub: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_xprv: Option<String>,
}

/// Multi-signature wallet creation request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWallet {
    pub label: String,
    pub m: u8,
    pub n: u8,
    pub keychains: Vec<Keychain>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enterprise: Option<String>,
    pub disable_transaction_notifications: bool,
}

/// Wallet as reported by the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendWallet {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub balance: u64,
    #[serde(default)]
    pub spendable_balance: u64,
    #[serde(default)]
    pub confirmed_balance: u64,
    #[serde(default)]
    pub unconfirmed_receives: u64,
}

/// Webhook registration
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Webhook {
    pub url: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub num_confirmations: u32,
}

impl Webhook {
    /// Notify on transactions once they have one confirmation
    pub fn transaction(url: String) -> Self {
        Self {
            url,
            kind: "transaction".to_string(),
            num_confirmations: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VelocityCondition {
    #[serde(rename = "type")]
    pub kind: String,
    pub amount: u64,
    /// Seconds
    pub time_window: u64,
    pub group_tags: Vec<String>,
    pub exclude_tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicyAction {
    #[serde(rename = "type")]
    pub kind: String,
}

/// Wallet policy rule
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicyRule {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub condition: VelocityCondition,
    pub action: PolicyAction,
}

impl PolicyRule {
    /// Deny spends once the aggregate within the window exceeds the limit
    pub fn velocity_limit(policy: &VelocityPolicy) -> Self {
        Self {
            id: policy.id.clone(),
            kind: "velocityLimit".to_string(),
            condition: VelocityCondition {
                kind: "velocity".to_string(),
                amount: policy.amount,
                time_window: policy.time_window_secs,
                group_tags: Vec::new(),
                exclude_tags: Vec::new(),
            },
            action: PolicyAction {
                kind: "deny".to_string(),
            },
        }
    }
}

/// Network fee estimate
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeEstimate {
    /// Satoshis per kilobyte
    pub fee_per_kb: u64,
}

/// Transaction construction request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    /// Address -> satoshis
    pub recipients: BTreeMap<String, u64>,
    /// Satoshis per kilobyte
    pub fee_rate: u64,
}

impl TransactionRequest {
    pub fn pay_to(address: &str, satoshis: u64, fee_rate: u64) -> Self {
        let mut recipients = BTreeMap::new();
        recipients.insert(address.to_string(), satoshis);
        Self {
            recipients,
            fee_rate,
        }
    }
}

/// Unsigned transaction built by the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuiltTransaction {
    pub transaction_hex: String,
    #[serde(default)]
    pub unspents: Vec<Value>,
    /// Fee the backend actually computed, in satoshis
    pub fee: u64,
    #[serde(default)]
    pub wallet_keychains: Vec<Keychain>,
}

/// Result of broadcasting a signed transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentTransaction {
    pub hash: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionEntry {
    pub account: String,
    /// Signed satoshi delta for the account
    pub value: i64,
}

/// Indexed transaction detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionDetail {
    #[serde(default)]
    pub fee: u64,
    #[serde(default)]
    pub entries: Vec<TransactionEntry>,
}

/// Capabilities required from the custodial backend
#[async_trait]
pub trait CustodialBackend: Send + Sync {
    /// Register a caller-supplied keychain
    async fn add_keychain(&self, keychain: &NewKeychain) -> Result<Keychain>;

    /// Have the backend generate and hold a keychain
    async fn create_backend_keychain(&self) -> Result<Keychain>;

    async fn add_wallet(&self, wallet: &NewWallet) -> Result<BackendWallet>;

    async fn add_webhook(&self, wallet_id: &str, webhook: &Webhook) -> Result<()>;

    async fn set_policy_rule(&self, wallet_id: &str, rule: &PolicyRule) -> Result<()>;

    async fn get_wallet(&self, kind: WalletKind, id: &str) -> Result<BackendWallet>;

    /// Fee estimate for confirmation within `num_blocks`
    async fn estimate_fee(&self, num_blocks: u32) -> Result<FeeEstimate>;

    async fn create_transaction(
        &self,
        wallet_id: &str,
        request: &TransactionRequest,
    ) -> Result<BuiltTransaction>;

    async fn send_transaction(&self, wallet_id: &str, signed_tx: &str) -> Result<SentTransaction>;

    /// Chain-query capability: detail of a transaction by hash
    async fn get_transaction(&self, id: &str) -> Result<TransactionDetail>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_wallet_wire_shape() {
        let wallet = NewWallet {
            label: "publisher".to_string(),
            m: 2,
            n: 3,
            keychains: vec![Keychain {
                xpub: "xpub-a".to_string(),
            }],
            enterprise: None,
            disable_transaction_notifications: true,
        };
        let value = serde_json::to_value(&wallet).unwrap();
        assert_eq!(value["disableTransactionNotifications"], true);
        assert_eq!(value["keychains"][0]["xpub"], "xpub-a");
        assert!(value.get("enterprise").is_none());
    }

    #[test]
    fn velocity_rule_wire_shape() {
        let rule = PolicyRule::velocity_limit(&VelocityPolicy::default());
        let value = serde_json::to_value(&rule).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "com.brave.limit.velocity.30d",
                "type": "velocityLimit",
                "condition": {
                    "type": "velocity",
                    "amount": 7_000_000,
                    "timeWindow": 432_000,
                    "groupTags": [],
                    "excludeTags": []
                },
                "action": { "type": "deny" }
            })
        );
    }

    #[test]
    fn webhook_wire_shape() {
        let hook = Webhook::transaction("https://pay.example/callbacks/bitgo/sink".to_string());
        let value = serde_json::to_value(&hook).unwrap();
        assert_eq!(value["type"], "transaction");
        assert_eq!(value["numConfirmations"], 1);
    }

    #[test]
    fn wallet_response_defaults_missing_balances() {
        let wallet: BackendWallet = serde_json::from_value(json!({
            "id": "2NwalletId",
            "balance": 150_000,
            "spendableBalance": 100_000
        }))
        .unwrap();
        assert_eq!(wallet.balance, 150_000);
        assert_eq!(wallet.spendable_balance, 100_000);
        assert_eq!(wallet.confirmed_balance, 0);
        assert_eq!(wallet.unconfirmed_receives, 0);
    }

    #[test]
    fn built_transaction_response() {
        let built: BuiltTransaction = serde_json::from_value(json!({
            "transactionHex": "0100",
            "unspents": [{ "tx_hash": "ab", "tx_output_n": 0, "value": 5000 }],
            "fee": 4520,
            "walletKeychains": [{ "xpub": "xpub-user", "path": "/0/0" }]
        }))
        .unwrap();
        assert_eq!(built.fee, 4520);
        assert_eq!(built.unspents.len(), 1);
        assert_eq!(built.wallet_keychains[0].xpub, "xpub-user");
    }

    #[test]
    fn transaction_request_pays_single_recipient() {
        let request = TransactionRequest::pay_to("2N1escrow", 990_000, 20_000);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value, json!({ "recipients": { "2N1escrow": 990_000 }, "feeRate": 20_000 }));
    }
}
