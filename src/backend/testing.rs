//! In-memory backend with scripted responses and call recording

use super::{
    BackendWallet, BuiltTransaction, CustodialBackend, FeeEstimate, Keychain, NewKeychain,
    NewWallet, PolicyRule, SentTransaction, TransactionDetail, TransactionEntry,
    TransactionRequest, WalletKind, Webhook,
};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

fn unavailable(what: &str) -> Error {
    Error::Backend {
        status: 503,
        message: format!("{} unavailable", what),
    }
}

pub(crate) struct ScriptedBackend {
    pub wallet: BackendWallet,
    pub fee_per_kb: u64,
    /// Fee reported by each successive construction; `None` fails the call
    pub build_fees: Mutex<VecDeque<Option<u64>>>,
    pub build_requests: Mutex<Vec<TransactionRequest>>,
    /// Number of `get_transaction` calls that fail before one succeeds
    pub detail_failures: Mutex<usize>,
    pub detail: TransactionDetail,
    pub detail_calls: Mutex<usize>,
    pub fail_webhook: bool,
    pub fail_policy: bool,
    pub keychains: Mutex<Vec<NewKeychain>>,
    pub wallets: Mutex<Vec<NewWallet>>,
    pub webhooks: Mutex<Vec<Webhook>>,
    pub policies: Mutex<Vec<PolicyRule>>,
    pub sent: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            wallet: BackendWallet {
                id: "2NwalletId".to_string(),
                label: Some("publisher".to_string()),
                balance: 2_500_000,
                spendable_balance: 2_000_000,
                confirmed_balance: 2_400_000,
                unconfirmed_receives: 100_000,
            },
            fee_per_kb: 20_000,
            build_fees: Mutex::new(VecDeque::new()),
            build_requests: Mutex::new(Vec::new()),
            detail_failures: Mutex::new(0),
            detail: TransactionDetail {
                fee: 4_520,
                entries: vec![TransactionEntry {
                    account: "2N1escrow".to_string(),
                    value: 990_000,
                }],
            },
            detail_calls: Mutex::new(0),
            fail_webhook: false,
            fail_policy: false,
            keychains: Mutex::new(Vec::new()),
            wallets: Mutex::new(Vec::new()),
            webhooks: Mutex::new(Vec::new()),
            policies: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn with_build_fees(self, fees: Vec<Option<u64>>) -> Self {
        *self.build_fees.lock().unwrap() = fees.into();
        self
    }

    pub fn with_detail_failures(self, failures: usize) -> Self {
        *self.detail_failures.lock().unwrap() = failures;
        self
    }

    pub fn build_requests(&self) -> Vec<TransactionRequest> {
        self.build_requests.lock().unwrap().clone()
    }

    pub fn detail_calls(&self) -> usize {
        *self.detail_calls.lock().unwrap()
    }
}

#[async_trait]
impl CustodialBackend for ScriptedBackend {
    async fn add_keychain(&self, keychain: &NewKeychain) -> Result<Keychain> {
        self.keychains.lock().unwrap().push(keychain.clone());
        Ok(Keychain {
            xpub: keychain.xpub.clone(),
        })
    }

    async fn create_backend_keychain(&self) -> Result<Keychain> {
        Ok(Keychain {
            xpub: "xpub-backend".to_string(),
        })
    }

    async fn add_wallet(&self, wallet: &NewWallet) -> Result<BackendWallet> {
        self.wallets.lock().unwrap().push(wallet.clone());
        Ok(BackendWallet {
            id: "2NnewWallet".to_string(),
            label: Some(wallet.label.clone()),
            balance: 0,
            spendable_balance: 0,
            confirmed_balance: 0,
            unconfirmed_receives: 0,
        })
    }

    async fn add_webhook(&self, _wallet_id: &str, webhook: &Webhook) -> Result<()> {
        self.webhooks.lock().unwrap().push(webhook.clone());
        if self.fail_webhook {
            return Err(unavailable("webhooks"));
        }
        Ok(())
    }

    async fn set_policy_rule(&self, _wallet_id: &str, rule: &PolicyRule) -> Result<()> {
        self.policies.lock().unwrap().push(rule.clone());
        if self.fail_policy {
            return Err(unavailable("policy"));
        }
        Ok(())
    }

    async fn get_wallet(&self, _kind: WalletKind, id: &str) -> Result<BackendWallet> {
        if id != self.wallet.id {
            return Err(Error::Backend {
                status: 404,
                message: format!("wallet {} not found", id),
            });
        }
        Ok(self.wallet.clone())
    }

    async fn estimate_fee(&self, _num_blocks: u32) -> Result<FeeEstimate> {
        Ok(FeeEstimate {
            fee_per_kb: self.fee_per_kb,
        })
    }

    async fn create_transaction(
        &self,
        _wallet_id: &str,
        request: &TransactionRequest,
    ) -> Result<BuiltTransaction> {
        self.build_requests.lock().unwrap().push(request.clone());
        let fee = self
            .build_fees
            .lock()
            .unwrap()
            .pop_front()
            .flatten()
            .ok_or_else(|| unavailable("transaction builder"))?;
        Ok(BuiltTransaction {
            transaction_hex: format!("0100{:08x}", fee),
            unspents: Vec::new(),
            fee,
            wallet_keychains: vec![
                Keychain {
                    xpub: "xpub-user".to_string(),
                },
                Keychain {
                    xpub: "xpub-unspendable".to_string(),
                },
            ],
        })
    }

    async fn send_transaction(&self, _wallet_id: &str, signed_tx: &str) -> Result<SentTransaction> {
        self.sent.lock().unwrap().push(signed_tx.to_string());
        Ok(SentTransaction {
            hash: "f4184fc596403b9d638783cf57adfe4c75c605f6356fbc91338530e9831e9e16".to_string(),
            status: Some("accepted".to_string()),
        })
    }

    async fn get_transaction(&self, _id: &str) -> Result<TransactionDetail> {
        *self.detail_calls.lock().unwrap() += 1;
        let mut failures = self.detail_failures.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(unavailable("indexer"));
        }
        Ok(self.detail.clone())
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
