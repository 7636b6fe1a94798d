//! HTTP client for the custodial backend REST API

use super::{
    BackendWallet, BuiltTransaction, CustodialBackend, FeeEstimate, Keychain, NewKeychain,
    NewWallet, PolicyRule, SentTransaction, TransactionDetail, TransactionRequest, WalletKind,
    Webhook,
};
use crate::config::BitGoConfig;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, Method};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::Instrument;
use url::Url;
use uuid::Uuid;

/// Backend client authenticated with a bearer access token
pub struct BitGoClient {
    client: Client,
    base_url: Url,
    access_token: SecretString,
}

impl BitGoClient {
    pub fn new(config: &BitGoConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        tracing::debug!(
            environment = config.environment.name(),
            base_url = config.base_url(),
            "Custodial backend client created"
        );

        Ok(Self {
            client,
            base_url: Url::parse(config.base_url())
                .map_err(|e| Error::Config(format!("bitgo.base_url: {}", e)))?,
            access_token: SecretString::from(config.access_token.expose_secret().to_string()),
        })
    }

    /// Resource URL under the API root; each segment stays a single path
    /// segment whatever characters it contains
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        if let Some(segment) = segments.iter().find(|s| matches!(**s, "" | "." | "..")) {
            return Err(Error::InvalidIdentifier(segment.to_string()));
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("bitgo.base_url {} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<Value>,
    ) -> Result<T> {
        let request_id = Uuid::new_v4();
        let span = tracing::debug_span!("backend_request", %method, path = url.path(), %request_id);

        async move {
            let mut builder = self
                .client
                .request(method, url)
                .bearer_auth(self.access_token.expose_secret())
                .header("x-request-id", request_id.to_string());
            if let Some(body) = body {
                builder = builder.json(&body);
            }

            let response = builder.send().await?;
            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                tracing::debug!(status = status.as_u16(), "Backend request rejected");
                return Err(Error::Backend {
                    status: status.as_u16(),
                    message: error_message(&text),
                });
            }

            let value = response.json::<Value>().await?;
            Ok(serde_json::from_value(value)?)
        }
        .instrument(span)
        .await
    }
}

/// Extract the backend's `error` field, falling back to the raw body
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl CustodialBackend for BitGoClient {
    async fn add_keychain(&self, keychain: &NewKeychain) -> Result<Keychain> {
        let url = self.endpoint(&["keychain"])?;
        self.request(Method::POST, url, Some(serde_json::to_value(keychain)?))
            .await
    }

    async fn create_backend_keychain(&self) -> Result<Keychain> {
        let url = self.endpoint(&["keychain", "bitgo"])?;
        self.request(Method::POST, url, Some(json!({}))).await
    }

    async fn add_wallet(&self, wallet: &NewWallet) -> Result<BackendWallet> {
        let url = self.endpoint(&["wallet"])?;
        self.request(Method::POST, url, Some(serde_json::to_value(wallet)?))
            .await
    }

    async fn add_webhook(&self, wallet_id: &str, webhook: &Webhook) -> Result<()> {
        let url = self.endpoint(&["wallet", wallet_id, "webhooks"])?;
        let _: Value = self
            .request(Method::POST, url, Some(serde_json::to_value(webhook)?))
            .await?;
        Ok(())
    }

    async fn set_policy_rule(&self, wallet_id: &str, rule: &PolicyRule) -> Result<()> {
        let url = self.endpoint(&["wallet", wallet_id, "policy", "rule"])?;
        let _: Value = self
            .request(Method::PUT, url, Some(serde_json::to_value(rule)?))
            .await?;
        Ok(())
    }

    async fn get_wallet(&self, kind: WalletKind, id: &str) -> Result<BackendWallet> {
        let mut url = self.endpoint(&["wallet", id])?;
        url.query_pairs_mut().append_pair("type", kind.as_str());
        self.request(Method::GET, url, None).await
    }

    async fn estimate_fee(&self, num_blocks: u32) -> Result<FeeEstimate> {
        let mut url = self.endpoint(&["tx", "fee"])?;
        url.query_pairs_mut()
            .append_pair("numBlocks", &num_blocks.to_string());
        self.request(Method::GET, url, None).await
    }

    async fn create_transaction(
        &self,
        wallet_id: &str,
        request: &TransactionRequest,
    ) -> Result<BuiltTransaction> {
        let url = self.endpoint(&["wallet", wallet_id, "tx", "build"])?;
        self.request(Method::POST, url, Some(serde_json::to_value(request)?))
            .await
    }

    async fn send_transaction(&self, wallet_id: &str, signed_tx: &str) -> Result<SentTransaction> {
        tracing::debug!(wallet = wallet_id, "Sending signed transaction");
        let url = self.endpoint(&["tx", "send"])?;
        self.request(Method::POST, url, Some(json!({ "tx": signed_tx })))
            .await
    }

    async fn get_transaction(&self, id: &str) -> Result<TransactionDetail> {
        let url = self.endpoint(&["tx", id])?;
        self.request(Method::GET, url, None).await
    }

    fn name(&self) -> &'static str {
        "bitgo"
    }
}
