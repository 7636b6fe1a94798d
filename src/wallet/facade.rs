use super::{
    Balances, CreatedWallet, PaymentInfo, SubmittedTransaction, UnsignedTransaction, UserKeychain,
    WalletInfo,
};
use crate::backend::{BitGoClient, CustodialBackend};
use crate::config::WalletConfig;
use crate::providers::{ops, ProviderRegistry, Sleeper, TokioSleeper, BITGO, COINBASE};
use crate::rates::{HttpRateFeed, RateCache, RateRefresher};
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Duration;

/// Entry point for wallet operations.
///
/// Each call is routed by `info.provider` through the registry. The façade
/// keeps no per-wallet state; all it owns is the configuration, the registry
/// and a handle on the shared rate cache.
pub struct WalletFacade {
    config: WalletConfig,
    registry: ProviderRegistry,
    rates: RateCache,
}

impl WalletFacade {
    pub fn new(
        config: WalletConfig,
        backend: Arc<dyn CustodialBackend>,
        rates: RateCache,
    ) -> Result<Self> {
        Self::with_sleeper(config, backend, rates, Arc::new(TokioSleeper))
    }

    /// Build with a custom pause source for the confirmation poll
    pub fn with_sleeper(
        config: WalletConfig,
        backend: Arc<dyn CustodialBackend>,
        rates: RateCache,
        sleeper: Arc<dyn Sleeper>,
    ) -> Result<Self> {
        config.validate()?;
        let registry = ProviderRegistry::from_config(&config, backend, rates.clone(), sleeper);

        tracing::info!(
            environment = config.bitgo.environment.name(),
            providers = ?registry.ids(),
            "Wallet façade ready"
        );

        Ok(Self {
            config,
            registry,
            rates,
        })
    }

    /// Wire the HTTP backend client and an empty rate cache.
    ///
    /// Rates stay empty until the owner starts [`Self::rate_refresher`].
    pub fn from_config(config: WalletConfig) -> Result<Self> {
        let backend = BitGoClient::new(&config.bitgo)?;
        Self::new(config, Arc::new(backend), RateCache::new())
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    pub fn rates(&self) -> &RateCache {
        &self.rates
    }

    /// Refresh task for this façade's cache, fed from the configured URL
    pub fn rate_refresher(&self) -> Result<RateRefresher> {
        let feed = HttpRateFeed::from_config(&self.config.rates)?;
        Ok(RateRefresher::new(
            Arc::new(feed),
            self.rates.clone(),
            Duration::from_secs(self.config.rates.refresh_interval_secs),
        ))
    }

    /// Create a custodial wallet; always handled by the bitcoin backend
    pub async fn create(
        &self,
        prefix: &str,
        label: &str,
        keychain: &UserKeychain,
    ) -> Result<CreatedWallet> {
        let provider = self
            .registry
            .get(BITGO)
            .ok_or_else(|| Error::unsupported(BITGO, ops::CREATE))?;
        provider
            .create_wallet(prefix, label, keychain)
            .await
            .unwrap_or_else(|| Err(Error::unsupported(BITGO, ops::CREATE)))
    }

    pub async fn balances(&self, info: &WalletInfo) -> Result<Balances> {
        let unsupported = || Error::unsupported(&info.provider, ops::BALANCES);
        let provider = self.registry.get(&info.provider).ok_or_else(unsupported)?;
        provider
            .balances(info)
            .await
            .unwrap_or_else(|| Err(unsupported()))
    }

    /// Checkout link for funding the wallet.
    ///
    /// Providers without a checkout of their own defer to the fiat link;
    /// `Ok(None)` when that is not configured either.
    pub fn payment_info(
        &self,
        info: &WalletInfo,
        amount: f64,
        currency: &str,
    ) -> Result<Option<PaymentInfo>> {
        let own = self
            .registry
            .get(&info.provider)
            .and_then(|p| p.payment_info(info, amount, currency));

        let result = own.or_else(|| {
            tracing::debug!(provider = %info.provider, "No checkout, falling back to fiat link");
            self.registry
                .get(COINBASE)
                .and_then(|p| p.payment_info(info, amount, currency))
        });

        result.transpose()
    }

    pub async fn submit_tx(
        &self,
        info: &WalletInfo,
        signed_tx: &str,
    ) -> Result<SubmittedTransaction> {
        let unsupported = || Error::unsupported(&info.provider, ops::SUBMIT_TX);
        let provider = self.registry.get(&info.provider).ok_or_else(unsupported)?;
        provider
            .submit_tx(info, signed_tx)
            .await
            .unwrap_or_else(|| Err(unsupported()))
    }

    /// Unsigned transaction for `amount` of `currency`, bounded by `balance`
    /// satoshis. `Ok(None)` means no transaction could be proposed.
    pub async fn unsigned_tx(
        &self,
        info: &WalletInfo,
        amount: f64,
        currency: &str,
        balance: u64,
    ) -> Result<Option<UnsignedTransaction>> {
        let unsupported = || Error::unsupported(&info.provider, ops::UNSIGNED_TX);
        let provider = self.registry.get(&info.provider).ok_or_else(unsupported)?;
        provider
            .unsigned_tx(info, amount, currency, balance)
            .await
            .unwrap_or_else(|| Err(unsupported()))
    }
}
