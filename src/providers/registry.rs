//! Provider lookup table

use super::{BitcoinProvider, BitcoinSettings, FiatLinkProvider, Provider, Sleeper};
use crate::backend::CustodialBackend;
use crate::config::WalletConfig;
use crate::rates::RateCache;
use std::collections::HashMap;
use std::sync::Arc;

/// Providers keyed by identifier; fixed once built
pub struct ProviderRegistry {
    providers: HashMap<&'static str, Provider>,
}

impl ProviderRegistry {
    pub fn new(providers: impl IntoIterator<Item = Provider>) -> Self {
        Self {
            providers: providers.into_iter().map(|p| (p.id(), p)).collect(),
        }
    }

    /// Register every provider the configuration enables
    pub fn from_config(
        config: &WalletConfig,
        backend: Arc<dyn CustodialBackend>,
        rates: RateCache,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        let mut providers = vec![Provider::Bitcoin(BitcoinProvider::new(
            backend,
            rates,
            BitcoinSettings::from_config(config),
            sleeper,
        ))];

        match &config.coinbase {
            Some(coinbase) => providers.push(Provider::FiatLink(FiatLinkProvider::new(
                coinbase.widget_code.clone(),
            ))),
            None => tracing::debug!("No fiat checkout configured"),
        }

        Self::new(providers)
    }

    /// Exact, case-sensitive lookup
    pub fn get(&self, id: &str) -> Option<&Provider> {
        self.providers.get(id)
    }

    pub fn ids(&self) -> Vec<&'static str> {
        let mut ids: Vec<_> = self.providers.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}
