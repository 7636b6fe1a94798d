//! Exchange-rate cache
//!
//! Holds the latest fiat/BTC rate table as an immutable snapshot. The
//! refresh task is the only writer; it publishes a whole new table through a
//! `watch` channel, so readers always see a complete table and never wait on
//! a fetch in flight. A failed refresh leaves the previous table in place.

mod feed;
mod refresher;

pub use feed::{parse_snapshot, HttpRateFeed, RateFeed};
pub use refresher::RateRefresher;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;

/// Currency code -> BTC price in that currency
#[derive(Debug, Clone, Default, Serialize)]
pub struct RateTable {
    rates: HashMap<String, f64>,
    as_of: Option<DateTime<Utc>>,
}

impl RateTable {
    /// Build a table, dropping any rate that is not a positive finite number
    pub fn new(rates: HashMap<String, f64>, as_of: DateTime<Utc>) -> Self {
        let rates = rates
            .into_iter()
            .filter(|(_, rate)| rate.is_finite() && *rate > 0.0)
            .collect();
        Self {
            rates,
            as_of: Some(as_of),
        }
    }

    pub fn get(&self, currency: &str) -> Option<f64> {
        self.rates.get(currency).copied()
    }

    /// When the feed produced this table; `None` until the first refresh
    pub fn as_of(&self) -> Option<DateTime<Utc>> {
        self.as_of
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    pub fn currencies(&self) -> impl Iterator<Item = &str> {
        self.rates.keys().map(String::as_str)
    }
}

/// Shared handle to the current rate table
#[derive(Clone)]
pub struct RateCache {
    table: Arc<watch::Sender<Arc<RateTable>>>,
}

impl RateCache {
    /// Empty cache; every lookup misses until the first refresh
    pub fn new() -> Self {
        Self::with_table(RateTable::default())
    }

    /// Cache seeded with a known table
    pub fn with_table(table: RateTable) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(table));
        Self { table: Arc::new(tx) }
    }

    /// Rate for a currency code (case-insensitive)
    pub fn get(&self, currency: &str) -> Option<f64> {
        self.table.borrow().get(&currency.to_ascii_uppercase())
    }

    /// The complete table currently being served
    pub fn snapshot(&self) -> Arc<RateTable> {
        Arc::clone(&self.table.borrow())
    }

    /// Receiver notified on every successful refresh
    pub fn subscribe(&self) -> watch::Receiver<Arc<RateTable>> {
        self.table.subscribe()
    }

    pub(crate) fn publish(&self, table: RateTable) {
        self.table.send_replace(Arc::new(table));
    }
}

impl Default for RateCache {
    fn default() -> Self {
        Self::new()
    }
}
