//! Background rate refresh task

use super::{parse_snapshot, RateCache, RateFeed};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Sole writer of a [`RateCache`]
pub struct RateRefresher {
    feed: Arc<dyn RateFeed>,
    cache: RateCache,
    interval: Duration,
}

impl RateRefresher {
    pub fn new(feed: Arc<dyn RateFeed>, cache: RateCache, interval: Duration) -> Self {
        Self {
            feed,
            cache,
            interval,
        }
    }

    /// Fetch, validate and publish one snapshot.
    ///
    /// Returns whether a new table was published. Failures are logged and
    /// leave the current table untouched.
    pub async fn refresh(&self) -> bool {
        let result = self
            .feed
            .fetch()
            .await
            .and_then(|snapshot| parse_snapshot(&snapshot, Utc::now()));

        match result {
            Ok(table) => {
                tracing::info!(
                    feed = self.feed.name(),
                    currencies = table.len(),
                    "Exchange rates refreshed"
                );
                self.cache.publish(table);
                true
            }
            Err(e) => {
                tracing::warn!(
                    feed = self.feed.name(),
                    error = %e,
                    "Exchange rate refresh failed, keeping previous rates"
                );
                false
            }
        }
    }

    /// Refresh immediately, then on every interval tick, until the task is aborted
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.refresh().await;
            }
        })
    }
}
