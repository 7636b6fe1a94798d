//! Exchange-rate feed and snapshot validation

use super::RateTable;
use crate::config::RateFeedConfig;
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// Source of raw rate snapshots
#[async_trait]
pub trait RateFeed: Send + Sync {
    /// Fetch the raw snapshot document
    async fn fetch(&self) -> Result<Value>;

    /// Feed name for logging
    fn name(&self) -> &'static str;
}

/// Rate feed over plain HTTP GET
pub struct HttpRateFeed {
    client: Client,
    url: String,
}

impl HttpRateFeed {
    /// Feed whose every fetch gives up after `timeout`
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn from_config(config: &RateFeedConfig) -> Result<Self> {
        Self::new(config.url.clone(), Duration::from_secs(config.timeout_secs))
    }
}

#[async_trait]
impl RateFeed for HttpRateFeed {
    async fn fetch(&self) -> Result<Value> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::RateFeed(format!(
                "{} returned HTTP {}",
                self.url, status
            )));
        }
        Ok(response.json::<Value>().await?)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

const TIMESTAMP_KEY: &str = "timestamp";

fn is_currency_code(key: &str) -> bool {
    key.len() == 3 && key.bytes().all(|b| b.is_ascii_uppercase())
}

/// Interpret a snapshot value as a point in time
fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(DateTime::from_timestamp_millis),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .or_else(|_| DateTime::parse_from_rfc2822(s))
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|dt| dt.and_utc())
            }),
        _ => None,
    }
}

/// Validate a feed snapshot and build a rate table from it.
///
/// Every key must be `timestamp` or a 3-letter uppercase code. Every value
/// must be a date, or an object whose `last` (when present) is a positive
/// number. Only objects carrying a positive `last` become table entries.
pub fn parse_snapshot(snapshot: &Value, fetched_at: DateTime<Utc>) -> Result<RateTable> {
    let entries = snapshot
        .as_object()
        .ok_or_else(|| Error::RateFeed("snapshot is not an object".to_string()))?;

    let mut rates = HashMap::new();
    let mut as_of = None;

    for (key, value) in entries {
        if key != TIMESTAMP_KEY && !is_currency_code(key) {
            return Err(Error::RateFeed(format!("unexpected key {:?}", key)));
        }

        match value {
            Value::Object(ticker) => match ticker.get("last") {
                None => {}
                Some(last) => {
                    let last = last
                        .as_f64()
                        .filter(|rate| *rate > 0.0)
                        .ok_or_else(|| {
                            Error::RateFeed(format!("{}.last must be a positive number", key))
                        })?;
                    rates.insert(key.clone(), last);
                }
            },
            other => {
                let date = parse_date(other).ok_or_else(|| {
                    Error::RateFeed(format!("{} is neither a date nor a ticker", key))
                })?;
                if key == TIMESTAMP_KEY {
                    as_of = Some(date);
                }
            }
        }
    }

    Ok(RateTable::new(rates, as_of.unwrap_or(fetched_at)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_table_from_tickers() {
        let snapshot = json!({
            "USD": { "ask": 10_010.0, "bid": 9_990.0, "last": 10_000.0 },
            "EUR": { "last": 9_000.5, "volume_percent": 12.1 },
            "timestamp": "Sat, 20 May 2017 00:00:00 -0000"
        });

        let table = parse_snapshot(&snapshot, Utc::now()).expect("valid snapshot");

        assert_eq!(table.len(), 2);
        assert_eq!(table.get("USD"), Some(10_000.0));
        assert_eq!(table.get("EUR"), Some(9_000.5));
        assert_eq!(
            table.as_of().unwrap().to_rfc3339(),
            "2017-05-20T00:00:00+00:00"
        );
    }

    #[test]
    fn tickers_without_last_are_skipped() {
        let snapshot = json!({
            "USD": { "last": 10_000.0 },
            "XAU": { "ask": 1.0 }
        });
        let table = parse_snapshot(&snapshot, Utc::now()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("XAU"), None);
    }

    #[test]
    fn date_values_are_accepted_but_not_rates() {
        let snapshot = json!({
            "USD": { "last": 10_000.0 },
            "GBP": "2017-05-20T00:00:00Z",
            "JPY": "2017-05-20",
            "timestamp": 1_495_238_400_000_i64
        });
        let fetched_at = Utc::now();
        let table = parse_snapshot(&snapshot, fetched_at).unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.get("GBP"), None);
        assert_eq!(table.as_of().unwrap().timestamp(), 1_495_238_400);
    }

    #[test]
    fn as_of_defaults_to_fetch_time() {
        let fetched_at = Utc::now();
        let table = parse_snapshot(&json!({ "USD": { "last": 1.0 } }), fetched_at).unwrap();
        assert_eq!(table.as_of(), Some(fetched_at));
    }

    #[test]
    fn rejects_unexpected_keys() {
        for key in ["usd", "USDT", "US", "rates"] {
            let snapshot = json!({ key: { "last": 1.0 } });
            assert!(
                parse_snapshot(&snapshot, Utc::now()).is_err(),
                "key {} should be rejected",
                key
            );
        }
    }

    #[test]
    fn rejects_non_positive_last() {
        for last in [json!(0), json!(-5.0), json!("10000"), json!(null)] {
            let snapshot = json!({ "USD": { "last": last } });
            assert!(matches!(
                parse_snapshot(&snapshot, Utc::now()),
                Err(Error::RateFeed(_))
            ));
        }
    }

    #[test]
    fn rejects_values_that_are_neither_dates_nor_tickers() {
        for value in [json!("not a date"), json!(true), json!([1, 2])] {
            let snapshot = json!({ "USD": value });
            assert!(parse_snapshot(&snapshot, Utc::now()).is_err());
        }
    }

    #[test]
    fn rejects_non_object_snapshot() {
        assert!(parse_snapshot(&json!([]), Utc::now()).is_err());
        assert!(parse_snapshot(&json!(null), Utc::now()).is_err());
    }

    #[test]
    fn currency_code_shape() {
        assert!(is_currency_code("USD"));
        assert!(!is_currency_code("Usd"));
        assert!(!is_currency_code("US1"));
        assert!(!is_currency_code("ÄBC"));
    }
}
