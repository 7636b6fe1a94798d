//! Hosted fiat checkout provider

use crate::wallet::{PaymentInfo, WalletInfo};
use crate::{Error, Result};

const CHECKOUT_URL: &str = "https://buy.coinbase.com";

/// Only fiat currency the checkout accepts
pub const SUPPORTED_CURRENCY: &str = "USD";

const TARGET_CRYPTO_CURRENCY: &str = "BTC";

/// Builds checkout links that deposit into a wallet address
pub struct FiatLinkProvider {
    widget_code: String,
}

impl FiatLinkProvider {
    pub fn new(widget_code: impl Into<String>) -> Self {
        Self {
            widget_code: widget_code.into(),
        }
    }

    pub fn payment_info(&self, info: &WalletInfo, amount: f64, currency: &str) -> Result<PaymentInfo> {
        if currency != SUPPORTED_CURRENCY {
            return Err(Error::PaymentCurrency(currency.to_string()));
        }

        let amount = amount.to_string();
        let url = url::Url::parse_with_params(
            CHECKOUT_URL,
            &[
                ("code", self.widget_code.as_str()),
                ("amount", amount.as_str()),
                ("address", info.address.as_str()),
                ("crypto_currency", TARGET_CRYPTO_CURRENCY),
            ],
        )
        .map_err(|e| Error::Config(format!("checkout url: {}", e)))?;

        Ok(PaymentInfo {
            buy_url: url.to_string(),
        })
    }
}
