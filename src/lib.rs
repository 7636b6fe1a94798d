//! Custodial Wallet Gateway
//!
//! Multi-provider wallet façade over a custodial bitcoin backend:
//! - Create 2-of-3 multi-signature wallets with webhook and velocity policy
//! - Report balances and submit externally signed transactions
//! - Build unsigned transactions for fiat amounts, converging on the
//!   backend's fee in a bounded bidding loop
//! - Hand out hosted fiat checkout links
//!
//! Fiat amounts are converted with a rate table that a background task
//! refreshes on a fixed interval. Readers never block on a refresh.

pub mod backend;
pub mod config;
pub mod providers;
pub mod rates;
pub mod wallet;

mod error;

// Re-export commonly used types
pub use config::{Environment, WalletConfig};
pub use error::{Error, Result};
pub use rates::{RateCache, RateRefresher};
pub use wallet::{WalletFacade, WalletInfo};
