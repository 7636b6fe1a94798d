//! Caller-facing wallet façade and the types it exchanges

mod facade;
mod types;

pub use facade::WalletFacade;
pub use types::{
    Balances, CreatedWallet, PaymentInfo, SubmittedTransaction, UnsignedTransaction,
    UserKeychain, WalletInfo,
};
