//! Stemwire Purchase - executing budget-capped purchases
//!
//! The executor validates the session key, reserves wallet budget,
//! records a ledger row, and submits the buy call (mocked or on chain).
//! Rejections (invalid key, exhausted budget) are structured results;
//! the error enum covers ledger misuse only.

mod executor;
mod ledger;

pub use executor::{PurchaseExecutor, PurchaseMode, PurchaseRequest, PurchaseResult};
pub use ledger::{TransactionLedger, RECENT_TRANSACTIONS_CAP};

use stemwire_types::AgentTxId;
use thiserror::Error;

/// Errors that can occur in purchase bookkeeping
#[derive(Error, Debug)]
pub enum PurchaseError {
    #[error("Transaction not found: {tx_id}")]
    TransactionNotFound { tx_id: AgentTxId },

    #[error("Transaction {tx_id} is terminal ({status}), cannot transition to {requested}")]
    TerminalTransition {
        tx_id: AgentTxId,
        status: String,
        requested: String,
    },
}

pub type Result<T> = std::result::Result<T, PurchaseError>;
