//! Stemwire Wallet - session key delegation and budget management
//!
//! Two mutually exclusive session-key modes behind one validate/revoke
//! surface: an ephemeral in-memory mock (lost on restart) and a
//! self-custodial mode that registers user-signed delegations. The wallet
//! side tracks monthly spend and produces alert levels.

mod mock_keys;
mod store;
mod wallet;

pub use mock_keys::{MockSessionKeyService, MockValidation, MOCK_SCOPE, MOCK_TTL_SECS};
pub use store::{
    AgentWalletRecord, InMemorySessionKeyStore, InMemoryWalletStore, ReserveOutcome,
    SessionKeyStore, WalletStore,
};
pub use wallet::{AgentWallet, KeyValidation, SessionKeyMode};

use thiserror::Error;

/// Errors that can occur in wallet operations.
///
/// Invalid session keys and exhausted budgets are structured results,
/// not errors; this enum covers wiring and store problems only.
#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Wallet not found: {user_id}")]
    WalletNotFound { user_id: String },

    #[error("Session key not found: {key_id}")]
    SessionKeyNotFound { key_id: String },
}

pub type Result<T> = std::result::Result<T, WalletError>;
