//! Agent transaction ledger rows
//!
//! An `AgentTransaction` is created with status `Pending` immediately
//! before any on-chain action and updated in place through to a terminal
//! state. It is the audit record for budget that was already reserved at
//! wallet level.

use crate::{AgentTxId, ListingId, SessionId, TokenId, TxHash, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Transaction status. `Confirmed` and `Failed` are terminal: a row that
/// reaches either never transitions again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Submitted,
    Confirmed,
    Failed,
}

impl TxStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Submitted => "submitted",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
        }
    }
}

/// One ledger row per purchase attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentTransaction {
    pub id: AgentTxId,
    pub session_id: SessionId,
    pub user_id: UserId,
    pub listing_id: ListingId,
    pub token_id: TokenId,
    pub amount: u64,
    pub total_price_wei: u128,
    pub price_usd: f64,
    pub status: TxStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<TxHash>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(!TxStatus::Pending.is_terminal());
        assert!(!TxStatus::Submitted.is_terminal());
        assert!(TxStatus::Confirmed.is_terminal());
        assert!(TxStatus::Failed.is_terminal());
    }
}
