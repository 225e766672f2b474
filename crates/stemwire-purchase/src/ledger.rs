//! The agent transaction ledger

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use stemwire_types::{AgentTransaction, AgentTxId, TxHash, TxStatus, UserId};
use tokio::sync::RwLock;

use crate::{PurchaseError, Result};

/// Max rows returned by a per-user history query
pub const RECENT_TRANSACTIONS_CAP: usize = 50;

/// In-memory ledger of purchase attempts.
///
/// Terminality is enforced here: a row that reached `Confirmed` or
/// `Failed` rejects every further transition.
#[derive(Clone, Default)]
pub struct TransactionLedger {
    rows: Arc<RwLock<HashMap<AgentTxId, AgentTransaction>>>,
}

impl TransactionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self, tx: AgentTransaction) -> AgentTxId {
        let id = tx.id.clone();
        self.rows.write().await.insert(id.clone(), tx);
        id
    }

    pub async fn get(&self, tx_id: &AgentTxId) -> Option<AgentTransaction> {
        self.rows.read().await.get(tx_id).cloned()
    }

    pub async fn mark_submitted(&self, tx_id: &AgentTxId) -> Result<()> {
        self.transition(tx_id, TxStatus::Submitted, None, None).await
    }

    pub async fn mark_confirmed(&self, tx_id: &AgentTxId, tx_hash: TxHash) -> Result<()> {
        self.transition(tx_id, TxStatus::Confirmed, Some(tx_hash), None)
            .await
    }

    pub async fn mark_failed(&self, tx_id: &AgentTxId, error_message: &str) -> Result<()> {
        self.transition(
            tx_id,
            TxStatus::Failed,
            None,
            Some(error_message.to_string()),
        )
        .await
    }

    async fn transition(
        &self,
        tx_id: &AgentTxId,
        status: TxStatus,
        tx_hash: Option<TxHash>,
        error_message: Option<String>,
    ) -> Result<()> {
        let mut rows = self.rows.write().await;
        let row = rows
            .get_mut(tx_id)
            .ok_or_else(|| PurchaseError::TransactionNotFound { tx_id: tx_id.clone() })?;
        if row.status.is_terminal() {
            return Err(PurchaseError::TerminalTransition {
                tx_id: tx_id.clone(),
                status: row.status.as_str().to_string(),
                requested: status.as_str().to_string(),
            });
        }
        row.status = status;
        if let Some(hash) = tx_hash {
            row.tx_hash = Some(hash);
        }
        if error_message.is_some() {
            row.error_message = error_message;
        }
        if status == TxStatus::Confirmed {
            row.confirmed_at = Some(Utc::now());
        }
        Ok(())
    }

    /// The user's most recent rows, newest first, capped at
    /// `RECENT_TRANSACTIONS_CAP`
    pub async fn recent_for_user(&self, user_id: &UserId) -> Vec<AgentTransaction> {
        let mut rows: Vec<AgentTransaction> = self
            .rows
            .read()
            .await
            .values()
            .filter(|tx| &tx.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(RECENT_TRANSACTIONS_CAP);
        rows
    }
}
