//! Session key and wallet persistence contracts

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use stemwire_types::{SessionKey, SessionKeyId, TxHash, UserId};

/// A user's agent wallet row
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentWalletRecord {
    pub user_id: UserId,
    pub enabled: bool,
    pub wallet_address: Option<String>,
    /// "smart_account" for delegated accounts, "eoa" for direct keys
    pub account_type: String,
    pub monthly_cap_usd: f64,
    pub spent_usd: f64,
}

impl AgentWalletRecord {
    pub fn remaining_usd(&self) -> f64 {
        (self.monthly_cap_usd - self.spent_usd).max(0.0)
    }
}

/// Result of an atomic check-and-reserve against the monthly cap
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReserveOutcome {
    /// Spend reserved; remaining budget after the reservation
    Reserved { remaining_usd: f64 },
    /// Cap would be exceeded; nothing was reserved
    Insufficient { remaining_usd: f64 },
}

/// Wallet persistence. Single-row updates are atomic; that is the only
/// transactional guarantee the core relies on.
#[async_trait]
pub trait WalletStore: Send + Sync {
    async fn get(&self, user_id: &UserId) -> Option<AgentWalletRecord>;

    async fn upsert(&self, record: AgentWalletRecord);

    /// Atomically check the remaining monthly budget and reserve
    /// `amount_usd` from it. Absent wallets report zero remaining.
    async fn try_reserve(&self, user_id: &UserId, amount_usd: f64) -> ReserveOutcome;
}

#[derive(Clone, Default)]
pub struct InMemoryWalletStore {
    wallets: Arc<RwLock<HashMap<UserId, AgentWalletRecord>>>,
}

impl InMemoryWalletStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WalletStore for InMemoryWalletStore {
    async fn get(&self, user_id: &UserId) -> Option<AgentWalletRecord> {
        self.wallets.read().await.get(user_id).cloned()
    }

    async fn upsert(&self, record: AgentWalletRecord) {
        self.wallets
            .write()
            .await
            .insert(record.user_id.clone(), record);
    }

    async fn try_reserve(&self, user_id: &UserId, amount_usd: f64) -> ReserveOutcome {
        let mut wallets = self.wallets.write().await;
        let Some(wallet) = wallets.get_mut(user_id) else {
            return ReserveOutcome::Insufficient { remaining_usd: 0.0 };
        };
        let remaining = wallet.remaining_usd();
        if amount_usd > remaining {
            return ReserveOutcome::Insufficient {
                remaining_usd: remaining,
            };
        }
        wallet.spent_usd += amount_usd;
        ReserveOutcome::Reserved {
            remaining_usd: wallet.remaining_usd(),
        }
    }
}

/// Session key persistence. Keys are never deleted; revocation writes
/// `revoked_at`.
#[async_trait]
pub trait SessionKeyStore: Send + Sync {
    async fn insert(&self, key: SessionKey);

    /// All keys for the user, newest first
    async fn keys_for_user(&self, user_id: &UserId) -> Vec<SessionKey>;

    /// The newest non-revoked, non-expired key
    async fn active_key(&self, user_id: &UserId) -> Option<SessionKey>;

    /// Revoke every active key; returns how many were revoked
    async fn revoke_all(&self, user_id: &UserId, revoke_tx_hash: Option<TxHash>) -> usize;

    async fn mark_revoked(&self, key_id: &SessionKeyId, revoke_tx_hash: Option<TxHash>) -> bool;
}

#[derive(Clone, Default)]
pub struct InMemorySessionKeyStore {
    keys: Arc<RwLock<Vec<SessionKey>>>,
}

impl InMemorySessionKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionKeyStore for InMemorySessionKeyStore {
    async fn insert(&self, key: SessionKey) {
        self.keys.write().await.push(key);
    }

    async fn keys_for_user(&self, user_id: &UserId) -> Vec<SessionKey> {
        let mut keys: Vec<SessionKey> = self
            .keys
            .read()
            .await
            .iter()
            .filter(|k| &k.user_id == user_id)
            .cloned()
            .collect();
        keys.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        keys
    }

    async fn active_key(&self, user_id: &UserId) -> Option<SessionKey> {
        let now = Utc::now();
        self.keys_for_user(user_id)
            .await
            .into_iter()
            .find(|k| k.is_active(now))
    }

    async fn revoke_all(&self, user_id: &UserId, revoke_tx_hash: Option<TxHash>) -> usize {
        let now = Utc::now();
        let mut keys = self.keys.write().await;
        let mut revoked = 0;
        for key in keys.iter_mut() {
            if &key.user_id == user_id && key.is_active(now) {
                key.revoked_at = Some(now);
                key.revoke_tx_hash = revoke_tx_hash.clone();
                revoked += 1;
            }
        }
        revoked
    }

    async fn mark_revoked(&self, key_id: &SessionKeyId, revoke_tx_hash: Option<TxHash>) -> bool {
        let mut keys = self.keys.write().await;
        for key in keys.iter_mut() {
            if &key.id == key_id && key.revoked_at.is_none() {
                key.revoked_at = Some(Utc::now());
                key.revoke_tx_hash = revoke_tx_hash;
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use stemwire_types::SessionKeyPermissions;

    fn wallet(user_id: &UserId, cap: f64, spent: f64) -> AgentWalletRecord {
        AgentWalletRecord {
            user_id: user_id.clone(),
            enabled: true,
            wallet_address: Some("0xwallet".to_string()),
            account_type: "smart_account".to_string(),
            monthly_cap_usd: cap,
            spent_usd: spent,
        }
    }

    pub(crate) fn key(user_id: &UserId) -> SessionKey {
        SessionKey {
            id: SessionKeyId::new(),
            user_id: user_id.clone(),
            serialized_key: "0xkey".to_string(),
            permissions: SessionKeyPermissions {
                target: "0xmarket".to_string(),
                function: "buy(uint256,uint256)".to_string(),
                total_cap_wei: 1_000_000,
                per_tx_cap_wei: 100_000,
                rate_limit: 10,
            },
            valid_until: Utc::now() + Duration::hours(1),
            tx_hash: None,
            revoked_at: None,
            revoke_tx_hash: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_reserve_is_checked_against_remaining() {
        let store = InMemoryWalletStore::new();
        let user = UserId::new();
        store.upsert(wallet(&user, 10.0, 9.50)).await;

        match store.try_reserve(&user, 0.40).await {
            ReserveOutcome::Reserved { remaining_usd } => {
                assert!((remaining_usd - 0.10).abs() < 1e-9)
            }
            other => panic!("expected reservation, got {other:?}"),
        }
        assert!(matches!(
            store.try_reserve(&user, 0.20).await,
            ReserveOutcome::Insufficient { .. }
        ));
    }

    #[tokio::test]
    async fn test_missing_wallet_cannot_reserve() {
        let store = InMemoryWalletStore::new();
        assert_eq!(
            store.try_reserve(&UserId::new(), 0.01).await,
            ReserveOutcome::Insufficient { remaining_usd: 0.0 }
        );
    }

    #[tokio::test]
    async fn test_revoke_all_leaves_no_active_key() {
        let store = InMemorySessionKeyStore::new();
        let user = UserId::new();
        store.insert(key(&user)).await;
        store.insert(key(&user)).await;

        assert_eq!(store.revoke_all(&user, None).await, 2);
        assert!(store.active_key(&user).await.is_none());
        // Rows survive revocation
        assert_eq!(store.keys_for_user(&user).await.len(), 2);
    }
}
