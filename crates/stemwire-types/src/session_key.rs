//! Session key records
//!
//! A session key is a scoped, time-boxed signing delegation that lets the
//! agent transact on a user's behalf without their private key. The user
//! signs the delegation off-system; the backend only registers, validates,
//! and revokes it.
//!
//! # Invariant
//!
//! At most one non-revoked, non-expired key exists per user. Registering a
//! new key revokes all previously active keys first (revoke-then-create,
//! two sequential writes - see the wallet crate for the crash-safety
//! discussion).

use crate::{SessionKeyId, TxHash, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// On-chain policies granted with the delegation, enforced by the smart
/// account. Spending caps are in native-currency base units (wei).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionKeyPermissions {
    /// Contract address the key may call (the marketplace)
    pub target: String,
    /// Allowed function signature, e.g. `buy(uint256,uint256)`
    pub function: String,
    pub total_cap_wei: u128,
    pub per_tx_cap_wei: u128,
    /// Max transactions per hour
    pub rate_limit: u32,
}

/// A registered delegated signing authority. Never physically deleted;
/// revocation sets `revoked_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionKey {
    pub id: SessionKeyId,
    pub user_id: UserId,
    /// Serialized key material as produced by the user's signer
    pub serialized_key: String,
    pub permissions: SessionKeyPermissions,
    pub valid_until: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<TxHash>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoke_tx_hash: Option<TxHash>,
    pub created_at: DateTime<Utc>,
}

impl SessionKey {
    /// Non-revoked and not yet expired at `now`
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && self.valid_until > now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn key(valid_until: DateTime<Utc>, revoked_at: Option<DateTime<Utc>>) -> SessionKey {
        SessionKey {
            id: SessionKeyId::new(),
            user_id: UserId::new(),
            serialized_key: "0xkey".to_string(),
            permissions: SessionKeyPermissions {
                target: "0xmarket".to_string(),
                function: "buy(uint256,uint256)".to_string(),
                total_cap_wei: 1_000_000,
                per_tx_cap_wei: 100_000,
                rate_limit: 10,
            },
            valid_until,
            tx_hash: None,
            revoked_at,
            revoke_tx_hash: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_active_requires_unexpired_and_unrevoked() {
        let now = Utc::now();
        assert!(key(now + Duration::hours(1), None).is_active(now));
        assert!(!key(now - Duration::hours(1), None).is_active(now));
        assert!(!key(now + Duration::hours(1), Some(now)).is_active(now));
    }
}
