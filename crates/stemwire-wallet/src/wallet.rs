//! The agent wallet service

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stemwire_events::{AgentEvent, EventBus};
use stemwire_types::{
    AgentWalletStatus, AlertLevel, SessionKey, SessionKeyId, SessionKeyPermissions, TxHash, UserId,
};
use tracing::info;

use crate::mock_keys::{MockSessionKeyService, MOCK_SCOPE, MOCK_TTL_SECS};
use crate::store::{AgentWalletRecord, SessionKeyStore, WalletStore};
use crate::Result;

/// Which session-key machinery the deployment runs.
///
/// Mock keys are ephemeral in-memory tokens; on-chain keys are
/// user-signed delegations registered with the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKeyMode {
    Mock,
    OnChain,
}

impl SessionKeyMode {
    /// `STEMWIRE_SKIP_BUNDLER=true` selects mock mode
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        match std::env::var("STEMWIRE_SKIP_BUNDLER").as_deref() {
            Ok("true") | Ok("1") => Self::Mock,
            _ => Self::OnChain,
        }
    }
}

/// Mode-independent outcome of validating a user's session key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyValidation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Unix millis, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

impl KeyValidation {
    fn invalid(reason: &str) -> Self {
        Self {
            valid: false,
            reason: Some(reason.to_string()),
            expires_at: None,
        }
    }
}

/// Issues, validates, and revokes delegated signing authority, and
/// computes wallet status and budget alerts.
pub struct AgentWallet {
    mode: SessionKeyMode,
    mock_keys: MockSessionKeyService,
    session_keys: Arc<dyn SessionKeyStore>,
    wallets: Arc<dyn WalletStore>,
    events: EventBus,
}

impl AgentWallet {
    pub fn new(
        mode: SessionKeyMode,
        session_keys: Arc<dyn SessionKeyStore>,
        wallets: Arc<dyn WalletStore>,
        events: EventBus,
    ) -> Self {
        Self {
            mode,
            mock_keys: MockSessionKeyService::new(),
            session_keys,
            wallets,
            events,
        }
    }

    pub fn mode(&self) -> SessionKeyMode {
        self.mode
    }

    /// Enable the agent wallet for a user. In mock mode this also issues
    /// the purchase-scoped token.
    pub async fn enable(
        &self,
        user_id: &UserId,
        wallet_address: &str,
        monthly_cap_usd: f64,
    ) -> Result<AgentWalletStatus> {
        let record = AgentWalletRecord {
            user_id: user_id.clone(),
            enabled: true,
            wallet_address: Some(wallet_address.to_string()),
            account_type: "smart_account".to_string(),
            monthly_cap_usd,
            spent_usd: self
                .wallets
                .get(user_id)
                .await
                .map(|w| w.spent_usd)
                .unwrap_or(0.0),
        };
        self.wallets.upsert(record).await;

        if self.mode == SessionKeyMode::Mock {
            self.mock_keys.issue(user_id, MOCK_SCOPE, MOCK_TTL_SECS).await;
        }

        info!(user_id = %user_id, "agent wallet enabled");
        self.events.publish(AgentEvent::WalletEnabled {
            user_id: user_id.clone(),
            wallet_address: wallet_address.to_string(),
        });
        Ok(self.status(user_id).await)
    }

    /// Disable the wallet and drop/revoke its keys
    pub async fn disable(&self, user_id: &UserId) -> Result<AgentWalletStatus> {
        if let Some(mut record) = self.wallets.get(user_id).await {
            record.enabled = false;
            self.wallets.upsert(record).await;
        }
        match self.mode {
            SessionKeyMode::Mock => {
                self.mock_keys.revoke_for_user(user_id).await;
            }
            SessionKeyMode::OnChain => {
                self.session_keys.revoke_all(user_id, None).await;
            }
        }

        info!(user_id = %user_id, "agent wallet disabled");
        self.events.publish(AgentEvent::WalletDisabled {
            user_id: user_id.clone(),
        });
        Ok(self.status(user_id).await)
    }

    /// Register a user-signed delegation. Every currently active key is
    /// revoked first; the two writes are sequential, not transactional,
    /// so a crash in between leaves zero active keys (purchases reject
    /// until re-registration) and never two.
    pub async fn register_session_key(
        &self,
        user_id: &UserId,
        serialized_key: &str,
        permissions: SessionKeyPermissions,
        valid_until: DateTime<Utc>,
        tx_hash: Option<TxHash>,
    ) -> Result<SessionKey> {
        let revoked = self.session_keys.revoke_all(user_id, None).await;
        if revoked > 0 {
            info!(user_id = %user_id, revoked, "revoked previously active session keys");
        }

        let key = SessionKey {
            id: SessionKeyId::new(),
            user_id: user_id.clone(),
            serialized_key: serialized_key.to_string(),
            permissions,
            valid_until,
            tx_hash,
            revoked_at: None,
            revoke_tx_hash: None,
            created_at: Utc::now(),
        };
        self.session_keys.insert(key.clone()).await;
        Ok(key)
    }

    /// Validate the user's current delegation, mode-dependent
    pub async fn validate(&self, user_id: &UserId) -> KeyValidation {
        match self.mode {
            SessionKeyMode::Mock => {
                let Some(token) = self.mock_keys.token_for_user(user_id).await else {
                    return KeyValidation::invalid("not_found");
                };
                let validation = self.mock_keys.validate(&token, MOCK_SCOPE).await;
                KeyValidation {
                    valid: validation.valid,
                    reason: validation.reason.map(str::to_string),
                    expires_at: validation.expires_at,
                }
            }
            SessionKeyMode::OnChain => match self.session_keys.active_key(user_id).await {
                Some(key) => KeyValidation {
                    valid: true,
                    reason: None,
                    expires_at: Some(key.valid_until.timestamp_millis()),
                },
                None => KeyValidation::invalid("not_found"),
            },
        }
    }

    /// The serialized key backing the current delegation, for submission
    pub async fn active_session_key(&self, user_id: &UserId) -> Option<SessionKey> {
        self.session_keys.active_key(user_id).await
    }

    /// Merge wallet row, key validity, and budget aggregation
    pub async fn status(&self, user_id: &UserId) -> AgentWalletStatus {
        let Some(record) = self.wallets.get(user_id).await else {
            return AgentWalletStatus::disabled();
        };
        let validation = self.validate(user_id).await;
        AgentWalletStatus {
            enabled: record.enabled,
            wallet_address: record.wallet_address.clone(),
            account_type: record.account_type.clone(),
            session_key_valid: validation.valid,
            session_key_expires_at: validation.expires_at,
            budget_cap_usd: record.monthly_cap_usd,
            spent_usd: record.spent_usd,
            remaining_usd: record.remaining_usd(),
            alert_level: AlertLevel::compute(record.spent_usd, record.monthly_cap_usd),
        }
    }

    /// Recompute the alert level and emit an event when it is non-none
    pub async fn check_and_emit_budget_alert(&self, user_id: &UserId) -> AlertLevel {
        let Some(record) = self.wallets.get(user_id).await else {
            return AlertLevel::None;
        };
        let level = AlertLevel::compute(record.spent_usd, record.monthly_cap_usd);
        if level != AlertLevel::None {
            let percent_used = if record.monthly_cap_usd > 0.0 {
                ((record.spent_usd / record.monthly_cap_usd) * 100.0).round() as u32
            } else {
                0
            };
            self.events.publish(AgentEvent::BudgetAlert {
                user_id: user_id.clone(),
                level,
                percent_used,
                spent_usd: record.spent_usd,
                monthly_cap_usd: record.monthly_cap_usd,
                remaining_usd: record.remaining_usd(),
            });
        }
        level
    }
}
