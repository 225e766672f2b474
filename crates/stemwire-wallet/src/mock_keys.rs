//! Ephemeral mock session keys
//!
//! An in-memory issue/validate/expire cycle keyed by an opaque token.
//! Nothing persists; a restart drops every key, which is safe because
//! purchase attempts simply reject until re-issued.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use stemwire_types::UserId;

/// Scope granted to agent purchase keys
pub const MOCK_SCOPE: &str = "agent:purchase";

/// Default key lifetime in seconds
pub const MOCK_TTL_SECS: i64 = 3600;

#[derive(Debug, Clone)]
struct MockKey {
    user_id: UserId,
    scope: String,
    expires_at: DateTime<Utc>,
}

/// Outcome of validating a mock token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockValidation {
    pub valid: bool,
    pub reason: Option<&'static str>,
    pub expires_at: Option<i64>,
}

impl MockValidation {
    fn invalid(reason: &'static str) -> Self {
        Self {
            valid: false,
            reason: Some(reason),
            expires_at: None,
        }
    }
}

#[derive(Clone, Default)]
pub struct MockSessionKeyService {
    keys: Arc<RwLock<HashMap<String, MockKey>>>,
}

impl MockSessionKeyService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a token for the user; any previous token for the same user
    /// stays in the map but is superseded on lookup by user.
    pub async fn issue(&self, user_id: &UserId, scope: &str, ttl_seconds: i64) -> String {
        let token = format!("skm_{}", Uuid::new_v4().simple());
        self.keys.write().await.insert(
            token.clone(),
            MockKey {
                user_id: user_id.clone(),
                scope: scope.to_string(),
                expires_at: Utc::now() + Duration::seconds(ttl_seconds),
            },
        );
        token
    }

    pub async fn validate(&self, token: &str, scope: &str) -> MockValidation {
        let keys = self.keys.read().await;
        let Some(key) = keys.get(token) else {
            return MockValidation::invalid("not_found");
        };
        if key.expires_at <= Utc::now() {
            return MockValidation::invalid("expired");
        }
        if key.scope != scope {
            return MockValidation::invalid("scope_mismatch");
        }
        MockValidation {
            valid: true,
            reason: None,
            expires_at: Some(key.expires_at.timestamp_millis()),
        }
    }

    /// The newest unexpired token issued to this user, if any
    pub async fn token_for_user(&self, user_id: &UserId) -> Option<String> {
        let now = Utc::now();
        self.keys
            .read()
            .await
            .iter()
            .filter(|(_, key)| &key.user_id == user_id && key.expires_at > now)
            .max_by_key(|(_, key)| key.expires_at)
            .map(|(token, _)| token.clone())
    }

    pub async fn revoke(&self, token: &str) -> bool {
        self.keys.write().await.remove(token).is_some()
    }

    pub async fn revoke_for_user(&self, user_id: &UserId) -> usize {
        let mut keys = self.keys.write().await;
        let before = keys.len();
        keys.retain(|_, key| &key.user_id != user_id);
        before - keys.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_issue_then_validate() {
        let service = MockSessionKeyService::new();
        let user = UserId::new();
        let token = service.issue(&user, MOCK_SCOPE, MOCK_TTL_SECS).await;

        let validation = service.validate(&token, MOCK_SCOPE).await;
        assert!(validation.valid);
        assert!(validation.expires_at.is_some());
    }

    #[tokio::test]
    async fn test_scope_mismatch() {
        let service = MockSessionKeyService::new();
        let user = UserId::new();
        let token = service.issue(&user, MOCK_SCOPE, MOCK_TTL_SECS).await;

        let validation = service.validate(&token, "other-scope").await;
        assert!(!validation.valid);
        assert_eq!(validation.reason, Some("scope_mismatch"));
    }

    #[tokio::test]
    async fn test_unknown_token_is_not_found() {
        let service = MockSessionKeyService::new();
        let validation = service.validate("skm_missing", MOCK_SCOPE).await;
        assert_eq!(validation.reason, Some("not_found"));
    }

    #[tokio::test]
    async fn test_expired_token() {
        let service = MockSessionKeyService::new();
        let user = UserId::new();
        let token = service.issue(&user, MOCK_SCOPE, -1).await;

        let validation = service.validate(&token, MOCK_SCOPE).await;
        assert_eq!(validation.reason, Some("expired"));
    }

    #[tokio::test]
    async fn test_revoke_for_user_drops_all_tokens() {
        let service = MockSessionKeyService::new();
        let user = UserId::new();
        service.issue(&user, MOCK_SCOPE, MOCK_TTL_SECS).await;
        service.issue(&user, MOCK_SCOPE, MOCK_TTL_SECS).await;

        assert_eq!(service.revoke_for_user(&user).await, 2);
        assert!(service.token_for_user(&user).await.is_none());
    }
}
