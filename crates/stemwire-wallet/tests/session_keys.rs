use std::sync::Arc;

use chrono::{Duration, Utc};
use stemwire_events::EventBus;
use stemwire_types::{SessionKeyPermissions, UserId};
use stemwire_wallet::{
    AgentWallet, InMemorySessionKeyStore, InMemoryWalletStore, SessionKeyMode, SessionKeyStore,
};

fn permissions() -> SessionKeyPermissions {
    SessionKeyPermissions {
        target: "0x2f8a1c440be97de074ccefa0ab48dd95d3d8c201".to_string(),
        function: "buy(uint256,uint256)".to_string(),
        total_cap_wei: 5_000_000_000_000_000,
        per_tx_cap_wei: 500_000_000_000_000,
        rate_limit: 10,
    }
}

#[tokio::test]
async fn test_register_revokes_every_prior_key() {
    let keys = Arc::new(InMemorySessionKeyStore::new());
    let wallet = AgentWallet::new(
        SessionKeyMode::OnChain,
        keys.clone(),
        Arc::new(InMemoryWalletStore::new()),
        EventBus::new(),
    );
    let user = UserId::new();
    let until = Utc::now() + Duration::days(7);

    for serialized in ["0xkey1", "0xkey2", "0xkey3"] {
        wallet
            .register_session_key(&user, serialized, permissions(), until, None)
            .await
            .unwrap();
    }

    let all = keys.keys_for_user(&user).await;
    assert_eq!(all.len(), 3);
    let active: Vec<_> = all
        .iter()
        .filter(|k| k.is_active(Utc::now()))
        .collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].serialized_key, "0xkey3");
}

// Revoke-then-create is two sequential writes with no surrounding
// transaction. A crash after the revoke leaves zero active keys, which
// must fail closed: validation rejects until the user re-registers.
#[tokio::test]
async fn test_crash_between_revoke_and_insert_fails_closed() {
    let keys = Arc::new(InMemorySessionKeyStore::new());
    let wallet = AgentWallet::new(
        SessionKeyMode::OnChain,
        keys.clone(),
        Arc::new(InMemoryWalletStore::new()),
        EventBus::new(),
    );
    let user = UserId::new();
    let until = Utc::now() + Duration::days(7);

    wallet
        .register_session_key(&user, "0xkey1", permissions(), until, None)
        .await
        .unwrap();

    // Simulate the first half of a registration that never completed
    keys.revoke_all(&user, None).await;

    let validation = wallet.validate(&user).await;
    assert!(!validation.valid);
    assert_eq!(validation.reason.as_deref(), Some("not_found"));
    assert!(wallet.active_session_key(&user).await.is_none());
}

#[tokio::test]
async fn test_expired_key_is_not_active() {
    let keys = Arc::new(InMemorySessionKeyStore::new());
    let wallet = AgentWallet::new(
        SessionKeyMode::OnChain,
        keys.clone(),
        Arc::new(InMemoryWalletStore::new()),
        EventBus::new(),
    );
    let user = UserId::new();

    wallet
        .register_session_key(
            &user,
            "0xkey1",
            permissions(),
            Utc::now() - Duration::minutes(1),
            None,
        )
        .await
        .unwrap();

    assert!(!wallet.validate(&user).await.valid);
}
