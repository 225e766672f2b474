//! Budget-capped purchase execution

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use stemwire_chain::{mock_tx_hash, BuyCall, PurchaseSubmitter, SubmissionPath};
use stemwire_events::{AgentEvent, EventBus};
use stemwire_types::{AgentTransaction, AgentTxId, Listing, SessionId, TxHash, TxStatus, UserId};
use stemwire_wallet::{AgentWallet, ReserveOutcome, WalletStore};
use tracing::{info, warn};

use crate::ledger::TransactionLedger;
use crate::Result;

/// How confirmed purchases are settled.
///
/// Mock mode synthesizes a transaction hash without touching the
/// network; on-chain mode submits through the configured submitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseMode {
    Mock,
    OnChain,
}

impl PurchaseMode {
    /// `STEMWIRE_SKIP_BUNDLER=true` selects mock mode
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        match std::env::var("STEMWIRE_SKIP_BUNDLER").as_deref() {
            Ok("true") | Ok("1") => Self::Mock,
            _ => Self::OnChain,
        }
    }
}

/// One negotiated purchase awaiting execution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub listing: Listing,
    pub amount: u64,
    pub price_usd: f64,
}

/// Outcome of a purchase attempt.
///
/// Rejections (invalid session key, exhausted budget) and submission
/// failures all land here; only ledger misuse surfaces as an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseResult {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_id: Option<AgentTxId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<TxHash>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_budget_usd: Option<f64>,
}

impl PurchaseResult {
    fn rejected(reason: &str, remaining_budget_usd: Option<f64>) -> Self {
        Self {
            accepted: false,
            reason: Some(reason.to_string()),
            tx_id: None,
            tx_hash: None,
            remaining_budget_usd,
        }
    }
}

/// Validates the session key, reserves budget, records the transaction,
/// and settles the buy call.
pub struct PurchaseExecutor {
    mode: PurchaseMode,
    wallet: Arc<AgentWallet>,
    wallets: Arc<dyn WalletStore>,
    ledger: TransactionLedger,
    submitter: Arc<dyn PurchaseSubmitter>,
    events: EventBus,
    marketplace: String,
}

impl PurchaseExecutor {
    pub fn new(
        mode: PurchaseMode,
        wallet: Arc<AgentWallet>,
        wallets: Arc<dyn WalletStore>,
        ledger: TransactionLedger,
        submitter: Arc<dyn PurchaseSubmitter>,
        events: EventBus,
        marketplace: impl Into<String>,
    ) -> Self {
        Self {
            mode,
            wallet,
            wallets,
            ledger,
            submitter,
            events,
            marketplace: marketplace.into(),
        }
    }

    pub fn ledger(&self) -> &TransactionLedger {
        &self.ledger
    }

    /// Execute a negotiated purchase.
    ///
    /// Ordering is fixed: key validation, then budget reservation, then
    /// the ledger row, then settlement. A rejection at either gate leaves
    /// no trace in the ledger or the wallet. A submission failure keeps
    /// the reserved spend; reconciliation against the chain releases it,
    /// not this path.
    pub async fn execute(&self, request: &PurchaseRequest) -> Result<PurchaseResult> {
        let validation = self.wallet.validate(&request.user_id).await;
        if !validation.valid {
            warn!(
                user_id = %request.user_id,
                reason = validation.reason.as_deref().unwrap_or("unknown"),
                "purchase rejected, session key invalid"
            );
            return Ok(PurchaseResult::rejected("session_key_invalid", None));
        }

        let remaining = match self
            .wallets
            .try_reserve(&request.user_id, request.price_usd)
            .await
        {
            ReserveOutcome::Reserved { remaining_usd } => remaining_usd,
            ReserveOutcome::Insufficient { remaining_usd } => {
                info!(
                    user_id = %request.user_id,
                    price_usd = request.price_usd,
                    remaining_usd,
                    "purchase rejected, monthly budget exhausted"
                );
                return Ok(PurchaseResult::rejected(
                    "budget_exceeded",
                    Some(remaining_usd),
                ));
            }
        };

        let total_price_wei = request.listing.price_per_unit_wei * request.amount as u128;
        let tx_id = self
            .ledger
            .create(AgentTransaction {
                id: AgentTxId::new(),
                session_id: request.session_id.clone(),
                user_id: request.user_id.clone(),
                listing_id: request.listing.listing_id,
                token_id: request.listing.token_id,
                amount: request.amount,
                total_price_wei,
                price_usd: request.price_usd,
                status: TxStatus::Pending,
                tx_hash: None,
                error_message: None,
                created_at: Utc::now(),
                confirmed_at: None,
            })
            .await;

        let call = BuyCall {
            marketplace: self.marketplace.clone(),
            listing_id: request.listing.listing_id,
            amount: request.amount,
            total_price_wei,
            chain_id: request.listing.chain_id,
        };

        let (tx_hash, mode) = match self.mode {
            PurchaseMode::Mock => (
                TxHash(mock_tx_hash(call.listing_id.0)),
                SubmissionPath::Mock,
            ),
            PurchaseMode::OnChain => {
                self.ledger.mark_submitted(&tx_id).await?;
                match self.submitter.submit_buy(&call).await {
                    Ok((hash, path)) => (hash, path),
                    Err(err) => {
                        let message = err.to_string();
                        warn!(
                            tx_id = %tx_id,
                            listing_id = call.listing_id.0,
                            error = %message,
                            "purchase submission failed"
                        );
                        self.ledger.mark_failed(&tx_id, &message).await?;
                        self.events.publish(AgentEvent::PurchaseFailed {
                            session_id: request.session_id.clone(),
                            user_id: request.user_id.clone(),
                            listing_id: request.listing.listing_id,
                            error: message.clone(),
                        });
                        return Ok(PurchaseResult {
                            accepted: false,
                            reason: Some(message),
                            tx_id: Some(tx_id),
                            tx_hash: None,
                            remaining_budget_usd: Some(remaining),
                        });
                    }
                }
            }
        };

        self.ledger.mark_confirmed(&tx_id, tx_hash.clone()).await?;
        let mode_label = match mode {
            SubmissionPath::Mock => "mock",
            SubmissionPath::Bundler => "bundler",
            SubmissionPath::Direct => "direct",
        };
        info!(
            tx_id = %tx_id,
            listing_id = request.listing.listing_id.0,
            price_usd = request.price_usd,
            mode = mode_label,
            "purchase confirmed"
        );
        self.events.publish(AgentEvent::PurchaseCompleted {
            session_id: request.session_id.clone(),
            user_id: request.user_id.clone(),
            listing_id: request.listing.listing_id,
            token_id: request.listing.token_id,
            amount: request.amount,
            price_usd: request.price_usd,
            tx_hash: tx_hash.0.clone(),
            mode: mode_label.to_string(),
        });
        self.wallet
            .check_and_emit_budget_alert(&request.user_id)
            .await;

        Ok(PurchaseResult {
            accepted: true,
            reason: None,
            tx_id: Some(tx_id),
            tx_hash: Some(tx_hash),
            remaining_budget_usd: Some(remaining),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use stemwire_chain::MockSubmitter;
    use stemwire_events::drain;
    use stemwire_types::{AlertLevel, ListingId, ListingStatus, StemId, TokenId};
    use stemwire_wallet::{InMemorySessionKeyStore, InMemoryWalletStore, SessionKeyMode};

    struct Fixture {
        executor: PurchaseExecutor,
        wallet: Arc<AgentWallet>,
        wallets: Arc<InMemoryWalletStore>,
        submitter: Arc<MockSubmitter>,
        events: EventBus,
    }

    fn fixture(purchase_mode: PurchaseMode) -> Fixture {
        let wallets = Arc::new(InMemoryWalletStore::new());
        let events = EventBus::new();
        let wallet = Arc::new(AgentWallet::new(
            SessionKeyMode::Mock,
            Arc::new(InMemorySessionKeyStore::new()),
            wallets.clone(),
            events.clone(),
        ));
        let submitter = Arc::new(MockSubmitter::new());
        let executor = PurchaseExecutor::new(
            purchase_mode,
            wallet.clone(),
            wallets.clone(),
            TransactionLedger::new(),
            submitter.clone(),
            events.clone(),
            "0x2f8a1c440be97de074ccefa0ab48dd95d3d8c201",
        );
        Fixture {
            executor,
            wallet,
            wallets,
            submitter,
            events,
        }
    }

    fn listing() -> Listing {
        Listing {
            listing_id: ListingId(7),
            token_id: TokenId(70),
            stem_id: StemId::new(),
            price_per_unit_wei: 10_000_000_000_000,
            chain_id: 31337,
            stem_type: "vocals".to_string(),
            status: ListingStatus::Active,
            expiry: Utc::now() + Duration::hours(1),
        }
    }

    fn request(user_id: &UserId, price_usd: f64) -> PurchaseRequest {
        PurchaseRequest {
            session_id: SessionId::new(),
            user_id: user_id.clone(),
            listing: listing(),
            amount: 1,
            price_usd,
        }
    }

    #[tokio::test]
    async fn test_invalid_session_key_rejects_without_side_effects() {
        let fx = fixture(PurchaseMode::Mock);
        let user = UserId::new();
        // Wallet row exists but no key was ever issued
        fx.wallets
            .upsert(stemwire_wallet::AgentWalletRecord {
                user_id: user.clone(),
                enabled: true,
                wallet_address: Some("0xabc".to_string()),
                account_type: "smart_account".to_string(),
                monthly_cap_usd: 10.0,
                spent_usd: 0.0,
            })
            .await;

        let result = fx.executor.execute(&request(&user, 0.02)).await.unwrap();
        assert!(!result.accepted);
        assert_eq!(result.reason.as_deref(), Some("session_key_invalid"));
        assert!(result.tx_id.is_none());
        assert_eq!(fx.wallets.get(&user).await.unwrap().spent_usd, 0.0);
        assert!(fx.executor.ledger().recent_for_user(&user).await.is_empty());
    }

    #[tokio::test]
    async fn test_exhausted_budget_rejects_without_ledger_row() {
        let fx = fixture(PurchaseMode::Mock);
        let user = UserId::new();
        fx.wallet.enable(&user, "0xabc", 0.05).await.unwrap();

        let result = fx.executor.execute(&request(&user, 0.06)).await.unwrap();
        assert!(!result.accepted);
        assert_eq!(result.reason.as_deref(), Some("budget_exceeded"));
        assert_eq!(result.remaining_budget_usd, Some(0.05));
        assert!(fx.executor.ledger().recent_for_user(&user).await.is_empty());
        assert_eq!(fx.wallets.get(&user).await.unwrap().spent_usd, 0.0);
    }

    #[tokio::test]
    async fn test_mock_purchase_confirms_and_publishes() {
        let fx = fixture(PurchaseMode::Mock);
        let user = UserId::new();
        fx.wallet.enable(&user, "0xabc", 10.0).await.unwrap();
        let mut rx = fx.events.subscribe();

        let result = fx.executor.execute(&request(&user, 0.02)).await.unwrap();
        assert!(result.accepted);
        let hash = result.tx_hash.unwrap();
        assert!(hash.0.starts_with("0x"));

        let tx = fx
            .executor
            .ledger()
            .get(result.tx_id.as_ref().unwrap())
            .await
            .unwrap();
        assert_eq!(tx.status, TxStatus::Confirmed);
        assert!((fx.wallets.get(&user).await.unwrap().spent_usd - 0.02).abs() < 1e-9);

        let published = drain(&mut rx);
        assert!(published.iter().any(|e| matches!(
            e,
            AgentEvent::PurchaseCompleted { mode, .. } if mode == "mock"
        )));
        // Mock mode never reaches the submitter
        assert!(fx.submitter.submitted().await.is_empty());
    }

    #[tokio::test]
    async fn test_submission_failure_keeps_reserved_spend() {
        let fx = fixture(PurchaseMode::OnChain);
        let user = UserId::new();
        fx.wallet.enable(&user, "0xabc", 10.0).await.unwrap();
        fx.submitter.fail_with("bundler unavailable").await;
        let mut rx = fx.events.subscribe();

        let result = fx.executor.execute(&request(&user, 0.02)).await.unwrap();
        assert!(!result.accepted);
        let tx = fx
            .executor
            .ledger()
            .get(result.tx_id.as_ref().unwrap())
            .await
            .unwrap();
        assert_eq!(tx.status, TxStatus::Failed);
        assert!(tx.error_message.as_deref().unwrap().contains("bundler"));
        // Reserved spend stays put until chain reconciliation
        assert!((fx.wallets.get(&user).await.unwrap().spent_usd - 0.02).abs() < 1e-9);

        let published = drain(&mut rx);
        assert!(published
            .iter()
            .any(|e| matches!(e, AgentEvent::PurchaseFailed { .. })));
    }

    #[tokio::test]
    async fn test_onchain_purchase_records_submission_path() {
        let fx = fixture(PurchaseMode::OnChain);
        let user = UserId::new();
        fx.wallet.enable(&user, "0xabc", 10.0).await.unwrap();

        let result = fx.executor.execute(&request(&user, 0.02)).await.unwrap();
        assert!(result.accepted);
        assert_eq!(fx.submitter.submitted().await.len(), 1);
        let tx = fx
            .executor
            .ledger()
            .get(result.tx_id.as_ref().unwrap())
            .await
            .unwrap();
        assert_eq!(tx.status, TxStatus::Confirmed);
        assert!(tx.tx_hash.is_some());
    }

    #[tokio::test]
    async fn test_purchase_crossing_threshold_emits_alert() {
        let fx = fixture(PurchaseMode::Mock);
        let user = UserId::new();
        fx.wallet.enable(&user, "0xabc", 0.10).await.unwrap();
        let mut record = fx.wallets.get(&user).await.unwrap();
        record.spent_usd = 0.07;
        fx.wallets.upsert(record).await;
        let mut rx = fx.events.subscribe();

        let result = fx.executor.execute(&request(&user, 0.02)).await.unwrap();
        assert!(result.accepted);

        let published = drain(&mut rx);
        assert!(published.iter().any(|e| matches!(
            e,
            AgentEvent::BudgetAlert {
                level: AlertLevel::Warning,
                percent_used: 90,
                ..
            }
        )));
    }
}
