//! Stemwire Events - typed in-process publish/subscribe
//!
//! # Delivery contract
//!
//! The bus is **at-most-once and non-durable**: events published while a
//! subscriber is absent or lagging are dropped, nothing is retried or
//! persisted, and ordering is only guaranteed within same-process dispatch
//! order. Downstream consumers (UI notification channels, analytics) are
//! external collaborators; the core does not depend on delivery.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stemwire_types::{
    AlertLevel, LicenseType, ListingId, SessionId, TokenId, TrackId, Transition, UserId,
};
use tokio::sync::broadcast;

/// Default bounded capacity of the broadcast channel. Slow subscribers
/// past this bound lose the oldest events (at-most-once).
pub const DEFAULT_BUS_CAPACITY: usize = 256;

/// Every event the core produces, with its fixed field set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "eventName", rename_all = "snake_case")]
pub enum AgentEvent {
    #[serde(rename = "session.started")]
    SessionStarted {
        session_id: SessionId,
        user_id: UserId,
    },
    #[serde(rename = "agent.selection")]
    Selection {
        session_id: SessionId,
        candidates: Vec<TrackId>,
        selected: Vec<TrackId>,
    },
    #[serde(rename = "agent.mix_planned")]
    MixPlanned {
        session_id: SessionId,
        track_id: TrackId,
        transition: Transition,
    },
    #[serde(rename = "agent.negotiated")]
    Negotiated {
        session_id: SessionId,
        track_id: TrackId,
        license_type: LicenseType,
        price_usd: f64,
        reason: String,
    },
    #[serde(rename = "agent.decision_made")]
    DecisionMade {
        session_id: SessionId,
        accepted: u32,
        total_spend_usd: f64,
        generations_used: u32,
        generation_spend_usd: f64,
        reason: String,
    },
    #[serde(rename = "agent.generation_triggered")]
    GenerationTriggered {
        session_id: SessionId,
        job_id: String,
        prompt: String,
        cost_usd: f64,
    },
    #[serde(rename = "agent.purchase_completed")]
    PurchaseCompleted {
        session_id: SessionId,
        user_id: UserId,
        listing_id: ListingId,
        token_id: TokenId,
        amount: u64,
        price_usd: f64,
        tx_hash: String,
        mode: String,
    },
    #[serde(rename = "agent.purchase_failed")]
    PurchaseFailed {
        session_id: SessionId,
        user_id: UserId,
        listing_id: ListingId,
        error: String,
    },
    #[serde(rename = "agent.budget_alert")]
    BudgetAlert {
        user_id: UserId,
        level: AlertLevel,
        percent_used: u32,
        spent_usd: f64,
        monthly_cap_usd: f64,
        remaining_usd: f64,
    },
    #[serde(rename = "agent.wallet_enabled")]
    WalletEnabled {
        user_id: UserId,
        wallet_address: String,
    },
    #[serde(rename = "agent.wallet_disabled")]
    WalletDisabled { user_id: UserId },
}

impl AgentEvent {
    /// The wire name of this event
    pub fn name(&self) -> &'static str {
        match self {
            Self::SessionStarted { .. } => "session.started",
            Self::Selection { .. } => "agent.selection",
            Self::MixPlanned { .. } => "agent.mix_planned",
            Self::Negotiated { .. } => "agent.negotiated",
            Self::DecisionMade { .. } => "agent.decision_made",
            Self::GenerationTriggered { .. } => "agent.generation_triggered",
            Self::PurchaseCompleted { .. } => "agent.purchase_completed",
            Self::PurchaseFailed { .. } => "agent.purchase_failed",
            Self::BudgetAlert { .. } => "agent.budget_alert",
            Self::WalletEnabled { .. } => "agent.wallet_enabled",
            Self::WalletDisabled { .. } => "agent.wallet_disabled",
        }
    }
}

/// An event wrapped with its publication timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub occurred_at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: AgentEvent,
}

/// The Stemwire event bus.
///
/// Cloning the bus shares the underlying channel; any clone may publish
/// and any clone may open new subscriptions.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Envelope>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUS_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event. Dropped silently when no subscriber is listening
    /// (at-most-once - publication is fire-and-forget).
    pub fn publish(&self, event: AgentEvent) {
        tracing::debug!(event = event.name(), "publishing event");
        let envelope = Envelope {
            occurred_at: Utc::now(),
            event,
        };
        let _ = self.sender.send(envelope);
    }

    /// Open a new subscription. Only events published after this call are
    /// observed.
    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Test helper: drain every event currently buffered on a receiver.
pub fn drain(receiver: &mut broadcast::Receiver<Envelope>) -> Vec<AgentEvent> {
    let mut events = Vec::new();
    while let Ok(envelope) = receiver.try_recv() {
        events.push(envelope.event);
    }
    events
}
