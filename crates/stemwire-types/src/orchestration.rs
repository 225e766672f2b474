//! Orchestration requests and outcomes

use crate::{JobId, MixPlan, NegotiationResult, SessionId, TastePreferences, TrackId, UserId};
use serde::{Deserialize, Serialize};

/// Default generation budget per orchestration call, in USD
pub const DEFAULT_GENERATION_BUDGET_USD: f64 = 1.00;

/// One orchestration call: select, mix, negotiate, and decide under a
/// hard budget. Transient - produced per call, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrationRequest {
    pub session_id: SessionId,
    pub user_id: UserId,
    /// Ordered most-recent-first
    #[serde(default)]
    pub recent_track_ids: Vec<TrackId>,
    pub budget_remaining_usd: f64,
    /// Budget for AI-generated audio, distinct from the licensing budget
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_budget_usd: Option<f64>,
    #[serde(default)]
    pub preferences: TastePreferences,
}

impl OrchestrationRequest {
    pub fn generation_budget(&self) -> f64 {
        self.generation_budget_usd
            .unwrap_or(DEFAULT_GENERATION_BUDGET_USD)
    }
}

/// One track the pipeline settled on - either a licensed catalog track
/// (with a negotiation) or a synthesized filler (with a generation job).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratedTrack {
    pub track_id: TrackId,
    pub mix_plan: MixPlan,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negotiation: Option<NegotiationResult>,
    #[serde(default)]
    pub generated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_job_id: Option<JobId>,
}

/// Terminal status of an orchestration call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestrationStatus {
    /// At least one track was accepted or generated
    Approved,
    /// Candidates existed but every negotiation was rejected
    AllRejected,
    /// Nothing selected and nothing generated
    NoTracks,
}

impl OrchestrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::AllRejected => "all_rejected",
            Self::NoTracks => "no_tracks",
        }
    }
}

/// Result of one orchestration call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrationOutcome {
    pub status: OrchestrationStatus,
    pub tracks: Vec<OrchestratedTrack>,
    /// Licensing spend across accepted tracks, in USD
    pub total_spend_usd: f64,
    /// Number of AI generations triggered during this call
    pub generations_used: u32,
    /// Total USD spent on generations during this call
    pub generation_spend_usd: f64,
}

impl OrchestrationOutcome {
    pub fn no_tracks() -> Self {
        Self {
            status: OrchestrationStatus::NoTracks,
            tracks: Vec::new(),
            total_spend_usd: 0.0,
            generations_used: 0,
            generation_spend_usd: 0.0,
        }
    }
}
