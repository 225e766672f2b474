//! Mix transition plans

use crate::{JobId, TrackId};
use serde::{Deserialize, Serialize};

/// How the agent should transition into a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Transition {
    HardCut,
    Crossfade,
    CrossfadeLong,
}

impl Transition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HardCut => "hard-cut",
            Self::Crossfade => "crossfade",
            Self::CrossfadeLong => "crossfade-long",
        }
    }
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A transition plan for one track.
///
/// The deterministic fields are always present; the generation job ids are
/// only set when the planner ran in generative mode and the budget allowed
/// the corresponding clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MixPlan {
    pub track_id: TrackId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_track_id: Option<TrackId>,
    pub transition: Transition,
    pub notes: String,
    /// AI transition clip bridging from the previous track
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition_job_id: Option<JobId>,
    /// AI fill-stem clip layered under a high-energy entry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_job_id: Option<JobId>,
    /// Total generation budget consumed by this plan, in USD
    pub generation_spend_usd: f64,
}
