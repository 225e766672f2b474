//! Mix transition planning

use serde_json::json;
use stemwire_tools::{ToolRegistry, GENERATION_UNIT_COST_USD};
use stemwire_types::{EnergyLevel, JobId, MixPlan, TastePreferences, TrackId, Transition};
use tracing::warn;

/// Produces transition plans: always a deterministic energy-to-transition
/// mapping, optionally enriched with AI clips while generation budget
/// remains. Generation failures degrade the plan to metadata-only.
pub struct MixPlanner {
    tools: ToolRegistry,
}

impl MixPlanner {
    pub fn new(tools: ToolRegistry) -> Self {
        Self { tools }
    }

    /// Deterministic plan, no generation spend
    pub fn plan(
        &self,
        track_id: &TrackId,
        previous_track_id: Option<&TrackId>,
        preferences: &TastePreferences,
    ) -> MixPlan {
        let transition = match preferences.energy {
            Some(EnergyLevel::High) => Transition::HardCut,
            Some(EnergyLevel::Low) => Transition::CrossfadeLong,
            _ => Transition::Crossfade,
        };
        let notes = match &preferences.mood {
            Some(mood) => format!("lean into the {mood} mood"),
            None => "hold the current mood".to_string(),
        };
        MixPlan {
            track_id: track_id.clone(),
            previous_track_id: previous_track_id.cloned(),
            transition,
            notes,
            transition_job_id: None,
            fill_job_id: None,
            generation_spend_usd: 0.0,
        }
    }

    /// Generative plan: a transition clip when a previous track exists
    /// and the budget covers one unit, then a fill-stem clip when energy
    /// is high and budget still allows. Each failed generation is logged
    /// and skipped.
    pub async fn plan_with_generation(
        &self,
        track_id: &TrackId,
        previous_track_id: Option<&TrackId>,
        preferences: &TastePreferences,
        generation_budget_usd: f64,
    ) -> MixPlan {
        let mut plan = self.plan(track_id, previous_track_id, preferences);
        let mut budget_left = generation_budget_usd;

        if let Some(previous) = previous_track_id {
            if budget_left >= GENERATION_UNIT_COST_USD {
                let prompt = format!(
                    "short {} transition bridging {} into {}",
                    plan.transition, previous, track_id
                );
                match self.generate(&prompt).await {
                    Some(job_id) => {
                        plan.transition_job_id = Some(job_id);
                        plan.generation_spend_usd += GENERATION_UNIT_COST_USD;
                        budget_left -= GENERATION_UNIT_COST_USD;
                    }
                    None => warn!(track_id = %track_id, "transition clip generation skipped"),
                }
            }
        }

        if preferences.energy == Some(EnergyLevel::High)
            && budget_left >= GENERATION_UNIT_COST_USD
        {
            let prompt = format!("high-energy fill stem layered under {track_id}");
            match self.generate(&prompt).await {
                Some(job_id) => {
                    plan.fill_job_id = Some(job_id);
                    plan.generation_spend_usd += GENERATION_UNIT_COST_USD;
                }
                None => warn!(track_id = %track_id, "fill stem generation skipped"),
            }
        }

        plan
    }

    async fn generate(&self, prompt: &str) -> Option<JobId> {
        match self
            .tools
            .run("generation.create", json!({ "prompt": prompt }))
            .await
        {
            Ok(output) => output["jobId"]
                .as_str()
                .map(|job_id| JobId::from(job_id)),
            Err(err) => {
                warn!(error = %err, "generation.create failed");
                None
            }
        }
    }
}
