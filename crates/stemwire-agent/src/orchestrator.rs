//! The deterministic orchestration pipeline

use std::sync::Arc;

use serde_json::json;
use stemwire_events::{AgentEvent, EventBus};
use stemwire_tools::{ToolRegistry, GENERATION_UNIT_COST_USD};
use stemwire_types::{
    OrchestratedTrack, OrchestrationOutcome, OrchestrationRequest, OrchestrationStatus, TrackId,
};
use tracing::{info, warn};

use crate::{CandidateSelector, LicenseNegotiator, MixPlanner, Result};

/// Selected count below which the generation fallback kicks in
pub const SPARSE_THRESHOLD: usize = 3;

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub sparse_threshold: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            sparse_threshold: SPARSE_THRESHOLD,
        }
    }
}

/// Runs `compile-queries -> select -> (maybe generate-fill) ->
/// per-track(mix, negotiate, accept?) -> decide` under one hard budget.
///
/// Track processing is strictly sequential: the running budget is
/// checked then decremented in a well-defined order. Selector and tool
/// errors propagate to the caller; a failed call is retryable by
/// resubmission.
pub struct Orchestrator {
    selector: Arc<CandidateSelector>,
    negotiator: Arc<LicenseNegotiator>,
    mixer: Arc<MixPlanner>,
    tools: ToolRegistry,
    events: EventBus,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        selector: Arc<CandidateSelector>,
        negotiator: Arc<LicenseNegotiator>,
        mixer: Arc<MixPlanner>,
        tools: ToolRegistry,
        events: EventBus,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            selector,
            negotiator,
            mixer,
            tools,
            events,
            config,
        }
    }

    pub async fn run(&self, request: &OrchestrationRequest) -> Result<OrchestrationOutcome> {
        self.events.publish(AgentEvent::SessionStarted {
            session_id: request.session_id.clone(),
            user_id: request.user_id.clone(),
        });

        let queries = request.preferences.compile_queries();
        let use_embeddings = !queries.is_empty();
        let allow_explicit = request.preferences.allow_explicit.unwrap_or(false);

        let selection = self
            .selector
            .select(
                &queries,
                &request.recent_track_ids,
                allow_explicit,
                use_embeddings,
            )
            .await?;

        self.events.publish(AgentEvent::Selection {
            session_id: request.session_id.clone(),
            candidates: selection.candidate_ids.clone(),
            selected: selection.selected.iter().map(|c| c.id.clone()).collect(),
        });

        let mut generation_budget_left = request.generation_budget();
        let mut generations_used: u32 = 0;
        let mut generation_spend_usd: f64 = 0.0;
        let mut tracks: Vec<OrchestratedTrack> = Vec::new();

        // Scarcity fallback: synthesize fillers when the catalog came up
        // short, stopping at the first failure rather than retrying a
        // likely rate-limited backend.
        let selected_count = selection.selected.len();
        if selected_count < self.config.sparse_threshold
            && generation_budget_left >= GENERATION_UNIT_COST_USD
        {
            let fill_count = (self.config.sparse_threshold - selected_count)
                .min((generation_budget_left / GENERATION_UNIT_COST_USD).floor() as usize);
            for _ in 0..fill_count {
                let prompt = filler_prompt(request);
                match self
                    .tools
                    .run("generation.create", json!({ "prompt": prompt }))
                    .await
                {
                    Ok(output) => {
                        let job_id = output["jobId"].as_str().unwrap_or_default().to_string();
                        generation_budget_left -= GENERATION_UNIT_COST_USD;
                        generation_spend_usd += GENERATION_UNIT_COST_USD;
                        generations_used += 1;

                        let track_id = TrackId::new();
                        let mix_plan = self.mixer.plan(
                            &track_id,
                            tracks.last().map(|t| &t.track_id),
                            &request.preferences,
                        );
                        tracks.push(OrchestratedTrack {
                            track_id,
                            mix_plan,
                            negotiation: None,
                            generated: true,
                            generation_job_id: Some(stemwire_types::JobId::from(job_id.as_str())),
                        });
                        self.events.publish(AgentEvent::GenerationTriggered {
                            session_id: request.session_id.clone(),
                            job_id,
                            prompt,
                            cost_usd: GENERATION_UNIT_COST_USD,
                        });
                    }
                    Err(err) => {
                        warn!(error = %err, "filler generation failed, stopping fallback");
                        break;
                    }
                }
            }
        }

        if selection.selected.is_empty() && generations_used == 0 {
            self.events.publish(AgentEvent::DecisionMade {
                session_id: request.session_id.clone(),
                accepted: 0,
                total_spend_usd: 0.0,
                generations_used: 0,
                generation_spend_usd: 0.0,
                reason: OrchestrationStatus::NoTracks.as_str().to_string(),
            });
            return Ok(OrchestrationOutcome::no_tracks());
        }

        let license_type = request.preferences.license_type.unwrap_or_default();
        let mut budget_remaining = request.budget_remaining_usd;
        let mut accepted: u32 = 0;
        let mut previous_track_id = request.recent_track_ids.first().cloned();

        for candidate in &selection.selected {
            if budget_remaining <= 0.0 {
                break;
            }

            // Generative mode engages while generation budget remains;
            // otherwise the plan stays metadata-only.
            let mix_plan = if generation_budget_left >= GENERATION_UNIT_COST_USD {
                let plan = self
                    .mixer
                    .plan_with_generation(
                        &candidate.id,
                        previous_track_id.as_ref(),
                        &request.preferences,
                        generation_budget_left,
                    )
                    .await;
                generation_budget_left -= plan.generation_spend_usd;
                generation_spend_usd += plan.generation_spend_usd;
                generations_used += plan.transition_job_id.is_some() as u32
                    + plan.fill_job_id.is_some() as u32;
                plan
            } else {
                self.mixer
                    .plan(&candidate.id, previous_track_id.as_ref(), &request.preferences)
            };
            self.events.publish(AgentEvent::MixPlanned {
                session_id: request.session_id.clone(),
                track_id: candidate.id.clone(),
                transition: mix_plan.transition,
            });

            let negotiation = self
                .negotiator
                .negotiate(
                    &candidate.id,
                    license_type,
                    budget_remaining,
                    &request.preferences.stem_types,
                )
                .await?;
            self.events.publish(AgentEvent::Negotiated {
                session_id: request.session_id.clone(),
                track_id: candidate.id.clone(),
                license_type,
                price_usd: negotiation.price_usd,
                reason: negotiation.reason.clone(),
            });

            if negotiation.allowed {
                budget_remaining -= negotiation.price_usd;
                accepted += 1;
                tracks.push(OrchestratedTrack {
                    track_id: candidate.id.clone(),
                    mix_plan,
                    negotiation: Some(negotiation),
                    generated: false,
                    generation_job_id: None,
                });
            }

            // Mix continuity follows the playlist even past rejections
            previous_track_id = Some(candidate.id.clone());
        }

        let status = if accepted > 0 || generations_used > 0 {
            OrchestrationStatus::Approved
        } else {
            OrchestrationStatus::AllRejected
        };
        let total_spend_usd = request.budget_remaining_usd - budget_remaining;

        info!(
            session_id = %request.session_id,
            accepted,
            total_spend_usd,
            generations_used,
            status = status.as_str(),
            "orchestration decided"
        );
        self.events.publish(AgentEvent::DecisionMade {
            session_id: request.session_id.clone(),
            accepted,
            total_spend_usd,
            generations_used,
            generation_spend_usd,
            reason: status.as_str().to_string(),
        });

        Ok(OrchestrationOutcome {
            status,
            tracks,
            total_spend_usd,
            generations_used,
            generation_spend_usd,
        })
    }
}

fn filler_prompt(request: &OrchestrationRequest) -> String {
    let genre = request
        .preferences
        .genres
        .first()
        .map(String::as_str)
        .unwrap_or("instrumental");
    match &request.preferences.mood {
        Some(mood) => format!("{genre} filler track, {mood} mood"),
        None => format!("{genre} filler track"),
    }
}
