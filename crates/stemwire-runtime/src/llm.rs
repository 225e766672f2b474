//! LLM-driven curation adapter
//!
//! Runs a tool-calling loop over the shared registry, then parses the
//! model's final text against the line grammar
//! `TRACK: <id> | LICENSE: <type> | PRICE: <usd>` (repeatable), with a
//! trailing `REASONING: <text>` line and a legacy single-line fallback.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use stemwire_llm::{
    CompletionRequest, LlmError, LlmProvider, Message, OpenAICompatConfig, OpenAICompatProvider,
};
use stemwire_tools::{execute_tool, tool_specs, ToolRegistry};
use stemwire_types::{LicenseType, OrchestrationRequest, TrackId};
use tracing::{debug, warn};

use crate::{Result, RuntimeAdapter, RuntimeError, RuntimeOutcome};

/// Cap on model/tool round trips per run
pub const MAX_TOOL_ROUNDS: usize = 6;

/// One track pick from the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmPick {
    pub track_id: TrackId,
    pub license_type: LicenseType,
    pub price_usd: f64,
}

/// Parsed result of one adapter run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmRunResult {
    /// Picks in model order, accumulated only while the running total
    /// stayed within budget
    pub picks: Vec<LlmPick>,
    /// First pick, retained for backward compatibility
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_id: Option<TrackId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_type: Option<LicenseType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_usd: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    pub rejected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub latency_ms: u64,
}

/// Tool-calling curation adapter over any chat provider
pub struct LlmCurationAdapter {
    name: String,
    provider: Arc<dyn LlmProvider>,
    tools: ToolRegistry,
}

impl LlmCurationAdapter {
    pub fn new(
        name: impl Into<String>,
        provider: Arc<dyn LlmProvider>,
        tools: ToolRegistry,
    ) -> Self {
        Self {
            name: name.into(),
            provider,
            tools,
        }
    }

    /// Build against the configured OpenAI-compatible endpoint.
    /// Missing configuration fails here, before any network call.
    pub fn from_env(tools: ToolRegistry) -> Result<Self> {
        let _ = dotenvy::dotenv();
        if std::env::var("STEMWIRE_LLM_BASE_URL").is_err() {
            return Err(RuntimeError::Configuration {
                message: "STEMWIRE_LLM_BASE_URL is not set".to_string(),
            });
        }
        let provider = OpenAICompatProvider::new(OpenAICompatConfig::default());
        Ok(Self::new("llm", Arc::new(provider), tools))
    }

    fn system_prompt(&self) -> String {
        let tool_names: Vec<String> = tool_specs().iter().map(|s| s.name.clone()).collect();
        format!(
            "You are an autonomous DJ curation agent for a stem-licensing \
             marketplace. Use the available tools ({}) to find catalog tracks \
             matching the listener's taste, quote license prices, and stay \
             within the remaining budget.\n\
             When you are done, answer with one line per chosen track:\n\
             TRACK: <trackId> | LICENSE: <personal|remix|commercial> | PRICE: <usd>\n\
             Optionally finish with a single line:\n\
             REASONING: <one sentence>\n\
             Answer with no other text.",
            tool_names.join(", ")
        )
    }

    fn user_message(&self, request: &OrchestrationRequest) -> String {
        let recent: Vec<&str> = request
            .recent_track_ids
            .iter()
            .map(|t| t.as_str())
            .collect();
        format!(
            "Session {session}. Remaining budget: ${budget:.2}.\n\
             Preferences: {preferences}\n\
             Recently played: {recent}",
            session = request.session_id,
            budget = request.budget_remaining_usd,
            preferences = serde_json::to_string(&request.preferences).unwrap_or_default(),
            recent = if recent.is_empty() {
                "none".to_string()
            } else {
                recent.join(", ")
            },
        )
    }

    /// Send the conversation, executing requested tools, until the model
    /// answers with free text or the round cap is hit.
    async fn tool_loop(&self, request: &OrchestrationRequest) -> Result<String> {
        let mut messages = vec![Message::user(self.user_message(request))];

        for round in 0..MAX_TOOL_ROUNDS {
            let completion = CompletionRequest::new(messages.clone())
                .with_system(self.system_prompt())
                .with_tools(tool_specs())
                .with_temperature(0.2);
            let response = self.provider.complete(completion).await?;

            if response.tool_calls.is_empty() {
                return Ok(response.content);
            }

            debug!(round, calls = response.tool_calls.len(), "executing tool calls");
            messages.push(Message::assistant_tool_calls(response.tool_calls.clone()));
            for call in response.tool_calls {
                let content = match execute_tool(&self.tools, &call.name, call.arguments).await {
                    Ok(output) => output.to_string(),
                    Err(err) => {
                        warn!(tool = %call.name, error = %err, "tool call failed");
                        json!({ "error": err.to_string() }).to_string()
                    }
                };
                messages.push(Message::tool_result(call.id, content));
            }
        }

        Err(LlmError::InvalidResponse {
            message: format!("no final answer within {MAX_TOOL_ROUNDS} tool rounds"),
        }
        .into())
    }
}

#[async_trait]
impl RuntimeAdapter for LlmCurationAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, request: &OrchestrationRequest) -> Result<RuntimeOutcome> {
        let started = Instant::now();
        let content = self.tool_loop(request).await?;
        let mut result = parse_curation(&content, request.budget_remaining_usd);
        result.latency_ms = started.elapsed().as_millis() as u64;
        Ok(RuntimeOutcome::Llm(result))
    }
}

/// Parse the final model text into picks and reasoning.
/// Picks accumulate only while the running total stays within budget.
fn parse_curation(content: &str, budget_usd: f64) -> LlmRunResult {
    let mut picks: Vec<LlmPick> = Vec::new();
    let mut reasoning: Option<String> = None;
    let mut running_total = 0.0;

    for line in content.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("REASONING:") {
            reasoning = Some(rest.trim().to_string());
            continue;
        }
        if let Some(pick) = parse_pick_line(line) {
            if running_total + pick.price_usd <= budget_usd {
                running_total += pick.price_usd;
                picks.push(pick);
            }
        }
    }

    // Older prompt revisions answered on a single unpiped line
    if picks.is_empty() {
        if let Some(pick) = parse_legacy_line(content) {
            if pick.price_usd <= budget_usd {
                picks.push(pick);
            }
        }
    }

    let first = picks.first().cloned();
    let rejected = picks.is_empty();
    LlmRunResult {
        track_id: first.as_ref().map(|p| p.track_id.clone()),
        license_type: first.as_ref().map(|p| p.license_type),
        price_usd: first.map(|p| p.price_usd),
        picks,
        reasoning,
        rejected,
        reason: rejected.then(|| "llm_no_track_selected".to_string()),
        latency_ms: 0,
    }
}

/// `TRACK: <id> | LICENSE: <type> | PRICE: <usd>`
fn parse_pick_line(line: &str) -> Option<LlmPick> {
    if !line.starts_with("TRACK:") {
        return None;
    }
    let mut track_id = None;
    let mut license_type = None;
    let mut price_usd = None;
    for part in line.split('|') {
        let part = part.trim();
        if let Some(value) = part.strip_prefix("TRACK:") {
            track_id = Some(TrackId::from(value.trim()));
        } else if let Some(value) = part.strip_prefix("LICENSE:") {
            license_type = LicenseType::parse(value);
        } else if let Some(value) = part.strip_prefix("PRICE:") {
            price_usd = value.trim().trim_start_matches('$').parse::<f64>().ok();
        }
    }
    Some(LlmPick {
        track_id: track_id?,
        license_type: license_type?,
        price_usd: price_usd?,
    })
}

/// Legacy single-line answer without pipe separators
fn parse_legacy_line(content: &str) -> Option<LlmPick> {
    let flat = content.split_whitespace().collect::<Vec<_>>().join(" ");
    let value_after = |marker: &str| -> Option<String> {
        let start = flat.find(marker)? + marker.len();
        flat[start..]
            .split_whitespace()
            .next()
            .map(str::to_string)
    };
    let track_id = value_after("TRACK:")?;
    let license_type = LicenseType::parse(&value_after("LICENSE:")?)?;
    let price_usd = value_after("PRICE:")?
        .trim_start_matches('$')
        .parse::<f64>()
        .ok()?;
    Some(LlmPick {
        track_id: TrackId::from(track_id.as_str()),
        license_type,
        price_usd,
    })
}
