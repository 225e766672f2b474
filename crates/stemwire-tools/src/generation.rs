//! Audio generation tool

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use stemwire_types::JobId;

use crate::registry::Tool;
use crate::{Result, ToolError};

/// Cost of one generated clip in USD
pub const GENERATION_UNIT_COST_USD: f64 = 0.06;

/// Client for the external audio-generation backend.
/// Returns a job id once the backend accepts the request; clip delivery
/// happens out of band.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn create(
        &self,
        prompt: &str,
        negative_prompt: Option<&str>,
        artist_id: Option<&str>,
    ) -> Result<JobId>;
}

/// In-memory generation backend for tests and mock deployments.
/// Optionally fails from the Nth call onward to exercise the
/// stop-on-first-failure path.
#[derive(Default)]
pub struct MockGenerationClient {
    calls: AtomicUsize,
    fail_after: Option<usize>,
}

impl MockGenerationClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Succeed for the first `n` calls, fail afterwards
    pub fn failing_after(n: usize) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_after: Some(n),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationClient for MockGenerationClient {
    async fn create(
        &self,
        _prompt: &str,
        _negative_prompt: Option<&str>,
        _artist_id: Option<&str>,
    ) -> Result<JobId> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(limit) = self.fail_after {
            if call >= limit {
                return Err(ToolError::Execution {
                    message: "generation backend rate limited".to_string(),
                });
            }
        }
        Ok(JobId::new())
    }
}

/// `generation.create(prompt, negativePrompt, artistId) -> {jobId}`
pub struct GenerationCreateTool {
    client: Arc<dyn GenerationClient>,
}

impl GenerationCreateTool {
    pub fn new(client: Arc<dyn GenerationClient>) -> Self {
        Self { client }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerationInput {
    prompt: String,
    #[serde(default)]
    negative_prompt: Option<String>,
    #[serde(default)]
    artist_id: Option<String>,
}

#[async_trait]
impl Tool for GenerationCreateTool {
    fn name(&self) -> &str {
        "generation.create"
    }

    async fn run(&self, input: Value) -> Result<Value> {
        let input: GenerationInput =
            serde_json::from_value(input).map_err(|e| ToolError::InvalidInput {
                message: e.to_string(),
            })?;
        let job_id = self
            .client
            .create(
                &input.prompt,
                input.negative_prompt.as_deref(),
                input.artist_id.as_deref(),
            )
            .await?;
        Ok(json!({ "jobId": job_id }))
    }
}
