//! Stemwire Runtime - the adapter chain
//!
//! Decision makers implement one `run(request) -> outcome` trait: the
//! local adapter delegates straight to the deterministic orchestrator,
//! LLM adapters run a tool-calling loop over the shared registry. A
//! single dispatcher owns adapter selection, the wall-clock timeout, and
//! the fallback to the deterministic path; adapters stay free of
//! fallback logic.

mod dispatcher;
mod llm;
mod local;

pub use dispatcher::{RuntimeDispatcher, ADAPTER_TIMEOUT_SECS};
pub use llm::{LlmCurationAdapter, LlmPick, LlmRunResult, MAX_TOOL_ROUNDS};
pub use local::LocalAdapter;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stemwire_types::{OrchestrationOutcome, OrchestrationRequest};
use thiserror::Error;

/// Errors that can occur in the runtime layer
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Raised eagerly on construction, before any network call
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("LLM error: {0}")]
    Llm(#[from] stemwire_llm::LlmError),

    #[error("Tool error: {0}")]
    Tool(#[from] stemwire_tools::ToolError),

    #[error("Pipeline error: {0}")]
    Agent(#[from] stemwire_agent::AgentError),

    #[error("Adapter timed out after {seconds}s")]
    Timeout { seconds: u64 },
}

pub type Result<T> = std::result::Result<T, RuntimeError>;

/// What a runtime run produced: either the deterministic pipeline's
/// outcome or an LLM curation result awaiting downstream purchase.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum RuntimeOutcome {
    Pipeline(OrchestrationOutcome),
    Llm(LlmRunResult),
}

/// A named decision maker in the adapter chain
#[async_trait]
pub trait RuntimeAdapter: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, request: &OrchestrationRequest) -> Result<RuntimeOutcome>;
}
