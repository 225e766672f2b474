//! Stemwire Agent - the deterministic purchasing pipeline
//!
//! Four collaborators, leaf-first: the Candidate Selector gathers and
//! ranks catalog matches, the License Negotiator prices a track and
//! validates its listings against live chain state, the Mix Planner
//! produces transition plans (optionally enriched with generated audio),
//! and the Orchestrator runs all three per track under one hard budget.

mod mixer;
mod negotiator;
mod orchestrator;
mod selector;

pub use mixer::MixPlanner;
pub use negotiator::LicenseNegotiator;
pub use orchestrator::{Orchestrator, OrchestratorConfig, SPARSE_THRESHOLD};
pub use selector::{CandidateSelector, SelectionResult, SelectorConfig};

use thiserror::Error;

/// Errors that can occur in the agent pipeline.
///
/// Budget rejection never appears here: it is a structured
/// `allowed == false` negotiation result, not an error.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Tool error: {0}")]
    Tool(#[from] stemwire_tools::ToolError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] stemwire_catalog::CatalogError),

    #[error("Malformed tool output: {message}")]
    MalformedToolOutput { message: String },
}

pub type Result<T> = std::result::Result<T, AgentError>;
