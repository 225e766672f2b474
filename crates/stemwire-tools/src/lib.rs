//! Stemwire Tools - the uniform `run(input) -> output` surface
//!
//! Every capability the agents consume (catalog search, pricing quotes,
//! similarity ranking, audio generation, analytics) is exposed as a named
//! tool behind one registry, so the deterministic pipeline and the LLM
//! tool-calling loop invoke identical code paths.

mod builtins;
mod declarations;
mod generation;
mod registry;

pub use builtins::{
    AnalyticsSignalTool, CatalogSearchTool, EmbeddingsSimilarityTool, PricingQuoteTool,
};
pub use declarations::{execute_tool, tool_specs, wire_tool_name};
pub use generation::{
    GenerationClient, GenerationCreateTool, MockGenerationClient, GENERATION_UNIT_COST_USD,
};
pub use registry::{Tool, ToolRegistry};

use thiserror::Error;

/// Errors that can occur running tools
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Tool not found: {name}")]
    ToolNotFound { name: String },

    #[error("Invalid tool input: {message}")]
    InvalidInput { message: String },

    #[error("Tool execution failed: {message}")]
    Execution { message: String },
}

pub type Result<T> = std::result::Result<T, ToolError>;
