//! Stemwire LLM - provider abstraction for curation models
//!
//! Providers speak one chat/tool-calling vocabulary; the router picks an
//! implementation from configuration. The scripted provider replays
//! canned responses so tool loops can be exercised deterministically.

mod providers;
mod router;
mod types;

pub use providers::{LlmProvider, OpenAICompatConfig, OpenAICompatProvider, ScriptedProvider};
pub use router::LlmRouter;
pub use types::{
    CompletionRequest, CompletionResponse, LlmError, Message, MessageRole, ProviderKind, Result,
    TokenUsage, ToolCall, ToolSpec,
};
