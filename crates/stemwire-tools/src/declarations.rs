//! Tool declarations for the LLM tool-calling loop
//!
//! Wire names use underscores because several model APIs reject dots in
//! function names; `wire_tool_name` maps them back to registry names.

use serde_json::{json, Value};
use stemwire_llm::ToolSpec;

use crate::registry::ToolRegistry;
use crate::{Result, ToolError};

/// Registry name for an underscore wire name
pub fn wire_tool_name(wire_name: &str) -> Option<&'static str> {
    match wire_name {
        "catalog_search" => Some("catalog.search"),
        "pricing_quote" => Some("pricing.quote"),
        "analytics_signal" => Some("analytics.signal"),
        "embeddings_similarity" => Some("embeddings.similarity"),
        "generation_create" => Some("generation.create"),
        _ => None,
    }
}

/// Declarations handed to the model alongside the curation prompt
pub fn tool_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "catalog_search".to_string(),
            description: "Search the stem catalog by free text over title and genre".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Search text" },
                    "limit": { "type": "integer", "description": "Max results, default 20" },
                    "allowExplicit": { "type": "boolean" }
                },
                "required": ["query"]
            }),
        },
        ToolSpec {
            name: "pricing_quote".to_string(),
            description: "Quote the license price in USD for a license type".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "licenseType": {
                        "type": "string",
                        "enum": ["personal", "remix", "commercial"]
                    },
                    "volume": { "type": "boolean", "description": "Apply volume discount" }
                },
                "required": ["licenseType"]
            }),
        },
        ToolSpec {
            name: "embeddings_similarity".to_string(),
            description: "Rank candidate track ids by similarity to a taste query".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string" },
                    "candidates": { "type": "array", "items": { "type": "string" } }
                },
                "required": ["query", "candidates"]
            }),
        },
        ToolSpec {
            name: "generation_create".to_string(),
            description: "Request an AI-generated audio clip; returns a job id".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "prompt": { "type": "string" },
                    "negativePrompt": { "type": "string" },
                    "artistId": { "type": "string" }
                },
                "required": ["prompt"]
            }),
        },
        ToolSpec {
            name: "analytics_signal".to_string(),
            description: "Record an analytics signal; fire and forget".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "payload": { "type": "object" }
                },
                "required": ["name"]
            }),
        },
    ]
}

/// Execute a model-requested tool call against the registry
pub async fn execute_tool(registry: &ToolRegistry, wire_name: &str, input: Value) -> Result<Value> {
    let name = wire_tool_name(wire_name).ok_or_else(|| ToolError::ToolNotFound {
        name: wire_name.to_string(),
    })?;
    registry.run(name, input).await
}
