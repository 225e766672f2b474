//! Name-to-tool registry

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::{Result, ToolError};

/// A named capability with a uniform JSON-in/JSON-out contract
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, input: Value) -> Result<Value>;
}

/// Registry of tools keyed by name.
///
/// An unregistered name is a wiring bug, surfaced as `ToolNotFound` and
/// never recovered from at runtime.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Tool>> {
        self.tools
            .get(name)
            .cloned()
            .ok_or_else(|| ToolError::ToolNotFound {
                name: name.to_string(),
            })
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn run(&self, name: &str, input: Value) -> Result<Value> {
        let tool = self.get(name)?;
        debug!(tool = name, "running tool");
        tool.run(input).await
    }
}
