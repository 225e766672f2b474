//! The default adapter: straight to the deterministic orchestrator

use std::sync::Arc;

use async_trait::async_trait;
use stemwire_agent::Orchestrator;
use stemwire_types::OrchestrationRequest;

use crate::{Result, RuntimeAdapter, RuntimeOutcome};

pub struct LocalAdapter {
    orchestrator: Arc<Orchestrator>,
}

impl LocalAdapter {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }
}

#[async_trait]
impl RuntimeAdapter for LocalAdapter {
    fn name(&self) -> &str {
        "local"
    }

    async fn run(&self, request: &OrchestrationRequest) -> Result<RuntimeOutcome> {
        let outcome = self.orchestrator.run(request).await?;
        Ok(RuntimeOutcome::Pipeline(outcome))
    }
}
