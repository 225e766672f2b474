//! Adapter selection, timeout, and fallback

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use stemwire_agent::Orchestrator;
use stemwire_types::{OrchestrationRequest, OrchestrationOutcome};
use tracing::warn;

use crate::{Result, RuntimeAdapter, RuntimeOutcome};

/// Hard wall-clock bound per adapter call
pub const ADAPTER_TIMEOUT_SECS: u64 = 30;

/// Owns the adapter registry and the timeout/fallback policy.
///
/// A timed-out or failed adapter never surfaces a partial answer: the
/// dispatcher logs a warning and re-runs the deterministic orchestrator.
/// The in-flight adapter work is abandoned, not cancelled at the network
/// layer.
pub struct RuntimeDispatcher {
    adapters: HashMap<String, Arc<dyn RuntimeAdapter>>,
    fallback: Arc<Orchestrator>,
    selected: String,
    timeout: Duration,
}

impl RuntimeDispatcher {
    /// Adapter name comes from `STEMWIRE_AGENT_RUNTIME`, default `local`
    pub fn from_env(fallback: Arc<Orchestrator>) -> Self {
        let _ = dotenvy::dotenv();
        let selected =
            std::env::var("STEMWIRE_AGENT_RUNTIME").unwrap_or_else(|_| "local".to_string());
        Self::new(fallback, selected)
    }

    pub fn new(fallback: Arc<Orchestrator>, selected: impl Into<String>) -> Self {
        Self {
            adapters: HashMap::new(),
            fallback,
            selected: selected.into(),
            timeout: Duration::from_secs(ADAPTER_TIMEOUT_SECS),
        }
    }

    pub fn register(&mut self, adapter: Arc<dyn RuntimeAdapter>) {
        self.adapters.insert(adapter.name().to_string(), adapter);
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn selected(&self) -> &str {
        &self.selected
    }

    /// Run the selected adapter, falling back to the deterministic
    /// orchestrator on an unknown name, an adapter error, or timeout.
    pub async fn dispatch(&self, request: &OrchestrationRequest) -> Result<RuntimeOutcome> {
        let Some(adapter) = self.adapters.get(&self.selected) else {
            if self.selected != "local" {
                warn!(runtime = %self.selected, "unknown runtime adapter, using orchestrator");
            }
            return self.run_fallback(request).await;
        };

        match tokio::time::timeout(self.timeout, adapter.run(request)).await {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(err)) => {
                warn!(
                    runtime = %self.selected,
                    error = %err,
                    "runtime adapter failed, using orchestrator"
                );
                self.run_fallback(request).await
            }
            Err(_) => {
                warn!(
                    runtime = %self.selected,
                    timeout_secs = self.timeout.as_secs(),
                    "runtime adapter timed out, using orchestrator"
                );
                self.run_fallback(request).await
            }
        }
    }

    async fn run_fallback(&self, request: &OrchestrationRequest) -> Result<RuntimeOutcome> {
        let outcome: OrchestrationOutcome = self.fallback.run(request).await?;
        Ok(RuntimeOutcome::Pipeline(outcome))
    }
}
