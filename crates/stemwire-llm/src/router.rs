//! Provider selection from configuration

use std::sync::Arc;

use crate::providers::*;
use crate::types::*;

/// Selects and holds the configured provider
pub struct LlmRouter {
    provider: Arc<dyn LlmProvider>,
    kind: ProviderKind,
}

impl LlmRouter {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        let kind = provider.kind();
        Self { provider, kind }
    }

    /// Create a router from environment variables.
    ///
    /// `STEMWIRE_LLM_PROVIDER` selects the provider:
    /// - `openai_compat` (default): any OpenAI-compatible endpoint
    /// - `scripted`: canned responses, no network
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let provider_name =
            std::env::var("STEMWIRE_LLM_PROVIDER").unwrap_or_else(|_| "openai_compat".to_string());
        let kind = ProviderKind::parse(&provider_name).unwrap_or(ProviderKind::OpenAICompat);
        Self::from_kind(kind)
    }

    pub fn from_kind(kind: ProviderKind) -> Self {
        let provider: Arc<dyn LlmProvider> = match kind {
            ProviderKind::OpenAICompat => Arc::new(OpenAICompatProvider::from_env()),
            ProviderKind::Scripted => Arc::new(ScriptedProvider::default()),
        };
        Self { provider, kind }
    }

    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.provider.complete(request).await
    }
}

impl Default for LlmRouter {
    fn default() -> Self {
        Self::from_env()
    }
}
