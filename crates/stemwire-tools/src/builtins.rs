//! Builtin tools backed by the core stores

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use stemwire_catalog::CatalogStore;
use stemwire_embeddings::{Embedder, EmbeddingStore};
use stemwire_pricing::PricingPolicy;
use stemwire_types::{LicenseType, TrackId};
use tokio::sync::RwLock;

use crate::generation::{GenerationClient, GenerationCreateTool};
use crate::registry::{Tool, ToolRegistry};
use crate::{Result, ToolError};

fn invalid_input(err: impl std::fmt::Display) -> ToolError {
    ToolError::InvalidInput {
        message: err.to_string(),
    }
}

// ============================================================================
// catalog.search
// ============================================================================

/// `catalog.search(query, limit, allowExplicit) -> {items[]}`
pub struct CatalogSearchTool {
    store: CatalogStore,
}

impl CatalogSearchTool {
    pub fn new(store: CatalogStore) -> Self {
        Self { store }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchInput {
    #[serde(default)]
    query: String,
    #[serde(default = "default_search_limit")]
    limit: usize,
    #[serde(default)]
    allow_explicit: bool,
}

fn default_search_limit() -> usize {
    20
}

#[async_trait]
impl Tool for CatalogSearchTool {
    fn name(&self) -> &str {
        "catalog.search"
    }

    async fn run(&self, input: Value) -> Result<Value> {
        let input: SearchInput = serde_json::from_value(input).map_err(invalid_input)?;
        let tracks = self
            .store
            .search(&input.query, input.limit, input.allow_explicit)
            .await;

        let mut items = Vec::with_capacity(tracks.len());
        for track in &tracks {
            let candidate = self.store.candidate_for(track).await;
            items.push(serde_json::to_value(candidate).map_err(invalid_input)?);
        }
        Ok(json!({ "items": items }))
    }
}

// ============================================================================
// pricing.quote
// ============================================================================

/// `pricing.quote(licenseType, volume) -> {priceUsd}`
pub struct PricingQuoteTool {
    policy: PricingPolicy,
}

impl PricingQuoteTool {
    pub fn new(policy: PricingPolicy) -> Self {
        Self { policy }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteInput {
    #[serde(default)]
    license_type: LicenseType,
    #[serde(default)]
    volume: bool,
}

#[async_trait]
impl Tool for PricingQuoteTool {
    fn name(&self) -> &str {
        "pricing.quote"
    }

    async fn run(&self, input: Value) -> Result<Value> {
        let input: QuoteInput = serde_json::from_value(input).map_err(invalid_input)?;
        let price_usd = self.policy.quote(input.license_type, input.volume);
        Ok(json!({ "priceUsd": price_usd }))
    }
}

// ============================================================================
// analytics.signal
// ============================================================================

/// `analytics.signal(name, payload) -> {recorded}`; signals are buffered
/// in memory for downstream consumers, nothing blocks on them.
#[derive(Clone, Default)]
pub struct AnalyticsSignalTool {
    signals: Arc<RwLock<Vec<Value>>>,
}

impl AnalyticsSignalTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn recorded(&self) -> Vec<Value> {
        self.signals.read().await.clone()
    }
}

#[async_trait]
impl Tool for AnalyticsSignalTool {
    fn name(&self) -> &str {
        "analytics.signal"
    }

    async fn run(&self, input: Value) -> Result<Value> {
        self.signals.write().await.push(input);
        Ok(json!({ "recorded": true }))
    }
}

// ============================================================================
// embeddings.similarity
// ============================================================================

/// `embeddings.similarity(query, candidates[]) -> {ranked[]}`.
/// Candidate vectors are computed from track title and genre on first
/// use and cached in the embedding store.
pub struct EmbeddingsSimilarityTool {
    embedder: Embedder,
    embeddings: EmbeddingStore,
    catalog: CatalogStore,
}

impl EmbeddingsSimilarityTool {
    pub fn new(embeddings: EmbeddingStore, catalog: CatalogStore) -> Self {
        Self {
            embedder: Embedder::new(),
            embeddings,
            catalog,
        }
    }
}

#[derive(Deserialize)]
struct SimilarityInput {
    query: String,
    candidates: Vec<TrackId>,
}

#[async_trait]
impl Tool for EmbeddingsSimilarityTool {
    fn name(&self) -> &str {
        "embeddings.similarity"
    }

    async fn run(&self, input: Value) -> Result<Value> {
        let input: SimilarityInput = serde_json::from_value(input).map_err(invalid_input)?;

        for track_id in &input.candidates {
            if self.embeddings.contains(track_id).await {
                continue;
            }
            if let Some(track) = self.catalog.track(track_id).await {
                let vector = self.embedder.embed(&format!("{} {}", track.title, track.genre));
                self.embeddings.upsert(track_id.clone(), vector).await;
            }
        }

        let query = self.embedder.embed(&input.query);
        let ranked = self.embeddings.similarity(&query, &input.candidates).await;
        Ok(json!({ "ranked": ranked }))
    }
}

// ============================================================================
// Wiring
// ============================================================================

impl ToolRegistry {
    /// Registry with all builtin tools wired to the given stores
    pub fn with_builtins(
        catalog: CatalogStore,
        embeddings: EmbeddingStore,
        policy: PricingPolicy,
        generation: Arc<dyn GenerationClient>,
    ) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(CatalogSearchTool::new(catalog.clone())));
        registry.register(Arc::new(PricingQuoteTool::new(policy)));
        registry.register(Arc::new(AnalyticsSignalTool::new()));
        registry.register(Arc::new(EmbeddingsSimilarityTool::new(embeddings, catalog)));
        registry.register(Arc::new(GenerationCreateTool::new(generation)));
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::MockGenerationClient;
    use chrono::Utc;
    use stemwire_catalog::Track;

    async fn seeded_registry() -> ToolRegistry {
        let catalog = CatalogStore::new();
        catalog
            .add_track(Track {
                id: TrackId::from("t1"),
                title: "Deep House Nights".to_string(),
                artist_id: "artist_1".to_string(),
                genre: "house".to_string(),
                explicit: false,
                created_at: Utc::now(),
            })
            .await;
        ToolRegistry::with_builtins(
            catalog,
            EmbeddingStore::new(),
            PricingPolicy::default(),
            Arc::new(MockGenerationClient::new()),
        )
    }

    #[tokio::test]
    async fn test_catalog_search_returns_items() {
        let registry = seeded_registry().await;
        let output = registry
            .run("catalog.search", json!({"query": "house", "limit": 5}))
            .await
            .unwrap();
        let items = output["items"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["id"], "t1");
        assert_eq!(items[0]["hasListing"], false);
    }

    #[tokio::test]
    async fn test_pricing_quote_license_tiers() {
        let registry = seeded_registry().await;
        let personal = registry
            .run("pricing.quote", json!({"licenseType": "personal"}))
            .await
            .unwrap();
        assert_eq!(personal["priceUsd"], 0.02);

        let commercial = registry
            .run("pricing.quote", json!({"licenseType": "commercial"}))
            .await
            .unwrap();
        assert_eq!(commercial["priceUsd"], 0.10);
    }

    #[tokio::test]
    async fn test_similarity_computes_vectors_lazily() {
        let registry = seeded_registry().await;
        let output = registry
            .run(
                "embeddings.similarity",
                json!({"query": "deep house", "candidates": ["t1", "t_unknown"]}),
            )
            .await
            .unwrap();
        let ranked = output["ranked"].as_array().unwrap();
        // t_unknown has no catalog row, so no vector, so no ranking entry
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0]["trackId"], "t1");
    }
}
