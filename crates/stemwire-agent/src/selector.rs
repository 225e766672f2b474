//! Candidate selection

use std::cmp::Reverse;
use std::sync::{Arc, OnceLock};

use serde_json::json;
use stemwire_catalog::QualityOracle;
use stemwire_embeddings::RankedTrack;
use stemwire_tools::ToolRegistry;
use stemwire_types::{Candidate, TrackId};
use tracing::warn;

use crate::{AgentError, Result};

/// Tuning knobs for candidate selection
#[derive(Debug, Clone)]
pub struct SelectorConfig {
    /// Max candidates returned to the caller
    pub limit: usize,
    /// Quality scores below this demote a candidate behind unrated ones
    pub quality_threshold: u8,
    /// Per-query catalog search width
    pub search_limit: usize,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            limit: 5,
            quality_threshold: 30,
            search_limit: 20,
        }
    }
}

/// Output of one selection pass
#[derive(Debug, Clone)]
pub struct SelectionResult {
    /// Every candidate id in final ranked order, before truncation
    pub candidate_ids: Vec<TrackId>,
    /// The top slice, at most `limit` long
    pub selected: Vec<Candidate>,
}

/// Gathers, dedups, ranks, and filters catalog candidates across taste
/// queries.
///
/// The quality oracle is attached once during startup rather than passed
/// per call, because the curator wiring is not available when the
/// selector itself is constructed.
pub struct CandidateSelector {
    tools: ToolRegistry,
    config: SelectorConfig,
    quality: OnceLock<Arc<dyn QualityOracle>>,
}

impl CandidateSelector {
    pub fn new(tools: ToolRegistry, config: SelectorConfig) -> Self {
        Self {
            tools,
            config,
            quality: OnceLock::new(),
        }
    }

    /// One-time wiring of the quality oracle; later calls are ignored
    pub fn attach_quality_oracle(&self, oracle: Arc<dyn QualityOracle>) {
        if self.quality.set(oracle).is_err() {
            warn!("quality oracle already attached, ignoring");
        }
    }

    /// Select up to `limit` candidates for the given taste queries.
    ///
    /// Guarantees: the returned slice is at most `limit` long and every
    /// returned id came from the per-query search union. Recency
    /// filtering never empties the result on its own: when every
    /// candidate was recently played the unfiltered pool is used.
    pub async fn select(
        &self,
        queries: &[String],
        recent_track_ids: &[TrackId],
        allow_explicit: bool,
        use_embeddings: bool,
    ) -> Result<SelectionResult> {
        let queries: Vec<String> = if queries.is_empty() {
            vec![String::new()]
        } else {
            queries.to_vec()
        };

        // 1. Search per query, dedup by id in first-seen order
        let mut candidates: Vec<Candidate> = Vec::new();
        for query in &queries {
            let output = self
                .tools
                .run(
                    "catalog.search",
                    json!({
                        "query": query,
                        "limit": self.config.search_limit,
                        "allowExplicit": allow_explicit,
                    }),
                )
                .await?;
            let items: Vec<Candidate> = serde_json::from_value(output["items"].clone())
                .map_err(|e| AgentError::MalformedToolOutput {
                    message: format!("catalog.search items: {e}"),
                })?;
            for item in items {
                if !candidates.iter().any(|c| c.id == item.id) {
                    candidates.push(item);
                }
            }
        }

        // 2. Embedding rerank against the concatenated queries
        let has_query_text = queries.iter().any(|q| !q.is_empty());
        if use_embeddings && candidates.len() > 1 && has_query_text {
            candidates = self.rerank(candidates, &queries.join(" ")).await?;
        }

        // 3. Listing availability is a hard boost; embedding order is
        //    preserved within each group
        candidates.sort_by_key(|c| !c.has_listing);

        // 4. Quality grouping, fail-open on oracle errors
        if let Some(oracle) = self.quality.get() {
            let ids: Vec<TrackId> = candidates.iter().map(|c| c.id.clone()).collect();
            match oracle.best_track_scores(&ids).await {
                Ok(scores) => {
                    for candidate in &mut candidates {
                        candidate.quality_score = scores.get(&candidate.id).copied();
                    }
                    let threshold = self.config.quality_threshold;
                    candidates.sort_by_key(|c| match c.quality_score {
                        Some(score) if score >= threshold => (0u8, Reverse(score)),
                        None => (1, Reverse(0)),
                        Some(score) => (2, Reverse(score)),
                    });
                }
                Err(err) => {
                    warn!(error = %err, "quality lookup failed, keeping unsorted order");
                }
            }
        }

        let candidate_ids: Vec<TrackId> = candidates.iter().map(|c| c.id.clone()).collect();

        // 5. Recency filter with unfiltered fallback
        let fresh: Vec<Candidate> = candidates
            .iter()
            .filter(|c| !recent_track_ids.contains(&c.id))
            .cloned()
            .collect();
        let mut selected = if fresh.is_empty() { candidates } else { fresh };

        // 6. Truncate
        selected.truncate(self.config.limit);

        Ok(SelectionResult {
            candidate_ids,
            selected,
        })
    }

    /// Reorder to the embedding ranking; candidates the ranker did not
    /// score keep their prior relative order after the ranked ones.
    async fn rerank(&self, candidates: Vec<Candidate>, query: &str) -> Result<Vec<Candidate>> {
        let ids: Vec<TrackId> = candidates.iter().map(|c| c.id.clone()).collect();
        let output = self
            .tools
            .run(
                "embeddings.similarity",
                json!({ "query": query, "candidates": ids }),
            )
            .await?;
        let ranked: Vec<RankedTrack> = serde_json::from_value(output["ranked"].clone())
            .map_err(|e| AgentError::MalformedToolOutput {
                message: format!("embeddings.similarity ranked: {e}"),
            })?;

        let mut remaining = candidates;
        let mut reordered = Vec::with_capacity(remaining.len());
        for entry in &ranked {
            if let Some(pos) = remaining.iter().position(|c| c.id == entry.track_id) {
                reordered.push(remaining.remove(pos));
            }
        }
        reordered.extend(remaining);
        Ok(reordered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use std::collections::HashMap;
    use stemwire_catalog::{CatalogStore, Stem, Track};
    use stemwire_embeddings::EmbeddingStore;
    use stemwire_pricing::PricingPolicy;
    use stemwire_tools::MockGenerationClient;
    use stemwire_types::{Listing, ListingId, ListingStatus, StemId, TokenId};

    async fn seeded(tracks: &[(&str, &str, &str, bool)]) -> (ToolRegistry, CatalogStore) {
        let catalog = CatalogStore::new();
        for (i, (id, title, genre, listed)) in tracks.iter().enumerate() {
            catalog
                .add_track(Track {
                    id: TrackId::from(*id),
                    title: title.to_string(),
                    artist_id: "artist_1".to_string(),
                    genre: genre.to_string(),
                    explicit: false,
                    created_at: Utc::now() - Duration::minutes(i as i64),
                })
                .await;
            if *listed {
                let stem_id = format!("{id}_stem");
                catalog
                    .add_stem(Stem {
                        id: StemId::from(stem_id.as_str()),
                        track_id: TrackId::from(*id),
                        stem_type: "drums".to_string(),
                    })
                    .await;
                catalog
                    .add_listing(Listing {
                        listing_id: ListingId(i as u64 + 1),
                        token_id: TokenId(i as u64 + 1),
                        stem_id: StemId::from(stem_id.as_str()),
                        price_per_unit_wei: 1_000,
                        chain_id: 31337,
                        stem_type: "drums".to_string(),
                        status: ListingStatus::Active,
                        expiry: Utc::now() + Duration::days(1),
                    })
                    .await;
            }
        }
        let registry = ToolRegistry::with_builtins(
            catalog.clone(),
            EmbeddingStore::new(),
            PricingPolicy::default(),
            Arc::new(MockGenerationClient::new()),
        );
        (registry, catalog)
    }

    struct FixedOracle(HashMap<TrackId, u8>);

    #[async_trait]
    impl QualityOracle for FixedOracle {
        async fn best_track_scores(
            &self,
            _track_ids: &[TrackId],
        ) -> stemwire_catalog::Result<HashMap<TrackId, u8>> {
            Ok(self.0.clone())
        }
    }

    struct FailingOracle;

    #[async_trait]
    impl QualityOracle for FailingOracle {
        async fn best_track_scores(
            &self,
            _track_ids: &[TrackId],
        ) -> stemwire_catalog::Result<HashMap<TrackId, u8>> {
            Err(stemwire_catalog::CatalogError::QualityLookup {
                message: "oracle offline".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_dedups_across_queries_and_respects_limit() {
        let (tools, _) = seeded(&[
            ("t1", "House One", "house", false),
            ("t2", "House Two", "house", false),
            ("t3", "Housewarming", "ambient", false),
        ])
        .await;
        let selector = CandidateSelector::new(tools, SelectorConfig { limit: 2, ..Default::default() });

        let result = selector
            .select(
                &["house".to_string(), "house".to_string()],
                &[],
                false,
                false,
            )
            .await
            .unwrap();
        assert_eq!(result.candidate_ids.len(), 3);
        assert_eq!(result.selected.len(), 2);
    }

    #[tokio::test]
    async fn test_listed_candidates_rank_first() {
        let (tools, _) = seeded(&[
            ("t1", "Unlisted", "house", false),
            ("t2", "Listed", "house", true),
        ])
        .await;
        let selector = CandidateSelector::new(tools, SelectorConfig::default());

        let result = selector
            .select(&["house".to_string()], &[], false, false)
            .await
            .unwrap();
        assert_eq!(result.selected[0].id, TrackId::from("t2"));
        assert!(result.selected[0].has_listing);
    }

    #[tokio::test]
    async fn test_quality_groups_demote_low_scores() {
        let (tools, _) = seeded(&[
            ("t1", "Low", "house", false),
            ("t2", "Unrated", "house", false),
            ("t3", "Great", "house", false),
        ])
        .await;
        let selector = CandidateSelector::new(tools, SelectorConfig::default());
        let mut scores = HashMap::new();
        scores.insert(TrackId::from("t1"), 10u8);
        scores.insert(TrackId::from("t3"), 90u8);
        selector.attach_quality_oracle(Arc::new(FixedOracle(scores)));

        let result = selector
            .select(&["house".to_string()], &[], false, false)
            .await
            .unwrap();
        let ids: Vec<&str> = result.selected.iter().map(|c| c.id.as_str()).collect();
        // rated >= threshold, then unrated, then rated < threshold
        assert_eq!(ids, vec!["t3", "t2", "t1"]);
    }

    #[tokio::test]
    async fn test_quality_failure_is_fail_open() {
        let (tools, _) = seeded(&[
            ("t1", "One", "house", false),
            ("t2", "Two", "house", false),
        ])
        .await;
        let selector = CandidateSelector::new(tools, SelectorConfig::default());
        selector.attach_quality_oracle(Arc::new(FailingOracle));

        let result = selector
            .select(&["house".to_string()], &[], false, false)
            .await
            .unwrap();
        assert_eq!(result.selected.len(), 2);
    }

    #[tokio::test]
    async fn test_recency_filter_falls_back_when_everything_is_recent() {
        let (tools, _) = seeded(&[("t1", "Only", "house", false)]).await;
        let selector = CandidateSelector::new(tools, SelectorConfig::default());

        let result = selector
            .select(&["house".to_string()], &[TrackId::from("t1")], false, false)
            .await
            .unwrap();
        assert_eq!(result.selected.len(), 1);
        assert_eq!(result.selected[0].id, TrackId::from("t1"));
    }

    #[tokio::test]
    async fn test_empty_queries_search_everything() {
        let (tools, _) = seeded(&[("t1", "Anything", "house", false)]).await;
        let selector = CandidateSelector::new(tools, SelectorConfig::default());

        let result = selector.select(&[], &[], false, false).await.unwrap();
        assert_eq!(result.selected.len(), 1);
    }
}
