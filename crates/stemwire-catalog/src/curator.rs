//! Curator quality oracle
//!
//! A track's quality score is the average of the best curator rating of
//! each of its stems, rounded to the nearest integer. Tracks with no
//! rated stems have no score.

use std::collections::HashMap;

use async_trait::async_trait;
use stemwire_types::TrackId;

use crate::{CatalogStore, Result};

/// Supplies per-track quality scores on the 0-100 scale
#[async_trait]
pub trait QualityOracle: Send + Sync {
    /// Scores for the given tracks. Tracks without a score are absent
    /// from the map rather than reported as zero.
    async fn best_track_scores(&self, track_ids: &[TrackId]) -> Result<HashMap<TrackId, u8>>;
}

/// Oracle backed by the catalog's stem ratings
#[derive(Clone)]
pub struct CuratorAgent {
    store: CatalogStore,
}

impl CuratorAgent {
    pub fn new(store: CatalogStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl QualityOracle for CuratorAgent {
    async fn best_track_scores(&self, track_ids: &[TrackId]) -> Result<HashMap<TrackId, u8>> {
        let mut scores = HashMap::new();
        for track_id in track_ids {
            let stems = self.store.stems_for_track(track_id).await;
            if stems.is_empty() {
                continue;
            }
            let stem_ids: Vec<_> = stems.iter().map(|s| s.id.clone()).collect();
            let best = self.store.best_stem_scores(&stem_ids).await;
            if best.is_empty() {
                continue;
            }
            let total: u32 = best.values().map(|s| *s as u32).sum();
            let average = (total as f64 / best.len() as f64).round() as u8;
            scores.insert(track_id.clone(), average);
        }
        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Stem, StemQualityRating, Track};
    use chrono::Utc;
    use stemwire_types::StemId;

    async fn seed_track(store: &CatalogStore, track_id: &str, stem_scores: &[(&str, &[u8])]) {
        store
            .add_track(Track {
                id: TrackId::from(track_id),
                title: track_id.to_string(),
                artist_id: "artist_1".to_string(),
                genre: "house".to_string(),
                explicit: false,
                created_at: Utc::now(),
            })
            .await;
        for (stem_id, scores) in stem_scores {
            store
                .add_stem(Stem {
                    id: StemId::from(*stem_id),
                    track_id: TrackId::from(track_id),
                    stem_type: "drums".to_string(),
                })
                .await;
            for (i, score) in scores.iter().enumerate() {
                store
                    .rate_stem(StemQualityRating {
                        stem_id: StemId::from(*stem_id),
                        curator_id: format!("curator_{i}"),
                        score: *score,
                    })
                    .await
                    .unwrap();
            }
        }
    }

    #[tokio::test]
    async fn test_score_averages_best_rating_per_stem() {
        let store = CatalogStore::new();
        // Stem a: best 80 of [60, 80]; stem b: 51. Average 65.5 -> 66.
        seed_track(&store, "t1", &[("s1", &[60, 80]), ("s2", &[51])]).await;

        let agent = CuratorAgent::new(store);
        let scores = agent
            .best_track_scores(&[TrackId::from("t1")])
            .await
            .unwrap();
        assert_eq!(scores[&TrackId::from("t1")], 66);
    }

    #[tokio::test]
    async fn test_unrated_track_has_no_score() {
        let store = CatalogStore::new();
        seed_track(&store, "t1", &[("s1", &[])]).await;

        let agent = CuratorAgent::new(store);
        let scores = agent
            .best_track_scores(&[TrackId::from("t1"), TrackId::from("missing")])
            .await
            .unwrap();
        assert!(scores.is_empty());
    }
}
