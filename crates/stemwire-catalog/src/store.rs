//! The in-memory catalog store

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stemwire_types::{Candidate, Listing, ListingId, ListingStatus, StemId, TrackId};
use tokio::sync::RwLock;

use crate::{CatalogError, Result};

/// A catalog track
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    pub artist_id: String,
    pub genre: String,
    pub explicit: bool,
    pub created_at: DateTime<Utc>,
}

/// An isolated audio layer of a track
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stem {
    pub id: StemId,
    pub track_id: TrackId,
    /// "vocals", "drums", "bass", ...
    pub stem_type: String,
}

/// A curator's 0-100 rating of a stem's audio quality
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StemQualityRating {
    pub stem_id: StemId,
    pub curator_id: String,
    pub score: u8,
}

#[derive(Default)]
struct CatalogState {
    tracks: Vec<Track>,
    stems: HashMap<StemId, Stem>,
    listings: HashMap<ListingId, Listing>,
    /// (stem_id, curator_id) -> rating; upserted per curator
    ratings: HashMap<(StemId, String), StemQualityRating>,
}

/// The Stemwire catalog store.
///
/// Thread-safe and designed for concurrent access; every mutation takes
/// one write lock so single-record updates are atomic.
#[derive(Clone, Default)]
pub struct CatalogStore {
    state: Arc<RwLock<CatalogState>>,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_track(&self, track: Track) {
        self.state.write().await.tracks.push(track);
    }

    pub async fn add_stem(&self, stem: Stem) {
        self.state.write().await.stems.insert(stem.id.clone(), stem);
    }

    pub async fn add_listing(&self, listing: Listing) {
        self.state
            .write()
            .await
            .listings
            .insert(listing.listing_id, listing);
    }

    /// Upsert a quality rating keyed by (stem, curator)
    pub async fn rate_stem(&self, rating: StemQualityRating) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.stems.contains_key(&rating.stem_id) {
            return Err(CatalogError::StemNotFound {
                stem_id: rating.stem_id.to_string(),
            });
        }
        state
            .ratings
            .insert((rating.stem_id.clone(), rating.curator_id.clone()), rating);
        Ok(())
    }

    pub async fn track(&self, track_id: &TrackId) -> Option<Track> {
        self.state
            .read()
            .await
            .tracks
            .iter()
            .find(|t| &t.id == track_id)
            .cloned()
    }

    /// Contains-match over title and genre, case-insensitive, newest
    /// first. An empty query matches everything. `limit` is clamped to
    /// [1, 50]; explicit tracks are excluded unless allowed.
    pub async fn search(&self, query: &str, limit: usize, allow_explicit: bool) -> Vec<Track> {
        let needle = query.to_lowercase();
        let take = limit.clamp(1, 50);
        let state = self.state.read().await;

        let mut matches: Vec<Track> = state
            .tracks
            .iter()
            .filter(|t| allow_explicit || !t.explicit)
            .filter(|t| {
                needle.is_empty()
                    || t.title.to_lowercase().contains(&needle)
                    || t.genre.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matches.truncate(take);
        matches
    }

    /// All `Active` listings under the track's stems, in listing-id order
    pub async fn active_listings_for_track(&self, track_id: &TrackId) -> Vec<Listing> {
        let state = self.state.read().await;
        let mut listings: Vec<Listing> = state
            .listings
            .values()
            .filter(|l| l.status == ListingStatus::Active)
            .filter(|l| {
                state
                    .stems
                    .get(&l.stem_id)
                    .is_some_and(|s| &s.track_id == track_id)
            })
            .cloned()
            .collect();
        listings.sort_by_key(|l| l.listing_id);
        listings
    }

    pub async fn has_listing(&self, track_id: &TrackId) -> bool {
        !self.active_listings_for_track(track_id).await.is_empty()
    }

    pub async fn listing(&self, listing_id: ListingId) -> Option<Listing> {
        self.state.read().await.listings.get(&listing_id).cloned()
    }

    /// Move a listing toward a terminal status. Forward-only: an attempt
    /// to leave a terminal status is rejected.
    pub async fn mark_listing(&self, listing_id: ListingId, status: ListingStatus) -> Result<()> {
        let mut state = self.state.write().await;
        let listing = state
            .listings
            .get_mut(&listing_id)
            .ok_or(CatalogError::ListingNotFound { listing_id })?;
        if !listing.status.can_transition_to(status) {
            return Err(CatalogError::InvalidTransition {
                from: format!("{:?}", listing.status),
                to: format!("{status:?}"),
            });
        }
        listing.status = status;
        Ok(())
    }

    /// Build the selector-facing candidate for a track
    pub async fn candidate_for(&self, track: &Track) -> Candidate {
        Candidate {
            id: track.id.clone(),
            title: track.title.clone(),
            has_listing: self.has_listing(&track.id).await,
            quality_score: None,
        }
    }

    /// Best rating per stem (highest score across curators)
    pub async fn best_stem_scores(&self, stem_ids: &[StemId]) -> HashMap<StemId, u8> {
        let state = self.state.read().await;
        let mut best: HashMap<StemId, u8> = HashMap::new();
        for ((stem_id, _), rating) in &state.ratings {
            if !stem_ids.contains(stem_id) {
                continue;
            }
            let entry = best.entry(stem_id.clone()).or_insert(rating.score);
            if rating.score > *entry {
                *entry = rating.score;
            }
        }
        best
    }

    pub async fn stems_for_track(&self, track_id: &TrackId) -> Vec<Stem> {
        self.state
            .read()
            .await
            .stems
            .values()
            .filter(|s| &s.track_id == track_id)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use stemwire_types::TokenId;

    fn track(id: &str, title: &str, genre: &str, explicit: bool, age_hours: i64) -> Track {
        Track {
            id: TrackId::from(id),
            title: title.to_string(),
            artist_id: "artist_1".to_string(),
            genre: genre.to_string(),
            explicit,
            created_at: Utc::now() - Duration::hours(age_hours),
        }
    }

    fn listing(id: u64, stem_id: &str, status: ListingStatus) -> Listing {
        Listing {
            listing_id: ListingId(id),
            token_id: TokenId(id),
            stem_id: StemId::from(stem_id),
            price_per_unit_wei: 1_000_000_000_000,
            chain_id: 31337,
            stem_type: "drums".to_string(),
            status,
            expiry: Utc::now() + Duration::days(7),
        }
    }

    #[tokio::test]
    async fn test_search_contains_match_over_title_and_genre() {
        let store = CatalogStore::new();
        store.add_track(track("t1", "Midnight Drive", "synthwave", false, 1)).await;
        store.add_track(track("t2", "Synth Sunrise", "house", false, 2)).await;
        store.add_track(track("t3", "Quiet Rain", "ambient", false, 3)).await;

        let hits = store.search("synth", 10, false).await;
        assert_eq!(hits.len(), 2);
        // Newest first
        assert_eq!(hits[0].id, TrackId::from("t1"));
    }

    #[tokio::test]
    async fn test_search_excludes_explicit_by_default() {
        let store = CatalogStore::new();
        store.add_track(track("t1", "Clean", "house", false, 1)).await;
        store.add_track(track("t2", "Raw", "house", true, 2)).await;

        assert_eq!(store.search("house", 10, false).await.len(), 1);
        assert_eq!(store.search("house", 10, true).await.len(), 2);
    }

    #[tokio::test]
    async fn test_active_listings_only() {
        let store = CatalogStore::new();
        store.add_track(track("t1", "A", "house", false, 1)).await;
        store
            .add_stem(Stem {
                id: StemId::from("s1"),
                track_id: TrackId::from("t1"),
                stem_type: "drums".to_string(),
            })
            .await;
        store.add_listing(listing(1, "s1", ListingStatus::Active)).await;
        store.add_listing(listing(2, "s1", ListingStatus::Sold)).await;

        let listings = store.active_listings_for_track(&TrackId::from("t1")).await;
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].listing_id, ListingId(1));
    }

    #[tokio::test]
    async fn test_mark_listing_forward_only() {
        let store = CatalogStore::new();
        store.add_track(track("t1", "A", "house", false, 1)).await;
        store
            .add_stem(Stem {
                id: StemId::from("s1"),
                track_id: TrackId::from("t1"),
                stem_type: "drums".to_string(),
            })
            .await;
        store.add_listing(listing(1, "s1", ListingStatus::Active)).await;

        store.mark_listing(ListingId(1), ListingStatus::Stale).await.unwrap();
        let err = store
            .mark_listing(ListingId(1), ListingStatus::Active)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_best_stem_scores_takes_highest() {
        let store = CatalogStore::new();
        store
            .add_stem(Stem {
                id: StemId::from("s1"),
                track_id: TrackId::from("t1"),
                stem_type: "vocals".to_string(),
            })
            .await;
        store
            .rate_stem(StemQualityRating {
                stem_id: StemId::from("s1"),
                curator_id: "system".to_string(),
                score: 40,
            })
            .await
            .unwrap();
        store
            .rate_stem(StemQualityRating {
                stem_id: StemId::from("s1"),
                curator_id: "human".to_string(),
                score: 70,
            })
            .await
            .unwrap();

        let best = store.best_stem_scores(&[StemId::from("s1")]).await;
        assert_eq!(best[&StemId::from("s1")], 70);
    }
}
