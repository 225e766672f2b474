//! Stemwire Embeddings - deterministic taste vectors
//!
//! A small bag-of-words embedder: tokens are hashed into a fixed number of
//! buckets and the count vector is L2-normalised. Deterministic by design
//! so ranking is reproducible across processes; track vectors are computed
//! lazily and cached on first use.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use stemwire_types::TrackId;
use tokio::sync::RwLock;

/// Embedding dimensionality
pub const DIMENSION: usize = 16;

/// A candidate ranked by similarity to a query vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedTrack {
    pub track_id: TrackId,
    pub score: f32,
}

/// Token-hash embedder
#[derive(Debug, Clone, Default)]
pub struct Embedder;

impl Embedder {
    pub fn new() -> Self {
        Self
    }

    /// Embed free text into a normalised `DIMENSION`-length vector.
    /// Empty or non-alphanumeric text yields the zero vector.
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; DIMENSION];
        let lower = text.to_lowercase();
        let tokens = lower
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|t| !t.is_empty());

        let mut any = false;
        for token in tokens {
            any = true;
            let index = (hash_token(token) as usize) % DIMENSION;
            vector[index] += 1.0;
        }
        if !any {
            return vector;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

// 31-based rolling hash, kept stable across releases because cached
// vectors outlive process restarts in deployments that snapshot the store
fn hash_token(token: &str) -> u32 {
    let mut hash: u32 = 0;
    for byte in token.bytes() {
        hash = hash.wrapping_mul(31).wrapping_add(byte as u32);
    }
    hash
}

/// Shared store of per-track embedding vectors
#[derive(Clone, Default)]
pub struct EmbeddingStore {
    vectors: Arc<RwLock<HashMap<TrackId, Vec<f32>>>>,
}

impl EmbeddingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert(&self, track_id: TrackId, vector: Vec<f32>) {
        self.vectors.write().await.insert(track_id, vector);
    }

    pub async fn get(&self, track_id: &TrackId) -> Option<Vec<f32>> {
        self.vectors.read().await.get(track_id).cloned()
    }

    pub async fn contains(&self, track_id: &TrackId) -> bool {
        self.vectors.read().await.contains_key(track_id)
    }

    /// Rank `candidates` by cosine similarity to `query`, descending.
    /// Candidates without a cached vector are omitted from the ranking.
    pub async fn similarity(&self, query: &[f32], candidates: &[TrackId]) -> Vec<RankedTrack> {
        let vectors = self.vectors.read().await;
        let mut scored: Vec<RankedTrack> = candidates
            .iter()
            .filter_map(|track_id| {
                vectors.get(track_id).map(|vector| RankedTrack {
                    track_id: track_id.clone(),
                    score: cosine(query, vector),
                })
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b).sqrt()
}
