use serde::{Deserialize, Serialize};

use crate::knowledge::Chunk;

/// One embedded chunk. The vector is the embedding of the chunk's exact
/// text under the index's recorded model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub embedding: Vec<f32>,
    pub chunk: Chunk,
}

/// A search result. Distance is cosine distance (0 = identical direction).
/// `relevance` is a normalized score in `[0, 1]` and is only populated
/// when the caller asked the engine to surface one; the confidence model
/// treats its absence as "no relevance signal".
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub chunk: Chunk,
    pub distance: f32,
    pub relevance: Option<f32>,
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;

    if denom <= f32::EPSILON {
        0.0
    } else {
        dot / denom
    }
}

pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}
