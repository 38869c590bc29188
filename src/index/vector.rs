//! In-memory vector index.
//!
//! Brute-force cosine search over embedded chunks. The index is immutable
//! after construction; rebuilds produce a fresh index that the manager
//! publishes by pointer swap, so concurrent searches never observe a
//! partially built index.

use crate::core::errors::AssistantError;
use crate::knowledge::Chunk;

use super::entry::{cosine_distance, IndexEntry, SearchHit};

#[derive(Debug)]
pub struct VectorIndex {
    model: String,
    dimension: usize,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    /// Build from embedded chunks, taking the dimension from the first
    /// entry. Mixed dimensions mean the embedder misbehaved.
    pub fn from_entries(
        model: impl Into<String>,
        entries: Vec<IndexEntry>,
    ) -> Result<Self, AssistantError> {
        let dimension = entries.first().map_or(0, |e| e.embedding.len());
        Self::from_parts(model, dimension, entries)
    }

    pub fn from_parts(
        model: impl Into<String>,
        dimension: usize,
        entries: Vec<IndexEntry>,
    ) -> Result<Self, AssistantError> {
        for entry in &entries {
            if entry.embedding.len() != dimension {
                return Err(AssistantError::Retrieval(format!(
                    "inconsistent embedding dimensions: expected {}, got {}",
                    dimension,
                    entry.embedding.len()
                )));
            }
        }

        Ok(Self {
            model: model.into(),
            dimension,
            entries,
        })
    }

    pub fn empty(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            dimension: 0,
            entries: Vec::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// The `k` nearest chunks by ascending cosine distance. `k` is clamped
    /// to the entry count; an empty index yields an empty result, never an
    /// error.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<SearchHit> {
        let mut hits: Vec<SearchHit> = self
            .entries
            .iter()
            .map(|entry| SearchHit {
                chunk: entry.chunk.clone(),
                distance: cosine_distance(query, &entry.embedding),
                relevance: None,
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k.min(self.entries.len()));
        hits
    }
}
