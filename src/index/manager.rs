//! Index lifecycle: load-or-rebuild at startup, atomic publication.
//!
//! The manager owns the live [`VectorIndex`] behind an [`ArcSwap`].
//! Searches grab the current pointer and run against an immutable
//! snapshot; a rebuild constructs a complete replacement off to the side
//! and publishes it in one swap.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::core::errors::AssistantError;
use crate::knowledge::{Chunk, Document, TextChunker};
use crate::llm::LlmProvider;

use super::entry::IndexEntry;
use super::store::IndexStore;
use super::vector::VectorIndex;

pub struct IndexManager {
    store: IndexStore,
    chunker: TextChunker,
    model: String,
    current: ArcSwap<VectorIndex>,
}

impl IndexManager {
    /// Startup policy: attempt to load the persisted index; on any load
    /// failure rebuild from the corpus and persist. A failed build (for
    /// example, an unreachable embedder) leaves an empty index in place —
    /// queries then degrade instead of the process dying, and the next
    /// restart tries again.
    pub async fn open_or_build(
        store: IndexStore,
        chunker: TextChunker,
        model: String,
        provider: &dyn LlmProvider,
        documents: &[Document],
    ) -> Self {
        let index = match store.load(&model).await {
            Ok(index) => index,
            Err(err) => {
                tracing::warn!("persisted index unavailable ({}), rebuilding", err);
                match Self::build(&chunker, &model, provider, documents).await {
                    Ok(index) => {
                        if let Err(e) = store.save(&index).await {
                            tracing::warn!("failed to persist rebuilt index: {}", e);
                        }
                        index
                    }
                    Err(err) => {
                        tracing::error!("index build failed ({}); serving an empty index", err);
                        VectorIndex::empty(model.clone())
                    }
                }
            }
        };

        Self {
            store,
            chunker,
            model,
            current: ArcSwap::from_pointee(index),
        }
    }

    /// Wrap an already-built index; no disk access.
    pub fn with_index(store: IndexStore, chunker: TextChunker, index: VectorIndex) -> Self {
        let model = index.model().to_string();
        Self {
            store,
            chunker,
            model,
            current: ArcSwap::from_pointee(index),
        }
    }

    /// Snapshot of the live index. Holders keep searching the snapshot
    /// even if a rebuild publishes a replacement underneath them.
    pub fn current(&self) -> Arc<VectorIndex> {
        self.current.load_full()
    }

    /// Full rebuild from the given documents: chunk, embed, persist, then
    /// publish. There is no incremental update path.
    pub async fn rebuild(
        &self,
        provider: &dyn LlmProvider,
        documents: &[Document],
    ) -> Result<(), AssistantError> {
        let index = Self::build(&self.chunker, &self.model, provider, documents).await?;
        if let Err(e) = self.store.save(&index).await {
            tracing::warn!("failed to persist rebuilt index: {}", e);
        }
        self.current.store(Arc::new(index));
        Ok(())
    }

    async fn build(
        chunker: &TextChunker,
        model: &str,
        provider: &dyn LlmProvider,
        documents: &[Document],
    ) -> Result<VectorIndex, AssistantError> {
        let chunks: Vec<Chunk> = documents
            .iter()
            .flat_map(|d| chunker.chunk_document(d))
            .collect();

        tracing::info!(
            "chunked {} documents into {} chunks",
            documents.len(),
            chunks.len()
        );

        if chunks.is_empty() {
            return Ok(VectorIndex::empty(model));
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = provider.embed(&texts).await.map_err(|e| {
            AssistantError::Retrieval(format!("embedding failed during index build: {}", e))
        })?;

        if embeddings.len() != chunks.len() {
            return Err(AssistantError::Retrieval(format!(
                "embedder returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let entries: Vec<IndexEntry> = embeddings
            .into_iter()
            .zip(chunks)
            .map(|(embedding, chunk)| IndexEntry { embedding, chunk })
            .collect();

        VectorIndex::from_entries(model, entries)
    }
}
