//! The retrieval query engine.
//!
//! Per question: exact-key cache check, query enhancement, retrieval,
//! confidence scoring, grounded generation, and a conditional cache
//! write. Any failure along the way collapses into a degraded — but
//! valid — result; the caller of [`QueryEngine::query`] never sees an
//! error.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::timeout;

use crate::core::config::Settings;
use crate::core::errors::AssistantError;
use crate::index::{IndexManager, SearchHit};
use crate::knowledge::Chunk;
use crate::llm::LlmProvider;

use super::cache::ResponseCache;
use super::confidence;
use super::enhance::enhance_query;
use super::prompt;

pub const DEGRADED_ANSWER: &str =
    "I apologize, but I encountered an error processing your request. Please try again.";

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Retrieval breadth per query.
    pub retrieval_k: usize,
    pub cache_capacity: u64,
    /// Results are cached only when confidence is strictly above this.
    pub cache_confidence_threshold: f64,
    /// Map search distances into relevance scores for the confidence
    /// model. Off by default: raw cosine distance is not a calibrated
    /// relevance signal.
    pub surface_relevance: bool,
    pub generation_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retrieval_k: 7,
            cache_capacity: 1024,
            cache_confidence_threshold: 0.7,
            surface_relevance: false,
            generation_timeout: Duration::from_secs(120),
        }
    }
}

impl EngineConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            retrieval_k: settings.retrieval_k,
            cache_capacity: settings.cache_capacity,
            cache_confidence_threshold: settings.cache_confidence_threshold,
            surface_relevance: settings.surface_relevance,
            generation_timeout: settings.generation_timeout(),
        }
    }
}

/// The engine's answer to one question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub answer: String,
    /// In `[0, 1]`; 0.0 means no evidence or a failed pipeline.
    pub confidence: f64,
    /// Titles of the retrieved chunks in rank order; duplicates kept.
    pub sources: Vec<String>,
    pub evidence: Vec<Chunk>,
}

impl QueryResult {
    /// The fixed result returned when any pipeline step fails.
    pub fn degraded() -> Self {
        Self {
            answer: DEGRADED_ANSWER.to_string(),
            confidence: 0.0,
            sources: Vec::new(),
            evidence: Vec::new(),
        }
    }
}

pub struct QueryEngine {
    config: EngineConfig,
    provider: Arc<dyn LlmProvider>,
    index: Arc<IndexManager>,
    cache: ResponseCache,
}

impl QueryEngine {
    pub fn new(
        config: EngineConfig,
        provider: Arc<dyn LlmProvider>,
        index: Arc<IndexManager>,
    ) -> Self {
        let cache = ResponseCache::new(config.cache_capacity);
        Self {
            config,
            provider,
            index,
            cache,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Answer a question from the index. Cached results are returned
    /// as-is, with no re-retrieval or re-scoring; they may go stale
    /// relative to a rebuilt index, which is accepted.
    pub async fn query(&self, question: &str) -> QueryResult {
        if let Some(cached) = self.cache.get(question) {
            tracing::info!("cache hit for question");
            return cached;
        }

        match self.run(question).await {
            Ok(result) => {
                if result.confidence > self.config.cache_confidence_threshold {
                    self.cache.insert(question.to_string(), result.clone());
                }
                result
            }
            Err(err) => {
                tracing::error!("query processing error: {}", err);
                QueryResult::degraded()
            }
        }
    }

    async fn run(&self, question: &str) -> Result<QueryResult, AssistantError> {
        let enhanced = enhance_query(question);

        let query_embedding = self
            .embed_one(&enhanced)
            .await
            .map_err(AssistantError::Retrieval)?;

        let index = self.index.current();
        let mut hits = index.search(&query_embedding, self.config.retrieval_k);
        if self.config.surface_relevance {
            for hit in &mut hits {
                hit.relevance = Some((1.0 - hit.distance).clamp(0.0, 1.0));
            }
        }

        let confidence = confidence::score(&hits);
        let evidence: Vec<Chunk> = hits.into_iter().map(|h| h.chunk).collect();

        // Generation sees the original question; only retrieval used the
        // enhanced one.
        let context = prompt::build_context(&evidence);
        let full_prompt = prompt::build_prompt(&context, question);
        let answer = timeout(
            self.config.generation_timeout,
            self.provider.generate(&full_prompt),
        )
        .await
        .map_err(|_| AssistantError::Generation("generation timed out".to_string()))?
        .map_err(|e| AssistantError::Generation(e.to_string()))?;

        let sources = evidence
            .iter()
            .map(|c| c.metadata.title.clone())
            .collect();

        Ok(QueryResult {
            answer,
            confidence,
            sources,
            evidence,
        })
    }

    /// Raw similarity search, bypassing enhancement and generation. Used
    /// by the search endpoint, which always exposes distances.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchHit>, AssistantError> {
        let query_embedding = self
            .embed_one(query)
            .await
            .map_err(AssistantError::Retrieval)?;
        Ok(self.index.current().search(&query_embedding, top_k))
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, String> {
        let inputs = [text.to_string()];
        let mut embeddings = self
            .provider
            .embed(&inputs)
            .await
            .map_err(|e| e.to_string())?;

        if embeddings.is_empty() {
            return Err("embedder returned no vector for the query".to_string());
        }
        Ok(embeddings.swap_remove(0))
    }
}
