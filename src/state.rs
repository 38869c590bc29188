use std::sync::Arc;

use thiserror::Error;

use crate::core::config::{AppPaths, Settings};
use crate::core::errors::AssistantError;
use crate::escalation::{AgentPipeline, EscalationGate};
use crate::index::{IndexManager, IndexStore};
use crate::knowledge::{self, ChunkerConfig, TextChunker};
use crate::llm::{LlmProvider, OllamaProvider};
use crate::retrieval::{EngineConfig, QueryEngine};

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("failed to load knowledge corpus: {0}")]
    Corpus(#[source] AssistantError),
}

/// Shared application state: settings, the model provider, the live
/// index, the query engine, and the escalation gate.
pub struct AppState {
    pub settings: Arc<Settings>,
    pub paths: Arc<AppPaths>,
    pub provider: Arc<dyn LlmProvider>,
    pub index: Arc<IndexManager>,
    pub engine: Arc<QueryEngine>,
    pub gate: Arc<EscalationGate>,
}

impl AppState {
    /// Load the corpus, open or rebuild the index, and wire the engine
    /// and gate. A malformed corpus is the only fatal outcome; anything
    /// else degrades and the service still comes up.
    pub async fn initialize(
        settings: Arc<Settings>,
        paths: Arc<AppPaths>,
    ) -> Result<Arc<Self>, InitializationError> {
        let provider: Arc<dyn LlmProvider> = Arc::new(OllamaProvider::new(
            settings.ollama_host.clone(),
            settings.generation_model.clone(),
            settings.embedding_model.clone(),
            settings.generation_timeout(),
        ));

        let documents = knowledge::load_documents_from_file(&settings.knowledge_base_path)
            .map_err(InitializationError::Corpus)?;

        let chunker = TextChunker::new(ChunkerConfig {
            chunk_size: settings.chunk_size,
            chunk_overlap: settings.chunk_overlap,
        });

        let index = Arc::new(
            IndexManager::open_or_build(
                IndexStore::new(paths.index_db_path.clone()),
                chunker,
                settings.embedding_model.clone(),
                provider.as_ref(),
                &documents,
            )
            .await,
        );

        let engine = Arc::new(QueryEngine::new(
            EngineConfig::from_settings(&settings),
            provider.clone(),
            index.clone(),
        ));
        let pipeline = Arc::new(AgentPipeline::new(provider.clone(), engine.clone()));
        let gate = Arc::new(EscalationGate::new(engine.clone(), pipeline, &settings));

        if !provider.health_check().await.unwrap_or(false) {
            tracing::warn!(
                "model backend at {} is unreachable; answers will degrade until it returns",
                settings.ollama_host
            );
        }

        Ok(Arc::new(AppState {
            settings,
            paths,
            provider,
            index,
            engine,
            gate,
        }))
    }
}
