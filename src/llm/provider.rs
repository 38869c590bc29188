use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by a model provider. Callers classify them into the
/// pipeline taxonomy (`Retrieval` for embedding, `Generation` for text).
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("provider request failed: {0}")]
    Http(String),
    #[error("provider returned an error: {0}")]
    Api(String),
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}

impl LlmError {
    pub fn http<E: std::fmt::Display>(err: E) -> Self {
        LlmError::Http(err.to_string())
    }
}

/// Black-box boundary to the language model backend.
///
/// Embedding must be deterministic for identical text under a fixed model
/// identity; the persisted index records the model it was built with and
/// refuses to load under a different one.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g. "ollama").
    fn name(&self) -> &str;

    /// Check whether the backend is reachable.
    async fn health_check(&self) -> Result<bool, LlmError>;

    /// Complete a prompt into answer text.
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;

    /// Embed each input into a fixed-dimension vector, one per input,
    /// in input order.
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, LlmError>;
}
