pub mod ollama;
pub mod provider;

pub use ollama::OllamaProvider;
pub use provider::{LlmError, LlmProvider};
