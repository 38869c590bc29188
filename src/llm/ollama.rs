use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::provider::{LlmError, LlmProvider};

/// Ollama-backed provider. Generation uses `/api/generate`, embeddings
/// `/api/embed`; both are plain JSON round trips.
#[derive(Clone)]
pub struct OllamaProvider {
    base_url: String,
    generation_model: String,
    embedding_model: String,
    client: Client,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl OllamaProvider {
    pub fn new(
        base_url: String,
        generation_model: String,
        embedding_model: String,
        request_timeout: Duration,
    ) -> Self {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .unwrap_or_default();

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            generation_model,
            embedding_model,
            client,
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn health_check(&self) -> Result<bool, LlmError> {
        let url = format!("{}/api/tags", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.base_url);

        let body = json!({
            "model": self.generation_model,
            "prompt": prompt,
            "stream": false,
            "options": { "temperature": 0.1 },
        });

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(LlmError::http)?;

        if !res.status().is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("generate: {}", text)));
        }

        let payload: GenerateResponse = res
            .json()
            .await
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

        Ok(payload.response)
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/api/embed", self.base_url);

        let body = json!({
            "model": self.embedding_model,
            "input": inputs,
        });

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(LlmError::http)?;

        if !res.status().is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("embed: {}", text)));
        }

        let payload: EmbedResponse = res
            .json()
            .await
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

        if payload.embeddings.len() != inputs.len() {
            return Err(LlmError::MalformedResponse(format!(
                "expected {} embeddings, got {}",
                inputs.len(),
                payload.embeddings.len()
            )));
        }

        Ok(payload.embeddings)
    }
}
