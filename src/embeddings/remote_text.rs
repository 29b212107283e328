//! Remote text embedding over HTTP, grounded on the teacher's
//! `OpenAIEmbedder` — same request/response shape, same model-to-dimension
//! table — but returning this crate's `RemError` and exposing
//! `provider_id()` so the `EmbeddingService` can route by id (§4.3).

use crate::embeddings::provider::EmbeddingProvider;
use crate::error::{RemError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct EmbeddingRequest {
    model: String,
    input: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Text embeddings served by a remote HTTP provider speaking the OpenAI
/// embeddings wire format (self-hosted or hosted, the request shape is
/// identical either way).
pub struct RemoteTextEmbedder {
    provider_id: String,
    api_key: String,
    model: String,
    dimensions: usize,
    endpoint: String,
    client: Client,
}

impl RemoteTextEmbedder {
    pub fn new(provider_id: impl Into<String>, api_key: String, model: String, endpoint: String) -> Self {
        let dimensions = match model.as_str() {
            "text-embedding-3-small" => 1536,
            "text-embedding-3-large" => 3072,
            "text-embedding-ada-002" => 1536,
            _ => 1536,
        };

        Self {
            provider_id: provider_id.into(),
            api_key,
            model,
            dimensions,
            endpoint,
            client: Client::new(),
        }
    }

    async fn call_api(&self, input: serde_json::Value) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest { model: self.model.clone(), input };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| RemError::InternalQueryError(format!("embedding request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_else(|_| "unknown error".to_string());
            return Err(RemError::InternalQueryError(format!("embedding provider error ({status}): {error_text}")));
        }

        let embedding_response: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| RemError::InternalQueryError(format!("failed to parse embedding response: {e}")))?;

        Ok(embedding_response.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingProvider for RemoteTextEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.call_api(serde_json::json!(text)).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| RemError::InternalQueryError("no embedding returned".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.call_api(serde_json::json!(texts)).await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn provider_id(&self) -> &str {
        &self.provider_id
    }
}
