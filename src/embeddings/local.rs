//! In-process text embedding via `embed_anything`, for tenants that opt out
//! of sending content to a remote provider (§4.3, §9's provider-binding
//! redesign: embedding choice is a per-model config, not a global switch).

use crate::embeddings::provider::EmbeddingProvider;
use crate::error::{RemError, Result};
use async_trait::async_trait;
use embed_anything::embeddings::embed::{EmbedData, Embedder};
use std::sync::Arc;

pub struct LocalTextEmbedder {
    provider_id: String,
    embedder: Arc<Embedder>,
    dimensions: usize,
}

impl LocalTextEmbedder {
    pub fn new(provider_id: impl Into<String>, embedder: Arc<Embedder>, dimensions: usize) -> Self {
        Self { provider_id: provider_id.into(), embedder, dimensions }
    }

    fn extract_vector(data: EmbedData) -> Vec<f32> {
        data.embedding.to_dense().unwrap_or_default()
    }
}

#[async_trait]
impl EmbeddingProvider for LocalTextEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self
            .embedder
            .embed(&[text.to_string()], None, None)
            .await
            .map_err(|e| RemError::InternalQueryError(format!("local embed failed: {e}")))?;

        results
            .into_iter()
            .next()
            .map(Self::extract_vector)
            .ok_or_else(|| RemError::InternalQueryError("local embedder returned nothing".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let results = self
            .embedder
            .embed(texts, None, None)
            .await
            .map_err(|e| RemError::InternalQueryError(format!("local embed failed: {e}")))?;
        Ok(results.into_iter().map(Self::extract_vector).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn provider_id(&self) -> &str {
        &self.provider_id
    }
}
