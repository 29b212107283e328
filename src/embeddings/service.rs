//! `EmbeddingService` — resolves a `provider_id` to a concrete
//! [`EmbeddingProvider`] and enforces the dimension-stability guarantee
//! (§4.3, §8 property 3): a provider's output width never silently changes
//! under an existing field; a mismatch is a hard `RemError`, not a
//! re-embedding of everything already stored under the old width.

use super::provider::EmbeddingProvider;
use crate::error::{RemError, Result};
use std::collections::HashMap;
use std::sync::Arc;

pub struct EmbeddingService {
    providers: HashMap<String, Arc<dyn EmbeddingProvider>>,
}

impl EmbeddingService {
    pub fn new() -> Self {
        Self { providers: HashMap::new() }
    }

    pub fn register(&mut self, provider: Arc<dyn EmbeddingProvider>) {
        self.providers.insert(provider.provider_id().to_string(), provider);
    }

    fn resolve(&self, provider_id: &str) -> Result<&Arc<dyn EmbeddingProvider>> {
        self.providers
            .get(provider_id)
            .ok_or_else(|| RemError::InternalQueryError(format!("unknown embedding provider: {provider_id}")))
    }

    /// Embeds `text` with `provider_id`, checking the result against
    /// `expected_dimension` when one is already on record for this field
    /// (i.e. some row already has an embedding under this provider).
    pub async fn embed(&self, provider_id: &str, text: &str, expected_dimension: Option<usize>) -> Result<Vec<f32>> {
        let provider = self.resolve(provider_id)?;
        let vector = provider.embed(text).await?;
        self.check_dimension(provider.as_ref(), &vector, expected_dimension)?;
        Ok(vector)
    }

    pub async fn embed_batch(&self, provider_id: &str, texts: &[String], expected_dimension: Option<usize>) -> Result<Vec<Vec<f32>>> {
        let provider = self.resolve(provider_id)?;
        let vectors = provider.embed_batch(texts).await?;
        for vector in &vectors {
            self.check_dimension(provider.as_ref(), vector, expected_dimension)?;
        }
        Ok(vectors)
    }

    fn check_dimension(&self, provider: &dyn EmbeddingProvider, vector: &[f32], expected: Option<usize>) -> Result<()> {
        if vector.len() != provider.dimensions() {
            return Err(RemError::EmbeddingDimensionMismatch { expected: provider.dimensions(), actual: vector.len() });
        }
        if let Some(expected) = expected {
            if vector.len() != expected {
                return Err(RemError::EmbeddingDimensionMismatch { expected, actual: vector.len() });
            }
        }
        Ok(())
    }
}

impl Default for EmbeddingService {
    fn default() -> Self {
        Self::new()
    }
}
