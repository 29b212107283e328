//! The `EmbeddingProvider` trait every concrete embedder implements.
//! Unchanged in shape from the teacher's original (implicit) contract —
//! `embed`/`embed_batch`/`dimensions` — just made explicit as a trait here
//! since the teacher's `embeddings/openai.rs` referenced
//! `embeddings::provider::EmbeddingProvider` without it existing in this
//! retrieval pack.

use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Fixed output width for this provider. The embedding service checks
    /// every returned vector against this — §4.3's dimension-stability
    /// guarantee, §8 property 3.
    fn dimensions(&self) -> usize;

    fn provider_id(&self) -> &str;
}
