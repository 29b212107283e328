//! Image embedding via caption-then-embed: a vision-capable LLM produces a
//! text caption, which is then run through a text embedder so image and
//! text fields can be compared in the same vector space (§4.3's image
//! embedding note — no separate image vector space).

use crate::embeddings::provider::EmbeddingProvider;
use crate::error::{RemError, Result};
use crate::llm::LlmAdapter;
use async_trait::async_trait;
use std::sync::Arc;

pub struct CaptionImageEmbedder {
    provider_id: String,
    llm: Arc<dyn LlmAdapter>,
    text_embedder: Arc<dyn EmbeddingProvider>,
}

impl CaptionImageEmbedder {
    pub fn new(provider_id: impl Into<String>, llm: Arc<dyn LlmAdapter>, text_embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { provider_id: provider_id.into(), llm, text_embedder }
    }
}

#[async_trait]
impl EmbeddingProvider for CaptionImageEmbedder {
    /// `text` here is the image URI; the adapter is expected to resolve and
    /// caption it. Images never carry pre-computed captions into this path
    /// directly — the caller passes `Image::uri`.
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let caption = self
            .llm
            .caption_image(text)
            .await
            .map_err(|e| RemError::InternalQueryError(format!("image caption failed: {e}")))?;
        self.text_embedder.embed(&caption).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for uri in texts {
            out.push(self.embed(uri).await?);
        }
        Ok(out)
    }

    fn dimensions(&self) -> usize {
        self.text_embedder.dimensions()
    }

    fn provider_id(&self) -> &str {
        &self.provider_id
    }
}
