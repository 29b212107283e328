//! Shared integration-test scaffolding: an in-process embedder and a
//! scripted [`LlmAdapter`] stub, plus a seeded [`TenantRepository`] over a
//! throwaway RocksDB directory. No test in this tree talks to a real
//! embedding or LLM provider.

use async_trait::async_trait;
use futures::stream::BoxStream;
use p8fs_rem::{EmbeddingService, RemConfig, StorageProvider, TenantRepository};
use p8fs_rem::llm::{BatchPollStatus, BatchRequest, BatchResult, LlmAdapter, LlmResult, StreamEvent};
use p8fs_rem::agents::TokenUsage;
use p8fs_rem::embeddings::EmbeddingProvider;
use p8fs_rem::storage::RocksStorage;
use serde_json::Value;
use std::sync::Arc;

/// Deterministic "embedder": every distinct text maps to a fixed point in a
/// tiny space so cosine similarity between two texts is predictable from
/// their content alone, without a real model in the loop.
pub struct WordOverlapEmbedder {
    vocabulary: Vec<&'static str>,
}

impl WordOverlapEmbedder {
    pub fn new(vocabulary: Vec<&'static str>) -> Self {
        Self { vocabulary }
    }
}

#[async_trait]
impl EmbeddingProvider for WordOverlapEmbedder {
    async fn embed(&self, text: &str) -> p8fs_rem::Result<Vec<f32>> {
        let lower = text.to_lowercase();
        Ok(self.vocabulary.iter().map(|w| if lower.contains(w) { 1.0 } else { 0.0 }).collect())
    }

    async fn embed_batch(&self, texts: &[String]) -> p8fs_rem::Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for t in texts {
            out.push(self.embed(t).await?);
        }
        Ok(out)
    }

    fn dimensions(&self) -> usize {
        self.vocabulary.len()
    }

    fn provider_id(&self) -> &str {
        "default"
    }
}

/// An `LlmAdapter` that returns whatever JSON value it was constructed
/// with, regardless of prompt. Enough to exercise the extractors and
/// affinity builder's second pass without a network call.
pub struct ScriptedLlmAdapter {
    pub response: Value,
}

impl ScriptedLlmAdapter {
    pub fn new(response: Value) -> Self {
        Self { response }
    }
}

#[async_trait]
impl LlmAdapter for ScriptedLlmAdapter {
    async fn complete(&self, _system_prompt: &str, _content: &str, _output_schema: &Value) -> LlmResult<(Value, TokenUsage)> {
        Ok((self.response.clone(), zero_usage()))
    }

    async fn stream(&self, _system_prompt: &str, _content: &str) -> LlmResult<BoxStream<'static, StreamEvent>> {
        Ok(Box::pin(futures::stream::empty()))
    }

    async fn batch_submit(&self, requests: Vec<BatchRequest>) -> LlmResult<String> {
        let ids: Vec<String> = requests.iter().map(|r| r.request_id.clone()).collect();
        Ok(ids.join(","))
    }

    async fn batch_poll(&self, batch_handle: &str) -> LlmResult<(BatchPollStatus, Vec<BatchResult>)> {
        let results = batch_handle
            .split(',')
            .filter(|s| !s.is_empty())
            .map(|id| BatchResult { request_id: id.to_string(), output: self.response.clone(), usage: zero_usage() })
            .collect();
        Ok((BatchPollStatus::Completed, results))
    }

    async fn caption_image(&self, _uri: &str) -> LlmResult<String> {
        Ok("a captioned image".to_string())
    }
}

pub async fn seeded_repo(vocabulary: Vec<&'static str>) -> (Arc<TenantRepository>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let storage: Arc<dyn StorageProvider> = Arc::new(RocksStorage::open(dir.path()).await.unwrap());
    p8fs_rem::register_builtin_models(storage.as_ref()).await.unwrap();

    let mut embeddings = EmbeddingService::new();
    embeddings.register(Arc::new(WordOverlapEmbedder::new(vocabulary)));
    let repo = Arc::new(TenantRepository::new(storage, Arc::new(embeddings)));
    (repo, dir)
}

pub fn default_config() -> RemConfig {
    RemConfig::default()
}

pub fn zero_usage() -> TokenUsage {
    TokenUsage { input_tokens: 0, output_tokens: 0, estimated_cost_usd: 0.0, model: "test-model".to_string() }
}
