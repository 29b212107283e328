//! `LlmAdapter` — the contract the dreaming worker, affinity builder, and
//! image embedder use to talk to whatever LLM backs this tenant. Three
//! shapes (§4.6, §4.8, §9): a one-shot structured completion, a streaming
//! completion, and an async batch submit/poll pair for direct vs batch
//! dreaming modes.

use crate::agents::TokenUsage;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;
use std::error::Error as StdError;

pub type LlmResult<T> = Result<T, Box<dyn StdError + Send + Sync>>;

/// One incremental chunk of a streamed completion.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    TextDelta(String),
    Done(TokenUsage),
}

/// A single request submitted as part of an LLM batch job.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub request_id: String,
    pub system_prompt: String,
    pub content: String,
    pub output_schema: Value,
}

#[derive(Debug, Clone)]
pub struct BatchResult {
    pub request_id: String,
    pub output: Value,
    pub usage: TokenUsage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchPollStatus {
    InProgress,
    Completed,
    Failed(String),
}

#[async_trait]
pub trait LlmAdapter: Send + Sync {
    /// Non-streaming structured completion: the response is validated
    /// against `output_schema` before being returned.
    async fn complete(&self, system_prompt: &str, content: &str, output_schema: &Value) -> LlmResult<(Value, TokenUsage)>;

    /// Streaming completion for interactive callers; the dreaming worker
    /// itself never uses this path (§4.8 runs headless), but the same
    /// adapter backs both.
    async fn stream(&self, system_prompt: &str, content: &str) -> LlmResult<BoxStream<'static, StreamEvent>>;

    /// Submits a batch of requests and returns a provider-side handle to
    /// poll later. Used by the dreaming worker's batch mode (§4.8).
    async fn batch_submit(&self, requests: Vec<BatchRequest>) -> LlmResult<String>;

    /// Polls a previously submitted batch. Returns `InProgress` until the
    /// provider finishes, at which point results are fetched and returned
    /// alongside `Completed`.
    async fn batch_poll(&self, batch_handle: &str) -> LlmResult<(BatchPollStatus, Vec<BatchResult>)>;

    /// Produces a short natural-language caption for an image at `uri`,
    /// used by the caption-then-embed image provider (§4.3).
    async fn caption_image(&self, uri: &str) -> LlmResult<String>;
}
