//! Token usage accounting shared across every LLM call site.
//!
//! The teacher's `LlmClient` HTTP client (`todo!()`-stubbed) lived in this
//! file too; it's superseded by [`crate::llm::HttpLlmAdapter`], which owns
//! the endpoint resolution and pricing table this type used to pair with.
//! `TokenUsage` itself is pure data and is reused as-is.

use serde::{Deserialize, Serialize};

/// Token usage and estimated cost for a single LLM request. Every
/// `LlmAdapter::complete` call returns one of these so the dreaming worker
/// can aggregate cost per job (§4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub estimated_cost_usd: f64,
    pub model: String,
}
