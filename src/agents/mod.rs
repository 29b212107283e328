//! Supporting pieces for background LLM calls: token-aware chunking and
//! pagination for content larger than one context window (§4.6, §4.8).
//!
//! The teacher's `client::LlmClient` (a `todo!()`-stubbed HTTP client) and
//! `schema::AgentSchema` (RocksDB-backed agent definitions keyed on a
//! `crate::database::Database` type this pack never included) are dropped:
//! `llm::HttpLlmAdapter` already covers the HTTP surface, and agent
//! definitions here are just the [`crate::schema::register_builtin_models`]
//! `ModelDescriptor`s plus the prompts `extract`/`affinity` build inline —
//! there's no separate per-tenant agent registry in this design.

pub mod chunking;
pub mod client;
pub mod pagination;

pub use chunking::Chunker;
pub use client::TokenUsage;
pub use pagination::{AggregatedTokenUsage, MergeStrategy, PaginatedRequest};
