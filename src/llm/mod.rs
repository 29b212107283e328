//! LLM access: the adapter contract plus the concrete HTTP implementation.
//!
//! The teacher's natural-language REM front-end (`query_builder`/`planner`/
//! `edge_builder`, which translated a free-text question into a query plan
//! via an LLM call) has no counterpart here — REM queries are an explicit
//! grammar (§4.5), not natural language, so nothing in this crate asks an
//! LLM to *write* a query. Those files also referenced `DatabaseError`/
//! `InlineEdge` types that don't exist in this crate's `types` module, so
//! they were dropped rather than patched up for a feature out of scope.
//! `edge_builder`'s typed-edge output shape (`dst`/`rel_type`/`properties`)
//! still grounds [`crate::affinity`]'s LLM second pass.

pub mod adapter;
pub mod http_client;

pub use adapter::{BatchPollStatus, BatchRequest, BatchResult, LlmAdapter, LlmResult, StreamEvent};
pub use http_client::HttpLlmAdapter;
