//! Paginated agent requests
//!
//! Executes a structured-output LLM call over content too large for one
//! context window by:
//! 1. Chunking content into pieces that fit ([`super::Chunker`])
//! 2. Running the call on each chunk (parallel or sequential)
//! 3. Merging results according to a [`MergeStrategy`]
//!
//! Adapted from the teacher's `pagination.rs`: the original bound this
//! directly to `agents::client::LlmClient`, a `todo!()`-stubbed HTTP client;
//! this version drives [`crate::llm::LlmAdapter`] instead, the trait
//! `extract` and `affinity` already use for every other LLM call.

use super::{Chunker, TokenUsage};
use crate::error::{RemError, Result};
use crate::llm::LlmAdapter;
use futures::future::join_all;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Merge strategy for combining paginated results.
#[derive(Debug, Clone, Copy)]
pub enum MergeStrategy {
    /// Keep every chunk result as a separate array entry.
    Concat,
    /// Combine list-valued fields across chunk results, keep first scalar.
    Merge,
    /// Keep only the first chunk's result.
    First,
    /// Keep only the last chunk's result.
    Last,
}

/// Aggregated token usage across all chunks of one paginated call.
#[derive(Debug, Clone)]
pub struct AggregatedTokenUsage {
    pub total_input_tokens: u32,
    pub total_output_tokens: u32,
    pub total_cost_usd: f64,
    pub chunks_processed: usize,
    pub per_chunk_usage: Vec<TokenUsage>,
}

pub struct PaginatedRequest {
    llm: Arc<dyn LlmAdapter>,
    chunker: Chunker,
}

impl PaginatedRequest {
    pub fn new(llm: Arc<dyn LlmAdapter>, chunker: Chunker) -> Self {
        Self { llm, chunker }
    }

    /// Chunk `content`, run `system_prompt`/`output_schema` over every
    /// distinct chunk, and merge. Chunks that are byte-identical to one
    /// already seen earlier in the same call (common with overlapping
    /// windows over repetitive source material) reuse that chunk's result
    /// instead of paying for a second LLM call. Runs unique chunks
    /// concurrently unless `parallel` is false (useful under provider rate
    /// limits).
    pub async fn execute(
        &self,
        system_prompt: &str,
        content: &str,
        output_schema: &Value,
        strategy: MergeStrategy,
        parallel: bool,
    ) -> Result<(Value, AggregatedTokenUsage)> {
        let chunks = self.chunker.chunk_text(content);

        let mut first_seen: HashMap<blake3::Hash, usize> = HashMap::new();
        let mut unique_chunks = Vec::new();
        let mut chunk_to_unique = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            let hash = blake3::hash(chunk.as_bytes());
            let unique_index = *first_seen.entry(hash).or_insert_with(|| {
                unique_chunks.push(chunk.clone());
                unique_chunks.len() - 1
            });
            chunk_to_unique.push(unique_index);
        }

        let unique_results = if parallel {
            self.execute_parallel(system_prompt, &unique_chunks, output_schema).await?
        } else {
            self.execute_sequential(system_prompt, &unique_chunks, output_schema).await?
        };

        let mut seen_unique = vec![false; unique_results.len()];
        let results: Vec<(Value, TokenUsage)> = chunk_to_unique
            .into_iter()
            .map(|unique_index| {
                let (value, usage) = unique_results[unique_index].clone();
                if std::mem::replace(&mut seen_unique[unique_index], true) {
                    // A repeat occurrence: no LLM call was made for it, so it
                    // contributes nothing to token/cost totals.
                    (value, TokenUsage { input_tokens: 0, output_tokens: 0, estimated_cost_usd: 0.0, model: usage.model })
                } else {
                    (value, usage)
                }
            })
            .collect();

        let merged = self.merge_results(results.iter().map(|(r, _)| r.clone()).collect(), strategy)?;
        let aggregated = self.aggregate_usage(results);
        Ok((merged, aggregated))
    }

    async fn execute_parallel(&self, system_prompt: &str, chunks: &[String], output_schema: &Value) -> Result<Vec<(Value, TokenUsage)>> {
        let futures = chunks.iter().map(|chunk| self.llm.complete(system_prompt, chunk, output_schema));
        join_all(futures)
            .await
            .into_iter()
            .map(|r| {
                let (value, usage) = r.map_err(|e| RemError::InternalQueryError(e.to_string()))?;
                validate_output(output_schema, &value)?;
                Ok((value, usage))
            })
            .collect()
    }

    async fn execute_sequential(&self, system_prompt: &str, chunks: &[String], output_schema: &Value) -> Result<Vec<(Value, TokenUsage)>> {
        let mut results = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let (result, usage) = self
                .llm
                .complete(system_prompt, chunk, output_schema)
                .await
                .map_err(|e| RemError::InternalQueryError(e.to_string()))?;
            validate_output(output_schema, &result)?;
            results.push((result, usage));
        }
        Ok(results)
    }

    fn merge_results(&self, results: Vec<Value>, strategy: MergeStrategy) -> Result<Value> {
        match strategy {
            MergeStrategy::Concat => Ok(Value::Array(results)),
            MergeStrategy::First => Ok(results.into_iter().next().unwrap_or(Value::Null)),
            MergeStrategy::Last => Ok(results.into_iter().next_back().unwrap_or(Value::Null)),
            MergeStrategy::Merge => self.merge_recursive(results),
        }
    }

    /// List-valued fields are concatenated across every chunk's result;
    /// anything else keeps the first chunk's value.
    fn merge_recursive(&self, results: Vec<Value>) -> Result<Value> {
        let Some(Value::Object(first)) = results.first().cloned() else {
            return Ok(results.into_iter().next().unwrap_or(Value::Null));
        };

        let mut merged = serde_json::Map::new();
        for key in first.keys() {
            let values: Vec<&Value> = results.iter().filter_map(|r| r.get(key)).collect();

            if values.iter().all(|v| v.is_array()) {
                let combined: Vec<Value> = values.into_iter().flat_map(|v| v.as_array().unwrap().clone()).collect();
                merged.insert(key.clone(), Value::Array(combined));
            } else if let Some(first_value) = values.into_iter().next() {
                merged.insert(key.clone(), first_value.clone());
            }
        }

        Ok(Value::Object(merged))
    }

    fn aggregate_usage(&self, results_with_usage: Vec<(Value, TokenUsage)>) -> AggregatedTokenUsage {
        let total_input_tokens = results_with_usage.iter().map(|(_, u)| u.input_tokens).sum();
        let total_output_tokens = results_with_usage.iter().map(|(_, u)| u.output_tokens).sum();
        let total_cost_usd = results_with_usage.iter().map(|(_, u)| u.estimated_cost_usd).sum();
        let per_chunk_usage: Vec<TokenUsage> = results_with_usage.into_iter().map(|(_, u)| u).collect();

        AggregatedTokenUsage {
            total_input_tokens,
            total_output_tokens,
            total_cost_usd,
            chunks_processed: per_chunk_usage.len(),
            per_chunk_usage,
        }
    }
}

/// Rejects LLM output that doesn't conform to the caller's declared
/// `output_schema` instead of letting a malformed field surface as a panic
/// or a silently-dropped value further down the extraction pipeline.
fn validate_output(schema: &Value, instance: &Value) -> Result<()> {
    jsonschema::validate(schema, instance).map_err(|e| RemError::SchemaValidation(e.to_string()))
}
