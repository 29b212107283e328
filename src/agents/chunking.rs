//! Token-aware content chunking
//!
//! Splits large content into chunks that fit within model context windows.
//! Uses tiktoken-rs for accurate token counting.
//!
//! # Design Philosophy
//!
//! - **Accurate token counting**: Use tiktoken-rs (same as OpenAI/Anthropic)
//! - **Boundary preservation**: Never split mid-sentence or mid-record
//! - **Optimal chunk size**: Calculate based on model context window
//! - **Two modes**: Text chunking (sentences) and record chunking (JSON arrays)

use tiktoken_rs::cl100k_base;

/// Token-aware chunker
///
/// Splits content into chunks that fit within a model's context window,
/// preserving natural boundaries (sentences for text, records for JSON).
pub struct Chunker {
    /// Model name for token counting and context-window lookup.
    pub(crate) model: String,

    /// Maximum tokens per chunk.
    pub(crate) max_tokens: usize,
}

impl Chunker {
    /// Create a new chunker. `max_tokens` of `None` calculates a usable
    /// budget from the model's context window: overhead (2000 tokens for
    /// system prompt + schema) and a 20% response buffer are subtracted.
    pub fn new(model: &str, max_tokens: Option<usize>) -> Self {
        let model = model.to_string();
        let max_tokens = max_tokens.unwrap_or_else(|| {
            let window = Self::context_window_for(&model);
            let overhead = 2_000;
            let response_buffer = window / 5;
            window.saturating_sub(overhead).saturating_sub(response_buffer).max(1)
        });
        Self { model, max_tokens }
    }

    /// Chunk text with sentence boundary preservation.
    pub fn chunk_text(&self, content: &str) -> Vec<String> {
        if self.estimate_tokens(content) <= self.max_tokens {
            return vec![content.to_string()];
        }

        let sentences: Vec<&str> = content
            .split_inclusive(['.', '!', '?'])
            .filter(|s| !s.trim().is_empty())
            .collect();

        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_tokens = 0;

        for sentence in sentences {
            let sentence_tokens = self.estimate_tokens(sentence);
            if current_tokens > 0 && current_tokens + sentence_tokens > self.max_tokens {
                chunks.push(std::mem::take(&mut current));
                current_tokens = 0;
            }
            current.push_str(sentence);
            current_tokens += sentence_tokens;
        }
        if !current.is_empty() {
            chunks.push(current);
        }

        chunks
    }

    /// Chunk JSON records, never splitting a record across chunks.
    pub fn chunk_records(&self, records: &[serde_json::Value]) -> Vec<Vec<serde_json::Value>> {
        if records.is_empty() {
            return Vec::new();
        }

        let sample_size = records.len().min(10);
        let total_tokens: usize = records[..sample_size]
            .iter()
            .map(|r| self.estimate_tokens(&r.to_string()))
            .sum();
        let avg_tokens_per_record = (total_tokens / sample_size).max(1);
        let records_per_chunk = (self.max_tokens / avg_tokens_per_record).max(1);

        records.chunks(records_per_chunk).map(|c| c.to_vec()).collect()
    }

    /// Estimate token count for content, falling back to a char/4 estimate
    /// if the model's tokenizer is unrecognized by tiktoken-rs.
    pub fn estimate_tokens(&self, content: &str) -> usize {
        match cl100k_base() {
            Ok(bpe) => bpe.encode_with_special_tokens(content).len(),
            Err(_) => (content.chars().count() / 4).max(1),
        }
    }

    fn context_window_for(model: &str) -> usize {
        match model {
            "claude-haiku-4-5" | "claude-sonnet-4-5" | "claude-opus-4" => 200_000,
            "gpt-4.1" | "gpt-4.1-turbo" => 128_000,
            _ => {
                tracing::warn!(model = %model, "unknown model context window, using 100k default");
                100_000
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_chunk_when_under_budget() {
        let chunker = Chunker { model: "claude-haiku-4-5".to_string(), max_tokens: 50_000 };
        let chunks = chunker.chunk_text("A short sentence. Another one.");
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn splits_on_sentence_boundaries_when_over_budget() {
        let chunker = Chunker { model: "claude-haiku-4-5".to_string(), max_tokens: 5 };
        let text = "First sentence here. Second sentence here. Third sentence here.";
        let chunks = chunker.chunk_text(text);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.trim_end().ends_with(['.', '!', '?']));
        }
    }

    #[test]
    fn chunk_records_respects_record_boundaries() {
        let chunker = Chunker { model: "claude-haiku-4-5".to_string(), max_tokens: 20 };
        let records: Vec<serde_json::Value> = (0..20).map(|i| serde_json::json!({"id": i})).collect();
        let chunks = chunker.chunk_records(&records);
        let total: usize = chunks.iter().map(|c| c.len()).sum();
        assert_eq!(total, 20);
        assert!(chunks.len() > 1);
    }

    #[test]
    fn chunk_records_empty_input() {
        let chunker = Chunker::new("claude-haiku-4-5", Some(1000));
        assert!(chunker.chunk_records(&[]).is_empty());
    }

    #[test]
    fn auto_calculates_max_tokens_from_context_window() {
        let chunker = Chunker::new("gpt-4.1", None);
        assert_eq!(chunker.max_tokens, 128_000 - 2_000 - 128_000 / 5);
    }
}
