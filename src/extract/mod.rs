//! Entity & Moment extractors (§4.6): LLM-mediated agents turning raw
//! Resource content into structured entities and moments, each a pure
//! `(content, context) -> structured output` function realized by
//! prompting [`crate::llm::LlmAdapter`] with a JSON Schema.
//!
//! Grounded in the teacher's `llm::query_builder::LlmQueryBuilder` (prompt
//! construction, schema-constrained parsing) and `llm::edge_builder`'s
//! typed-edge shape for how extracted entities become graph edges.

pub mod entity_extractor;
pub mod moment_extractor;

pub use entity_extractor::{apply_to_resource, entity_uuid, normalize_entity_id, EntityExtractor};
pub use moment_extractor::{ExtractedMoment, MomentExtractor};
