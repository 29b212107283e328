//! Entity extractor (§4.6): `(content, context) -> Vec<EntityDescriptor>`,
//! normalized and mirrored onto a [`Resource`]'s `graph_paths` as `mentions`
//! edges.
//!
//! Grounded in the teacher's `llm::query_builder::LlmQueryBuilder` (prompt +
//! schema + structured parse, now retargeted at [`crate::llm::LlmAdapter`]
//! instead of a bespoke OpenAI/Anthropic dispatch) and
//! `llm::edge_builder::EdgeSpec` for the mirrored-edge shape. Long content is
//! chunked through [`PaginatedRequest`] per SPEC_FULL.md's extractor
//! chunking supplement.

use crate::agents::{Chunker, MergeStrategy, PaginatedRequest};
use crate::error::Result;
use crate::llm::LlmAdapter;
use crate::types::entity::{merge_edge, GraphEdge};
use crate::types::resource::{EntityDescriptor, EntityKind, Resource};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

/// Entities mentioned below this confidence are discarded entirely (§4.6).
const MIN_CONFIDENCE: f32 = 0.3;

/// Fixed namespace used to derive a stable `Uuid` for an extracted entity
/// that has no row of its own — `graph_paths` edges need a `dst: Uuid`
/// (§3), but entities are a union noun (Person/Organization/...), not a
/// stored table (§9 glossary). The same `(tenant_id, entity_id)` pair always
/// maps to the same `Uuid`, so repeated extraction passes converge onto the
/// same edge per §4.7/§8 property 5 instead of growing duplicates.
const MENTION_NAMESPACE: Uuid = Uuid::from_bytes([
    0x70, 0x38, 0x66, 0x73, 0x2d, 0x6d, 0x65, 0x6e, 0x74, 0x69, 0x6f, 0x6e, 0x73, 0x00, 0x00, 0x01,
]);

/// Deterministic `Uuid` for an extracted entity, stable across extraction
/// passes and tenants.
pub fn entity_uuid(tenant_id: &str, entity_id: &str) -> Uuid {
    Uuid::new_v5(&MENTION_NAMESPACE, format!("{tenant_id}/{entity_id}").as_bytes())
}

/// Normalize an entity id: lowercase, non-alphanumerics to `-`, collapse
/// runs of `-`, trim leading/trailing `-` (spec.md line 130, verified by S3
/// line 238).
pub fn normalize_entity_id(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_was_sep = false;
    for c in raw.to_lowercase().chars() {
        if c.is_alphanumeric() {
            out.push(c);
            last_was_sep = false;
        } else if !last_was_sep {
            out.push('-');
            last_was_sep = true;
        }
    }
    out.trim_matches('-').to_string()
}

#[derive(Debug, Deserialize)]
struct RawEntity {
    entity_id: String,
    entity_type: EntityKind,
    entity_name: String,
    #[serde(default)]
    context: String,
    confidence: f32,
}

#[derive(Debug, Deserialize)]
struct RawEntityBatch {
    #[serde(default)]
    entities: Vec<RawEntity>,
}

/// Normalize and confidence-filter one LLM completion's raw entity list.
/// Shared by [`EntityExtractor::extract`] and the dreaming worker's batch
/// mode, which parses a `batch_poll` result the same way outside any
/// [`PaginatedRequest`] chunking.
pub(crate) fn parse_entities(value: Value) -> Result<Vec<EntityDescriptor>> {
    let batch: RawEntityBatch = serde_json::from_value(value)?;
    Ok(batch
        .entities
        .into_iter()
        .map(|raw| {
            let source = if raw.entity_id.trim().is_empty() { &raw.entity_name } else { &raw.entity_id };
            let entity_id = normalize_entity_id(source);
            EntityDescriptor {
                entity_id,
                entity_type: raw.entity_type,
                entity_name: raw.entity_name,
                context: raw.context,
                confidence: raw.confidence,
            }
        })
        .filter(|e| e.confidence >= MIN_CONFIDENCE)
        .collect())
}

pub(crate) fn output_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "entities": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "entity_id": {"type": "string"},
                        "entity_type": {"type": "string", "enum": ["Person", "Organization", "Project", "Concept", "Location"]},
                        "entity_name": {"type": "string"},
                        "context": {"type": "string"},
                        "confidence": {"type": "number"}
                    },
                    "required": ["entity_id", "entity_type", "entity_name", "confidence"]
                }
            }
        },
        "required": ["entities"]
    })
}

pub(crate) fn system_prompt(context: &str) -> String {
    format!(
        "Extract every named person, organization, project, concept, and \
         location mentioned in the content. For each, give a short id \
         derived from its name, its type, the display name, a brief quote \
         of surrounding context, and a confidence from 0 to 1. Additional \
         context about this content: {context}"
    )
}

pub struct EntityExtractor {
    paginator: PaginatedRequest,
}

impl EntityExtractor {
    pub fn new(llm: Arc<dyn LlmAdapter>, model: &str, context_window: Option<usize>) -> Self {
        Self { paginator: PaginatedRequest::new(llm, Chunker::new(model, context_window)) }
    }

    /// Run extraction over `content`, chunking if it exceeds one context
    /// window, normalizing every `entity_id`, and discarding anything below
    /// [`MIN_CONFIDENCE`].
    pub async fn extract(&self, content: &str, context: &str) -> Result<Vec<EntityDescriptor>> {
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let (value, _usage) = self
            .paginator
            .execute(&system_prompt(context), content, &output_schema(), MergeStrategy::Merge, true)
            .await?;

        parse_entities(value)
    }

    /// Extract and write the result onto `resource`: `related_entities` is
    /// replaced, and each entity is mirrored as a `mentions` edge in
    /// `graph_paths` via [`merge_edge`] (§4.6).
    pub async fn extract_into(&self, resource: &mut Resource) -> Result<()> {
        let entities = self.extract(&resource.content, &resource.name).await?;
        apply_to_resource(resource, entities);
        Ok(())
    }
}

/// Assign `entities` to `resource.related_entities` and mirror each as a
/// `mentions` edge, deduplicated via [`merge_edge`]'s replace-iff-higher-
/// weight rule (weight = extraction confidence).
pub fn apply_to_resource(resource: &mut Resource, entities: Vec<EntityDescriptor>) {
    for entity in &entities {
        let dst = entity_uuid(&resource.meta.tenant_id, &entity.entity_id);
        merge_edge(&mut resource.meta.graph_paths, GraphEdge::new(dst, "mentions", entity.confidence));
    }
    resource.related_entities = entities;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_per_s3_worked_example() {
        assert_eq!(normalize_entity_id("John Smith"), "john-smith");
        assert_eq!(normalize_entity_id("Sarah Chen"), "sarah-chen");
        assert_eq!(normalize_entity_id("Mike Johnson"), "mike-johnson");
        assert_eq!(normalize_entity_id("Project Alpha"), "project-alpha");
        assert_eq!(normalize_entity_id("Acme Corp"), "acme-corp");
    }

    #[test]
    fn collapses_punctuation_runs_and_trims_edges() {
        assert_eq!(normalize_entity_id("  --Dr. O'Brien!!--  "), "dr-o-brien");
        assert_eq!(normalize_entity_id("R2-D2"), "r2-d2");
    }

    #[test]
    fn entity_uuid_is_stable_across_calls() {
        let a = entity_uuid("tenant-1", "acme-corp");
        let b = entity_uuid("tenant-1", "acme-corp");
        assert_eq!(a, b);
        let c = entity_uuid("tenant-2", "acme-corp");
        assert_ne!(a, c);
    }

    #[test]
    fn apply_to_resource_mirrors_mentions_edges_and_filters_low_confidence() {
        let mut resource = Resource::new("tenant-1", "meeting notes", "...");
        let entities = vec![
            EntityDescriptor {
                entity_id: "acme-corp".into(),
                entity_type: EntityKind::Organization,
                entity_name: "Acme Corp".into(),
                context: "discussed with Acme Corp".into(),
                confidence: 0.9,
            },
            EntityDescriptor {
                entity_id: "maybe-noise".into(),
                entity_type: EntityKind::Concept,
                entity_name: "maybe noise".into(),
                context: "".into(),
                confidence: 0.1,
            },
        ];
        // Caller is expected to have already filtered by MIN_CONFIDENCE
        // (extract() does this); apply_to_resource mirrors whatever it's given.
        let filtered: Vec<_> = entities.into_iter().filter(|e| e.confidence >= MIN_CONFIDENCE).collect();
        assert_eq!(filtered.len(), 1);

        apply_to_resource(&mut resource, filtered);
        assert_eq!(resource.related_entities.len(), 1);
        assert_eq!(resource.meta.graph_paths.len(), 1);
        assert_eq!(resource.meta.graph_paths[0].rel_type, "mentions");
        assert_eq!(resource.meta.graph_paths[0].dst, entity_uuid("tenant-1", "acme-corp"));
    }
}
