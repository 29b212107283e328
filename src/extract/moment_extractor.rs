//! Moment extractor (§4.6): turns a Resource's content into zero or more
//! [`Moment`]s bounded by the resource's own time range, validating each
//! one against §3 invariant (d) / §8 property 4 before it's kept.
//!
//! Long content is chunked through [`PaginatedRequest`] with
//! [`MergeStrategy::Concat`] (each chunk independently yields its own list
//! of moments — unlike entity extraction there's nothing to merge field-by-
//! field across chunks).

use crate::agents::{Chunker, MergeStrategy, PaginatedRequest};
use crate::error::Result;
use crate::llm::LlmAdapter;
use crate::types::entity::EntityMeta;
use crate::types::moment::{Moment, MomentType, MomentValidationIssue, PersonDescriptor, SpeakerDescriptor};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct RawMoment {
    name: String,
    moment_type: MomentType,
    #[serde(default)]
    summary: Option<String>,
    content: String,
    start_offset_seconds: i64,
    end_offset_seconds: i64,
    #[serde(default)]
    emotion_tags: Vec<String>,
    #[serde(default)]
    topic_tags: Vec<String>,
    #[serde(default)]
    present_persons: Vec<String>,
    #[serde(default)]
    speakers: Vec<RawSpeaker>,
    #[serde(default)]
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSpeaker {
    name: String,
    speaking_time_seconds: f64,
}

#[derive(Debug, Deserialize)]
struct RawChunkMoments {
    #[serde(default)]
    moments: Vec<RawMoment>,
}

fn output_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "moments": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": {"type": "string"},
                        "moment_type": {"type": "string", "enum": ["meeting", "conversation", "reflection", "planning", "observation"]},
                        "summary": {"type": "string"},
                        "content": {"type": "string"},
                        "start_offset_seconds": {"type": "integer"},
                        "end_offset_seconds": {"type": "integer"},
                        "emotion_tags": {"type": "array", "items": {"type": "string"}},
                        "topic_tags": {"type": "array", "items": {"type": "string"}},
                        "present_persons": {"type": "array", "items": {"type": "string"}},
                        "speakers": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "name": {"type": "string"},
                                    "speaking_time_seconds": {"type": "number"}
                                },
                                "required": ["name", "speaking_time_seconds"]
                            }
                        },
                        "location": {"type": "string"}
                    },
                    "required": ["name", "moment_type", "content", "start_offset_seconds", "end_offset_seconds"]
                }
            }
        },
        "required": ["moments"]
    })
}

fn system_prompt(resource_name: &str) -> String {
    format!(
        "Identify distinct temporal moments (meetings, conversations, \
         reflections, planning sessions, or observations) within this \
         content from \"{resource_name}\". For each, give a name, type, \
         summary, the verbatim content span, its start/end offset in \
         seconds from the beginning of the content, any emotion/topic tags, \
         who was present, who spoke and for how long, and a location if \
         mentioned."
    )
}

/// An extracted moment paired with the validation issues found on it.
/// Warnings (duration out of range) are attached but never block a write;
/// hard violations mean the caller should discard the moment.
pub struct ExtractedMoment {
    pub moment: Moment,
    pub issues: Vec<MomentValidationIssue>,
}

impl ExtractedMoment {
    pub fn is_valid(&self) -> bool {
        !Moment::has_hard_violation(&self.issues)
    }
}

pub struct MomentExtractor {
    paginator: PaginatedRequest,
}

impl MomentExtractor {
    pub fn new(llm: Arc<dyn LlmAdapter>, model: &str, context_window: Option<usize>) -> Self {
        Self { paginator: PaginatedRequest::new(llm, Chunker::new(model, context_window)) }
    }

    /// Extract moments from `content`, anchoring offsets to
    /// `resource_start`/`resource_end` and discarding nothing here — the
    /// caller decides what to do with `issues` (§4.6: warnings never
    /// reject, hard violations should).
    pub async fn extract(
        &self,
        tenant_id: &str,
        content: &str,
        resource_name: &str,
        resource_start: DateTime<Utc>,
        resource_end: DateTime<Utc>,
    ) -> Result<Vec<ExtractedMoment>> {
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let (value, _usage) = self
            .paginator
            .execute(&system_prompt(resource_name), content, &output_schema(), MergeStrategy::Concat, true)
            .await?;

        let chunk_results: Vec<RawChunkMoments> = match value {
            Value::Array(chunks) => chunks.into_iter().map(serde_json::from_value).collect::<std::result::Result<_, _>>()?,
            single => vec![serde_json::from_value(single)?],
        };

        let mut out = Vec::new();
        for chunk in chunk_results {
            for raw in chunk.moments {
                out.push(build_moment(tenant_id, raw, resource_start, resource_end));
            }
        }
        Ok(out)
    }
}

fn build_moment(
    tenant_id: &str,
    raw: RawMoment,
    resource_start: DateTime<Utc>,
    resource_end: DateTime<Utc>,
) -> ExtractedMoment {
    let start = resource_start + chrono::Duration::seconds(raw.start_offset_seconds.max(0));
    let end = resource_start + chrono::Duration::seconds(raw.end_offset_seconds.max(0));
    // Clamp to the owning resource's span: a moment can't outlive its source.
    let start = start.clamp(resource_start, resource_end);
    let end = end.clamp(resource_start, resource_end);

    let present_persons: HashMap<String, PersonDescriptor> = raw
        .present_persons
        .into_iter()
        .map(|name| (super::entity_extractor::normalize_entity_id(&name), PersonDescriptor { display_label: name }))
        .collect();

    let speakers: HashMap<String, SpeakerDescriptor> = raw
        .speakers
        .into_iter()
        .map(|s| {
            let key = super::entity_extractor::normalize_entity_id(&s.name);
            (key, SpeakerDescriptor { display_label: s.name, speaking_time_seconds: s.speaking_time_seconds })
        })
        .collect();

    let moment = Moment {
        meta: EntityMeta::new(tenant_id),
        name: raw.name,
        moment_type: raw.moment_type,
        summary: raw.summary,
        content: raw.content,
        resource_timestamp: start,
        resource_ends_timestamp: end,
        emotion_tags: raw.emotion_tags,
        topic_tags: raw.topic_tags,
        present_persons,
        speakers,
        location: raw.location,
    };

    let issues = moment.validate();
    ExtractedMoment { moment, issues }
}
