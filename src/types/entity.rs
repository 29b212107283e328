//! Graph edges and the system fields shared by every entity table.
//!
//! Adapted from the teacher's `InlineEdge`/`SystemFields` (percolate-rocks
//! `types::entity`): edges are still carried inline inside the owning
//! entity's JSON rather than a separate edge table — "cyclic graphs ...
//! inherently acyclic as stored" per §9 — but the shape now matches
//! spec §3's `graph_paths` exactly (`dst`, `rel_type`, `weight`,
//! `created_at`, `properties`) instead of the teacher's weight-less edge.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A directed, typed edge from the owning entity to another entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphEdge {
    pub dst: Uuid,
    pub rel_type: String,
    /// similarity score, confidence, or otherwise; spec §3 bounds it to
    /// [0,1] for affinity edges but leaves it open for LLM-proposed ones.
    pub weight: f32,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub properties: HashMap<String, serde_json::Value>,
}

impl GraphEdge {
    pub fn new(dst: Uuid, rel_type: impl Into<String>, weight: f32) -> Self {
        Self {
            dst,
            rel_type: rel_type.into(),
            weight,
            created_at: Utc::now(),
            properties: HashMap::new(),
        }
    }

    /// Edges are deduplicated on `(dst, rel_type)` — §4.7, §8 property 5.
    pub fn key(&self) -> (Uuid, String) {
        (self.dst, self.rel_type.clone())
    }
}

/// Merge a candidate edge into an existing edge set.
///
/// Replacement rule (§4.7): an edge with the same `(dst, rel_type)` is
/// replaced iff the new weight is higher; otherwise the existing edge is
/// kept untouched. This is the single chokepoint every writer (repository
/// upsert, affinity builder, LLM edge proposals) goes through so property 5
/// (idempotence, monotonically non-decreasing weights) holds regardless of
/// caller.
pub fn merge_edge(edges: &mut Vec<GraphEdge>, candidate: GraphEdge) {
    if let Some(existing) = edges
        .iter_mut()
        .find(|e| e.dst == candidate.dst && e.rel_type == candidate.rel_type)
    {
        if candidate.weight > existing.weight {
            *existing = candidate;
        }
    } else {
        edges.push(candidate);
    }
}

/// Fields every entity table carries regardless of its domain shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityMeta {
    pub id: Uuid,
    pub tenant_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub graph_paths: Vec<GraphEdge>,
}

impl EntityMeta {
    pub fn new(tenant_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.into(),
            created_at: now,
            updated_at: now,
            metadata: HashMap::new(),
            graph_paths: Vec::new(),
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
