//! Resource — the atom (§3).

use super::entity::EntityMeta;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An extracted entity descriptor attached to a Resource's `related_entities`
/// (§4.6's entity extractor output, normalized).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityDescriptor {
    pub entity_id: String,
    pub entity_type: EntityKind,
    pub entity_name: String,
    pub context: String,
    pub confidence: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum EntityKind {
    Person,
    Organization,
    Project,
    Concept,
    Location,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub name: String,
    pub category: Option<String>,
    pub content: String,
    pub summary: Option<String>,
    pub uri: Option<String>,
    pub resource_type: Option<String>,
    pub resource_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub related_entities: Vec<EntityDescriptor>,
}

impl Resource {
    pub fn new(tenant_id: impl Into<String>, name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            meta: EntityMeta::new(tenant_id),
            name: name.into(),
            category: None,
            content: content.into(),
            summary: None,
            uri: None,
            resource_type: None,
            resource_timestamp: None,
            related_entities: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.meta.id
    }
}
