//! Image (§3).

use super::entity::EntityMeta;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub name: String,
    pub uri: String,
    pub caption: Option<String>,
    pub source: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub mime_type: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Image {
    pub fn new(tenant_id: impl Into<String>, name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            meta: EntityMeta::new(tenant_id),
            name: name.into(),
            uri: uri.into(),
            caption: None,
            source: None,
            width: None,
            height: None,
            mime_type: None,
            tags: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.meta.id
    }
}
