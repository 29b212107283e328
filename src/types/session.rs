//! Session — a conversation thread (§3), with message compression metadata
//! (§4.4's `repository::session` owns the compression logic itself; this
//! module only defines the shape).

use super::entity::EntityMeta;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub thread_id: String,
    pub userid: String,
    pub query: Option<String>,
    pub agent: Option<String>,
    pub session_type: Option<String>,
    pub moment_id: Option<Uuid>,
}

/// One message inside `Session.metadata["messages"]`. Plain (uncompressed)
/// until `MessageCompressor` rewrites it in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub _compressed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _entity_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _original_length: Option<usize>,
}

impl Message {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            timestamp: Some(chrono::Utc::now()),
            _compressed: false,
            _entity_key: None,
            _original_length: None,
        }
    }
}

impl Session {
    pub fn new(tenant_id: impl Into<String>, thread_id: impl Into<String>, userid: impl Into<String>) -> Self {
        Self {
            meta: EntityMeta::new(tenant_id),
            thread_id: thread_id.into(),
            userid: userid.into(),
            query: None,
            agent: None,
            session_type: None,
            moment_id: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.meta.id
    }
}
