//! `ModelDescriptor` — data, not reflection (§9).
//!
//! Every model the Tenant Repository manages (Resource, Moment, Session,
//! Image, UserContext, and any caller-defined model) is described by one of
//! these instead of being discovered by introspecting a class hierarchy.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingFieldSpec {
    /// Source field on the model whose text is embedded.
    pub field_name: String,
    /// Provider id looked up in `RemConfig::providers`.
    pub provider_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Table name (also the RocksDB column family name).
    pub table_name: String,
    /// Name of the primary-key field (always `id` for built-ins).
    pub primary_key_field: String,
    /// Fields embedded on upsert, and which provider backs each.
    pub embedding_fields: Vec<EmbeddingFieldSpec>,
    /// Fields the Reverse Key Index should mirror into KV on upsert.
    pub nameable_fields: Vec<String>,
    /// Every row must carry `tenant_id`; always true for this crate's models,
    /// kept explicit because spec.md calls it out as a per-model flag.
    pub tenant_isolated: bool,
    /// Entity type tag written into reverse-index entries
    /// (`resource`, `moment`, `session`, `image`, ...).
    pub entity_type: String,
}

impl ModelDescriptor {
    pub fn embedding_table(&self) -> String {
        format!("embeddings.{}", self.table_name)
    }

    pub fn embedding_field_spec(&self, field_name: &str) -> Option<&EmbeddingFieldSpec> {
        self.embedding_fields
            .iter()
            .find(|f| f.field_name == field_name)
    }
}
