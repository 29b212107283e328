//! Built-in model registration (§3): `Resource`, `Moment`, `Session`,
//! `Image`, `UserContext`. Adapted from the teacher's JSON-Schema-based
//! `register_builtin_schemas` — same idea, `embedding_fields` /
//! `indexed_fields` / `key_field` per table — but expressed as
//! [`ModelDescriptor`] values against [`StorageProvider::register_schema`]
//! instead of a `SchemaRegistry` + raw JSON Schema (the teacher's `resources`
//! is one chunk of a larger document; here `Resource` is this crate's own
//! canonical atom, so the shape differs even though the registration
//! mechanics are the same).

use crate::error::Result;
use crate::storage::StorageProvider;
use crate::types::{EmbeddingFieldSpec, ModelDescriptor};

pub async fn register_builtin_models(storage: &dyn StorageProvider) -> Result<()> {
    storage.register_schema(resource_descriptor()).await?;
    storage.register_schema(moment_descriptor()).await?;
    storage.register_schema(session_descriptor()).await?;
    storage.register_schema(image_descriptor()).await?;
    storage.register_schema(user_context_descriptor()).await?;
    Ok(())
}

fn resource_descriptor() -> ModelDescriptor {
    ModelDescriptor {
        table_name: "resources".to_string(),
        primary_key_field: "id".to_string(),
        embedding_fields: vec![
            EmbeddingFieldSpec { field_name: "content".to_string(), provider_id: "default".to_string() },
            EmbeddingFieldSpec { field_name: "summary".to_string(), provider_id: "default".to_string() },
        ],
        nameable_fields: vec!["name".to_string()],
        tenant_isolated: true,
        entity_type: "resource".to_string(),
    }
}

fn moment_descriptor() -> ModelDescriptor {
    ModelDescriptor {
        table_name: "moments".to_string(),
        primary_key_field: "id".to_string(),
        embedding_fields: vec![
            EmbeddingFieldSpec { field_name: "content".to_string(), provider_id: "default".to_string() },
        ],
        nameable_fields: vec!["name".to_string()],
        tenant_isolated: true,
        entity_type: "moment".to_string(),
    }
}

fn session_descriptor() -> ModelDescriptor {
    ModelDescriptor {
        table_name: "sessions".to_string(),
        primary_key_field: "id".to_string(),
        // Sessions are never embedded directly — their content lives in
        // per-message KV sidecars (§4.4), not a single embeddable field.
        embedding_fields: vec![],
        nameable_fields: vec!["thread_id".to_string()],
        tenant_isolated: true,
        entity_type: "session".to_string(),
    }
}

fn image_descriptor() -> ModelDescriptor {
    ModelDescriptor {
        table_name: "images".to_string(),
        primary_key_field: "id".to_string(),
        embedding_fields: vec![
            EmbeddingFieldSpec { field_name: "uri".to_string(), provider_id: "default-image".to_string() },
        ],
        nameable_fields: vec!["name".to_string()],
        tenant_isolated: true,
        entity_type: "image".to_string(),
    }
}

fn user_context_descriptor() -> ModelDescriptor {
    ModelDescriptor {
        table_name: "user_contexts".to_string(),
        primary_key_field: "id".to_string(),
        embedding_fields: vec![],
        nameable_fields: vec![],
        tenant_isolated: true,
        entity_type: "user_context".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptors_agree_on_primary_key_field() {
        for descriptor in [resource_descriptor(), moment_descriptor(), session_descriptor(), image_descriptor(), user_context_descriptor()] {
            assert_eq!(descriptor.primary_key_field, "id");
            assert!(descriptor.tenant_isolated);
        }
    }
}
