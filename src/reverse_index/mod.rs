//! Tenant-aware reverse key index (§4.2): a KV mirror of every nameable
//! field so `REM LOOKUP <name>` resolves without knowing which table the
//! name lives in. Grounded in `original_source`'s
//! `test_tenant_aware_reverse_lookup.py`, which fixes the exact key format
//! this module reproduces (`types::kv::ReverseNameEntry::key`).

use crate::error::{RemError, Result};
use crate::storage::provider::FilterExpr;
use crate::storage::StorageProvider;
use crate::types::{KvEntry, ReverseNameEntry};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

pub struct ReverseIndex {
    storage: Arc<dyn StorageProvider>,
}

impl ReverseIndex {
    pub fn new(storage: Arc<dyn StorageProvider>) -> Self {
        Self { storage }
    }

    /// Mirrors one nameable field into the KV substrate. Called by the
    /// repository on every upsert for each of the model's `nameable_fields`
    /// (§4.4) — idempotent, so re-running an upsert just overwrites the same
    /// key with the same value.
    pub async fn put(&self, tenant_id: &str, name: &str, entity_id: Uuid, entity_type: &str, table_name: &str) -> Result<()> {
        let key = ReverseNameEntry::key(tenant_id, name, entity_type);
        let entry = ReverseNameEntry {
            entity_id,
            entity_type: entity_type.to_string(),
            table_name: table_name.to_string(),
            tenant_id: tenant_id.to_string(),
        };
        let value = serde_json::to_value(&entry)?;
        self.storage.kv_put(KvEntry::new(key, value, None)).await
    }

    /// Exact lookup when the caller already knows the entity type.
    pub async fn lookup_typed(&self, tenant_id: &str, name: &str, entity_type: &str) -> Result<Option<ReverseNameEntry>> {
        let key = ReverseNameEntry::key(tenant_id, name, entity_type);
        match self.storage.kv_get(&key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Type-agnostic LOOKUP (§4.2): scans the `"{tenant}/{name}/"` KV
    /// prefix for every entity type registered under this name. On a KV
    /// miss, falls back to a SQL scan across every nameable field in every
    /// registered table and self-heals by writing back whatever it finds,
    /// so the next LOOKUP for the same name is a pure KV hit.
    pub async fn lookup(&self, tenant_id: &str, name: &str, scan_limit: usize) -> Result<Vec<ReverseNameEntry>> {
        let prefix = ReverseNameEntry::scan_prefix(tenant_id, name);
        let hits = self.storage.kv_scan_prefix(&prefix, scan_limit).await?;

        if !hits.is_empty() {
            return hits
                .into_iter()
                .map(|(_, value)| Ok(serde_json::from_value(value)?))
                .collect();
        }

        self.self_heal(tenant_id, name, scan_limit).await
    }

    async fn self_heal(&self, tenant_id: &str, name: &str, scan_limit: usize) -> Result<Vec<ReverseNameEntry>> {
        let mut found = Vec::new();

        for descriptor in self.storage.list_schemas() {
            if descriptor.nameable_fields.is_empty() {
                continue;
            }

            for field in &descriptor.nameable_fields {
                let filter = FilterExpr::eq(field, Value::String(name.to_string()));
                let rows = self.storage.scan_rows(&descriptor.table_name, tenant_id, Some(&filter), &[], scan_limit, 0).await?;

                for row in rows {
                    let Some(id_str) = row.get("id").and_then(Value::as_str) else { continue };
                    let Ok(entity_id) = Uuid::parse_str(id_str) else { continue };

                    self.put(tenant_id, name, entity_id, &descriptor.entity_type, &descriptor.table_name).await?;
                    found.push(ReverseNameEntry {
                        entity_id,
                        entity_type: descriptor.entity_type.clone(),
                        table_name: descriptor.table_name.clone(),
                        tenant_id: tenant_id.to_string(),
                    });
                }
            }
        }

        if found.is_empty() {
            return Err(RemError::NotFound(format!("no entity named '{name}' for tenant '{tenant_id}'")));
        }

        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::RocksStorage;
    use crate::types::{EmbeddingFieldSpec, ModelDescriptor};

    async fn test_storage() -> Arc<dyn StorageProvider> {
        let dir = tempfile::tempdir().unwrap();
        let storage = RocksStorage::open(dir.path()).await.unwrap();
        std::mem::forget(dir);
        Arc::new(storage)
    }

    fn resource_model() -> ModelDescriptor {
        ModelDescriptor {
            table_name: "resources".to_string(),
            primary_key_field: "id".to_string(),
            embedding_fields: vec![EmbeddingFieldSpec { field_name: "content".to_string(), provider_id: "default".to_string() }],
            nameable_fields: vec!["name".to_string()],
            tenant_isolated: true,
            entity_type: "resource".to_string(),
        }
    }

    #[tokio::test]
    async fn put_then_lookup_round_trips() {
        let storage = test_storage().await;
        storage.register_schema(resource_model()).await.unwrap();
        let index = ReverseIndex::new(storage);

        let id = Uuid::new_v4();
        index.put("tenant-a", "my-project-alpha", id, "resource", "resources").await.unwrap();

        let hits = index.lookup("tenant-a", "my-project-alpha", 100).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entity_id, id);
    }

    #[tokio::test]
    async fn tenants_are_isolated() {
        let storage = test_storage().await;
        storage.register_schema(resource_model()).await.unwrap();
        let index = ReverseIndex::new(storage);

        index.put("tenant-a", "my-project-alpha", Uuid::new_v4(), "resource", "resources").await.unwrap();

        let err = index.lookup("tenant-b", "my-project-alpha", 100).await.unwrap_err();
        assert!(matches!(err, RemError::NotFound(_)));
    }

    #[tokio::test]
    async fn kv_miss_self_heals_from_sql_scan() {
        let storage = test_storage().await;
        storage.register_schema(resource_model()).await.unwrap();

        let id = Uuid::new_v4();
        let row = serde_json::json!({"id": id.to_string(), "tenant_id": "tenant-a", "name": "my-project-alpha", "content": "x"});
        storage.put_row("resources", id, row).await.unwrap();

        let index = ReverseIndex::new(storage.clone());
        let hits = index.lookup("tenant-a", "my-project-alpha", 100).await.unwrap();
        assert_eq!(hits[0].entity_id, id);

        // Self-heal wrote the KV entry back; a second lookup must not rescan SQL.
        let direct = storage.kv_get(&ReverseNameEntry::key("tenant-a", "my-project-alpha", "resource")).await.unwrap();
        assert!(direct.is_some());
    }
}
