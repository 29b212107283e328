//! Tenant Repository (§4.4): the facade every caller above storage uses. One
//! instance is bound to `(ModelDescriptor, tenant_id)` for the lifetime of a
//! request and fans an upsert out across SQL rows, embeddings, and the
//! reverse index — "eventually consistent with self-healing", per §4.4,
//! rather than cross-substrate atomic: if the embedding write fails after
//! the row write succeeds, the row still exists and a later upsert retry
//! fixes the embedding without corrupting anything already readable.

pub mod session;

pub use session::MessageCompressor;

use crate::config::TenantContext;
use crate::embeddings::EmbeddingService;
use crate::error::{RemError, Result};
use crate::reverse_index::ReverseIndex;
use crate::storage::provider::{FilterExpr, OrderBy};
use crate::storage::StorageProvider;
use crate::types::{EmbeddingRecord, ModelDescriptor};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

pub struct TenantRepository {
    storage: Arc<dyn StorageProvider>,
    embeddings: Arc<EmbeddingService>,
    reverse_index: ReverseIndex,
}

impl TenantRepository {
    pub fn new(storage: Arc<dyn StorageProvider>, embeddings: Arc<EmbeddingService>) -> Self {
        let reverse_index = ReverseIndex::new(storage.clone());
        Self { storage, embeddings, reverse_index }
    }

    pub async fn register_model(&self, descriptor: ModelDescriptor) -> Result<()> {
        self.storage.register_schema(descriptor).await
    }

    /// Upserts one JSON row into `table`. `row` must already carry `id` and
    /// `tenant_id` matching `ctx`; this is the tenant-isolation chokepoint
    /// every write in the crate funnels through (§8 property 1).
    pub async fn upsert(&self, ctx: &TenantContext, table: &str, mut row: Value) -> Result<Uuid> {
        if !ctx.is_valid() {
            return Err(RemError::TenantMissing);
        }

        let descriptor = self.storage.schema(table)?;
        let id = row
            .get(&descriptor.primary_key_field)
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        row[descriptor.primary_key_field.clone()] = Value::String(id.to_string());
        row["tenant_id"] = Value::String(ctx.tenant_id.clone());

        if row.get("tenant_id").and_then(Value::as_str) != Some(ctx.tenant_id.as_str()) {
            return Err(RemError::TenantMissing);
        }

        self.storage.put_row(table, id, row.clone()).await?;

        for field_spec in &descriptor.embedding_fields {
            let Some(text) = row.get(&field_spec.field_name).and_then(Value::as_str) else { continue };
            if text.is_empty() {
                continue;
            }
            let existing = self.storage.get_embedding(table, id, &field_spec.field_name).await?;
            let expected_dim = existing.as_ref().map(|e| e.vector_dimension);
            let vector = self.embeddings.embed(&field_spec.provider_id, text, expected_dim).await?;
            let record = EmbeddingRecord::new(id, field_spec.field_name.clone(), field_spec.provider_id.clone(), vector, ctx.tenant_id.clone());
            self.storage.put_embedding(table, record).await?;
        }

        for nameable_field in &descriptor.nameable_fields {
            if let Some(name) = row.get(nameable_field).and_then(Value::as_str) {
                self.reverse_index.put(&ctx.tenant_id, name, id, &descriptor.entity_type, table).await?;
            }
        }

        Ok(id)
    }

    pub async fn get(&self, ctx: &TenantContext, table: &str, id: Uuid) -> Result<Option<Value>> {
        let row = self.storage.get_row(table, id).await?;
        Ok(row.filter(|r| r.get("tenant_id").and_then(Value::as_str) == Some(ctx.tenant_id.as_str())))
    }

    pub async fn select(
        &self,
        ctx: &TenantContext,
        table: &str,
        filter: Option<&FilterExpr>,
        order_by: &[OrderBy],
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Value>> {
        self.storage.scan_rows(table, &ctx.tenant_id, filter, order_by, limit, offset).await
    }

    pub async fn delete(&self, ctx: &TenantContext, table: &str, id: Uuid) -> Result<()> {
        let existing = self.get(ctx, table, id).await?;
        if existing.is_none() {
            return Err(RemError::NotFound(format!("{table}:{id}")));
        }
        self.storage.delete_row(table, id).await
    }

    pub fn reverse_index(&self) -> &ReverseIndex {
        &self.reverse_index
    }

    pub fn storage(&self) -> &Arc<dyn StorageProvider> {
        &self.storage
    }

    pub fn embeddings(&self) -> &Arc<EmbeddingService> {
        &self.embeddings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::EmbeddingProvider;
    use crate::storage::RocksStorage;
    use crate::types::EmbeddingFieldSpec;
    use async_trait::async_trait;

    struct FixedEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FixedEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(vec![text.len() as f32, 1.0, 0.0])
        }
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let mut out = Vec::new();
            for t in texts {
                out.push(self.embed(t).await?);
            }
            Ok(out)
        }
        fn dimensions(&self) -> usize {
            3
        }
        fn provider_id(&self) -> &str {
            "default"
        }
    }

    async fn test_repo() -> TenantRepository {
        let dir = tempfile::tempdir().unwrap();
        let storage: Arc<dyn StorageProvider> = Arc::new(RocksStorage::open(dir.path()).await.unwrap());
        std::mem::forget(dir);

        let mut embeddings = EmbeddingService::new();
        embeddings.register(Arc::new(FixedEmbedder));

        let repo = TenantRepository::new(storage, Arc::new(embeddings));
        repo.register_model(ModelDescriptor {
            table_name: "resources".to_string(),
            primary_key_field: "id".to_string(),
            embedding_fields: vec![EmbeddingFieldSpec { field_name: "content".to_string(), provider_id: "default".to_string() }],
            nameable_fields: vec!["name".to_string()],
            tenant_isolated: true,
            entity_type: "resource".to_string(),
        })
        .await
        .unwrap();
        repo
    }

    #[tokio::test]
    async fn upsert_populates_row_embedding_and_reverse_index() {
        let repo = test_repo().await;
        let ctx = TenantContext::new("tenant-a", "user-1");

        let id = repo
            .upsert(&ctx, "resources", serde_json::json!({"name": "my-project-alpha", "content": "hello world"}))
            .await
            .unwrap();

        let row = repo.get(&ctx, "resources", id).await.unwrap().unwrap();
        assert_eq!(row["name"], "my-project-alpha");

        let embedding = repo.storage().get_embedding("resources", id, "content").await.unwrap();
        assert!(embedding.is_some());

        let hits = repo.reverse_index().lookup(&ctx.tenant_id, "my-project-alpha", 10).await.unwrap();
        assert_eq!(hits[0].entity_id, id);
    }

    #[tokio::test]
    async fn rejects_upsert_without_tenant() {
        let repo = test_repo().await;
        let ctx = TenantContext::new("", "user-1");
        let err = repo.upsert(&ctx, "resources", serde_json::json!({"name": "x", "content": "y"})).await.unwrap_err();
        assert!(matches!(err, RemError::TenantMissing));
    }

    #[tokio::test]
    async fn get_hides_rows_from_other_tenants() {
        let repo = test_repo().await;
        let ctx_a = TenantContext::new("tenant-a", "user-1");
        let ctx_b = TenantContext::new("tenant-b", "user-2");

        let id = repo.upsert(&ctx_a, "resources", serde_json::json!({"name": "x", "content": "y"})).await.unwrap();
        assert!(repo.get(&ctx_b, "resources", id).await.unwrap().is_none());
        assert!(repo.get(&ctx_a, "resources", id).await.unwrap().is_some());
    }
}
