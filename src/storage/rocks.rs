//! RocksDB-backed [`StorageProvider`]. One column family per table, a
//! parallel `embeddings.{table}` column family for that table's vectors, a
//! `__kv` column family for the key-value substrate, and a `__schemas`
//! column family holding registered [`ModelDescriptor`]s.
//!
//! This plays the role the original system split across a networked SQL
//! engine and a networked KV store (§6's redesign note): one embedded
//! engine, two kinds of column family, same contract.

use super::cache::SchemaCache;
use super::provider::{sort_rows, FilterExpr, OrderBy, StorageProvider, VectorHit};
use crate::error::{RemError, Result};
use crate::otel::db::{db_span, record_db_metrics, DbOperation};
use crate::types::{cosine_similarity, EmbeddingRecord, KvEntry, ModelDescriptor};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use rocksdb::{ColumnFamilyDescriptor, IteratorMode, Options, DB};
use serde_json::Value;
use std::path::Path;
use std::sync::RwLock;
use uuid::Uuid;

const SCHEMAS_CF: &str = "__schemas";
const KV_CF: &str = "__kv";

fn embeddings_cf(table: &str) -> String {
    format!("embeddings.{table}")
}

pub struct RocksStorage {
    db: DB,
    schemas: SchemaCache,
    /// Protects column-family creation so two concurrent `register_schema`
    /// calls for the same table don't race on `create_cf`.
    cf_lock: RwLock<()>,
}

impl RocksStorage {
    /// Opens (or creates) the database at `path`, connecting with bounded
    /// exponential backoff: a concurrent process holding the RocksDB lock
    /// file is a transient condition worth retrying, not a hard failure.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut delay_ms = 50u64;
        let mut last_err = None;
        for attempt in 0..6 {
            match Self::open_once(&path) {
                Ok(storage) => return Ok(storage),
                Err(e) => {
                    last_err = Some(e);
                    if attempt < 5 {
                        tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
                        delay_ms = (delay_ms * 2).min(2_000);
                    }
                }
            }
        }
        Err(last_err.unwrap_or_else(|| RemError::InternalQueryError("rocksdb open failed".into())))
    }

    fn open_once(path: &Path) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let existing_cfs = DB::list_cf(&opts, path).unwrap_or_default();
        let mut cf_names: Vec<String> = existing_cfs
            .into_iter()
            .filter(|n| n != "default")
            .collect();
        for required in [SCHEMAS_CF, KV_CF] {
            if !cf_names.iter().any(|n| n == required) {
                cf_names.push(required.to_string());
            }
        }

        let descriptors: Vec<ColumnFamilyDescriptor> = cf_names
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        let storage = Self {
            db,
            schemas: SchemaCache::new(256),
            cf_lock: RwLock::new(()),
        };
        storage.warm_schema_cache()?;
        Ok(storage)
    }

    fn warm_schema_cache(&self) -> Result<()> {
        let cf = self.db.cf_handle(SCHEMAS_CF).ok_or_else(|| RemError::InternalQueryError("missing __schemas cf".into()))?;
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item?;
            let descriptor: ModelDescriptor = serde_json::from_slice(&value)?;
            self.schemas.put(descriptor.table_name.clone(), descriptor);
        }
        Ok(())
    }

    fn ensure_cf(&self, name: &str) -> Result<()> {
        if self.db.cf_handle(name).is_some() {
            return Ok(());
        }
        let _guard = self.cf_lock.write().unwrap();
        if self.db.cf_handle(name).is_none() {
            self.db.create_cf(name, &Options::default())?;
        }
        Ok(())
    }

    fn cf(&self, name: &str) -> Result<std::sync::Arc<rocksdb::BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| RemError::UnknownTable(name.to_string()))
    }
}

#[async_trait]
impl StorageProvider for RocksStorage {
    async fn register_schema(&self, descriptor: ModelDescriptor) -> Result<()> {
        let _span = db_span(DbOperation::Put, Some(&descriptor.table_name), None).entered();
        self.ensure_cf(&descriptor.table_name)?;
        self.ensure_cf(&embeddings_cf(&descriptor.table_name))?;

        let cf = self.cf(SCHEMAS_CF)?;
        let bytes = serde_json::to_vec(&descriptor)?;
        self.db.put_cf(&cf, descriptor.table_name.as_bytes(), bytes)?;
        self.schemas.put(descriptor.table_name.clone(), descriptor);
        Ok(())
    }

    fn schema(&self, table_name: &str) -> Result<ModelDescriptor> {
        self.schemas
            .get(table_name)
            .ok_or_else(|| RemError::UnknownTable(table_name.to_string()))
    }

    fn list_schemas(&self) -> Vec<ModelDescriptor> {
        self.schemas.all()
    }

    async fn put_row(&self, table: &str, id: Uuid, row: Value) -> Result<()> {
        let _span = db_span(DbOperation::Put, Some(table), None).entered();
        let cf = self.cf(table)?;
        let bytes = serde_json::to_vec(&row)?;
        self.db.put_cf(&cf, id.as_bytes(), bytes)?;
        Ok(())
    }

    async fn get_row(&self, table: &str, id: Uuid) -> Result<Option<Value>> {
        let _span = db_span(DbOperation::Get, Some(table), None).entered();
        let cf = self.cf(table)?;
        match self.db.get_cf(&cf, id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn get_rows(&self, table: &str, ids: &[Uuid]) -> Result<Vec<Option<Value>>> {
        let cf = self.cf(table)?;
        let keys: Vec<&[u8]> = ids.iter().map(|id| id.as_bytes().as_slice()).collect();
        let results = self.db.batched_multi_get_cf(&cf, &keys, false);
        results
            .into_iter()
            .map(|r| match r?.as_deref() {
                Some(bytes) => Ok(Some(serde_json::from_slice(bytes)?)),
                None => Ok(None),
            })
            .collect()
    }

    async fn delete_row(&self, table: &str, id: Uuid) -> Result<()> {
        let _span = db_span(DbOperation::Delete, Some(table), None).entered();
        let cf = self.cf(table)?;
        self.db.delete_cf(&cf, id.as_bytes())?;
        Ok(())
    }

    async fn scan_rows(
        &self,
        table: &str,
        tenant_id: &str,
        filter: Option<&FilterExpr>,
        order_by: &[OrderBy],
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Value>> {
        let span = db_span(DbOperation::Scan, Some(table), Some(tenant_id)).entered();
        let cf = self.cf(table)?;
        let mut out = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item?;
            let row: Value = serde_json::from_slice(&value)?;
            if row.get("tenant_id").and_then(Value::as_str) != Some(tenant_id) {
                continue;
            }
            if filter.map(|f| f.matches(&row)).unwrap_or(true) {
                out.push(row);
            }
        }
        sort_rows(&mut out, order_by);
        drop(span);
        record_db_metrics(Some(out.len()), None);
        Ok(out.into_iter().skip(offset).take(limit).collect())
    }

    async fn put_embedding(&self, table: &str, record: EmbeddingRecord) -> Result<()> {
        let cf_name = embeddings_cf(table);
        let cf = self.cf(&cf_name)?;
        let key = format!("{}:{}", record.entity_id, record.field_name);
        let bytes = serde_json::to_vec(&record)?;
        self.db.put_cf(&cf, key.as_bytes(), bytes)?;
        Ok(())
    }

    async fn get_embedding(&self, table: &str, entity_id: Uuid, field_name: &str) -> Result<Option<EmbeddingRecord>> {
        let cf_name = embeddings_cf(table);
        let cf = self.cf(&cf_name)?;
        let key = format!("{entity_id}:{field_name}");
        match self.db.get_cf(&cf, key.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn search_vectors(&self, table: &str, tenant_id: &str, query: &[f32], top_k: usize, threshold: f32) -> Result<Vec<VectorHit>> {
        let cf_name = embeddings_cf(table);
        let cf = self.cf(&cf_name)?;
        let mut candidates = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item?;
            let record: EmbeddingRecord = serde_json::from_slice(&value)?;
            if record.tenant_id == tenant_id {
                candidates.push(record);
            }
        }

        let mut scored: Vec<VectorHit> = candidates
            .par_iter()
            .map(|record| VectorHit {
                entity_id: record.entity_id,
                field_name: record.field_name.clone(),
                score: cosine_similarity(query, &record.embedding_vector),
            })
            .filter(|hit| hit.score >= threshold)
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn kv_put(&self, entry: KvEntry) -> Result<()> {
        let cf = self.cf(KV_CF)?;
        let bytes = serde_json::to_vec(&entry)?;
        self.db.put_cf(&cf, entry.key.as_bytes(), bytes)?;
        Ok(())
    }

    async fn kv_get(&self, key: &str) -> Result<Option<Value>> {
        let cf = self.cf(KV_CF)?;
        match self.db.get_cf(&cf, key.as_bytes())? {
            Some(bytes) => {
                let entry: KvEntry = serde_json::from_slice(&bytes)?;
                if entry.is_expired(Utc::now()) {
                    Ok(None)
                } else {
                    Ok(Some(entry.value))
                }
            }
            None => Ok(None),
        }
    }

    async fn kv_scan_prefix(&self, prefix: &str, limit: usize) -> Result<Vec<(String, Value)>> {
        let cf = self.cf(KV_CF)?;
        let now = Utc::now();
        let mut out = Vec::new();
        let mode = IteratorMode::From(prefix.as_bytes(), rocksdb::Direction::Forward);
        for item in self.db.iterator_cf(&cf, mode) {
            let (key, value) = item?;
            let key_str = String::from_utf8_lossy(&key).to_string();
            if !key_str.starts_with(prefix) {
                break;
            }
            let entry: KvEntry = serde_json::from_slice(&value)?;
            if !entry.is_expired(now) {
                out.push((key_str, entry.value));
            }
            if out.len() >= limit {
                break;
            }
        }
        Ok(out)
    }

    async fn kv_delete_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let cf = self.cf(KV_CF)?;
        let mut expired_keys = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (key, value) = item?;
            let entry: KvEntry = serde_json::from_slice(&value)?;
            if entry.is_expired(now) {
                expired_keys.push(key.to_vec());
            }
        }
        let count = expired_keys.len();
        for key in expired_keys {
            self.db.delete_cf(&cf, &key)?;
        }
        Ok(count)
    }
}
