//! Explicit context objects, replacing the source's global singletons.
//!
//! Per §9: "Global config / singletons (`config.storage_provider`,
//! `get_provider()`) become an explicit context object threaded through the
//! worker and handlers; tests can swap substrates by passing a different
//! context." Nothing in this crate reads process-wide statics for tenant or
//! provider selection.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Carries `(tenant_id, user_id)` into every call. Never derived internally
/// from a network path — the auth boundary (outside this crate) is the only
/// source of truth for this value (§6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantContext {
    pub tenant_id: String,
    pub user_id: String,
}

impl TenantContext {
    pub fn new(tenant_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            user_id: user_id.into(),
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.tenant_id.trim().is_empty()
    }
}

/// One embedding provider's binding: id, endpoint, dimension, credential
/// reference. Populated from the enclosing service's configuration; this
/// crate never reads environment variables for this table directly (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderBinding {
    pub provider_id: String,
    pub dimension: usize,
    pub endpoint: Option<String>,
    pub credential_ref: Option<String>,
    pub requires_api_key: bool,
}

/// Top-level context threaded through the worker and handlers instead of a
/// global. Holds the database path, the provider table, and tunables that
/// spec.md leaves as "configurable" (affinity k, similarity threshold, job
/// retry count, message compression length).
#[derive(Debug, Clone)]
pub struct RemConfig {
    pub db_path: std::path::PathBuf,
    pub providers: HashMap<String, ProviderBinding>,
    pub default_embedding_provider: String,
    pub affinity_k: usize,
    pub affinity_similarity_threshold: f32,
    pub search_default_limit: usize,
    pub search_default_threshold: f32,
    pub lookup_scan_limit: usize,
    pub traverse_default_depth: u32,
    pub traverse_max_depth: u32,
    pub message_compression_length: usize,
    pub job_max_retries: u32,
    pub kv_sweep_interval_secs: u64,
}

impl Default for RemConfig {
    fn default() -> Self {
        Self {
            db_path: std::path::PathBuf::from("./data/p8fs-rem"),
            providers: HashMap::new(),
            default_embedding_provider: "openai-text".to_string(),
            affinity_k: 3,
            affinity_similarity_threshold: 0.75,
            search_default_limit: 10,
            search_default_threshold: 0.7,
            lookup_scan_limit: 100,
            traverse_default_depth: 1,
            traverse_max_depth: 5,
            message_compression_length: 500,
            job_max_retries: 3,
            kv_sweep_interval_secs: 60,
        }
    }
}
