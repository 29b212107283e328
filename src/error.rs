//! Error kinds observable to callers of the REM substrate.
//!
//! One variant per row of spec §7's error table. Each carries enough context
//! to act on without re-deriving it from a string.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemError {
    #[error("operation invoked without tenant context")]
    TenantMissing,

    #[error("entity not found: {0}")]
    NotFound(String),

    #[error("unsupported SQL construct: {0}")]
    UnsupportedSqlConstruct(String),

    #[error("vector search unavailable on table '{table}' field '{field}'")]
    VectorUnavailable { table: String, field: String },

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    EmbeddingDimensionMismatch { expected: usize, actual: usize },

    #[error("deadline exceeded after {0:?}")]
    DeadlineExceeded(std::time::Duration),

    #[error("rate limited by {provider}, retry after {retry_after_secs:?}s")]
    RateLimited {
        provider: String,
        retry_after_secs: Option<u64>,
    },

    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("traversal depth {requested} exceeds hard cap {cap}")]
    DepthExceeded { requested: u32, cap: u32 },

    #[error("internal query error: {0}")]
    InternalQueryError(String),

    #[error("LLM output failed schema validation: {0}")]
    SchemaValidation(String),
}

impl RemError {
    /// Per §7: only `deadline_exceeded` and `rate_limited` are retriable by
    /// the core itself (storage connect path, dreaming job lifecycle).
    pub fn is_retriable(&self) -> bool {
        matches!(self, RemError::DeadlineExceeded(_) | RemError::RateLimited { .. })
    }

    pub fn code(&self) -> &'static str {
        match self {
            RemError::TenantMissing => "tenant_missing",
            RemError::NotFound(_) => "not_found",
            RemError::UnsupportedSqlConstruct(_) => "unsupported_sql_construct",
            RemError::VectorUnavailable { .. } => "vector_unavailable",
            RemError::EmbeddingDimensionMismatch { .. } => "embedding_dimension_mismatch",
            RemError::DeadlineExceeded(_) => "deadline_exceeded",
            RemError::RateLimited { .. } => "rate_limited",
            RemError::UnknownTable(_) => "unknown_table",
            RemError::DepthExceeded { .. } => "depth_exceeded",
            RemError::InternalQueryError(_) => "internal_query_error",
            RemError::SchemaValidation(_) => "schema_validation",
        }
    }
}

impl From<rocksdb::Error> for RemError {
    fn from(e: rocksdb::Error) -> Self {
        RemError::InternalQueryError(format!("rocksdb: {e}"))
    }
}

impl From<serde_json::Error> for RemError {
    fn from(e: serde_json::Error) -> Self {
        RemError::InternalQueryError(format!("json: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, RemError>;
