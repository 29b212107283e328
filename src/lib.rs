//! `p8fs_rem` — the tenant-isolated personal memory store described in §1:
//! the canonical data model, a repository that fans writes out across SQL
//! rows, embeddings, and a reverse key index, the REM query engine
//! (LOOKUP/SEARCH/SQL/TRAVERSE) that composes them, and the dreaming worker
//! that enriches stored data offline.
//!
//! Authentication, the MCP/HTTP edge, and real email/Slack delivery are
//! external collaborators (§6) — this crate only defines the trait seams
//! they plug into (`LlmAdapter`, `Notifier`, `EmbeddingProvider`).

pub mod affinity;
pub mod agents;
pub mod config;
pub mod dreaming;
pub mod embeddings;
pub mod error;
pub mod extract;
pub mod llm;
pub mod otel;
pub mod rem;
pub mod repository;
pub mod reverse_index;
pub mod schema;
pub mod storage;
pub mod types;

pub use config::{ProviderBinding, RemConfig, TenantContext};
pub use error::{RemError, Result};
pub use repository::TenantRepository;
pub use reverse_index::ReverseIndex;
pub use storage::{FilterExpr, OrderBy, StorageProvider};

pub use dreaming::{DreamReport, DreamingWorker, InMemoryNotifier, JobScheduler, Notifier};
pub use embeddings::EmbeddingService;
pub use extract::{EntityExtractor, MomentExtractor};
pub use llm::{HttpLlmAdapter, LlmAdapter};
pub use rem::{RemExecutor, RemQueryParser, RemQueryPlan, RemQueryResult};
pub use schema::register_builtin_models;
