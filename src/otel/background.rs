//! Background job instrumentation.
//!
//! For async operations like indexing, embedding, and compaction.
//! Uses INTERNAL span kind since these are not database client operations.

use tracing::{span, Level, Span};

/// Background job types (§4.8's dreaming worker, §9's KV sweeper).
#[derive(Debug, Clone, Copy)]
pub enum BackgroundJobType {
    /// Entity extraction pass over a Resource
    EntityExtraction,
    /// Moment extraction pass over a Resource
    MomentExtraction,
    /// Affinity builder k-NN + edge materialization pass
    AffinityBuild,
    /// Embedding generation for a row's embedding_fields
    EmbeddingGeneration,
    /// Expired KV entry sweep
    KvSweep,
}

impl BackgroundJobType {
    /// Get job type as string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EntityExtraction => "extract.entities",
            Self::MomentExtraction => "extract.moments",
            Self::AffinityBuild => "affinity.build",
            Self::EmbeddingGeneration => "embedding.generate",
            Self::KvSweep => "kv.sweep",
        }
    }
}

/// Create background job span.
///
/// # Arguments
///
/// * `job_type` - Type of background job
/// * `target` - Job target (schema name, CF name, etc.)
///
/// # Returns
///
/// Tracing span with job attributes
///
/// # Example
///
/// ```rust,ignore
/// let span = background_span(BackgroundJobType::IndexBuild, "articles");
/// let _guard = span.entered();
/// ```
pub fn background_span(job_type: BackgroundJobType, target: &str) -> Span {
    span!(
        Level::INFO,
        "background.job",
        otel.name = format!("{} {}", job_type.as_str(), target),
        otel.kind = "internal",
        job.type = job_type.as_str(),
        job.target = target,
    )
}

/// Record background job metrics.
///
/// # Arguments
///
/// * `batch_size` - Number of items processed (optional)
/// * `duration_ms` - Processing duration in milliseconds (optional)
/// * `status` - Job status ("success", "failed", "partial")
///
/// # Example
///
/// ```rust,ignore
/// let span = background_span(BackgroundJobType::EmbeddingGeneration, "articles");
/// let _guard = span.entered();
///
/// let count = generate_embeddings(texts)?;
/// record_background_metrics(Some(count), None, "success");
/// ```
pub fn record_background_metrics(
    batch_size: Option<usize>,
    duration_ms: Option<u64>,
    status: &str,
) {
    let span = Span::current();
    if let Some(size) = batch_size {
        span.record("job.batch_size", size);
    }
    if let Some(duration) = duration_ms {
        span.record("job.duration_ms", duration);
    }
    span.record("job.status", status);
}
