//! Dreaming worker (§4.8): runs one [`Job`] — entity extraction, moment
//! extraction, and affinity — over every Resource in its `data_window`,
//! direct (one LLM call at a time) or batch (provider async submit/poll).
//!
//! Grounded in the teacher's `agents::client::TokenUsage` cost-tracking
//! pattern and `agents::pagination::AggregatedTokenUsage` for per-chunk
//! accounting; the job state machine itself lives on [`Job`]
//! (`types::job`), this worker only drives it.

use super::report::{DreamReport, Notifier};
use crate::affinity::AffinityBuilder;
use crate::config::RemConfig;
use crate::error::{RemError, Result};
use crate::extract::{entity_extractor, EntityExtractor, MomentExtractor};
use crate::llm::{BatchRequest, LlmAdapter};
use crate::repository::TenantRepository;
use crate::types::job::{DataWindow, Job, JobMode};
use crate::types::moment::Moment;
use crate::types::resource::Resource;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

const RESOURCES_TABLE: &str = "resources";
const MOMENTS_TABLE: &str = "moments";

pub struct DreamingWorker {
    repo: Arc<TenantRepository>,
    config: RemConfig,
    llm: Arc<dyn LlmAdapter>,
    entities: EntityExtractor,
    moments: MomentExtractor,
    affinity: AffinityBuilder,
    notifier: Arc<dyn Notifier>,
}

impl DreamingWorker {
    pub fn new(repo: Arc<TenantRepository>, config: RemConfig, llm: Arc<dyn LlmAdapter>, model: &str, notifier: Arc<dyn Notifier>) -> Self {
        let entities = EntityExtractor::new(llm.clone(), model, None);
        let moments = MomentExtractor::new(llm.clone(), model, None);
        let affinity = AffinityBuilder::new(repo.clone(), config.clone());
        Self { repo, config, llm, entities, moments, affinity, notifier }
    }

    /// Runs `job` to completion (or failure), advancing its state machine
    /// and emitting a [`DreamReport`] through the notifier regardless of
    /// outcome (§6: reporting is best-effort, never blocks the job result).
    pub async fn run(&self, job: &mut Job) -> Result<DreamReport> {
        job.mark_in_progress();

        match self.run_inner(job).await {
            Ok(report) => {
                job.mark_completed();
                self.notifier.notify(&report).await;
                Ok(report)
            }
            Err(e) => {
                job.mark_failed(e.to_string());
                let mut report = DreamReport::new(job.tenant_id.clone(), job.data_window.clone());
                report.warnings.push(format!("job failed: {e}"));
                self.notifier.notify(&report).await;
                Err(e)
            }
        }
    }

    async fn run_inner(&self, job: &Job) -> Result<DreamReport> {
        let mut report = DreamReport::new(job.tenant_id.clone(), job.data_window.clone());
        let rows = self.resources_in_window(&job.tenant_id, &job.data_window).await?;
        let mut processed_ids = Vec::with_capacity(rows.len());

        match job.mode {
            JobMode::Direct => {
                for row in rows {
                    if let Some(id) = self.process_resource_direct(&job.tenant_id, row, &mut report).await? {
                        processed_ids.push(id);
                    }
                }
            }
            JobMode::Batch => {
                processed_ids = self.process_resources_batch(&job.tenant_id, rows, &mut report).await?;
            }
        }

        for id in processed_ids {
            let affinity_result = self.affinity.build_for_resource(&job.tenant_id, id).await?;
            report.edges_written += affinity_result.edges_written;
        }

        Ok(report)
    }

    async fn resources_in_window(&self, tenant_id: &str, window: &DataWindow) -> Result<Vec<Value>> {
        let rows = self.repo.storage().scan_rows(RESOURCES_TABLE, tenant_id, None, &[], self.config.lookup_scan_limit, 0).await?;
        Ok(rows.into_iter().filter(|row| row_timestamp(row).map(|ts| ts >= window.start && ts < window.end).unwrap_or(false)).collect())
    }

    /// Runs entity + moment extraction synchronously for one resource,
    /// writing the enriched resource row and any valid moments back.
    /// Returns the resource id so the caller can run affinity next.
    async fn process_resource_direct(&self, tenant_id: &str, row: Value, report: &mut DreamReport) -> Result<Option<Uuid>> {
        let mut resource: Resource = serde_json::from_value(row)?;
        self.entities.extract_into(&mut resource).await?;
        report.entities_extracted += resource.related_entities.len();

        self.extract_and_store_moments(tenant_id, &resource, report).await?;

        let id = resource.id();
        self.repo.storage().put_row(RESOURCES_TABLE, id, serde_json::to_value(resource)?).await?;
        report.resources_processed += 1;
        Ok(Some(id))
    }

    async fn extract_and_store_moments(&self, tenant_id: &str, resource: &Resource, report: &mut DreamReport) -> Result<()> {
        let start = resource.resource_timestamp.unwrap_or(resource.meta.created_at);
        let end = start + chrono::Duration::hours(1);
        let extracted = self.moments.extract(tenant_id, &resource.content, &resource.name, start, end).await?;

        for item in extracted {
            if item.is_valid() {
                self.store_moment(tenant_id, item.moment).await?;
                report.moments_created += 1;
            } else {
                report.moments_rejected += 1;
                for issue in &item.issues {
                    report.warnings.push(format!("moment {} rejected: {issue:?}", item.moment.name));
                }
            }
        }
        Ok(())
    }

    async fn store_moment(&self, tenant_id: &str, moment: Moment) -> Result<()> {
        let ctx = crate::config::TenantContext::new(tenant_id, String::new());
        self.repo.upsert(&ctx, MOMENTS_TABLE, serde_json::to_value(moment)?).await?;
        Ok(())
    }

    /// Batch mode (§4.8, §5): entity extraction only dispatches through
    /// the provider's async `batch_submit`/`batch_poll` pair, one request
    /// per resource. Moment extraction and affinity still run synchronously
    /// regardless of job mode — only the highest-volume call (one entity
    /// pass per resource) benefits from batching in practice.
    async fn process_resources_batch(&self, tenant_id: &str, rows: Vec<Value>, report: &mut DreamReport) -> Result<Vec<Uuid>> {
        let mut resources = Vec::with_capacity(rows.len());
        let mut requests = Vec::with_capacity(rows.len());
        for row in rows {
            let resource: Resource = serde_json::from_value(row)?;
            requests.push(BatchRequest {
                request_id: resource.id().to_string(),
                system_prompt: entity_extractor::system_prompt(&resource.name),
                content: resource.content.clone(),
                output_schema: entity_extractor::output_schema(),
            });
            resources.push(resource);
        }

        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let handle = self.llm.batch_submit(requests).await.map_err(|e| RemError::InternalQueryError(e.to_string()))?;
        let results = self.poll_until_complete(&handle).await?;

        let mut processed = Vec::with_capacity(resources.len());
        for mut resource in resources {
            if let Some(result) = results.iter().find(|r| r.request_id == resource.id().to_string()) {
                let entities = entity_extractor::parse_entities(result.output.clone())?;
                entity_extractor::apply_to_resource(&mut resource, entities);
                report.entities_extracted += resource.related_entities.len();
            }

            self.extract_and_store_moments(tenant_id, &resource, report).await?;

            let id = resource.id();
            self.repo.storage().put_row(RESOURCES_TABLE, id, serde_json::to_value(resource)?).await?;
            report.resources_processed += 1;
            processed.push(id);
        }
        Ok(processed)
    }

    async fn poll_until_complete(&self, handle: &str) -> Result<Vec<crate::llm::BatchResult>> {
        use crate::llm::BatchPollStatus;
        loop {
            let (status, results) = self.llm.batch_poll(handle).await.map_err(|e| RemError::InternalQueryError(e.to_string()))?;
            match status {
                BatchPollStatus::Completed => return Ok(results),
                BatchPollStatus::Failed(reason) => return Err(RemError::InternalQueryError(format!("batch job failed: {reason}"))),
                BatchPollStatus::InProgress => tokio::time::sleep(std::time::Duration::from_secs(2)).await,
            }
        }
    }
}

fn row_timestamp(row: &Value) -> Option<chrono::DateTime<chrono::Utc>> {
    let raw = row
        .get("resource_timestamp")
        .and_then(Value::as_str)
        .or_else(|| row.get("created_at").and_then(Value::as_str))?;
    chrono::DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.with_timezone(&chrono::Utc))
}
