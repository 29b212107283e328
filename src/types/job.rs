//! Dreaming Worker job record and state machine (§4.8).
//!
//! `pending` -> `in_progress` -> `completed` | `failed`. Idempotence key is
//! `(tenant_id, mode, data_window)` so a resubmitted job for the same window
//! finds and resumes the existing record instead of double-running.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobMode {
    /// Synchronous LLM calls, one extraction at a time.
    Direct,
    /// Async LLM batch submit/poll, many extractions per batch job.
    Batch,
}

/// The half-open `[start, end)` window of source data a dreaming pass covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DataWindow {
    /// Stable string used inside the idempotence key; avoids re-deriving a
    /// canonical form every time a job is looked up.
    pub fn as_key(&self) -> String {
        format!("{}:{}", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub tenant_id: String,
    pub mode: JobMode,
    pub data_window: DataWindow,
    pub status: JobStatus,
    pub attempts: u32,
    pub max_attempts: u32,
    pub last_error: Option<String>,
    /// Provider-side batch id once a batch job has been submitted.
    pub batch_handle: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(tenant_id: impl Into<String>, mode: JobMode, data_window: DataWindow, max_attempts: u32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.into(),
            mode,
            data_window,
            status: JobStatus::Pending,
            attempts: 0,
            max_attempts,
            last_error: None,
            batch_handle: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Idempotence key per §4.8 / §8 property 7.
    pub fn idempotence_key(tenant_id: &str, mode: JobMode, data_window: &DataWindow) -> String {
        let mode_str = match mode {
            JobMode::Direct => "direct",
            JobMode::Batch => "batch",
        };
        format!("{tenant_id}:{mode_str}:{}", data_window.as_key())
    }

    pub fn mark_in_progress(&mut self) {
        self.status = JobStatus::InProgress;
        self.attempts += 1;
        self.updated_at = Utc::now();
    }

    pub fn mark_completed(&mut self) {
        self.status = JobStatus::Completed;
        self.last_error = None;
        self.updated_at = Utc::now();
    }

    /// Fails the job for good once `max_attempts` is exhausted; otherwise
    /// reverts to `pending` so the scheduler retries with backoff.
    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.last_error = Some(error.into());
        self.status = if self.attempts >= self.max_attempts {
            JobStatus::Failed
        } else {
            JobStatus::Pending
        };
        self.updated_at = Utc::now();
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, JobStatus::Completed | JobStatus::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> DataWindow {
        let end = Utc::now();
        DataWindow { start: end - chrono::Duration::hours(1), end }
    }

    #[test]
    fn retries_before_failing_terminally() {
        let mut job = Job::new("tenant-a", JobMode::Direct, window(), 3);
        job.mark_in_progress();
        job.mark_failed("transient");
        assert_eq!(job.status, JobStatus::Pending);
        assert!(!job.is_terminal());

        job.mark_in_progress();
        job.mark_failed("transient");
        job.mark_in_progress();
        job.mark_failed("transient again");
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.is_terminal());
        assert_eq!(job.attempts, 3);
    }

    #[test]
    fn idempotence_key_stable_for_same_window() {
        let w = window();
        let k1 = Job::idempotence_key("tenant-a", JobMode::Batch, &w);
        let k2 = Job::idempotence_key("tenant-a", JobMode::Batch, &w);
        assert_eq!(k1, k2);
    }
}
