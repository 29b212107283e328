//! Dreaming Worker (§4.8): offline enrichment over stored Resources —
//! entity extraction, moment generation, and resource-to-resource affinity
//! — run as [`Job`]s through a [`JobScheduler`]-managed pool.

pub mod report;
pub mod scheduler;
pub mod worker;

pub use report::{DreamReport, InMemoryNotifier, Notifier};
pub use scheduler::JobScheduler;
pub use worker::DreamingWorker;

use crate::types::job::Job;

pub(crate) fn idempotence_key(job: &Job) -> String {
    Job::idempotence_key(&job.tenant_id, job.mode, &job.data_window)
}
