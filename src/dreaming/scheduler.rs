//! Dreaming worker executor pool (§5): a fixed-size `tokio::task` pool fed
//! by a `crossbeam` bounded channel, with idempotence enforced at submit
//! time and retry-with-backoff up to [`RemConfig::job_max_retries`].
//!
//! Grounded in the teacher's `rayon`+`crossbeam` dependency pair (there used
//! for parallel vector scoring); here it's repurposed from data-parallel
//! scoring to worker-pool fan-out, per SPEC_FULL.md §5's pack-enrichment
//! note.

use super::worker::DreamingWorker;
use crate::types::job::Job;
use crossbeam::channel::{bounded, Receiver, Sender};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Submits jobs onto a bounded queue consumed by a fixed pool of worker
/// tasks. Jobs whose idempotence key is already in flight are dropped at
/// submit time rather than double-run (§4.8, §8 property 7).
pub struct JobScheduler {
    sender: Sender<Job>,
    in_flight: Arc<Mutex<HashSet<String>>>,
    cancel: CancellationToken,
    handles: Vec<tokio::task::JoinHandle<()>>,
}

impl JobScheduler {
    /// Spawns `pool_size` worker tasks pulling from a channel of capacity
    /// `queue_capacity`.
    pub fn start(worker: Arc<DreamingWorker>, pool_size: usize, queue_capacity: usize) -> Self {
        let (sender, receiver): (Sender<Job>, Receiver<Job>) = bounded(queue_capacity);
        let in_flight = Arc::new(Mutex::new(HashSet::new()));
        let cancel = CancellationToken::new();

        let handles = (0..pool_size.max(1))
            .map(|_| {
                let receiver = receiver.clone();
                let worker = worker.clone();
                let in_flight = in_flight.clone();
                let cancel = cancel.clone();
                tokio::spawn(async move { Self::run_worker_loop(receiver, worker, in_flight, cancel).await })
            })
            .collect();

        Self { sender, in_flight, cancel, handles }
    }

    async fn run_worker_loop(
        receiver: Receiver<Job>,
        worker: Arc<DreamingWorker>,
        in_flight: Arc<Mutex<HashSet<String>>>,
        cancel: CancellationToken,
    ) {
        loop {
            let job = tokio::select! {
                _ = cancel.cancelled() => break,
                job = tokio::task::spawn_blocking({
                    let receiver = receiver.clone();
                    move || receiver.recv()
                }) => match job {
                    Ok(Ok(job)) => job,
                    _ => break,
                },
            };

            let key = super::idempotence_key(&job);
            let mut attempt = job;
            loop {
                let result = worker.run(&mut attempt).await;
                match result {
                    Ok(report) => {
                        info!(tenant = %attempt.tenant_id, resources = report.resources_processed, "dreaming job completed");
                        break;
                    }
                    Err(e) if e.is_retriable() && !attempt.is_terminal() => {
                        warn!(tenant = %attempt.tenant_id, error = %e, attempts = attempt.attempts, "dreaming job retrying");
                        tokio::time::sleep(backoff(attempt.attempts)).await;
                    }
                    Err(e) => {
                        warn!(tenant = %attempt.tenant_id, error = %e, "dreaming job failed terminally");
                        break;
                    }
                }
            }
            in_flight.lock().unwrap().remove(&key);
        }
    }

    /// Submits `job`. Returns `false` without queuing if a job with the same
    /// idempotence key is already in flight.
    pub fn submit(&self, job: Job) -> bool {
        let key = super::idempotence_key(&job);
        {
            let mut guard = self.in_flight.lock().unwrap();
            if !guard.insert(key) {
                return false;
            }
        }
        self.sender.send(job).is_ok()
    }

    /// Signals every worker task to stop after its current job and waits
    /// for them to drain.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

/// Exponential backoff capped at 30s, keyed off the job's attempt count.
fn backoff(attempts: u32) -> std::time::Duration {
    let secs = 2u64.saturating_pow(attempts.min(5)).min(30);
    std::time::Duration::from_secs(secs)
}
