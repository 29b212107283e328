//! `JobScheduler` concurrency scenarios (§5, §8 property 7): in-flight
//! idempotence-key dedup at submit time, and that a submitted job actually
//! runs to completion through the pool.

mod common;

use chrono::{Duration, Utc};
use common::{default_config, seeded_repo, ScriptedLlmAdapter};
use p8fs_rem::config::TenantContext;
use p8fs_rem::dreaming::{DreamingWorker, InMemoryNotifier, JobScheduler};
use p8fs_rem::types::job::{DataWindow, Job, JobMode};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration as StdDuration;

#[tokio::test]
async fn duplicate_submission_of_an_in_flight_job_is_dropped() {
    let (repo, _dir) = seeded_repo(vec!["x"]).await;
    let ctx = TenantContext::new("tenant-sched", "user-1");
    let start = Utc::now() - Duration::hours(1);
    let end = Utc::now() + Duration::hours(1);
    repo.upsert(&ctx, "resources", json!({"name": "doc", "content": "x", "resource_timestamp": start})).await.unwrap();

    let llm: Arc<dyn p8fs_rem::LlmAdapter> = Arc::new(ScriptedLlmAdapter::new(json!({"entities": []})));
    let notifier = Arc::new(InMemoryNotifier::default());
    let worker = Arc::new(DreamingWorker::new(repo.clone(), default_config(), llm, "claude-3-haiku", notifier.clone()));

    let scheduler = JobScheduler::start(worker, 1, 8);
    let window = DataWindow { start, end };

    let accepted_first = scheduler.submit(Job::new("tenant-sched", JobMode::Direct, window.clone(), 3));
    let accepted_duplicate = scheduler.submit(Job::new("tenant-sched", JobMode::Direct, window, 3));

    assert!(accepted_first);
    assert!(!accepted_duplicate);

    tokio::time::timeout(StdDuration::from_secs(5), async {
        loop {
            if !notifier.sent().is_empty() {
                break;
            }
            tokio::time::sleep(StdDuration::from_millis(20)).await;
        }
    })
    .await
    .expect("job should complete within the timeout");

    scheduler.shutdown().await;
    assert_eq!(notifier.sent().len(), 1);
}

#[tokio::test]
async fn differently_windowed_jobs_for_the_same_tenant_both_run() {
    let (repo, _dir) = seeded_repo(vec!["x"]).await;
    let ctx = TenantContext::new("tenant-sched-2", "user-1");
    let now = Utc::now();
    repo.upsert(&ctx, "resources", json!({"name": "doc", "content": "x", "resource_timestamp": now})).await.unwrap();

    let llm: Arc<dyn p8fs_rem::LlmAdapter> = Arc::new(ScriptedLlmAdapter::new(json!({"entities": []})));
    let notifier = Arc::new(InMemoryNotifier::default());
    let worker = Arc::new(DreamingWorker::new(repo.clone(), default_config(), llm, "claude-3-haiku", notifier.clone()));

    let scheduler = JobScheduler::start(worker, 2, 8);

    let window_one = DataWindow { start: now - Duration::hours(2), end: now + Duration::hours(2) };
    let window_two = DataWindow { start: now - Duration::days(2), end: now - Duration::hours(3) };

    assert!(scheduler.submit(Job::new("tenant-sched-2", JobMode::Direct, window_one, 3)));
    assert!(scheduler.submit(Job::new("tenant-sched-2", JobMode::Direct, window_two, 3)));

    tokio::time::timeout(StdDuration::from_secs(5), async {
        loop {
            if notifier.sent().len() >= 2 {
                break;
            }
            tokio::time::sleep(StdDuration::from_millis(20)).await;
        }
    })
    .await
    .expect("both jobs should complete within the timeout");

    scheduler.shutdown().await;
}
