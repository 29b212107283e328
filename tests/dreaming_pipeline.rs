//! End-to-end dreaming-worker scenarios: entity extraction mirrored onto
//! `mentions` edges (§8 S3, at the resource level), and affinity idempotence
//! across repeated runs over the same tenant window (§8 S4).

mod common;

use chrono::{Duration, Utc};
use common::{default_config, seeded_repo, ScriptedLlmAdapter};
use p8fs_rem::config::TenantContext;
use p8fs_rem::dreaming::{DreamingWorker, InMemoryNotifier};
use p8fs_rem::types::job::{DataWindow, Job, JobMode};
use serde_json::json;
use std::sync::Arc;

fn entity_response() -> serde_json::Value {
    json!({
        "entities": [
            {
                "entity_id": "",
                "entity_type": "Organization",
                "entity_name": "Acme Corp",
                "context": "discussed with Acme Corp",
                "confidence": 0.9
            }
        ]
    })
}

#[tokio::test]
async fn s4_affinity_idempotence_across_two_dreaming_runs() {
    let (repo, _dir) = seeded_repo(vec!["oauth", "unrelated"]).await;
    let ctx = TenantContext::new("tenant-dream", "user-1");

    let start = Utc::now() - Duration::hours(1);
    let end = Utc::now() + Duration::hours(1);

    repo.upsert(&ctx, "resources", json!({"name": "doc-i", "content": "oauth flows explained", "resource_timestamp": start})).await.unwrap();
    repo.upsert(&ctx, "resources", json!({"name": "doc-ii", "content": "oauth token refresh", "resource_timestamp": start})).await.unwrap();
    repo.upsert(&ctx, "resources", json!({"name": "doc-iii", "content": "unrelated topic entirely", "resource_timestamp": start})).await.unwrap();

    let llm: Arc<dyn p8fs_rem::LlmAdapter> = Arc::new(ScriptedLlmAdapter::new(entity_response()));
    let notifier = Arc::new(InMemoryNotifier::default());
    let mut config = default_config();
    config.affinity_k = 1;
    config.affinity_similarity_threshold = 0.0;

    let worker = Arc::new(DreamingWorker::new(repo.clone(), config, llm, "claude-3-haiku", notifier.clone()));

    let window = DataWindow { start, end };
    let mut job = Job::new("tenant-dream", JobMode::Direct, window.clone(), 3);
    let report_one = worker.run(&mut job).await.unwrap();
    assert_eq!(report_one.resources_processed, 3);
    assert!(report_one.edges_written > 0);

    let mut job_two = Job::new("tenant-dream", JobMode::Direct, window, 3);
    let report_two = worker.run(&mut job_two).await.unwrap();

    assert_eq!(report_one.edges_written, report_two.edges_written);
    assert_eq!(notifier.sent().len(), 2);
}

#[tokio::test]
async fn entity_extraction_mirrors_mentions_edges_onto_resource() {
    let (repo, _dir) = seeded_repo(vec!["acme"]).await;
    let ctx = TenantContext::new("tenant-dream", "user-1");

    let start = Utc::now() - Duration::hours(1);
    let end = Utc::now() + Duration::hours(1);
    let id = repo
        .upsert(&ctx, "resources", json!({"name": "call-notes", "content": "met with Acme Corp about renewal", "resource_timestamp": start}))
        .await
        .unwrap();

    let llm: Arc<dyn p8fs_rem::LlmAdapter> = Arc::new(ScriptedLlmAdapter::new(entity_response()));
    let notifier = Arc::new(InMemoryNotifier::default());
    let config = default_config();
    let worker = DreamingWorker::new(repo.clone(), config, llm, "claude-3-haiku", notifier);

    let mut job = Job::new("tenant-dream", JobMode::Direct, DataWindow { start, end }, 3);
    worker.run(&mut job).await.unwrap();

    let row = repo.storage().get_row("resources", id).await.unwrap().unwrap();
    let entities = row["related_entities"].as_array().unwrap();
    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0]["entity_id"], "acme-corp");

    let edges = row["graph_paths"].as_array().unwrap();
    assert!(edges.iter().any(|e| e["rel_type"] == "mentions"));
}
