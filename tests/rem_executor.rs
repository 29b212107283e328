//! End-to-end REM query engine scenarios (§4.5, §8 S1/S2/S5), run against a
//! real `RocksStorage` in a temp directory — no mocks below `RemExecutor`.

mod common;

use common::{default_config, seeded_repo};
use p8fs_rem::config::TenantContext;
use p8fs_rem::rem::{RemExecutor, RemQueryParser};
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn s1_name_lookup_across_tables_is_tenant_scoped() {
    let (repo, _dir) = seeded_repo(vec!["alpha"]).await;
    let ctx_a = TenantContext::new("tenant-a", "user-1");

    repo.upsert(&ctx_a, "resources", json!({"name": "my-project-alpha", "content": "alpha work"})).await.unwrap();
    repo.upsert(
        &ctx_a,
        "moments",
        json!({
            "name": "my-project-alpha",
            "content": "alpha meeting",
            "moment_type": "meeting",
            "resource_timestamp": "2026-01-01T00:00:00Z",
            "resource_ends_timestamp": "2026-01-01T01:00:00Z",
        }),
    )
    .await
    .unwrap();

    let executor = RemExecutor::new(repo.clone(), default_config());
    let parser = RemQueryParser::new("resources");

    let plan = parser.parse("tenant-a", "LOOKUP my-project-alpha").unwrap();
    let rows = executor.execute(plan).await.unwrap().into_rows();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r["tenant_id"] == "tenant-a"));

    let plan_b = parser.parse("tenant-b", "LOOKUP my-project-alpha").unwrap();
    let rows_b = executor.execute(plan_b).await.unwrap().into_rows();
    assert!(rows_b.is_empty());
}

#[tokio::test]
async fn s2_semantic_search_orders_by_similarity() {
    let (repo, _dir) = seeded_repo(vec!["oauth", "security", "database"]).await;
    let ctx = TenantContext::new("tenant-test", "user-1");

    repo.upsert(&ctx, "resources", json!({"name": "doc-oauth", "content": "a deep dive into oauth flows"})).await.unwrap();
    repo.upsert(&ctx, "resources", json!({"name": "doc-security", "content": "api security best practices"})).await.unwrap();
    repo.upsert(&ctx, "resources", json!({"name": "doc-db", "content": "database design patterns"})).await.unwrap();

    let executor = RemExecutor::new(repo.clone(), default_config());
    let parser = RemQueryParser::new("resources");

    let plan = parser.parse("tenant-test", "SEARCH \"oauth authentication security\" IN resources").unwrap();
    let rows = executor.execute(plan).await.unwrap().into_rows();

    assert_eq!(rows.len(), 3);
    let names: Vec<&str> = rows.iter().map(|r| r["name"].as_str().unwrap()).collect();
    let db_pos = names.iter().position(|n| *n == "doc-db").unwrap();
    assert!(names[..db_pos].contains(&"doc-oauth") || names[..db_pos].contains(&"doc-security"));
    assert_eq!(db_pos, names.len() - 1);
}

#[tokio::test]
async fn s5_traverse_respects_depth() {
    let (repo, _dir) = seeded_repo(vec!["x"]).await;
    let ctx = TenantContext::new("tenant-a", "user-1");

    let a = repo.upsert(&ctx, "resources", json!({"name": "node-a", "content": "x"})).await.unwrap();
    let b = repo.upsert(&ctx, "resources", json!({"name": "node-b", "content": "x"})).await.unwrap();
    let c = repo.upsert(&ctx, "resources", json!({"name": "node-c", "content": "x"})).await.unwrap();

    link(&repo, a, b).await;
    link(&repo, b, c).await;

    let executor = RemExecutor::new(repo.clone(), default_config());
    let parser = RemQueryParser::new("resources");

    let plan2 = parser.parse("tenant-a", "TRAVERSE WITH LOOKUP node-a DEPTH 2").unwrap();
    let rows2 = executor.execute(plan2).await.unwrap().into_rows();
    let ids2: Vec<_> = rows2.iter().map(|r| r["id"].as_str().unwrap().to_string()).collect();
    assert!(ids2.contains(&b.to_string()));
    assert!(ids2.contains(&c.to_string()));
    assert!(!ids2.contains(&a.to_string()));

    let plan1 = parser.parse("tenant-a", "TRAVERSE WITH LOOKUP node-a DEPTH 1").unwrap();
    let rows1 = executor.execute(plan1).await.unwrap().into_rows();
    let ids1: Vec<_> = rows1.iter().map(|r| r["id"].as_str().unwrap().to_string()).collect();
    assert!(ids1.contains(&b.to_string()));
    assert!(!ids1.contains(&c.to_string()));
}

async fn link(repo: &Arc<p8fs_rem::TenantRepository>, from: uuid::Uuid, to: uuid::Uuid) {
    let mut row = repo.storage().get_row("resources", from).await.unwrap().unwrap();
    let edge = json!({
        "dst": to,
        "rel_type": "SEE_ALSO",
        "weight": 0.9,
        "created_at": chrono::Utc::now(),
        "properties": {},
    });
    row["graph_paths"] = json!([edge]);
    repo.storage().put_row("resources", from, row).await.unwrap();
}

#[tokio::test]
async fn sql_rejects_joins_and_always_scopes_to_tenant() {
    let (repo, _dir) = seeded_repo(vec!["x"]).await;
    let ctx_a = TenantContext::new("tenant-a", "user-1");
    let ctx_b = TenantContext::new("tenant-b", "user-1");

    repo.upsert(&ctx_a, "resources", json!({"name": "doc-a", "content": "x", "category": "notes"})).await.unwrap();
    repo.upsert(&ctx_b, "resources", json!({"name": "doc-b", "content": "x", "category": "notes"})).await.unwrap();

    let executor = RemExecutor::new(repo.clone(), default_config());
    let parser = RemQueryParser::new("resources");

    // Same filter, different tenants: each only sees its own row, even
    // though the WHERE clause doesn't mention tenant_id at all — the
    // tenant predicate is injected by scan_rows, not by SQL parsing.
    let plan = parser.parse("tenant-a", "SELECT * FROM resources WHERE category = 'notes'").unwrap();
    let rows = executor.execute(plan).await.unwrap().into_rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], "doc-a");

    let join_plan = parser.parse("tenant-a", "SELECT * FROM resources r JOIN moments m ON r.id = m.id");
    match join_plan {
        Ok(plan) => assert!(executor.execute(plan).await.is_err()),
        Err(_) => {} // rejected at parse time is equally acceptable
    }
}
