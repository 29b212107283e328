//! Affinity builder (§4.7): k-NN query over a Resource's `content` embedding,
//! `SEE_ALSO` edge materialization via [`merge_edge`]'s replace-iff-higher-
//! weight rule, and an optional LLM second pass that replaces a `SEE_ALSO`
//! edge with a more specific typed one when the model can name the
//! relationship.
//!
//! Grounded in the teacher's vector-scan pattern (`rem::executor`'s SEARCH
//! path) for the k-NN step, and in `llm::edge_builder`'s `EdgePlan`/
//! `EdgeSpec` output shape for the second pass — reused verbatim as a
//! schema, repointed at "why do these two resources relate" instead of the
//! teacher's single-document edge extraction.

use crate::config::RemConfig;
use crate::error::Result;
use crate::llm::LlmAdapter;
use crate::repository::TenantRepository;
use crate::types::entity::{merge_edge, GraphEdge};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

const RESOURCES_TABLE: &str = "resources";
const CONTENT_FIELD: &str = "content";
const SEE_ALSO: &str = "SEE_ALSO";

/// Typed relationship vocabulary the LLM second pass is constrained to,
/// carried over from the teacher's edge-extraction prompt.
const TYPED_RELATIONSHIPS: &[&str] = &[
    "references", "authored_by", "depends_on", "implements", "extends",
    "supersedes", "related_to", "part_of", "cites", "derived_from",
];

/// Summary of one affinity pass over a single resource, folded into the
/// dreaming worker's [`crate::dreaming::DreamReport`].
#[derive(Debug, Clone, Default)]
pub struct AffinityResult {
    pub resource_id: Uuid,
    pub neighbors_considered: usize,
    pub edges_written: usize,
}

#[derive(Debug, Deserialize)]
struct TypedEdgeProposal {
    #[serde(default)]
    rel_type: Option<String>,
    #[serde(default)]
    confidence: f32,
}

pub struct AffinityBuilder {
    repo: Arc<TenantRepository>,
    config: RemConfig,
    llm: Option<Arc<dyn LlmAdapter>>,
}

impl AffinityBuilder {
    pub fn new(repo: Arc<TenantRepository>, config: RemConfig) -> Self {
        Self { repo, config, llm: None }
    }

    /// Enables the optional LLM second pass (§4.7 step 3).
    pub fn with_llm(mut self, llm: Arc<dyn LlmAdapter>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Runs the three-step pass for one resource: k-NN query, `SEE_ALSO`
    /// materialization, optional typed-edge refinement. Idempotent per §8
    /// property 5 — re-running never decreases an edge's weight.
    pub async fn build_for_resource(&self, tenant_id: &str, resource_id: Uuid) -> Result<AffinityResult> {
        let Some(mut row) = self.repo.storage().get_row(RESOURCES_TABLE, resource_id).await? else {
            return Ok(AffinityResult { resource_id, ..Default::default() });
        };

        let Some(embedding) = self.repo.storage().get_embedding(RESOURCES_TABLE, resource_id, CONTENT_FIELD).await? else {
            return Ok(AffinityResult { resource_id, ..Default::default() });
        };

        // Ask for k+1 since the resource's own embedding is always its own
        // nearest neighbor.
        let hits = self
            .repo
            .storage()
            .search_vectors(RESOURCES_TABLE, tenant_id, &embedding.embedding_vector, self.config.affinity_k + 1, self.config.affinity_similarity_threshold)
            .await?;

        let neighbors: Vec<_> = hits.into_iter().filter(|h| h.entity_id != resource_id).take(self.config.affinity_k).collect();

        let mut graph_paths: Vec<GraphEdge> = row.get("graph_paths").cloned().map(serde_json::from_value).transpose()?.unwrap_or_default();

        for hit in &neighbors {
            merge_edge(&mut graph_paths, GraphEdge::new(hit.entity_id, SEE_ALSO, hit.score));
        }

        if let Some(llm) = &self.llm {
            for hit in &neighbors {
                if let Some(neighbor_row) = self.repo.storage().get_row(RESOURCES_TABLE, hit.entity_id).await? {
                    if let Some(edge) = self.propose_typed_edge(llm.as_ref(), &row, &neighbor_row, hit.entity_id, hit.score).await? {
                        merge_edge(&mut graph_paths, edge);
                    }
                }
            }
        }

        let edges_written = graph_paths.len();
        row["graph_paths"] = serde_json::to_value(&graph_paths)?;
        self.repo.storage().put_row(RESOURCES_TABLE, resource_id, row).await?;

        Ok(AffinityResult { resource_id, neighbors_considered: neighbors.len(), edges_written })
    }

    async fn propose_typed_edge(
        &self,
        llm: &dyn LlmAdapter,
        resource: &Value,
        neighbor: &Value,
        neighbor_id: Uuid,
        similarity: f32,
    ) -> Result<Option<GraphEdge>> {
        let a = resource.get(CONTENT_FIELD).and_then(Value::as_str).unwrap_or_default();
        let b = neighbor.get(CONTENT_FIELD).and_then(Value::as_str).unwrap_or_default();
        let prompt = format!(
            "Two resources are similar (cosine similarity {similarity:.2}). If one of \
             these relationships precisely describes how the second relates to the \
             first, name it: {}. Otherwise say none. Resource A: {a}\n\nResource B: {b}",
            TYPED_RELATIONSHIPS.join(", ")
        );
        let mut allowed_values: Vec<Value> = TYPED_RELATIONSHIPS.iter().map(|r| json!(r)).collect();
        allowed_values.push(Value::Null);
        let schema = json!({
            "type": "object",
            "properties": {
                "rel_type": {"type": ["string", "null"], "enum": allowed_values},
                "confidence": {"type": "number"}
            }
        });

        let (value, _usage) = llm
            .complete("Classify the relationship between two resources.", &prompt, &schema)
            .await
            .map_err(|e| crate::error::RemError::InternalQueryError(e.to_string()))?;
        let proposal: TypedEdgeProposal = serde_json::from_value(value)?;

        Ok(match proposal.rel_type {
            Some(rel_type) if TYPED_RELATIONSHIPS.contains(&rel_type.as_str()) && proposal.confidence >= self.config.affinity_similarity_threshold => {
                Some(GraphEdge::new(neighbor_id, rel_type, proposal.confidence))
            }
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::{EmbeddingProvider, EmbeddingService};
    use crate::storage::RocksStorage;
    use crate::storage::StorageProvider;
    use async_trait::async_trait;

    struct FixedEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FixedEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(vec![text.len() as f32, 1.0])
        }
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let mut out = Vec::new();
            for t in texts {
                out.push(self.embed(t).await?);
            }
            Ok(out)
        }
        fn dimensions(&self) -> usize {
            2
        }
        fn provider_id(&self) -> &str {
            "default"
        }
    }

    async fn seeded_repo() -> (Arc<TenantRepository>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let storage: Arc<dyn crate::storage::StorageProvider> = Arc::new(RocksStorage::open(dir.path()).await.unwrap());
        crate::schema::register_builtin_models(storage.as_ref()).await.unwrap();

        let mut embeddings = EmbeddingService::new();
        embeddings.register(Arc::new(FixedEmbedder));
        let repo = Arc::new(TenantRepository::new(storage, Arc::new(embeddings)));
        (repo, dir)
    }

    #[tokio::test]
    async fn materializes_see_also_edge_between_similar_resources() {
        let (repo, _dir) = seeded_repo().await;
        let ctx = crate::config::TenantContext::new("tenant-a", "user-1");

        let a = repo.upsert(&ctx, "resources", json!({"name": "doc-a", "content": "hello"})).await.unwrap();
        let b = repo.upsert(&ctx, "resources", json!({"name": "doc-b", "content": "hellos"})).await.unwrap();

        let mut config = RemConfig::default();
        config.affinity_k = 3;
        config.affinity_similarity_threshold = 0.0;
        let builder = AffinityBuilder::new(repo.clone(), config);

        let result = builder.build_for_resource("tenant-a", a).await.unwrap();
        assert!(result.neighbors_considered >= 1);
        assert!(result.edges_written >= 1);

        let row = repo.storage().get_row("resources", a).await.unwrap().unwrap();
        let edges: Vec<GraphEdge> = serde_json::from_value(row["graph_paths"].clone()).unwrap();
        assert!(edges.iter().any(|e| e.dst == b && e.rel_type == SEE_ALSO));
    }

    #[tokio::test]
    async fn rerunning_never_decreases_edge_weight() {
        let (repo, _dir) = seeded_repo().await;
        let ctx = crate::config::TenantContext::new("tenant-a", "user-1");
        let a = repo.upsert(&ctx, "resources", json!({"name": "doc-a", "content": "hello"})).await.unwrap();
        repo.upsert(&ctx, "resources", json!({"name": "doc-b", "content": "hellos"})).await.unwrap();

        let mut config = RemConfig::default();
        config.affinity_k = 3;
        config.affinity_similarity_threshold = 0.0;
        let builder = AffinityBuilder::new(repo.clone(), config);

        builder.build_for_resource("tenant-a", a).await.unwrap();
        let first = repo.storage().get_row("resources", a).await.unwrap().unwrap();
        let first_edges: Vec<GraphEdge> = serde_json::from_value(first["graph_paths"].clone()).unwrap();

        builder.build_for_resource("tenant-a", a).await.unwrap();
        let second = repo.storage().get_row("resources", a).await.unwrap().unwrap();
        let second_edges: Vec<GraphEdge> = serde_json::from_value(second["graph_paths"].clone()).unwrap();

        assert_eq!(first_edges.len(), second_edges.len());
        for edge in &second_edges {
            let prior = first_edges.iter().find(|e| e.dst == edge.dst && e.rel_type == edge.rel_type).unwrap();
            assert!(edge.weight >= prior.weight);
        }
    }
}
