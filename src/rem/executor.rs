//! REM query executor (§4.5): turns a [`RemQueryPlan`] into a
//! [`RemQueryResult`] by calling straight through to the
//! [`TenantRepository`]/[`ReverseIndex`]/[`StorageProvider`] stack built
//! underneath it. Nothing here talks to RocksDB directly.

use super::plan::{InitialQuery, LookupParameters, QueryType, RemQueryPlan, SearchParameters, SqlParameters, TraverseMode, TraverseParameters};
use super::result::{RemQueryResult, TraverseStep};
use super::sql_dialect::validate_and_extract_filters;
use crate::config::RemConfig;
use crate::error::{RemError, Result};
use crate::repository::TenantRepository;
use crate::storage::provider::OrderBy;
use crate::types::GraphEdge;
use serde_json::Value;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use uuid::Uuid;

pub struct RemExecutor {
    repo: Arc<TenantRepository>,
    config: RemConfig,
}

impl RemExecutor {
    pub fn new(repo: Arc<TenantRepository>, config: RemConfig) -> Self {
        Self { repo, config }
    }

    pub async fn execute(&self, plan: RemQueryPlan) -> Result<RemQueryResult> {
        match plan {
            RemQueryPlan::Lookup(p) => self.execute_lookup(p).await,
            RemQueryPlan::Search(p) => self.execute_search(p).await,
            RemQueryPlan::Sql(p) => self.execute_sql(p).await,
            RemQueryPlan::Traverse(p) => self.execute_traverse(p).await,
        }
    }

    async fn execute_lookup(&self, params: LookupParameters) -> Result<RemQueryResult> {
        let mut rows = Vec::new();
        for key in &params.keys {
            let entries = match &params.table_name {
                // Table-scoped LOOKUP (`LOOKUP resources:my-name`): narrow
                // to the hinted table's entity type via the exact-match
                // path instead of scanning every type for this tenant.
                Some(table) => {
                    let entity_type = self.repo.storage().schema(table)?.entity_type;
                    self.repo
                        .reverse_index()
                        .lookup_typed(&params.tenant_id, key, &entity_type)
                        .await?
                        .into_iter()
                        .collect()
                }
                None => match self.repo.reverse_index().lookup(&params.tenant_id, key, self.config.lookup_scan_limit).await {
                    Ok(entries) => entries,
                    Err(RemError::NotFound(_)) => Vec::new(),
                    Err(e) => return Err(e),
                },
            };
            for entry in entries {
                if let Some(row) = self.repo.storage().get_row(&entry.table_name, entry.entity_id).await? {
                    rows.push(row);
                }
            }
        }
        // Tie-breaking (§4.5.2): LOOKUP results ordered by `updated_at` desc.
        rows.sort_by(|a, b| updated_at_of(b).cmp(&updated_at_of(a)));
        Ok(RemQueryResult::Rows(rows))
    }

    async fn execute_search(&self, params: SearchParameters) -> Result<RemQueryResult> {
        let descriptor = self.repo.storage().schema(&params.table_name)?;
        let field_spec = descriptor
            .embedding_fields
            .first()
            .ok_or_else(|| RemError::VectorUnavailable { table: params.table_name.clone(), field: "<none>".to_string() })?;

        let vector = self.repo.embeddings().embed(&field_spec.provider_id, &params.query_text, None).await?;
        let mut hits = self
            .repo
            .storage()
            .search_vectors(&params.table_name, &params.tenant_id, &vector, params.limit, params.threshold)
            .await?;

        // Tie-breaking (§4.5.2): similarity desc, then the underlying row's
        // `updated_at` desc (newest first) so equal-score hits still come
        // back in a deterministic order across repeated runs.
        let mut rows = Vec::with_capacity(hits.len());
        for hit in hits.drain(..) {
            if let Some(row) = self.repo.storage().get_row(&params.table_name, hit.entity_id).await? {
                rows.push((hit.score, row));
            }
        }
        rows.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| updated_at_of(&b.1).cmp(&updated_at_of(&a.1)))
        });

        Ok(RemQueryResult::Rows(rows.into_iter().map(|(_, row)| row).collect()))
    }

    async fn execute_sql(&self, params: SqlParameters) -> Result<RemQueryResult> {
        let filter = validate_and_extract_filters(&params.raw_sql, &params.table_name)?;
        let limit = params.limit.unwrap_or(self.config.search_default_limit);
        let offset = params.offset.unwrap_or(0);
        let order_by = params.order_by.as_deref().map(parse_order_by).unwrap_or_default();

        let rows = self
            .repo
            .storage()
            .scan_rows(&params.table_name, &params.tenant_id, filter.as_ref(), &order_by, limit, offset)
            .await?;

        Ok(RemQueryResult::Rows(rows))
    }

    async fn execute_traverse(&self, params: TraverseParameters) -> Result<RemQueryResult> {
        if params.max_depth > self.config.traverse_max_depth {
            return Err(RemError::DepthExceeded { requested: params.max_depth, cap: self.config.traverse_max_depth });
        }

        let starts = self.resolve_initial(&params).await?;

        let mut visited: HashSet<Uuid> = starts.iter().copied().collect();
        let mut queue: VecDeque<(Uuid, u32)> = starts.iter().map(|id| (*id, 0)).collect();
        let mut steps = Vec::new();
        let mut rows = Vec::new();

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= params.max_depth {
                continue;
            }
            let Some(row) = self.repo.storage().get_row(&params.table_name, current).await? else { continue };
            let edges: Vec<GraphEdge> = row
                .get("graph_paths")
                .cloned()
                .map(serde_json::from_value)
                .transpose()?
                .unwrap_or_default();

            for edge in edges {
                if let Some(allowed) = &params.edge_types {
                    if !allowed.contains(&edge.rel_type) {
                        continue;
                    }
                }
                steps.push(TraverseStep { from: current, to: edge.dst, rel_type: edge.rel_type.clone(), weight: edge.weight, depth: depth + 1 });

                if visited.insert(edge.dst) {
                    queue.push_back((edge.dst, depth + 1));
                    if params.mode == TraverseMode::Depth {
                        if let Some(row) = self.repo.storage().get_row(&params.table_name, edge.dst).await? {
                            rows.push(row);
                        }
                    }
                }
            }
        }

        match params.mode {
            TraverseMode::Depth => Ok(RemQueryResult::Rows(rows)),
            TraverseMode::Plan => Ok(RemQueryResult::TraversePlan(steps)),
        }
    }

    async fn resolve_initial(&self, params: &TraverseParameters) -> Result<Vec<Uuid>> {
        let result = match &params.initial {
            InitialQuery::Lookup(p) => self.execute_lookup(p.clone()).await?,
            InitialQuery::Search(p) => {
                let mut p = p.clone();
                p.table_name = params.table_name.clone();
                self.execute_search(p).await?
            }
        };
        let rows = result.into_rows();
        Ok(rows.iter().filter_map(|r| r.get("id").and_then(Value::as_str)).filter_map(|s| Uuid::parse_str(s).ok()).collect())
    }
}

fn parse_order_by(keys: &[String]) -> Vec<OrderBy> {
    keys.iter()
        .map(|key| match key.to_uppercase().strip_suffix(" DESC") {
            Some(_) => OrderBy::desc(key[..key.len() - 5].trim()),
            None => OrderBy::asc(key.trim_end_matches(|c: char| c.is_whitespace()).trim_end_matches("ASC").trim()),
        })
        .collect()
}

fn updated_at_of(row: &Value) -> String {
    row.get("updated_at").and_then(Value::as_str).unwrap_or_default().to_string()
}

pub fn query_type_of(plan: &RemQueryPlan) -> QueryType {
    plan.query_type()
}
