//! The [`StorageProvider`] trait: the one seam every higher layer (reverse
//! index, repository, REM executor) goes through to reach the database.
//! Adapted from the teacher's `PyDatabase` method surface
//! (`bindings/database.rs`: `insert`/`get`/`lookup`/`search`/`query`/
//! `traverse`/`upsert`) but typed against this crate's models instead of
//! PyO3 dynamic values, and tenant-scoped on every call.

use crate::error::Result;
use crate::types::ModelDescriptor;
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use uuid::Uuid;

/// Comparison operator for a [`FilterExpr::Cmp`] leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

/// A `WHERE`-clause predicate tree evaluated during a row scan. SQL-dialect
/// filters lower into this; LOOKUP and the reverse-index self-heal path
/// build the `Cmp`/`Eq` leaves directly.
#[derive(Debug, Clone)]
pub enum FilterExpr {
    Cmp { field: String, op: CmpOp, value: Value },
    /// Case-insensitive substring containment (SQL's `%substr%` collapses
    /// to this; REM's dialect never supports true wildcard positions).
    Like { field: String, pattern: String },
    In { field: String, values: Vec<Value> },
    IsNull { field: String },
    IsNotNull { field: String },
    And(Vec<FilterExpr>),
    Or(Vec<FilterExpr>),
}

impl FilterExpr {
    pub fn eq(field: impl Into<String>, value: Value) -> Self {
        Self::Cmp { field: field.into(), op: CmpOp::Eq, value }
    }

    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::Like { field: field.into(), pattern: pattern.into() }
    }

    pub fn and(exprs: Vec<FilterExpr>) -> Self {
        Self::And(exprs)
    }

    pub fn matches(&self, row: &Value) -> bool {
        match self {
            FilterExpr::Cmp { field, op, value } => cmp_matches(row.get(field), *op, value),
            FilterExpr::Like { field, pattern } => match row.get(field).and_then(Value::as_str) {
                Some(actual) => actual.to_lowercase().contains(&pattern.to_lowercase()),
                None => false,
            },
            FilterExpr::In { field, values } => row.get(field).map(|v| values.contains(v)).unwrap_or(false),
            FilterExpr::IsNull { field } => row.get(field).map(Value::is_null).unwrap_or(true),
            FilterExpr::IsNotNull { field } => row.get(field).map(|v| !v.is_null()).unwrap_or(false),
            FilterExpr::And(exprs) => exprs.iter().all(|e| e.matches(row)),
            FilterExpr::Or(exprs) => exprs.iter().any(|e| e.matches(row)),
        }
    }
}

fn cmp_matches(actual: Option<&Value>, op: CmpOp, expected: &Value) -> bool {
    let Some(actual) = actual else { return op == CmpOp::Ne };
    if op == CmpOp::Eq {
        return actual == expected;
    }
    if op == CmpOp::Ne {
        return actual != expected;
    }

    let ordering = match (actual.as_f64(), expected.as_f64()) {
        (Some(a), Some(b)) => a.partial_cmp(&b),
        _ => actual.as_str().zip(expected.as_str()).map(|(a, b)| a.cmp(b)),
    };
    match (ordering, op) {
        (Some(Ordering::Less), CmpOp::Lt | CmpOp::Lte) => true,
        (Some(Ordering::Equal), CmpOp::Lte | CmpOp::Gte) => true,
        (Some(Ordering::Greater), CmpOp::Gt | CmpOp::Gte) => true,
        _ => false,
    }
}

/// One `ORDER BY` key: field name plus sort direction.
#[derive(Debug, Clone)]
pub struct OrderBy {
    pub field: String,
    pub descending: bool,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self { field: field.into(), descending: false }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self { field: field.into(), descending: true }
    }
}

/// Applies `order_by` keys in reverse so the first key is the primary sort
/// (a stable sort per key, applied last-to-first, composes into that).
pub fn sort_rows(rows: &mut [Value], order_by: &[OrderBy]) {
    for key in order_by.iter().rev() {
        rows.sort_by(|a, b| {
            let cmp = value_cmp(a.get(&key.field), b.get(&key.field));
            if key.descending { cmp.reverse() } else { cmp }
        });
    }
}

/// Numbers compare numerically, strings lexicographically, missing fields
/// sort first — the same "numeric before string fallback" rule
/// [`cmp_matches`] uses for `Cmp` leaves, so `ORDER BY` and `WHERE` agree on
/// what "less than" means for a given field.
fn value_cmp(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            _ => a.to_string().cmp(&b.to_string()),
        },
    }
}

/// One scored vector hit from a [`StorageProvider::search_vectors`] call.
#[derive(Debug, Clone)]
pub struct VectorHit {
    pub entity_id: Uuid,
    pub field_name: String,
    pub score: f32,
}

#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Registers (or re-registers) a table's [`ModelDescriptor`], creating
    /// its row and embedding column families if they don't exist yet.
    async fn register_schema(&self, descriptor: ModelDescriptor) -> Result<()>;

    fn schema(&self, table_name: &str) -> Result<ModelDescriptor>;

    fn list_schemas(&self) -> Vec<ModelDescriptor>;

    /// Upserts one row, keyed by `id`. Tenant isolation is enforced by the
    /// repository layer above this trait, not here — this method trusts
    /// whatever `tenant_id` is already on the row.
    async fn put_row(&self, table: &str, id: Uuid, row: Value) -> Result<()>;

    async fn get_row(&self, table: &str, id: Uuid) -> Result<Option<Value>>;

    async fn get_rows(&self, table: &str, ids: &[Uuid]) -> Result<Vec<Option<Value>>>;

    async fn delete_row(&self, table: &str, id: Uuid) -> Result<()>;

    /// Full column-family scan with `filter` applied row-by-row, sorted by
    /// `order_by`, then paged by `offset`/`limit`. This is the fallback path
    /// every SQL/LOOKUP self-heal and TRAVERSE step ultimately runs on top
    /// of.
    async fn scan_rows(
        &self,
        table: &str,
        tenant_id: &str,
        filter: Option<&FilterExpr>,
        order_by: &[OrderBy],
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Value>>;

    async fn put_embedding(&self, table: &str, record: crate::types::EmbeddingRecord) -> Result<()>;

    async fn get_embedding(&self, table: &str, entity_id: Uuid, field_name: &str) -> Result<Option<crate::types::EmbeddingRecord>>;

    /// Brute-force cosine scan over every embedding in `table` for
    /// `tenant_id`, parallelized by the implementation (§6: exact search,
    /// not an approximate index — see SPEC_FULL.md's Open Question note).
    async fn search_vectors(&self, table: &str, tenant_id: &str, query: &[f32], top_k: usize, threshold: f32) -> Result<Vec<VectorHit>>;

    async fn kv_put(&self, entry: crate::types::KvEntry) -> Result<()>;

    async fn kv_get(&self, key: &str) -> Result<Option<Value>>;

    async fn kv_scan_prefix(&self, prefix: &str, limit: usize) -> Result<Vec<(String, Value)>>;

    /// Removes every KV entry whose `expires_at` is at or before `now`.
    /// Returns the count removed, for the sweeper's log line.
    async fn kv_delete_expired(&self, now: chrono::DateTime<chrono::Utc>) -> Result<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn sort_rows_orders_numeric_fields_numerically(values in prop::collection::vec(any::<i64>(), 0..30)) {
            let mut rows: Vec<Value> = values.iter().map(|v| serde_json::json!({"n": v})).collect();
            sort_rows(&mut rows, &[OrderBy::asc("n")]);
            let sorted: Vec<i64> = rows.iter().map(|r| r["n"].as_i64().unwrap()).collect();
            let mut expected = values;
            expected.sort();
            prop_assert_eq!(sorted, expected);
        }

        #[test]
        fn cmp_matches_agrees_with_native_ordering(a in any::<i64>(), b in any::<i64>()) {
            let row = serde_json::json!({"n": a});
            let lt = FilterExpr::Cmp { field: "n".to_string(), op: CmpOp::Lt, value: Value::from(b) };
            let gte = FilterExpr::Cmp { field: "n".to_string(), op: CmpOp::Gte, value: Value::from(b) };
            prop_assert_eq!(lt.matches(&row), a < b);
            prop_assert_eq!(gte.matches(&row), a >= b);
            prop_assert_ne!(lt.matches(&row), gte.matches(&row));
        }
    }

    #[test]
    fn and_or_short_circuit_on_missing_fields() {
        let row = serde_json::json!({"category": "diary"});
        let missing_field = FilterExpr::IsNotNull { field: "summary".to_string() };
        let has_category = FilterExpr::eq("category", Value::String("diary".to_string()));
        assert!(!FilterExpr::And(vec![has_category.clone(), missing_field.clone()]).matches(&row));
        assert!(FilterExpr::Or(vec![has_category, missing_field]).matches(&row));
    }
}
