//! REM query plan types (§4.1, §4.5). Adapted from the teacher's
//! `providers::rem_query` dataclasses (`QueryType`, `LookupParameters`,
//! `SearchParameters`, `SQLParameters`, `TraverseParameters`,
//! `REMQueryPlan`) referenced by `rem_parser.py`, expressed here as a single
//! tagged enum instead of a base class plus a `parameters: Any` field.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    Lookup,
    Search,
    Sql,
    Traverse,
}

#[derive(Debug, Clone)]
pub struct LookupParameters {
    /// `None` means truly type-agnostic — only used as a fallback hint if
    /// the reverse index has nothing under any type for this key.
    pub table_name: Option<String>,
    pub keys: Vec<String>,
    pub tenant_id: String,
}

#[derive(Debug, Clone)]
pub struct SearchParameters {
    pub table_name: String,
    pub query_text: String,
    pub tenant_id: String,
    pub limit: usize,
    pub threshold: f32,
}

#[derive(Debug, Clone)]
pub struct SqlParameters {
    pub table_name: String,
    pub where_clause: Option<String>,
    pub order_by: Option<Vec<String>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub tenant_id: String,
    pub raw_sql: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraverseMode {
    /// Expand up to `max_depth` hops and return every reached entity.
    Depth,
    /// Return only the edge path (§4.5's PLAN mode) without loading every
    /// reached entity's full row — cheaper when the caller just wants the
    /// connection, not the content.
    Plan,
}

#[derive(Debug, Clone)]
pub enum InitialQuery {
    Lookup(LookupParameters),
    Search(SearchParameters),
}

#[derive(Debug, Clone)]
pub struct TraverseParameters {
    pub initial: InitialQuery,
    /// `None` means follow every edge type.
    pub edge_types: Option<Vec<String>>,
    pub max_depth: u32,
    pub mode: TraverseMode,
    pub table_name: String,
    pub tenant_id: String,
}

#[derive(Debug, Clone)]
pub enum RemQueryPlan {
    Lookup(LookupParameters),
    Search(SearchParameters),
    Sql(SqlParameters),
    Traverse(TraverseParameters),
}

impl RemQueryPlan {
    pub fn query_type(&self) -> QueryType {
        match self {
            RemQueryPlan::Lookup(_) => QueryType::Lookup,
            RemQueryPlan::Search(_) => QueryType::Search,
            RemQueryPlan::Sql(_) => QueryType::Sql,
            RemQueryPlan::Traverse(_) => QueryType::Traverse,
        }
    }
}
