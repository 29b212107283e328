//! REM: the query language described in §4 — LOOKUP, SEARCH, SQL, and
//! TRAVERSE expressed as one small grammar over a tenant's entities.
//!
//! [`RemQueryParser`] turns a query string into a [`RemQueryPlan`];
//! [`RemExecutor`] runs that plan against a [`crate::repository::TenantRepository`].

pub mod executor;
pub mod parser;
pub mod plan;
pub mod result;
pub mod sql_dialect;

pub use executor::RemExecutor;
pub use parser::RemQueryParser;
pub use plan::{
    InitialQuery, LookupParameters, QueryType, RemQueryPlan, SearchParameters, SqlParameters,
    TraverseMode, TraverseParameters,
};
pub use result::{RemQueryResult, TraverseStep};
