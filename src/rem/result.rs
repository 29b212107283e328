//! Result shapes returned by [`super::executor::RemExecutor::execute`].

use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct TraverseStep {
    pub from: Uuid,
    pub to: Uuid,
    pub rel_type: String,
    pub weight: f32,
    pub depth: u32,
}

#[derive(Debug, Clone)]
pub enum RemQueryResult {
    /// LOOKUP, SEARCH, SQL, and TRAVERSE in `Depth` mode all resolve to full
    /// rows — the caller doesn't need to know which query shape produced
    /// them.
    Rows(Vec<Value>),
    /// TRAVERSE in `Plan` mode: the edge path itself, without loading every
    /// reached entity's row.
    TraversePlan(Vec<TraverseStep>),
}

impl RemQueryResult {
    pub fn into_rows(self) -> Vec<Value> {
        match self {
            RemQueryResult::Rows(rows) => rows,
            RemQueryResult::TraversePlan(_) => Vec::new(),
        }
    }
}
