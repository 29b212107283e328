//! REM query string parser (§4.1). A line-for-line port of
//! `original_source`'s `REMQueryParser` (`rem_parser.py`) onto
//! [`RemQueryPlan`] — same keyword dispatch, same quote-stripping rules,
//! same TRAVERSE sub-grammar — since the distilled spec.md only says REM
//! parses "a small query language" without pinning down the exact grammar.

use super::plan::{InitialQuery, LookupParameters, QueryType, RemQueryPlan, SearchParameters, SqlParameters, TraverseMode, TraverseParameters};
use crate::error::{RemError, Result};
use regex::Regex;
use std::sync::LazyLock;

static DEPTH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)DEPTH\s+(\d+)").unwrap());
static IN_TABLE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bIN\s+(\w+)").unwrap());
static WITH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bWITH\b").unwrap());
static QUOTED_SEARCH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"(?is)^["'](.+?)["']\s*(?:IN\s+(\w+))?$"#).unwrap());
static QUOTED_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"(?s)^["'](.+?)["']"#).unwrap());
static FROM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)FROM\s+(\w+)").unwrap());
static WHERE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)WHERE\s+(.+?)(?:ORDER BY|LIMIT|$)").unwrap());
static LIMIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)LIMIT\s+(\d+)").unwrap());
static OFFSET_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)OFFSET\s+(\d+)").unwrap());
static ORDER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)ORDER BY\s+(.+?)(?:LIMIT|OFFSET|$)").unwrap());

/// Strips one layer of matching surrounding quotes/backticks/triple-quotes.
fn strip_outer_quotes(s: &str) -> String {
    let markers = ["```", "\"\"\"", "'''", "\"", "'", "`"];
    for marker in markers {
        if s.len() >= marker.len() * 2 && s.starts_with(marker) && s.ends_with(marker) {
            return s[marker.len()..s.len() - marker.len()].to_string();
        }
    }
    s.to_string()
}

pub struct RemQueryParser {
    pub default_table: String,
}

impl RemQueryParser {
    pub fn new(default_table: impl Into<String>) -> Self {
        Self { default_table: default_table.into() }
    }

    pub fn parse(&self, tenant_id: &str, query: &str) -> Result<RemQueryPlan> {
        let query = query.trim();
        let upper = query.to_uppercase();

        if upper.starts_with("TRAVERSE ") {
            self.parse_traverse(tenant_id, query)
        } else if upper.starts_with("LOOKUP ") || upper.starts_with("GET ") {
            Ok(self.parse_lookup(tenant_id, query))
        } else if upper.starts_with("SEARCH ") {
            Ok(self.parse_search(tenant_id, query))
        } else if upper.starts_with("SELECT ") {
            Ok(self.parse_sql(tenant_id, query))
        } else {
            Ok(self.parse_implicit_search(tenant_id, query))
        }
    }

    fn strip_prefix_ci<'a>(&self, query: &'a str, prefixes: &[&str]) -> &'a str {
        for prefix in prefixes {
            if query.len() >= prefix.len() && query[..prefix.len()].eq_ignore_ascii_case(prefix) {
                return query[prefix.len()..].trim_start();
            }
        }
        query
    }

    fn parse_lookup(&self, tenant_id: &str, query: &str) -> RemQueryPlan {
        let mut rest = self.strip_prefix_ci(query, &["LOOKUP ", "GET "]).to_string();

        let mut table = None;
        if rest.contains(':') && !rest.contains(',') {
            if let Some((head, tail)) = rest.split_once(':') {
                if !head.contains(' ') {
                    table = Some(head.trim().to_string());
                    rest = tail.trim().to_string();
                }
            }
        }

        let keys: Vec<String> = if rest.contains(',') {
            rest.split(',')
                .map(|k| strip_outer_quotes(k.trim()))
                .filter(|k| !k.is_empty())
                .collect()
        } else {
            vec![strip_outer_quotes(rest.trim())]
        };

        RemQueryPlan::Lookup(LookupParameters { table_name: table.filter(|t| !t.is_empty()), keys, tenant_id: tenant_id.to_string() })
    }

    fn parse_search(&self, tenant_id: &str, query: &str) -> RemQueryPlan {
        let rest = self.strip_prefix_ci(query, &["SEARCH "]);

        let (query_text, table) = if let Some(caps) = QUOTED_SEARCH_RE.captures(rest) {
            let text = caps.get(1).unwrap().as_str().replace("\\\"", "\"").replace("\\'", "'");
            let table = caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_else(|| self.default_table.clone());
            (text, table)
        } else if let Some((head, tail)) = rest.split_once(':') {
            (tail.trim().to_string(), head.trim().to_string())
        } else {
            (rest.to_string(), self.default_table.clone())
        };

        RemQueryPlan::Search(SearchParameters { table_name: table, query_text, tenant_id: tenant_id.to_string(), limit: 10, threshold: 0.7 })
    }

    fn parse_implicit_search(&self, tenant_id: &str, query: &str) -> RemQueryPlan {
        RemQueryPlan::Search(SearchParameters {
            table_name: self.default_table.clone(),
            query_text: query.to_string(),
            tenant_id: tenant_id.to_string(),
            limit: 10,
            threshold: 0.7,
        })
    }

    fn parse_sql(&self, tenant_id: &str, query: &str) -> RemQueryPlan {
        let table = FROM_RE.captures(query).map(|c| c[1].to_string()).unwrap_or_else(|| self.default_table.clone());
        let where_clause = WHERE_RE.captures(query).map(|c| c[1].trim().to_string());
        let limit = LIMIT_RE.captures(query).and_then(|c| c[1].parse().ok());
        let offset = OFFSET_RE.captures(query).and_then(|c| c[1].parse().ok());
        let order_by = ORDER_RE.captures(query).map(|c| c[1].split(',').map(|o| o.trim().to_string()).collect());

        RemQueryPlan::Sql(SqlParameters {
            table_name: table,
            where_clause,
            order_by,
            limit,
            offset,
            tenant_id: tenant_id.to_string(),
            raw_sql: query.to_string(),
        })
    }

    fn parse_traverse(&self, tenant_id: &str, query: &str) -> Result<RemQueryPlan> {
        let mut rest = self.strip_prefix_ci(query, &["TRAVERSE "]).to_string();

        let mut mode = TraverseMode::Depth;
        if rest.to_uppercase().starts_with("PLAN ") {
            mode = TraverseMode::Plan;
            rest = self.strip_prefix_ci(&rest, &["PLAN "]).to_string();
        }

        let mut edge_types = None;
        if let Some(m) = WITH_RE.find(&rest) {
            let before = rest[..m.start()].trim();
            if !before.is_empty() {
                edge_types = Some(before.split(',').map(|e| e.trim().to_string()).collect());
            }
            rest = rest[m.end()..].trim().to_string();
        }

        let mut table = self.default_table.clone();
        let initial;

        if rest.to_uppercase().starts_with("LOOKUP ") {
            let query_part = self.strip_prefix_ci(&rest, &["LOOKUP "]);
            let depth_pos = DEPTH_RE.find(query_part).map(|m| m.start());
            let in_pos = IN_TABLE_RE.find(query_part).map(|m| m.start());
            let end = [depth_pos, in_pos].into_iter().flatten().min().unwrap_or(query_part.len());
            let key = strip_outer_quotes(query_part[..end].trim());
            rest = query_part[end..].trim().to_string();

            initial = InitialQuery::Lookup(LookupParameters { table_name: None, keys: vec![key], tenant_id: tenant_id.to_string() });
        } else if rest.to_uppercase().starts_with("SEARCH ") {
            let query_part = self.strip_prefix_ci(&rest, &["SEARCH "]);
            let Some(caps) = QUOTED_PREFIX_RE.captures(query_part) else {
                return Err(RemError::UnsupportedSqlConstruct("TRAVERSE SEARCH requires quoted text".to_string()));
            };
            let text = caps.get(1).unwrap().as_str().replace("\\\"", "\"").replace("\\'", "'");
            rest = query_part[caps.get(0).unwrap().end()..].trim().to_string();

            initial = InitialQuery::Search(SearchParameters { table_name: table.clone(), query_text: text, tenant_id: tenant_id.to_string(), limit: 10, threshold: 0.7 });
        } else {
            return Err(RemError::UnsupportedSqlConstruct("TRAVERSE requires WITH LOOKUP or WITH SEARCH".to_string()));
        }

        let max_depth = DEPTH_RE.captures(&rest).and_then(|c| c[1].parse().ok()).unwrap_or(1);
        if let Some(caps) = IN_TABLE_RE.captures(&rest) {
            table = caps[1].to_string();
        }

        Ok(RemQueryPlan::Traverse(TraverseParameters { initial, edge_types, max_depth, mode, table_name: table, tenant_id: tenant_id.to_string() }))
    }
}
