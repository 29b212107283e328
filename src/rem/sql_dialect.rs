//! REM's restricted SQL dialect (§4.1, §4.5): a single-table `SELECT`
//! subset validated with a real SQL parser rather than the regex
//! field-extraction the teacher's `rem_parser.py` used for the loose
//! `table`/`where_clause`/`limit` fields. Comparison operators, `IN`,
//! `IS NULL`, `AND`/`OR`, and parenthesization are all supported (§4.5.2);
//! only joins, subqueries, and DDL are rejected so REM SQL cannot express a
//! query the storage layer can't serve safely (§8's mutation-test property:
//! every accepted query still carries the tenant clause down to
//! `StorageProvider::scan_rows`).

use crate::error::{RemError, Result};
use crate::storage::provider::{CmpOp, FilterExpr};
use sqlparser::ast::{BinaryOperator, Expr, SetExpr, Statement, TableFactor, Value as SqlValue};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use serde_json::Value;

/// Parses `raw_sql`, checks it is a single-table `SELECT` with only
/// `AND`/`OR`-combined comparison/`LIKE`/`IN`/`IS NULL` predicates, and
/// returns the filter tree to run through
/// [`crate::storage::StorageProvider::scan_rows`]. The table name is
/// cross-checked against `expected_table` (already extracted by the REM
/// parser) so the two never disagree silently.
pub fn validate_and_extract_filters(raw_sql: &str, expected_table: &str) -> Result<Option<FilterExpr>> {
    let statements = Parser::parse_sql(&GenericDialect {}, raw_sql)
        .map_err(|e| RemError::UnsupportedSqlConstruct(format!("parse error: {e}")))?;

    let [Statement::Query(query)] = statements.as_slice() else {
        return Err(RemError::UnsupportedSqlConstruct("expected exactly one SELECT statement".to_string()));
    };

    if query.with.is_some() {
        return Err(RemError::UnsupportedSqlConstruct("CTEs are not supported".to_string()));
    }

    let SetExpr::Select(select) = query.body.as_ref() else {
        return Err(RemError::UnsupportedSqlConstruct("only plain SELECT is supported".to_string()));
    };

    if !matches!(&select.group_by, sqlparser::ast::GroupByExpr::Expressions(exprs, _) if exprs.is_empty()) {
        return Err(RemError::UnsupportedSqlConstruct("GROUP BY is not supported".to_string()));
    }
    if select.having.is_some() {
        return Err(RemError::UnsupportedSqlConstruct("HAVING is not supported".to_string()));
    }
    if select.distinct.is_some() {
        return Err(RemError::UnsupportedSqlConstruct("DISTINCT is not supported".to_string()));
    }

    if select.from.len() != 1 || !select.from[0].joins.is_empty() {
        return Err(RemError::UnsupportedSqlConstruct("joins are not supported, REM SQL is single-table".to_string()));
    }

    let TableFactor::Table { name, .. } = &select.from[0].relation else {
        return Err(RemError::UnsupportedSqlConstruct("FROM must name a single table".to_string()));
    };
    let table_name = name.to_string();
    if table_name != expected_table {
        return Err(RemError::UnsupportedSqlConstruct(format!("FROM table '{table_name}' does not match parsed table '{expected_table}'")));
    }

    match &select.selection {
        Some(selection) => Ok(Some(to_filter_expr(selection)?)),
        None => Ok(None),
    }
}

fn to_filter_expr(expr: &Expr) -> Result<FilterExpr> {
    match expr {
        Expr::Nested(inner) => to_filter_expr(inner),
        Expr::BinaryOp { left, op: BinaryOperator::And, right } => {
            Ok(FilterExpr::And(vec![to_filter_expr(left)?, to_filter_expr(right)?]))
        }
        Expr::BinaryOp { left, op: BinaryOperator::Or, right } => {
            Ok(FilterExpr::Or(vec![to_filter_expr(left)?, to_filter_expr(right)?]))
        }
        Expr::BinaryOp { left, op, right } if cmp_op(op).is_some() => {
            let field = identifier_name(left)?;
            let value = literal_value(right)?;
            Ok(FilterExpr::Cmp { field, op: cmp_op(op).unwrap(), value })
        }
        Expr::Like { negated: false, expr, pattern, .. } => {
            let field = identifier_name(expr)?;
            let Expr::Value(SqlValue::SingleQuotedString(pattern)) = pattern.as_ref() else {
                return Err(RemError::UnsupportedSqlConstruct("LIKE pattern must be a string literal".to_string()));
            };
            // `%substr%` style patterns collapse to a substring containment
            // check; REM's `__like` filter never supports true SQL wildcard
            // positions.
            Ok(FilterExpr::Like { field, pattern: pattern.trim_matches('%').to_string() })
        }
        Expr::InList { expr, list, negated: false } => {
            let field = identifier_name(expr)?;
            let values = list.iter().map(literal_value).collect::<Result<Vec<Value>>>()?;
            Ok(FilterExpr::In { field, values })
        }
        Expr::IsNull(inner) => Ok(FilterExpr::IsNull { field: identifier_name(inner)? }),
        Expr::IsNotNull(inner) => Ok(FilterExpr::IsNotNull { field: identifier_name(inner)? }),
        _ => Err(RemError::UnsupportedSqlConstruct(
            "WHERE must combine comparisons, LIKE, IN, and IS [NOT] NULL with AND/OR".to_string(),
        )),
    }
}

fn cmp_op(op: &BinaryOperator) -> Option<CmpOp> {
    match op {
        BinaryOperator::Eq => Some(CmpOp::Eq),
        BinaryOperator::NotEq => Some(CmpOp::Ne),
        BinaryOperator::Lt => Some(CmpOp::Lt),
        BinaryOperator::LtEq => Some(CmpOp::Lte),
        BinaryOperator::Gt => Some(CmpOp::Gt),
        BinaryOperator::GtEq => Some(CmpOp::Gte),
        _ => None,
    }
}

fn identifier_name(expr: &Expr) -> Result<String> {
    match expr {
        Expr::Identifier(ident) => Ok(ident.value.clone()),
        _ => Err(RemError::UnsupportedSqlConstruct("left-hand side of a filter must be a column name".to_string())),
    }
}

fn literal_value(expr: &Expr) -> Result<Value> {
    match expr {
        Expr::Value(SqlValue::SingleQuotedString(s)) => Ok(Value::String(s.clone())),
        Expr::Value(SqlValue::Number(n, _)) => {
            if let Ok(i) = n.parse::<i64>() {
                Ok(Value::from(i))
            } else {
                n.parse::<f64>().map(Value::from).map_err(|_| RemError::UnsupportedSqlConstruct(format!("invalid numeric literal: {n}")))
            }
        }
        Expr::Value(SqlValue::Boolean(b)) => Ok(Value::Bool(*b)),
        _ => Err(RemError::UnsupportedSqlConstruct("right-hand side of a filter must be a literal".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_equality_filter() {
        let filter = validate_and_extract_filters("SELECT * FROM resources WHERE category = 'diary'", "resources").unwrap().unwrap();
        let row = serde_json::json!({"category": "diary"});
        assert!(filter.matches(&row));
        assert!(!filter.matches(&serde_json::json!({"category": "other"})));
    }

    #[test]
    fn extracts_and_chain() {
        let filter = validate_and_extract_filters(
            "SELECT * FROM resources WHERE category = 'diary' AND name LIKE '%alpha%'",
            "resources",
        )
        .unwrap()
        .unwrap();
        assert!(filter.matches(&serde_json::json!({"category": "diary", "name": "my-alpha-doc"})));
        assert!(!filter.matches(&serde_json::json!({"category": "diary", "name": "beta-doc"})));
    }

    #[test]
    fn extracts_or_chain() {
        let filter =
            validate_and_extract_filters("SELECT * FROM resources WHERE category = 'a' OR category = 'b'", "resources").unwrap().unwrap();
        assert!(filter.matches(&serde_json::json!({"category": "a"})));
        assert!(filter.matches(&serde_json::json!({"category": "b"})));
        assert!(!filter.matches(&serde_json::json!({"category": "c"})));
    }

    #[test]
    fn extracts_comparison_operators() {
        let filter = validate_and_extract_filters("SELECT * FROM resources WHERE priority >= 3", "resources").unwrap().unwrap();
        assert!(filter.matches(&serde_json::json!({"priority": 3})));
        assert!(filter.matches(&serde_json::json!({"priority": 5})));
        assert!(!filter.matches(&serde_json::json!({"priority": 2})));
    }

    #[test]
    fn extracts_in_list() {
        let filter = validate_and_extract_filters("SELECT * FROM resources WHERE category IN ('a', 'b')", "resources").unwrap().unwrap();
        assert!(filter.matches(&serde_json::json!({"category": "a"})));
        assert!(!filter.matches(&serde_json::json!({"category": "c"})));
    }

    #[test]
    fn extracts_is_null() {
        let filter = validate_and_extract_filters("SELECT * FROM resources WHERE category IS NULL", "resources").unwrap().unwrap();
        assert!(filter.matches(&serde_json::json!({"category": null})));
        assert!(!filter.matches(&serde_json::json!({"category": "a"})));
    }

    #[test]
    fn extracts_parenthesized_mixed_and_or() {
        let filter = validate_and_extract_filters(
            "SELECT * FROM resources WHERE (category = 'a' OR category = 'b') AND priority > 1",
            "resources",
        )
        .unwrap()
        .unwrap();
        assert!(filter.matches(&serde_json::json!({"category": "a", "priority": 2})));
        assert!(!filter.matches(&serde_json::json!({"category": "a", "priority": 1})));
        assert!(!filter.matches(&serde_json::json!({"category": "c", "priority": 2})));
    }

    #[test]
    fn rejects_join() {
        let err = validate_and_extract_filters("SELECT * FROM resources JOIN moments ON resources.id = moments.id", "resources").unwrap_err();
        assert!(matches!(err, RemError::UnsupportedSqlConstruct(_)));
    }

    #[test]
    fn rejects_table_mismatch() {
        let err = validate_and_extract_filters("SELECT * FROM moments", "resources").unwrap_err();
        assert!(matches!(err, RemError::UnsupportedSqlConstruct(_)));
    }
}
