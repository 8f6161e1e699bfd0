//! Predicate evaluation with three-valued logic
//!
//! A comparison against a null or missing attribute is unknown rather than
//! false, and unknown propagates through `AND`, `OR` and `NOT` the way SQL
//! does. A feature passes only when its predicate is known to be true.

use super::ast::{CompareOp, FilterNode, Literal};
use super::parser::parse_date;
use geosift_core::models::Feature;
use serde_json::Value;
use std::cmp::Ordering;

/// `Some(true)`, `Some(false)` or unknown
pub type Truth = Option<bool>;

impl FilterNode {
    pub fn evaluate(&self, feature: &Feature) -> Truth {
        match self {
            FilterNode::Comparison { field, op, value } => {
                compare(attribute(feature, field), *op, value)
            }
            FilterNode::SetMembership { field, values } => {
                let actual = attribute(feature, field);
                any(values.iter().map(|v| compare(actual, CompareOp::Eq, v)))
            }
            FilterNode::Range { field, low, high } => {
                let actual = attribute(feature, field);
                all([compare(actual, CompareOp::GtEq, low), compare(actual, CompareOp::LtEq, high)])
            }
            FilterNode::NullTest { field, is_null } => {
                Some(attribute(feature, field).is_null() == *is_null)
            }
            FilterNode::Pattern { field, pattern } => {
                as_text(attribute(feature, field)).map(|text| pattern.is_match(&text))
            }
            FilterNode::And(nodes) => all(nodes.iter().map(|n| n.evaluate(feature))),
            FilterNode::Or(nodes) => any(nodes.iter().map(|n| n.evaluate(feature))),
            FilterNode::Not(node) => node.evaluate(feature).map(|b| !b),
            FilterNode::Constant(value) => Some(*value),
        }
    }

    /// True only when the predicate is known to hold
    pub fn matches(&self, feature: &Feature) -> bool {
        self.evaluate(feature) == Some(true)
    }
}

static NULL: Value = Value::Null;

fn attribute<'a>(feature: &'a Feature, field: &str) -> &'a Value {
    feature.attribute(field).unwrap_or(&NULL)
}

fn all(values: impl IntoIterator<Item = Truth>) -> Truth {
    let mut result = Some(true);
    for value in values {
        match value {
            Some(false) => return Some(false),
            None => result = None,
            Some(true) => {}
        }
    }
    result
}

fn any(values: impl IntoIterator<Item = Truth>) -> Truth {
    let mut result = Some(false);
    for value in values {
        match value {
            Some(true) => return Some(true),
            None => result = None,
            Some(false) => {}
        }
    }
    result
}

/// Compare a stored attribute value against a literal
pub fn compare(actual: &Value, op: CompareOp, literal: &Literal) -> Truth {
    let ordering = ordering(actual, literal)?;
    Some(match op {
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::NotEq => ordering != Ordering::Equal,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::LtEq => ordering != Ordering::Greater,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::GtEq => ordering != Ordering::Less,
    })
}

/// Ordering of `actual` relative to `literal`, or None when the two are
/// not comparable.
///
/// Numbers compare numerically, including against numeric-looking text on
/// either side. Text compares case-sensitively. Dates compare against epoch
/// milliseconds or parseable date text.
fn ordering(actual: &Value, literal: &Literal) -> Option<Ordering> {
    match (actual, literal) {
        (_, Literal::Null) => None,
        (Value::Null | Value::Array(_) | Value::Object(_), _) => None,

        (Value::Number(n), Literal::Number(lit)) => n.as_f64()?.partial_cmp(lit),
        (Value::String(s), Literal::Number(lit)) => numeric(s)?.partial_cmp(lit),

        (Value::String(s), Literal::String(lit)) => Some(s.as_str().cmp(lit.as_str())),
        (Value::Number(n), Literal::String(lit)) => n.as_f64()?.partial_cmp(&numeric(lit)?),

        (Value::Bool(b), Literal::Bool(lit)) => Some(b.cmp(lit)),

        (Value::Number(n), Literal::Date(ms)) => n.as_f64()?.partial_cmp(&(*ms as f64)),
        (Value::String(s), Literal::Date(ms)) => Some(parse_date(s)?.cmp(ms)),

        _ => None,
    }
}

/// Numeric reading of attribute text, shared by sorting and statistics
pub(crate) fn numeric(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Text form used for LIKE matching
fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::compile;
    use serde_json::json;

    fn feature(properties: Value) -> Feature {
        match properties {
            Value::Object(map) => Feature::without_geometry(map),
            _ => panic!("properties must be an object"),
        }
    }

    fn eval(clause: &str, properties: Value) -> Truth {
        compile(clause).unwrap().unwrap().evaluate(&feature(properties))
    }

    #[test]
    fn test_numeric_comparisons() {
        assert_eq!(eval("pop > 100", json!({"pop": 150})), Some(true));
        assert_eq!(eval("pop > 100", json!({"pop": 50})), Some(false));
        assert_eq!(eval("pop <= 100", json!({"pop": 100})), Some(true));
        assert_eq!(eval("100 < pop", json!({"pop": 150})), Some(true));
        assert_eq!(eval("pop <> 1", json!({"pop": 1.0})), Some(false));
    }

    #[test]
    fn test_text_coercion() {
        assert_eq!(eval("code = 42", json!({"code": "42"})), Some(true));
        assert_eq!(eval("code = '42'", json!({"code": 42})), Some(true));
        assert_eq!(eval("code = 42", json!({"code": "forty-two"})), None);
        assert_eq!(eval("name = 'denver'", json!({"name": "Denver"})), Some(false));
    }

    #[test]
    fn test_null_is_unknown() {
        assert_eq!(eval("a = 1", json!({"a": null})), None);
        assert_eq!(eval("a = 1", json!({})), None);
        assert_eq!(eval("NOT a = 1", json!({"a": null})), None);
        assert_eq!(eval("a <> 1", json!({"a": null})), None);
    }

    #[test]
    fn test_kleene_connectives() {
        assert_eq!(eval("a = 1 OR b = 2", json!({"a": null, "b": 2})), Some(true));
        assert_eq!(eval("a = 1 OR b = 2", json!({"a": null, "b": 3})), None);
        assert_eq!(eval("a = 1 AND b = 2", json!({"a": null, "b": 3})), Some(false));
        assert_eq!(eval("a = 1 AND b = 2", json!({"a": null, "b": 2})), None);
    }

    #[test]
    fn test_null_tests() {
        assert_eq!(eval("a IS NULL", json!({"a": null})), Some(true));
        assert_eq!(eval("a IS NULL", json!({})), Some(true));
        assert_eq!(eval("a IS NOT NULL", json!({"a": 0})), Some(true));
        assert_eq!(eval("a IS NOT NULL", json!({"a": null})), Some(false));
    }

    #[test]
    fn test_membership_and_range() {
        assert_eq!(eval("k IN (1, 2, 3)", json!({"k": "2"})), Some(true));
        assert_eq!(eval("k IN (1, 2, 3)", json!({"k": 4})), Some(false));
        assert_eq!(eval("k IN (1, NULL)", json!({"k": 4})), None);
        assert_eq!(eval("k NOT IN (1, 2)", json!({"k": 4})), Some(true));
        assert_eq!(eval("k BETWEEN 1 AND 3", json!({"k": 3})), Some(true));
        assert_eq!(eval("k BETWEEN 1 AND 3", json!({"k": "2.5"})), Some(true));
        assert_eq!(eval("k NOT BETWEEN 1 AND 3", json!({"k": 0})), Some(true));
        assert_eq!(eval("k BETWEEN 1 AND 3", json!({})), None);
    }

    #[test]
    fn test_patterns() {
        assert_eq!(eval("name LIKE 'Den%'", json!({"name": "Denver"})), Some(true));
        assert_eq!(eval("name LIKE 'den%'", json!({"name": "Denver"})), Some(false));
        assert_eq!(eval("name ILIKE 'den%'", json!({"name": "Denver"})), Some(true));
        assert_eq!(eval("zip LIKE '80%'", json!({"zip": 80202})), Some(true));
        assert_eq!(eval("name NOT LIKE 'B%'", json!({"name": "Denver"})), Some(true));
        assert_eq!(eval("name LIKE 'B%'", json!({})), None);
    }

    #[test]
    fn test_dates() {
        let clause = "opened >= DATE '2020-01-01'";
        assert_eq!(eval(clause, json!({"opened": "2021-06-30"})), Some(true));
        assert_eq!(eval(clause, json!({"opened": 1_500_000_000_000_i64})), Some(false));
        assert_eq!(eval(clause, json!({"opened": "not a date"})), None);
        assert_eq!(
            eval("t < TIMESTAMP '2020-01-01 12:00:00'", json!({"t": "2020-01-01T11:59:59Z"})),
            Some(true)
        );
    }

    #[test]
    fn test_booleans() {
        assert_eq!(eval("active = TRUE", json!({"active": true})), Some(true));
        assert_eq!(eval("active = FALSE", json!({"active": true})), Some(false));
        assert_eq!(eval("active = 1", json!({"active": true})), None);
    }

    #[test]
    fn test_case_insensitive_field_fallback() {
        assert_eq!(eval("NAME = 'Denver'", json!({"name": "Denver"})), Some(true));
    }

    #[test]
    fn test_unknown_never_matches() {
        let node = compile("a = 1").unwrap().unwrap();
        assert!(!node.matches(&feature(json!({"a": null}))));
        let node = compile("NOT (a = 1)").unwrap().unwrap();
        assert!(!node.matches(&feature(json!({}))));
    }
}
