//! Multi-field ordering of result features

use crate::filter::eval;
use geosift_core::models::{Feature, SortDirection, SortField};
use serde_json::Value;
use std::cmp::Ordering;

/// Total order over attribute values: nulls, booleans, numbers, text, then
/// arrays and objects (which tie with each other).
///
/// Text that reads as a number ranks among the numbers by its value, the
/// same coercion the filter applies; a number sorts before text of equal
/// value.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    sort_key(a).cmp(&sort_key(b))
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum SortKey<'a> {
    Null,
    Bool(bool),
    Number(TotalF64, Option<&'a str>),
    Text(&'a str),
    Composite,
}

/// `f64` ordered by `total_cmp`
#[derive(Debug)]
struct TotalF64(f64);

impl PartialEq for TotalF64 {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TotalF64 {}

impl PartialOrd for TotalF64 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TotalF64 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

fn sort_key(value: &Value) -> SortKey<'_> {
    match value {
        Value::Null => SortKey::Null,
        Value::Bool(b) => SortKey::Bool(*b),
        Value::Number(n) => SortKey::Number(TotalF64(n.as_f64().unwrap_or(f64::NAN)), None),
        Value::String(s) => match eval::numeric(s) {
            Some(n) => SortKey::Number(TotalF64(n), Some(s.as_str())),
            None => SortKey::Text(s.as_str()),
        },
        Value::Array(_) | Value::Object(_) => SortKey::Composite,
    }
}

static NULL: Value = Value::Null;

/// Compare two features by each sort field in turn
pub fn compare_features(a: &Feature, b: &Feature, fields: &[SortField]) -> Ordering {
    for sort in fields {
        let left = a.attribute(&sort.field).unwrap_or(&NULL);
        let right = b.attribute(&sort.field).unwrap_or(&NULL);
        let ordering = match sort.direction {
            SortDirection::Ascending => compare_values(left, right),
            SortDirection::Descending => compare_values(right, left),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Stable sort; features equal on every field keep their input order.
pub fn sort_features(features: &mut [Feature], fields: &[SortField]) {
    if fields.is_empty() {
        return;
    }
    features.sort_by(|a, b| compare_features(a, b, fields));
}
