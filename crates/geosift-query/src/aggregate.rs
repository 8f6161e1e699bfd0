//! Grouped statistics over filtered features

use crate::filter::eval;
use crate::sort::compare_values;
use geosift_core::models::{Aggregate, AggregateKind, Feature, Properties};
use serde_json::{json, Value};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Field name that makes `count` count rows rather than non-null values
pub const ALL_ROWS: &str = "*";

static NULL: Value = Value::Null;
static PRESENT: Value = Value::Bool(true);

/// Running state for one aggregate within one group
#[derive(Debug, Clone, Default)]
struct Accumulator {
    count: u64,
    sum: f64,
    integral_sum: Option<i64>,
    numeric: u64,
    extreme: Option<Value>,
}

impl Accumulator {
    fn new() -> Self {
        Self { integral_sum: Some(0), ..Default::default() }
    }

    fn add(&mut self, kind: AggregateKind, value: &Value) {
        if value.is_null() {
            return;
        }
        self.count += 1;

        match kind {
            AggregateKind::Count => {}
            AggregateKind::Sum | AggregateKind::Avg => {
                let Some(n) = numeric(value) else { return };
                self.numeric += 1;
                self.sum += n;
                self.integral_sum = match (self.integral_sum, value.as_i64()) {
                    (Some(total), Some(i)) => total.checked_add(i),
                    _ => None,
                };
            }
            AggregateKind::Min | AggregateKind::Max => {
                let wanted = if kind == AggregateKind::Min { Ordering::Less } else { Ordering::Greater };
                let replace = match &self.extreme {
                    None => true,
                    Some(current) => compare_values(value, current) == wanted,
                };
                if replace {
                    self.extreme = Some(value.clone());
                }
            }
        }
    }

    fn finish(&self, kind: AggregateKind) -> Value {
        match kind {
            AggregateKind::Count => json!(self.count),
            AggregateKind::Sum if self.numeric == 0 => Value::Null,
            AggregateKind::Sum => match self.integral_sum {
                Some(total) => json!(total),
                None => float(self.sum),
            },
            AggregateKind::Avg if self.numeric == 0 => Value::Null,
            AggregateKind::Avg => float(self.sum / self.numeric as f64),
            AggregateKind::Min | AggregateKind::Max => self.extreme.clone().unwrap_or(Value::Null),
        }
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => eval::numeric(s),
        _ => None,
    }
}

fn float(value: f64) -> Value {
    serde_json::Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null)
}

struct Group {
    key: Vec<Value>,
    accumulators: Vec<Accumulator>,
}

/// Compute `aggregates` per distinct combination of `group_by` values.
///
/// Returns one geometry-less feature per group, in order of first
/// appearance. Without grouping there is always exactly one row, even for
/// an empty input.
pub fn aggregate<'a, I>(features: I, aggregates: &[Aggregate], group_by: &[String]) -> Vec<Feature>
where
    I: IntoIterator<Item = &'a Feature>,
{
    let mut groups: Vec<Group> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    if group_by.is_empty() {
        groups.push(Group { key: Vec::new(), accumulators: vec![Accumulator::new(); aggregates.len()] });
        index.insert(String::new(), 0);
    }

    for feature in features {
        let key: Vec<Value> = group_by
            .iter()
            .map(|field| feature.attribute(field).cloned().unwrap_or(Value::Null))
            .collect();
        let lookup = if group_by.is_empty() { String::new() } else { Value::Array(key.clone()).to_string() };

        let slot = *index.entry(lookup).or_insert_with(|| {
            groups.push(Group { key, accumulators: vec![Accumulator::new(); aggregates.len()] });
            groups.len() - 1
        });

        let group = &mut groups[slot];
        for (agg, acc) in aggregates.iter().zip(group.accumulators.iter_mut()) {
            if agg.kind == AggregateKind::Count && agg.field == ALL_ROWS {
                acc.add(agg.kind, &PRESENT);
            } else {
                let value = feature.attribute(&agg.field).unwrap_or(&NULL);
                acc.add(agg.kind, value);
            }
        }
    }

    tracing::debug!(groups = groups.len(), aggregates = aggregates.len(), "Aggregated features");

    groups
        .into_iter()
        .map(|group| {
            let mut properties = Properties::new();
            for (field, value) in group_by.iter().zip(group.key) {
                properties.insert(field.clone(), value);
            }
            for (agg, acc) in aggregates.iter().zip(group.accumulators.iter()) {
                properties.insert(agg.output_name(), acc.finish(agg.kind));
            }
            Feature::without_geometry(properties)
        })
        .collect()
}
