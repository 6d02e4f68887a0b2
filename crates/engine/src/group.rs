//! Grouping and aggregation
//!
//! Rows are grouped by the joined values of every group-by column. Each other
//! column is reduced with its configured [`Reducer`]; the reducer is resolved
//! once per column and each group keeps one [`Accumulator`] per column.

use std::cmp::Ordering;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::row::{Row, RowId};
use crate::style::ColumnStyle;
use crate::value::{compare_natural, Value};

/// Per-column reduction applied while grouping
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reducer {
    #[serde(rename = "sum")]
    Sum,
    #[serde(rename = "avg")]
    Avg,
    /// Non-empty values
    #[serde(rename = "cnt")]
    Count,
    /// All rows
    #[serde(rename = "rowcnt")]
    RowCount,
    #[serde(rename = "min")]
    Min,
    #[serde(rename = "max")]
    Max,
    #[serde(rename = "min-max")]
    MinMax,
    #[serde(rename = "concat")]
    Concat,
    #[serde(rename = "unique concat", alias = "unique_concat")]
    UniqueConcat,
    #[serde(rename = "unique cnt", alias = "unique_cnt")]
    UniqueCount,
    /// Distinct values, Empty included
    #[serde(rename = "unique rowcnt")]
    UniqueRowCount,
    #[default]
    #[serde(rename = "first")]
    First,
    #[serde(rename = "last")]
    Last,
}

impl Reducer {
    pub const ALL: [Reducer; 13] = [
        Reducer::Sum,
        Reducer::Avg,
        Reducer::Count,
        Reducer::RowCount,
        Reducer::Min,
        Reducer::Max,
        Reducer::MinMax,
        Reducer::Concat,
        Reducer::UniqueConcat,
        Reducer::UniqueCount,
        Reducer::UniqueRowCount,
        Reducer::First,
        Reducer::Last,
    ];

    /// Configuration name, also used in grouped header labels
    pub fn name(self) -> &'static str {
        match self {
            Reducer::Sum => "sum",
            Reducer::Avg => "avg",
            Reducer::Count => "cnt",
            Reducer::RowCount => "rowcnt",
            Reducer::Min => "min",
            Reducer::Max => "max",
            Reducer::MinMax => "min-max",
            Reducer::Concat => "concat",
            Reducer::UniqueConcat => "unique concat",
            Reducer::UniqueCount => "unique cnt",
            Reducer::UniqueRowCount => "unique rowcnt",
            Reducer::First => "first",
            Reducer::Last => "last",
        }
    }

    fn accumulator(self) -> Accumulator {
        match self {
            Reducer::Sum => Accumulator::Sum { sum: 0.0, count: 0 },
            Reducer::Avg => Accumulator::Avg { sum: 0.0, count: 0 },
            Reducer::Count => Accumulator::Count(0),
            Reducer::RowCount => Accumulator::RowCount(0),
            Reducer::Min => Accumulator::Min(None),
            Reducer::Max => Accumulator::Max(None),
            Reducer::MinMax => Accumulator::MinMax(None),
            Reducer::Concat => Accumulator::Concat(Vec::new()),
            Reducer::UniqueConcat => Accumulator::UniqueConcat(Distinct::default()),
            Reducer::UniqueCount => Accumulator::UniqueCount(Distinct::default()),
            Reducer::UniqueRowCount => Accumulator::UniqueRowCount(Distinct::default()),
            Reducer::First => Accumulator::First(None),
            Reducer::Last => Accumulator::Last(None),
        }
    }
}

// =============================================================================
// Accumulators
// =============================================================================

/// Distinct values in first-seen order
#[derive(Debug, Default)]
struct Distinct {
    seen: FxHashSet<Value>,
    order: Vec<Value>,
}

impl Distinct {
    fn insert(&mut self, v: &Value) {
        if self.seen.insert(v.clone()) {
            self.order.push(v.clone());
        }
    }
}

/// Running state of one reducer for one group
#[derive(Debug)]
enum Accumulator {
    Sum { sum: f64, count: usize },
    Avg { sum: f64, count: usize },
    Count(usize),
    RowCount(usize),
    Min(Option<Value>),
    Max(Option<Value>),
    MinMax(Option<(Value, Value)>),
    Concat(Vec<String>),
    UniqueConcat(Distinct),
    UniqueCount(Distinct),
    UniqueRowCount(Distinct),
    First(Option<Value>),
    Last(Option<Value>),
}

fn replace_if(slot: &mut Option<Value>, v: &Value, wanted: Ordering) {
    match slot {
        Some(cur) if compare_natural(v, cur) != wanted => {}
        _ => *slot = Some(v.clone()),
    }
}

impl Accumulator {
    fn push(&mut self, v: &Value) {
        match self {
            Accumulator::Sum { sum, count } | Accumulator::Avg { sum, count } => {
                if let Some(n) = v.as_number() {
                    *sum += n;
                    *count += 1;
                }
            }
            Accumulator::Count(n) => {
                if !v.is_empty() {
                    *n += 1;
                }
            }
            Accumulator::RowCount(n) => *n += 1,
            Accumulator::Min(slot) => {
                if !v.is_empty() {
                    replace_if(slot, v, Ordering::Less);
                }
            }
            Accumulator::Max(slot) => {
                if !v.is_empty() {
                    replace_if(slot, v, Ordering::Greater);
                }
            }
            Accumulator::MinMax(slot) => {
                if v.is_empty() {
                    return;
                }
                match slot {
                    None => *slot = Some((v.clone(), v.clone())),
                    Some((lo, hi)) => {
                        if compare_natural(v, lo) == Ordering::Less {
                            *lo = v.clone();
                        }
                        if compare_natural(v, hi) == Ordering::Greater {
                            *hi = v.clone();
                        }
                    }
                }
            }
            Accumulator::Concat(parts) => parts.push(v.to_string()),
            Accumulator::UniqueConcat(d) | Accumulator::UniqueCount(d) => {
                if !v.is_empty() {
                    d.insert(v);
                }
            }
            Accumulator::UniqueRowCount(d) => d.insert(v),
            Accumulator::First(slot) => {
                if slot.is_none() {
                    *slot = Some(v.clone());
                }
            }
            Accumulator::Last(slot) => *slot = Some(v.clone()),
        }
    }

    fn finish(self) -> Value {
        match self {
            Accumulator::Sum { sum, .. } => Value::Number(sum),
            Accumulator::Avg { sum, count } => {
                if count > 0 {
                    Value::Number(sum / count as f64)
                } else {
                    Value::Empty
                }
            }
            Accumulator::Count(n) | Accumulator::RowCount(n) => Value::Number(n as f64),
            Accumulator::Min(v) | Accumulator::Max(v) | Accumulator::First(v) | Accumulator::Last(v) => {
                v.unwrap_or_default()
            }
            Accumulator::MinMax(None) => Value::Empty,
            Accumulator::MinMax(Some((lo, hi))) => Value::Text(format!("{} - {}", lo, hi)),
            Accumulator::Concat(parts) => Value::from(parts.join(", ")),
            Accumulator::UniqueConcat(d) => {
                let parts: Vec<String> = d.order.iter().map(Value::to_string).collect();
                Value::from(parts.join(", "))
            }
            Accumulator::UniqueCount(d) | Accumulator::UniqueRowCount(d) => Value::Number(d.order.len() as f64),
        }
    }
}

// =============================================================================
// Grouping
// =============================================================================

/// Columns (in header order) whose style marks them as group-by
pub fn group_by_columns(headers: &[String], styles: &FxHashMap<String, ColumnStyle>) -> Vec<String> {
    headers
        .iter()
        .filter(|h| styles.get(*h).is_some_and(ColumnStyle::is_group_by))
        .cloned()
        .collect()
}

/// Reducer per non-group column (default `first`)
pub fn reducers_for(headers: &[String], styles: &FxHashMap<String, ColumnStyle>) -> Vec<(String, Reducer)> {
    headers
        .iter()
        .filter_map(|h| {
            let reducer = match styles.get(h) {
                Some(style) => style.effective_reducer()?,
                None => Reducer::default(),
            };
            Some((h.clone(), reducer))
        })
        .collect()
}

/// Header label while grouping: reduced columns show their reducer
pub fn grouped_header_label(column: &str, group_by: &[String], reducer: Option<Reducer>) -> String {
    match reducer {
        Some(r) if !group_by.is_empty() && !group_by.iter().any(|g| g == column) => {
            format!("{} ({})", column, r.name())
        }
        _ => column.to_string(),
    }
}

struct Group {
    key: String,
    keys: Vec<Value>,
    accumulators: Vec<Accumulator>,
}

/// Group and reduce `rows`. With no group-by columns the rows are returned unchanged.
///
/// Groups appear in first-seen order. Each output row holds the shared
/// group-by values plus one reduced value per other column, and is
/// identified by `RowId::Group(key)`.
pub fn group_rows(rows: Vec<Row>, headers: &[String], styles: &FxHashMap<String, ColumnStyle>) -> Vec<Row> {
    let group_by = group_by_columns(headers, styles);
    if group_by.is_empty() {
        return rows;
    }
    let reducers = reducers_for(headers, styles);

    let mut index: FxHashMap<String, usize> = FxHashMap::default();
    let mut groups: Vec<Group> = Vec::new();
    for row in &rows {
        let key = row.key_for(&group_by);
        let slot = match index.get(&key) {
            Some(&i) => i,
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(Group {
                    key,
                    keys: group_by.iter().map(|c| row.get(c).clone()).collect(),
                    accumulators: reducers.iter().map(|(_, r)| r.accumulator()).collect(),
                });
                groups.len() - 1
            }
        };
        let group = &mut groups[slot];
        for ((column, _), acc) in reducers.iter().zip(group.accumulators.iter_mut()) {
            acc.push(row.get(column));
        }
    }

    log::debug!("group: {} rows into {} groups", rows.len(), groups.len());

    groups
        .into_iter()
        .map(|g| {
            let mut out = Row::new(RowId::Group(g.key));
            for (column, v) in group_by.iter().zip(g.keys) {
                out.set(column.clone(), v);
            }
            for ((column, _), acc) in reducers.iter().zip(g.accumulators) {
                out.set(column.clone(), acc.finish());
            }
            out
        })
        .collect()
}
