//! Rows and row sets
//!
//! A row is a column-name → value map plus a stable identity. Source rows get
//! a 1-based sequence id at normalization time; grouped rows are identified by
//! their joined group key.

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Separator used when joining group-by / split-by values into one key.
/// The unit separator never appears in ordinary cell text.
pub const KEY_SEPARATOR: char = '\u{1F}';

static EMPTY: Value = Value::Empty;

/// Stable row identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RowId {
    /// Source row, 1-based
    Seq(u64),
    /// Grouped row, keyed by the joined group-by values
    Group(String),
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowId::Seq(n) => write!(f, "{}", n),
            RowId::Group(key) => {
                let readable = key.replace(KEY_SEPARATOR, " / ");
                f.write_str(&readable)
            }
        }
    }
}

/// A single record
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub id: RowId,
    cells: FxHashMap<String, Value>,
}

impl Row {
    pub fn new(id: RowId) -> Self {
        Self {
            id,
            cells: FxHashMap::default(),
        }
    }

    /// Build a row from `(column, value)` pairs
    pub fn from_pairs<I, K>(id: RowId, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self {
            id,
            cells: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Value for a column; a missing column reads as `Empty`
    pub fn get(&self, column: &str) -> &Value {
        self.cells.get(column).unwrap_or(&EMPTY)
    }

    pub fn set(&mut self, column: impl Into<String>, value: Value) {
        self.cells.insert(column.into(), value);
    }

    pub fn contains(&self, column: &str) -> bool {
        self.cells.contains_key(column)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Values of `columns` joined with [`KEY_SEPARATOR`] (Empty → "")
    pub fn key_for(&self, columns: &[String]) -> String {
        join_key(columns.iter().map(|c| self.get(c)))
    }
}

/// Join values into a group/split key
pub fn join_key<'a>(values: impl Iterator<Item = &'a Value>) -> String {
    let mut key = String::new();
    for (i, v) in values.enumerate() {
        if i > 0 {
            key.push(KEY_SEPARATOR);
        }
        key.push_str(&v.to_string());
    }
    key
}

/// Headers plus rows, as produced by the normalizer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl RowSet {
    pub fn new(headers: Vec<String>, rows: Vec<Row>) -> Self {
        Self { headers, rows }
    }

    /// Build from positional records, filling every header and assigning
    /// sequence ids from 1. Short records are padded with `Empty`.
    pub fn from_records(headers: Vec<String>, records: Vec<Vec<Value>>) -> Self {
        let rows = records
            .into_iter()
            .enumerate()
            .map(|(idx, record)| {
                let mut values = record.into_iter();
                let mut row = Row::new(RowId::Seq(idx as u64 + 1));
                for h in &headers {
                    row.set(h.clone(), values.next().unwrap_or_default());
                }
                row
            })
            .collect();
        Self { headers, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_column_reads_empty() {
        let row = Row::from_pairs(RowId::Seq(1), [("a", Value::from(1.0))]);
        assert_eq!(row.get("a"), &Value::Number(1.0));
        assert_eq!(row.get("zzz"), &Value::Empty);
    }

    #[test]
    fn test_from_records_pads_and_numbers() {
        let set = RowSet::from_records(
            vec!["a".into(), "b".into()],
            vec![vec![Value::from("x")], vec![Value::from("y"), Value::from(2.0)]],
        );
        assert_eq!(set.rows[0].id, RowId::Seq(1));
        assert_eq!(set.rows[1].id, RowId::Seq(2));
        assert_eq!(set.rows[0].get("b"), &Value::Empty);
        assert!(set.rows[0].contains("b"));
        assert_eq!(set.rows[1].get("b"), &Value::Number(2.0));
    }

    #[test]
    fn test_key_for_uses_unit_separator() {
        let row = Row::from_pairs(
            RowId::Seq(1),
            [("d", Value::from("Eng")), ("s", Value::Empty), ("n", Value::from(3.0))],
        );
        let key = row.key_for(&["d".into(), "s".into(), "n".into()]);
        assert_eq!(key, "Eng\u{1F}\u{1F}3");
        assert_eq!(RowId::Group(key).to_string(), "Eng /  / 3");
    }
}
