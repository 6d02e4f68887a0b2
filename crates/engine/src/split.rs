//! Split-by partitioning
//!
//! Splits the final row sequence into independent sub-tables, one per
//! distinct combination of split-by values. Partition order is first-seen,
//! and rows keep their relative order inside a partition.

use rustc_hash::FxHashMap;

use crate::row::Row;
use crate::style::ColumnStyle;
use crate::value::Value;

/// Separator between `column: value` pairs in a partition title
pub const TITLE_SEPARATOR: &str = " • ";

/// One sub-table
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    /// Split-by columns, in header order
    pub columns: Vec<String>,
    /// Shared split-by values, parallel to `columns`
    pub keys: Vec<Value>,
    pub rows: Vec<Row>,
}

impl Partition {
    /// `"State: CA • Year: 2024"`; empty for the implicit partition
    pub fn title(&self) -> String {
        self.columns
            .iter()
            .zip(&self.keys)
            .map(|(c, v)| format!("{}: {}", c, v))
            .collect::<Vec<_>>()
            .join(TITLE_SEPARATOR)
    }

    pub fn is_implicit(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Columns (in header order) whose style marks them as split-by
pub fn split_by_columns(headers: &[String], styles: &FxHashMap<String, ColumnStyle>) -> Vec<String> {
    headers
        .iter()
        .filter(|h| styles.get(*h).is_some_and(ColumnStyle::is_split_by))
        .cloned()
        .collect()
}

/// Partition rows by `columns`. With no split-by columns there is a single
/// implicit partition holding every row.
pub fn split_rows(rows: Vec<Row>, columns: &[String]) -> Vec<Partition> {
    if columns.is_empty() {
        return vec![Partition {
            columns: Vec::new(),
            keys: Vec::new(),
            rows,
        }];
    }

    let mut index: FxHashMap<String, usize> = FxHashMap::default();
    let mut partitions: Vec<Partition> = Vec::new();
    for row in rows {
        let key = row.key_for(columns);
        let slot = match index.get(&key) {
            Some(&i) => i,
            None => {
                index.insert(key, partitions.len());
                partitions.push(Partition {
                    columns: columns.to_vec(),
                    keys: columns.iter().map(|c| row.get(c).clone()).collect(),
                    rows: Vec::new(),
                });
                partitions.len() - 1
            }
        };
        partitions[slot].rows.push(row);
    }
    log::debug!("split: {} partitions over {:?}", partitions.len(), columns);
    partitions
}
