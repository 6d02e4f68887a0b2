//! Multi-key row sorting
//!
//! Sort keys come from the visible columns, in visible order, whose style
//! carries a sort mode other than `none`. The first key is primary.
//!
//! Comparison per key:
//! - "numbers" modes: exact comparison, with integer-like values keeping
//!   every digit even against floats. A value that does not coerce to a
//!   number always sorts after one that does; two such values are equal.
//! - plain modes: Empty ranks after a defined value when ascending (before it
//!   when descending), otherwise case-insensitive text comparison.
//!
//! The sort is stable, so sorting is idempotent and ties keep input order.

use std::cmp::Ordering;

use rustc_hash::FxHashMap;

use crate::row::Row;
use crate::style::{ColumnStyle, SortMode};
use crate::value::{compare_numbers, Value};

/// One sort directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub column: String,
    pub mode: SortMode,
}

/// Active sort keys, in visible column order
pub fn sort_keys(visible: &[String], styles: &FxHashMap<String, ColumnStyle>) -> Vec<SortKey> {
    visible
        .iter()
        .filter_map(|column| {
            let mode = styles.get(column)?.sort_mode();
            mode.is_active().then(|| SortKey {
                column: column.clone(),
                mode,
            })
        })
        .collect()
}

fn compare_numeric(a: &Value, b: &Value, ascending: bool) -> Ordering {
    match compare_numbers(a, b) {
        Some(ord) if ascending => ord,
        Some(ord) => ord.reverse(),
        // Non-numbers trail in both directions
        None => a.as_number().is_none().cmp(&b.as_number().is_none()),
    }
}

fn compare_lexical(a: &Value, b: &Value, ascending: bool) -> Ordering {
    let ord = match (a.is_empty(), b.is_empty()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.folded().cmp(&b.folded()),
    };
    if ascending {
        ord
    } else {
        ord.reverse()
    }
}

/// Compare two rows under a single key
pub fn compare_by_key(a: &Row, b: &Row, key: &SortKey) -> Ordering {
    let (av, bv) = (a.get(&key.column), b.get(&key.column));
    let ascending = key.mode.is_ascending();
    if key.mode.is_numeric() {
        compare_numeric(av, bv, ascending)
    } else {
        compare_lexical(av, bv, ascending)
    }
}

/// Compare two rows under every key, primary first
pub fn compare_rows(a: &Row, b: &Row, keys: &[SortKey]) -> Ordering {
    keys.iter()
        .map(|k| compare_by_key(a, b, k))
        .find(|o| *o != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

/// Stable in-place sort
pub fn sort_rows(rows: &mut [Row], keys: &[SortKey]) {
    if keys.is_empty() {
        return;
    }
    rows.sort_by(|a, b| compare_rows(a, b, keys));
}

/// Owned variant of [`sort_rows`]
pub fn sorted(mut rows: Vec<Row>, keys: &[SortKey]) -> Vec<Row> {
    sort_rows(&mut rows, keys);
    rows
}
