//! Column type inference
//!
//! One pass over the rows per column. The heuristic only distinguishes
//! text, whole numbers and fractional numbers; it is not a type system.

use rustc_hash::FxHashMap;

use crate::row::Row;
use crate::style::{Align, ColumnStyle, ColumnType};

/// Inferred type per column (never `Auto`)
pub type TypeMap = FxHashMap<String, ColumnType>;

/// Infer one column.
///
/// - no non-empty values, or any non-numeric one → `Text`
/// - all numeric and whole → `Integer`
/// - otherwise → `Number`
///
/// Numeric-looking text ("42") counts as numeric.
pub fn infer_column(rows: &[Row], column: &str) -> ColumnType {
    let mut seen = false;
    let mut all_whole = true;
    for row in rows {
        let value = row.get(column);
        if value.is_empty() {
            continue;
        }
        seen = true;
        match value.strict_number() {
            Some(n) => {
                if n.fract() != 0.0 {
                    all_whole = false;
                }
            }
            None => return ColumnType::Text,
        }
    }
    match (seen, all_whole) {
        (false, _) => ColumnType::Text,
        (true, true) => ColumnType::Integer,
        (true, false) => ColumnType::Number,
    }
}

/// Infer every header
pub fn infer_types(rows: &[Row], headers: &[String]) -> TypeMap {
    headers
        .iter()
        .map(|h| (h.clone(), infer_column(rows, h)))
        .collect()
}

/// Declared type unless `auto`, else the inferred type (text when unknown)
pub fn effective_type(style: Option<&ColumnStyle>, inferred: &TypeMap, column: &str) -> ColumnType {
    match style.map(ColumnStyle::declared_type) {
        Some(declared) if declared != ColumnType::Auto => declared,
        _ => inferred.get(column).copied().unwrap_or(ColumnType::Text),
    }
}

/// Alignment used when the style does not set one
pub fn default_align(ty: ColumnType) -> Align {
    if ty.is_numeric() {
        Align::Right
    } else {
        Align::Left
    }
}
