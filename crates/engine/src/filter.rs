//! Column filters
//!
//! Each column is filtered either by a text expression or by a dropdown
//! selection, never both. Text expressions are either a plain substring
//! ("ali") or a comparison with a leading operator (">= 100", "<> paris").
//!
//! Key invariants:
//! - A row is kept iff it passes every active predicate
//! - With no active predicate the input is returned as-is (borrowed)
//! - Predicates are compiled once per pass, evaluation is O(rows × predicates)
//! - Switching a column's mode clears the other mode's stored value

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::infer::TypeMap;
use crate::row::Row;
use crate::style::ColumnType;
use crate::value::{compare_natural, parse_float_prefix, Value};

// =============================================================================
// Filter state
// =============================================================================

/// How a column is filtered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    #[default]
    Text,
    Dropdown,
}

/// All filter settings for a table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterState {
    /// Column → text expression
    pub text: BTreeMap<String, String>,
    /// Column → selected raw values
    pub dropdown: BTreeMap<String, BTreeSet<Value>>,
    /// Column → mode (absent means text)
    pub mode: BTreeMap<String, FilterMode>,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode_of(&self, column: &str) -> FilterMode {
        self.mode.get(column).copied().unwrap_or_default()
    }

    /// Set (or clear, when empty) a text filter
    pub fn set_text(&mut self, column: &str, expr: impl Into<String>) {
        let expr = expr.into();
        if expr.is_empty() {
            self.text.remove(column);
        } else {
            self.text.insert(column.to_string(), expr);
        }
    }

    /// Replace a dropdown selection (an empty set clears it)
    pub fn set_selection(&mut self, column: &str, selection: BTreeSet<Value>) {
        if selection.is_empty() {
            self.dropdown.remove(column);
        } else {
            self.dropdown.insert(column.to_string(), selection);
        }
    }

    /// Add or remove one value from a dropdown selection
    pub fn toggle_value(&mut self, column: &str, value: Value) {
        let selection = self.dropdown.entry(column.to_string()).or_default();
        if !selection.remove(&value) {
            selection.insert(value);
        }
        if selection.is_empty() {
            self.dropdown.remove(column);
        }
    }

    /// "Select all": selects every value, or clears the selection when
    /// everything is already selected
    pub fn toggle_select_all(&mut self, column: &str, all_values: &[Value]) {
        let selected = self.dropdown.get(column).map_or(0, BTreeSet::len);
        if selected == all_values.len() {
            self.dropdown.remove(column);
        } else {
            self.set_selection(column, all_values.iter().cloned().collect());
        }
    }

    /// Switch between text and dropdown mode, clearing the value stored
    /// for the mode being left
    pub fn toggle_mode(&mut self, column: &str) -> FilterMode {
        let next = match self.mode_of(column) {
            FilterMode::Dropdown => FilterMode::Text,
            FilterMode::Text => FilterMode::Dropdown,
        };
        self.mode.insert(column.to_string(), next);
        match next {
            FilterMode::Text => {
                self.dropdown.remove(column);
            }
            FilterMode::Dropdown => {
                self.text.remove(column);
            }
        }
        next
    }

    /// Clear every text filter and dropdown selection (modes are kept)
    pub fn clear(&mut self) {
        self.text.clear();
        self.dropdown.clear();
    }

    /// Number of predicates a filter pass would evaluate
    pub fn active_count(&self) -> usize {
        self.text.values().filter(|t| !t.is_empty()).count()
            + self.dropdown.values().filter(|s| !s.is_empty()).count()
    }

    pub fn is_active(&self) -> bool {
        self.active_count() > 0
    }
}

// =============================================================================
// Expression parsing
// =============================================================================

/// Comparison operator of a text filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Ne,
}

/// Split a leading operator from a filter expression.
///
/// The expression is trimmed first; two-character operators win over their
/// one-character prefixes. Returns `None` when there is no operator.
pub fn parse_operator(expr: &str) -> Option<(CompareOp, &str)> {
    let t = expr.trim();
    const OPS: [(&str, CompareOp); 6] = [
        (">=", CompareOp::Ge),
        ("<=", CompareOp::Le),
        ("<>", CompareOp::Ne),
        (">", CompareOp::Gt),
        ("<", CompareOp::Lt),
        ("=", CompareOp::Eq),
    ];
    OPS.iter()
        .find_map(|(token, op)| t.strip_prefix(token).map(|rest| (*op, rest.trim_start())))
}

fn compare_numbers(op: CompareOp, a: f64, b: f64) -> bool {
    match op {
        CompareOp::Gt => a > b,
        CompareOp::Lt => a < b,
        CompareOp::Ge => a >= b,
        CompareOp::Le => a <= b,
        CompareOp::Eq => a == b,
        CompareOp::Ne => a != b,
    }
}

fn compare_text(op: CompareOp, a: &str, b: &str) -> bool {
    match op {
        CompareOp::Gt => a > b,
        CompareOp::Lt => a < b,
        CompareOp::Ge => a >= b,
        CompareOp::Le => a <= b,
        CompareOp::Eq => a == b,
        CompareOp::Ne => a != b,
    }
}

// =============================================================================
// Compiled predicates
// =============================================================================

#[derive(Debug)]
enum Predicate<'a> {
    /// Case-insensitive substring
    Contains { column: &'a str, needle: String },
    /// Numeric comparison; `rhs` is None when the operand is not numeric
    Numeric { column: &'a str, op: CompareOp, rhs: Option<f64> },
    /// Case-insensitive lexical comparison
    Lexical { column: &'a str, op: CompareOp, rhs: String },
    /// Exact membership of the raw value
    OneOf { column: &'a str, selection: &'a BTreeSet<Value> },
}

impl Predicate<'_> {
    fn matches(&self, row: &Row) -> bool {
        match self {
            Predicate::Contains { column, needle } => row.get(column).folded().contains(needle.as_str()),
            Predicate::Numeric { column, op, rhs } => match (row.get(column).as_number(), rhs) {
                (Some(a), Some(b)) => compare_numbers(*op, a, *b),
                _ => false,
            },
            Predicate::Lexical { column, op, rhs } => compare_text(*op, &row.get(column).folded(), rhs),
            Predicate::OneOf { column, selection } => selection.contains(row.get(column)),
        }
    }
}

/// Filters compiled against the effective column types of one pass
#[derive(Debug)]
pub struct CompiledFilters<'a> {
    predicates: Vec<Predicate<'a>>,
}

impl<'a> CompiledFilters<'a> {
    pub fn compile(state: &'a FilterState, types: &TypeMap) -> Self {
        let mut predicates = Vec::new();
        for (column, expr) in &state.text {
            if expr.is_empty() {
                continue;
            }
            let numeric = types.get(column).is_some_and(|t| t.is_numeric());
            let predicate = match parse_operator(expr) {
                None => Predicate::Contains {
                    column,
                    needle: expr.to_lowercase(),
                },
                Some((op, rhs)) if numeric => Predicate::Numeric {
                    column,
                    op,
                    rhs: parse_float_prefix(rhs),
                },
                Some((op, rhs)) => Predicate::Lexical {
                    column,
                    op,
                    rhs: rhs.to_lowercase(),
                },
            };
            predicates.push(predicate);
        }
        for (column, selection) in &state.dropdown {
            if !selection.is_empty() {
                predicates.push(Predicate::OneOf { column, selection });
            }
        }
        Self { predicates }
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    /// True iff the row passes every predicate
    pub fn matches(&self, row: &Row) -> bool {
        self.predicates.iter().all(|p| p.matches(row))
    }
}

/// Apply all active filters. The input comes back borrowed when nothing is active.
pub fn apply_filters<'r>(rows: &'r [Row], state: &FilterState, types: &TypeMap) -> Cow<'r, [Row]> {
    let compiled = CompiledFilters::compile(state, types);
    if compiled.is_empty() {
        return Cow::Borrowed(rows);
    }
    let kept: Vec<Row> = rows.iter().filter(|r| compiled.matches(r)).cloned().collect();
    log::debug!(
        "filter: {} predicates kept {} of {} rows",
        compiled.len(),
        kept.len(),
        rows.len()
    );
    Cow::Owned(kept)
}

// =============================================================================
// Dropdown values
// =============================================================================

/// Distinct non-empty values of a column, in natural order
pub fn distinct_values(rows: &[Row], column: &str) -> Vec<Value> {
    let set: BTreeSet<&Value> = rows
        .iter()
        .map(|r| r.get(column))
        .filter(|v| !v.is_empty())
        .collect();
    let mut values: Vec<Value> = set.into_iter().cloned().collect();
    values.sort_by(compare_natural);
    values
}

/// Narrow a value list by a case-insensitive search term
pub fn search_values<'v>(values: &'v [Value], term: &str) -> Vec<&'v Value> {
    let needle = term.to_lowercase();
    values.iter().filter(|v| v.folded().contains(&needle)).collect()
}

/// True when the column's effective type makes operator filters numeric
pub fn is_numeric_filter(types: &TypeMap, column: &str) -> bool {
    types.get(column).copied().is_some_and(ColumnType::is_numeric)
}
