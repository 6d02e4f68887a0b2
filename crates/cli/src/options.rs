// View flags shared by the table commands

use std::collections::{BTreeMap, BTreeSet};

use clap::Args;
use serde::de::DeserializeOwned;
use tabview_engine::filter::{distinct_values, FilterMode};
use tabview_engine::format::NumFormat;
use tabview_engine::group::Reducer;
use tabview_engine::{ColumnType, RowSet, SortMode, Value, ViewState};

use crate::CliError;

/// Interactive edits expressed as flags, applied in declaration order
#[derive(Args, Debug, Clone, Default)]
pub struct ViewArgs {
    /// Sort a column: COL=up|down|up numbers|down numbers|none. Repeatable.
    #[arg(long, value_name = "COL=MODE")]
    pub sort: Vec<String>,

    /// Text filter: COL=EXPR ('>100', '<=5', '=3', '<>0', or a substring). Repeatable.
    #[arg(long, value_name = "COL=EXPR")]
    pub filter: Vec<String>,

    /// Dropdown filter: keep rows whose COL equals VALUE. Repeatable.
    #[arg(long, value_name = "COL=VALUE")]
    pub pick: Vec<String>,

    /// Hide a column. Repeatable.
    #[arg(long, value_name = "COL")]
    pub hide: Vec<String>,

    /// Group by a column. Repeatable.
    #[arg(long, value_name = "COL")]
    pub group_by: Vec<String>,

    /// Reducer for a column while grouped (sum, avg, cnt, min-max, ...). Repeatable.
    #[arg(long, value_name = "COL=REDUCER")]
    pub reducer: Vec<String>,

    /// Split into one table per distinct value. Repeatable.
    #[arg(long, value_name = "COL")]
    pub split_by: Vec<String>,

    /// Declare a column type: COL=auto|text|number|integer. Repeatable.
    #[arg(long = "type", value_name = "COL=TYPE")]
    pub column_type: Vec<String>,

    /// Number format: COL=thousand2|currency|paren-red|... Repeatable.
    #[arg(long, value_name = "COL=FORMAT")]
    pub num_format: Vec<String>,

    /// Pin columns up to and including COL
    #[arg(long, value_name = "COL")]
    pub pin: Option<String>,

    /// Toggle the row-number column
    #[arg(long)]
    pub row_numbers: bool,

    #[arg(long)]
    pub font_size: Option<f64>,
}

/// Split `COL=VALUE` at the first `=`
pub fn split_assignment(arg: &str) -> Result<(&str, &str), CliError> {
    match arg.split_once('=') {
        Some((col, value)) if !col.trim().is_empty() => Ok((col.trim(), value)),
        _ => Err(CliError::args(format!("expected COL=VALUE, got '{}'", arg))),
    }
}

/// Parse an enum by its configuration name
pub fn parse_named<T: DeserializeOwned>(kind: &str, name: &str) -> Result<T, CliError> {
    serde_json::from_value(serde_json::Value::String(name.trim().to_string()))
        .map_err(|_| CliError::args(format!("unknown {} '{}'", kind, name)))
}

pub fn check_column<'a>(column: &'a str, headers: &[String]) -> Result<&'a str, CliError> {
    if headers.iter().any(|h| h == column) {
        Ok(column)
    } else {
        Err(CliError::args(format!("unknown column '{}'", column))
            .with_hint(format!("columns: {}", headers.join(", "))))
    }
}

fn assignments<'a>(args: &'a [String], headers: &[String]) -> Result<Vec<(&'a str, &'a str)>, CliError> {
    args.iter()
        .map(|arg| {
            let (col, value) = split_assignment(arg)?;
            Ok((check_column(col, headers)?, value))
        })
        .collect()
}

/// Match a picked value against the column's distinct values by display text
fn resolve_pick(rows: &RowSet, column: &str, raw: &str) -> Value {
    distinct_values(&rows.rows, column)
        .into_iter()
        .find(|v| v.to_string() == raw)
        .unwrap_or_else(|| Value::parse_typed(raw))
}

impl ViewArgs {
    pub fn is_empty(&self) -> bool {
        self.sort.is_empty()
            && self.filter.is_empty()
            && self.pick.is_empty()
            && self.hide.is_empty()
            && self.group_by.is_empty()
            && self.reducer.is_empty()
            && self.split_by.is_empty()
            && self.column_type.is_empty()
            && self.num_format.is_empty()
            && self.pin.is_none()
            && !self.row_numbers
            && self.font_size.is_none()
    }

    /// Validate every flag against the headers, then apply them all.
    /// Nothing is applied when any flag is invalid.
    pub fn apply(&self, state: &mut ViewState, rows: &RowSet) -> Result<(), CliError> {
        let headers = &rows.headers;
        let mut next = state.clone();

        for (col, mode) in assignments(&self.sort, headers)? {
            next.set_sort(col, parse_named::<SortMode>("sort mode", mode)?);
        }
        for (col, expr) in assignments(&self.filter, headers)? {
            next.filters.mode.remove(col);
            next.filters.set_text(col, expr);
            next.show_filter_row = true;
        }

        let mut picks: BTreeMap<&str, BTreeSet<Value>> = BTreeMap::new();
        for (col, raw) in assignments(&self.pick, headers)? {
            picks.entry(col).or_default().insert(resolve_pick(rows, col, raw));
        }
        for (col, selection) in picks {
            next.filters.mode.insert(col.to_string(), FilterMode::Dropdown);
            next.filters.text.remove(col);
            next.filters.set_selection(col, selection);
            next.show_filter_row = true;
        }

        for col in &self.hide {
            check_column(col, headers)?;
            if !next.hidden.contains(col.as_str()) {
                next.toggle_hidden(col);
            }
        }
        for col in &self.group_by {
            check_column(col, headers)?;
            next.update_style(col, |s| s.group_by = Some(true));
        }
        for (col, name) in assignments(&self.reducer, headers)? {
            let reducer = parse_named::<Reducer>("reducer", name)?;
            next.update_style(col, |s| s.reducer = Some(reducer));
        }
        for col in &self.split_by {
            check_column(col, headers)?;
            next.update_style(col, |s| s.split_by = Some(true));
        }
        for (col, name) in assignments(&self.column_type, headers)? {
            let ty = parse_named::<ColumnType>("column type", name)?;
            next.update_style(col, |s| s.column_type = Some(ty));
        }
        for (col, name) in assignments(&self.num_format, headers)? {
            let fmt = parse_named::<NumFormat>("number format", name)?;
            next.update_style(col, |s| s.num_format = Some(fmt));
        }
        if let Some(col) = &self.pin {
            check_column(col, headers)?;
            next.pinned_anchor = Some(col.clone());
        }
        if self.row_numbers {
            next.show_row_numbers = !next.show_row_numbers;
        }
        if let Some(size) = self.font_size {
            if size.is_nan() || size <= 0.0 {
                return Err(CliError::args(format!("font size must be positive, got {}", size)));
            }
            next.set_font_size(size);
        }

        *state = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> RowSet {
        RowSet::from_records(
            vec!["dept".into(), "salary".into()],
            vec![
                vec![Value::from("Eng"), Value::from(100i64)],
                vec![Value::from("Ops"), Value::from(70i64)],
            ],
        )
    }

    #[test]
    fn test_split_assignment() {
        assert_eq!(split_assignment("a=b=c").unwrap(), ("a", "b=c"));
        assert_eq!(split_assignment("salary=>100").unwrap(), ("salary", ">100"));
        assert!(split_assignment("novalue").is_err());
        assert!(split_assignment("=x").is_err());
    }

    #[test]
    fn test_parse_named_uses_config_names() {
        assert_eq!(parse_named::<SortMode>("sort mode", "down numbers").unwrap(), SortMode::DownNumbers);
        assert_eq!(parse_named::<Reducer>("reducer", "unique cnt").unwrap(), Reducer::UniqueCount);
        assert_eq!(parse_named::<NumFormat>("number format", "paren-red").unwrap(), NumFormat::ParenRed);
        let err = parse_named::<Reducer>("reducer", "median").unwrap_err();
        assert_eq!(err.message, "unknown reducer 'median'");
    }

    #[test]
    fn test_apply_sets_styles_and_filters() {
        let rows = rows();
        let mut state = ViewState::new(&rows.headers);
        let args = ViewArgs {
            sort: vec!["salary=down".into()],
            filter: vec!["salary=>60".into()],
            group_by: vec!["dept".into()],
            reducer: vec!["salary=avg".into()],
            ..Default::default()
        };
        args.apply(&mut state, &rows).unwrap();
        assert_eq!(state.style("salary").unwrap().sort, Some(SortMode::Down));
        assert_eq!(state.style("salary").unwrap().reducer, Some(Reducer::Avg));
        assert!(state.style("dept").unwrap().is_group_by());
        assert_eq!(state.filters.text.get("salary").map(String::as_str), Some(">60"));
        assert!(state.show_filter_row);
    }

    #[test]
    fn test_pick_matches_typed_values() {
        let rows = rows();
        let mut state = ViewState::new(&rows.headers);
        let args = ViewArgs { pick: vec!["salary=100".into(), "salary=70".into()], ..Default::default() };
        args.apply(&mut state, &rows).unwrap();
        let selection = &state.filters.dropdown["salary"];
        assert!(selection.contains(&Value::from(100i64)));
        assert!(selection.contains(&Value::from(70i64)));
        assert_eq!(state.filters.mode_of("salary"), FilterMode::Dropdown);
    }

    #[test]
    fn test_invalid_flag_leaves_state_untouched() {
        let rows = rows();
        let mut state = ViewState::new(&rows.headers);
        let before = state.clone();
        let args = ViewArgs {
            sort: vec!["salary=up".into()],
            hide: vec!["bonus".into()],
            ..Default::default()
        };
        let err = args.apply(&mut state, &rows).unwrap_err();
        assert_eq!(err.message, "unknown column 'bonus'");
        assert_eq!(err.hint.as_deref(), Some("columns: dept, salary"));
        assert_eq!(state, before);
    }
}
