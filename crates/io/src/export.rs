// CSV and Markdown export of the processed table

use tabview_engine::{ProcessedTable, Row};

use crate::error::SourceError;

const BOM: &str = "\u{feff}";

/// CSV text: BOM, header, rows, CRLF between lines, RFC 4180 quoting.
///
/// Lines are joined like the Markdown export, so the last row carries no
/// trailing line break.
///
/// Covers the visible columns of the processed (filtered, grouped, sorted)
/// rows. `None` when no column is visible.
pub fn to_csv(table: &ProcessedTable) -> Result<Option<String>, SourceError> {
    rows_to_csv(&table.visible_columns, &table.rows)
}

pub fn rows_to_csv(columns: &[String], rows: &[Row]) -> Result<Option<String>, SourceError> {
    if columns.is_empty() {
        return Ok(None);
    }
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(Vec::new());

    writer.write_record(columns)?;
    for row in rows {
        writer.write_record(columns.iter().map(|c| row.get(c).to_string()))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| SourceError::Parse(e.to_string()))?;
    let body = String::from_utf8(bytes).map_err(|e| SourceError::Parse(e.to_string()))?;
    let body = body.strip_suffix("\r\n").unwrap_or(&body);
    Ok(Some(format!("{}{}", BOM, body)))
}

/// Markdown pipe table over the visible columns. `None` when no column is visible.
pub fn to_markdown(table: &ProcessedTable) -> Option<String> {
    rows_to_markdown(&table.visible_columns, &table.rows)
}

pub fn rows_to_markdown(columns: &[String], rows: &[Row]) -> Option<String> {
    if columns.is_empty() {
        return None;
    }
    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(markdown_line(columns.iter().map(|c| escape_cell(c))));
    lines.push(markdown_line(columns.iter().map(|_| "---".to_string())));
    for row in rows {
        lines.push(markdown_line(columns.iter().map(|c| escape_cell(&row.get(c).to_string()))));
    }
    Some(lines.join("\n"))
}

fn markdown_line(cells: impl Iterator<Item = String>) -> String {
    format!("| {} |", cells.collect::<Vec<_>>().join(" | "))
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabview_engine::{process, RowSet, SortMode, Value, ViewState};

    fn sample() -> (RowSet, ViewState) {
        let headers: Vec<String> = vec!["name".into(), "note".into(), "amount".into()];
        let set = RowSet::from_records(
            headers.clone(),
            vec![
                vec![Value::from("b"), Value::from("x, y"), Value::from(2.5)],
                vec![Value::from("a"), Value::from("say \"hi\""), Value::Empty],
            ],
        );
        (set, ViewState::new(&headers))
    }

    #[test]
    fn test_csv_has_bom_and_crlf_between_lines() {
        let (set, state) = sample();
        let csv = to_csv(&process(&set, &state)).unwrap().unwrap();
        assert_eq!(
            csv,
            "\u{feff}name,note,amount\r\nb,\"x, y\",2.5\r\na,\"say \"\"hi\"\"\","
        );
    }

    #[test]
    fn test_csv_reflects_sort_and_hidden() {
        let (set, mut state) = sample();
        state.toggle_hidden("note");
        state.set_sort("name", SortMode::Up);
        let csv = to_csv(&process(&set, &state)).unwrap().unwrap();
        assert_eq!(csv, "\u{feff}name,amount\r\na,\r\nb,2.5");
    }

    #[test]
    fn test_nothing_without_visible_columns() {
        let (set, mut state) = sample();
        for c in ["name", "note", "amount"] {
            state.toggle_hidden(c);
        }
        let table = process(&set, &state);
        assert_eq!(to_csv(&table).unwrap(), None);
        assert_eq!(to_markdown(&table), None);
    }

    #[test]
    fn test_csv_and_markdown_end_without_line_break() {
        let (set, mut state) = sample();
        state.toggle_hidden("note");
        let table = process(&set, &state);
        let csv = to_csv(&table).unwrap().unwrap();
        let md = to_markdown(&table).unwrap();
        assert!(!csv.ends_with('\n'), "{:?}", csv);
        assert!(!md.ends_with('\n'), "{:?}", md);
        assert_eq!(csv.trim_start_matches('\u{feff}').lines().count(), md.lines().count() - 1);

        // a header-only export is just the header line
        let header_only = rows_to_csv(&["name".to_string()], &[]).unwrap().unwrap();
        assert_eq!(header_only, "\u{feff}name");
    }

    #[test]
    fn test_markdown_escapes_pipes() {
        let columns = vec!["a|b".to_string(), "c".to_string()];
        let set = RowSet::from_records(columns.clone(), vec![vec![Value::from("x|y"), Value::from(1i64)]]);
        let md = rows_to_markdown(&columns, &set.rows).unwrap();
        assert_eq!(md, "| a\\|b | c |\n| --- | --- |\n| x\\|y | 1 |");
    }
}
