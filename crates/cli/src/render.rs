// Plain-text rendering of a processed table

use std::fmt::Write as _;

use tabview_engine::style::Align;
use tabview_engine::{ProcessedTable, ViewState};
use unicode_width::UnicodeWidthStr;

/// Which slice of each partition to print
#[derive(Debug, Clone, Copy)]
pub struct WindowOptions {
    pub scroll_top: f64,
    pub viewport_height: f64,
    /// Ignore the viewport and print every row
    pub all_rows: bool,
}

const PIN_SEPARATOR: &str = " ‖ ";
const COLUMN_GAP: &str = "  ";

fn pad(text: &str, width: usize, align: Align) -> String {
    let fill = width.saturating_sub(text.width());
    match align {
        Align::Left => format!("{}{}", text, " ".repeat(fill)),
        Align::Right => format!("{}{}", " ".repeat(fill), text),
        Align::Center => {
            let left = fill / 2;
            format!("{}{}{}", " ".repeat(left), text, " ".repeat(fill - left))
        }
    }
}

fn join_line(cells: &[String], pinned_after: Option<usize>) -> String {
    let mut line = String::new();
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            line.push_str(if pinned_after == Some(i - 1) { PIN_SEPARATOR } else { COLUMN_GAP });
        }
        line.push_str(cell);
    }
    line.trim_end().to_string()
}

/// Render every partition's window as aligned text.
///
/// Columns up to the pinned anchor are set off by `‖`; the row-number
/// column counts as pinned.
pub fn render_table(table: &ProcessedTable, state: &ViewState, opts: WindowOptions) -> String {
    let columns = &table.visible_columns;
    let mut out = String::new();
    if columns.is_empty() {
        out.push_str("(no visible columns)\n");
        return out;
    }

    let pinned = state.pinned_index();
    let numbered = state.show_row_numbers;
    let pinned_after = match (numbered, pinned) {
        (true, Some(idx)) => Some(idx + 1),
        (true, None) => Some(0),
        (false, p) => p,
    };

    for (p, partition) in table.partitions.iter().enumerate() {
        if !partition.is_implicit() {
            let _ = writeln!(out, "## {} ({} rows)", partition.title(), partition.rows.len());
        }
        let window = if opts.all_rows {
            0..partition.rows.len()
        } else {
            table.window(p, opts.scroll_top, opts.viewport_height).range()
        };

        let mut header: Vec<String> = columns.iter().map(|c| table.header_label(c)).collect();
        let mut body: Vec<Vec<String>> = partition.rows[window.clone()]
            .iter()
            .map(|row| columns.iter().map(|c| table.display(row, c).text).collect())
            .collect();
        let mut aligns: Vec<Align> = columns.iter().map(|c| table.align(c)).collect();
        if numbered {
            header.insert(0, "#".into());
            for (offset, cells) in body.iter_mut().enumerate() {
                cells.insert(0, (window.start + offset + 1).to_string());
            }
            aligns.insert(0, Align::Right);
        }

        let widths: Vec<usize> = (0..header.len())
            .map(|i| {
                body.iter()
                    .map(|cells| cells[i].width())
                    .chain(std::iter::once(header[i].width()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let format_line = |cells: &[String], header_row: bool| {
            let padded: Vec<String> = cells
                .iter()
                .enumerate()
                .map(|(i, c)| pad(c, widths[i], if header_row { Align::Left } else { aligns[i] }))
                .collect();
            join_line(&padded, pinned_after)
        };

        let _ = writeln!(out, "{}", format_line(&header, true));
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        let _ = writeln!(out, "{}", format_line(&rule, true));
        for cells in &body {
            let _ = writeln!(out, "{}", format_line(cells, false));
        }
        if window.len() < partition.rows.len() {
            let _ = writeln!(
                out,
                "rows {}-{} of {}",
                window.start + 1,
                window.end,
                partition.rows.len()
            );
        }
        out.push('\n');
    }

    if state.filters.is_active() {
        let _ = writeln!(out, "{} of {} rows match the filters", table.filtered_count, table.total_count);
    }
    out
}
