//! The processing pipeline
//!
//! `process` turns raw rows plus a view state into what a renderer or
//! exporter needs. Stages run in a fixed order and every input is explicit:
//!
//! ```text
//! infer → filter → group → sort → split
//! ```
//!
//! Stages never fail; malformed configuration degrades to neutral behavior.

use rustc_hash::FxHashMap;

use crate::filter::apply_filters;
use crate::format::{format_cell, DisplayCell};
use crate::group::{group_by_columns, group_rows, grouped_header_label};
use crate::infer::{effective_type, infer_types, TypeMap};
use crate::row::{Row, RowSet};
use crate::sort::{sort_keys, sorted};
use crate::split::{split_by_columns, split_rows, Partition};
use crate::style::{Align, ColumnStyle, ColumnType};
use crate::view::ViewState;
use crate::window::{compute_window, row_height_for_font, VirtualWindow, OVERSCAN};

/// Output of one pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedTable {
    /// Columns to render, in display order
    pub visible_columns: Vec<String>,
    /// Effective type of every header
    pub column_types: TypeMap,
    /// Filtered, grouped and sorted rows (what export sees)
    pub rows: Vec<Row>,
    /// `rows` split into sub-tables (one implicit partition without split-by)
    pub partitions: Vec<Partition>,
    /// Group-by columns, empty when not grouping
    pub group_by: Vec<String>,
    /// Rows that passed the filters, before grouping
    pub filtered_count: usize,
    /// Total source rows
    pub total_count: usize,
    styles: FxHashMap<String, ColumnStyle>,
    font_size: f64,
}

impl ProcessedTable {
    pub fn is_grouped(&self) -> bool {
        !self.group_by.is_empty()
    }

    pub fn column_type(&self, column: &str) -> ColumnType {
        self.column_types.get(column).copied().unwrap_or(ColumnType::Text)
    }

    /// Header text, with the reducer appended for reduced columns while grouping
    pub fn header_label(&self, column: &str) -> String {
        let reducer = self.styles.get(column).map_or(Some(Default::default()), ColumnStyle::effective_reducer);
        grouped_header_label(column, &self.group_by, reducer)
    }

    pub fn align(&self, column: &str) -> Align {
        crate::layout::resolve_align(self.styles.get(column), self.column_type(column))
    }

    /// Formatted cell text
    pub fn display(&self, row: &Row, column: &str) -> DisplayCell {
        format_cell(row.get(column), self.styles.get(column), self.column_type(column))
    }

    pub fn row_height(&self) -> f64 {
        row_height_for_font(self.font_size)
    }

    /// Rows of `partition` to render for a scroll position
    pub fn window(&self, partition: usize, scroll_top: f64, viewport_height: f64) -> VirtualWindow {
        let count = self.partitions.get(partition).map_or(0, |p| p.rows.len());
        compute_window(scroll_top, viewport_height, self.row_height(), count, OVERSCAN)
    }
}

/// Run the full pipeline
pub fn process(source: &RowSet, state: &ViewState) -> ProcessedTable {
    let headers = &source.headers;
    let styles = &state.column_styles;

    let inferred = infer_types(&source.rows, headers);
    let column_types: TypeMap = headers
        .iter()
        .map(|h| (h.clone(), effective_type(styles.get(h), &inferred, h)))
        .collect();

    let filtered = apply_filters(&source.rows, &state.filters, &column_types).into_owned();
    let filtered_count = filtered.len();

    let group_by = group_by_columns(headers, styles);
    let grouped = group_rows(filtered, headers, styles);

    let visible_columns = state.visible_columns();
    let keys = sort_keys(&visible_columns, styles);
    let rows = sorted(grouped, &keys);

    let split_by = split_by_columns(headers, styles);
    let partitions = split_rows(rows.clone(), &split_by);

    log::debug!(
        "process: {} rows, {} filtered, {} out, {} sort keys, {} partitions",
        source.rows.len(),
        filtered_count,
        rows.len(),
        keys.len(),
        partitions.len()
    );

    ProcessedTable {
        visible_columns,
        column_types,
        rows,
        partitions,
        group_by,
        filtered_count,
        total_count: source.rows.len(),
        styles: styles.clone(),
        font_size: state.font_size,
    }
}
