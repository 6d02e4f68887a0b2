//! View state: the mutable configuration of one table
//!
//! Everything a user can change about a table lives here. The state is the
//! unit of persistence; `tabview-config` turns it into a versioned document
//! and back.

use std::collections::BTreeSet;
use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::filter::FilterState;
use crate::layout;
use crate::style::{ColumnStyle, SortMode};

pub const DEFAULT_THEME: &str = "lite";
pub const DEFAULT_FONT_SIZE: f64 = 13.0;

/// Sentinel for "no size limit"
pub const UNLIMITED: &str = "unlimited";

/// Maximum table height or width
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TableSize {
    #[default]
    Unlimited,
    /// CSS length, e.g. `"480px"`, `"60vh"`, `"100%"`
    Css(String),
}

impl TableSize {
    pub fn parse(s: &str) -> Self {
        let t = s.trim();
        if t.is_empty() || t == UNLIMITED {
            TableSize::Unlimited
        } else {
            TableSize::Css(t.to_string())
        }
    }

    pub fn is_unlimited(&self) -> bool {
        matches!(self, TableSize::Unlimited)
    }

    /// Pixel value for `px` (or bare numeric) lengths
    pub fn pixels(&self) -> Option<f64> {
        match self {
            TableSize::Unlimited => None,
            TableSize::Css(s) => s.strip_suffix("px").unwrap_or(s).trim().parse().ok(),
        }
    }
}

impl fmt::Display for TableSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableSize::Unlimited => f.write_str(UNLIMITED),
            TableSize::Css(s) => f.write_str(s),
        }
    }
}

impl Serialize for TableSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TableSize {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(TableSize::parse(&s))
    }
}

/// Complete configuration of one table view
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub theme: String,
    pub column_styles: FxHashMap<String, ColumnStyle>,
    /// Every known column exactly once, in display order
    pub column_order: Vec<String>,
    pub hidden: BTreeSet<String>,
    pub filters: FilterState,
    pub show_filter_row: bool,
    /// Rightmost pinned column
    pub pinned_anchor: Option<String>,
    pub show_row_numbers: bool,
    /// Customization controls are shown
    pub customize: bool,
    pub table_max_height: TableSize,
    pub table_max_width: TableSize,
    pub font_size: f64,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            theme: DEFAULT_THEME.to_string(),
            column_styles: FxHashMap::default(),
            column_order: Vec::new(),
            hidden: BTreeSet::new(),
            filters: FilterState::default(),
            show_filter_row: false,
            pinned_anchor: None,
            show_row_numbers: false,
            customize: false,
            table_max_height: TableSize::Unlimited,
            table_max_width: TableSize::Unlimited,
            font_size: DEFAULT_FONT_SIZE,
        }
    }
}

impl ViewState {
    /// Built-in defaults for a dataset with `headers`
    pub fn new(headers: &[String]) -> Self {
        Self {
            column_order: headers.to_vec(),
            ..Self::default()
        }
    }

    pub fn style(&self, column: &str) -> Option<&ColumnStyle> {
        self.column_styles.get(column)
    }

    /// Edit one column's style in place
    pub fn update_style(&mut self, column: &str, edit: impl FnOnce(&mut ColumnStyle)) {
        edit(self.column_styles.entry(column.to_string()).or_default());
    }

    pub fn set_sort(&mut self, column: &str, mode: SortMode) {
        self.update_style(column, |s| s.sort = Some(mode));
    }

    /// Header click: none → up → down → none
    pub fn cycle_sort(&mut self, column: &str) -> SortMode {
        let next = self
            .style(column)
            .map(ColumnStyle::sort_mode)
            .unwrap_or_default()
            .next();
        self.set_sort(column, next);
        next
    }

    pub fn visible_columns(&self) -> Vec<String> {
        layout::visible_columns(&self.column_order, &self.hidden)
    }

    pub fn pinned_index(&self) -> Option<usize> {
        layout::pinned_index(&self.visible_columns(), self.pinned_anchor.as_deref())
    }

    /// Returns true if the column is now hidden
    pub fn toggle_hidden(&mut self, column: &str) -> bool {
        layout::toggle_hidden(&mut self.hidden, column)
    }

    pub fn move_column(&mut self, dragged: &str, target: &str) -> bool {
        layout::move_column(&mut self.column_order, dragged, target)
    }

    /// Apply a resize drag to a column whose rendered width was `start_px`
    pub fn resize_column(&mut self, column: &str, start_px: f64, dx: f64) {
        let width = layout::resize_width(start_px, dx);
        self.update_style(column, |s| s.width = Some(width));
    }

    pub fn toggle_pin(&mut self, column: &str) {
        let visible = self.visible_columns();
        self.pinned_anchor = layout::toggle_pin(&visible, self.pinned_anchor.as_deref(), column);
    }

    /// Switch a column's filter between text and dropdown mode
    pub fn toggle_filter_mode(&mut self, column: &str) {
        self.filters.toggle_mode(column);
    }

    pub fn set_font_size(&mut self, size: f64) {
        if size.is_finite() && size > 0.0 {
            self.font_size = size;
        }
    }
}
