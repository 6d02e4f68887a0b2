//! Column layout: visibility, ordering, pinning and widths
//!
//! Visible columns are the declared order minus the hidden set. Pinning is
//! anchored on one column: every visible column up to and including the
//! anchor sticks to the left edge, at an offset computed from the widths
//! of the columns before it.
//!
//! Key invariants:
//! - Offsets only exist while the anchor is visible
//! - Offsets are recomputed whenever any width-affecting input changes;
//!   [`PinnedLayout`] detects that with a fingerprint, and callers whose
//!   measurements changed for other reasons call [`PinnedLayout::invalidate`]

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

use rustc_hash::FxHashMap;

use crate::style::{Align, ColumnStyle, ColumnType, Width};

/// Narrowest width a resize can produce, in pixels
pub const MIN_COLUMN_PX: f64 = 60.0;

// =============================================================================
// Visibility and pinning
// =============================================================================

/// Declared order minus hidden columns
pub fn visible_columns(order: &[String], hidden: &BTreeSet<String>) -> Vec<String> {
    order.iter().filter(|c| !hidden.contains(*c)).cloned().collect()
}

/// Position of the anchor among the visible columns
pub fn pinned_index(visible: &[String], anchor: Option<&str>) -> Option<usize> {
    let anchor = anchor?;
    visible.iter().position(|c| c == anchor)
}

/// True iff `column` is visible at or left of the anchor
pub fn is_pinned(visible: &[String], anchor: Option<&str>, column: &str) -> bool {
    match (pinned_index(visible, anchor), visible.iter().position(|c| c == column)) {
        (Some(pin), Some(idx)) => idx <= pin,
        _ => false,
    }
}

/// Pin button on a column header. Returns the new anchor.
///
/// The first column unpins everything; clicking the current anchor moves
/// the anchor one column left; any other column becomes the anchor.
pub fn toggle_pin(visible: &[String], anchor: Option<&str>, column: &str) -> Option<String> {
    let idx = visible.iter().position(|c| c == column)?;
    if idx == 0 {
        return None;
    }
    if pinned_index(visible, anchor) == Some(idx) {
        visible.get(idx - 1).cloned()
    } else {
        Some(column.to_string())
    }
}

/// Show a hidden column or hide a visible one. Returns true if now hidden.
pub fn toggle_hidden(hidden: &mut BTreeSet<String>, column: &str) -> bool {
    if hidden.remove(column) {
        false
    } else {
        hidden.insert(column.to_string());
        true
    }
}

/// Drag-and-drop reorder: remove `dragged` and insert it at the index
/// `target` had before the move. Returns false when nothing changed.
pub fn move_column(order: &mut Vec<String>, dragged: &str, target: &str) -> bool {
    if dragged == target {
        return false;
    }
    let (Some(from), Some(to)) = (
        order.iter().position(|c| c == dragged),
        order.iter().position(|c| c == target),
    ) else {
        return false;
    };
    let column = order.remove(from);
    order.insert(to.min(order.len()), column);
    true
}

/// Width after dragging a resize handle by `dx` pixels from `start_px`
pub fn resize_width(start_px: f64, dx: f64) -> Width {
    Width::from_pixels((start_px + dx).round().max(MIN_COLUMN_PX))
}

/// Explicit alignment, or the type default
pub fn resolve_align(style: Option<&ColumnStyle>, effective: ColumnType) -> Align {
    style
        .and_then(|s| s.align)
        .unwrap_or_else(|| crate::infer::default_align(effective))
}

// =============================================================================
// Widths and pinned offsets
// =============================================================================

/// Source of rendered column widths
pub trait WidthProvider {
    /// Rendered width of a column, in pixels
    fn column_width(&self, column: &str) -> f64;

    /// Width of the row-number gutter (only used while it is shown)
    fn row_number_width(&self) -> f64;
}

/// Widths from column styles, with a fixed fallback for unsized columns
#[derive(Debug, Clone)]
pub struct StyleWidths<'a> {
    styles: &'a FxHashMap<String, ColumnStyle>,
    default_px: f64,
    row_number_px: f64,
}

impl<'a> StyleWidths<'a> {
    pub fn new(styles: &'a FxHashMap<String, ColumnStyle>, default_px: f64, row_number_px: f64) -> Self {
        Self {
            styles,
            default_px,
            row_number_px,
        }
    }
}

impl WidthProvider for StyleWidths<'_> {
    fn column_width(&self, column: &str) -> f64 {
        self.styles
            .get(column)
            .and_then(ColumnStyle::width_px)
            .unwrap_or(self.default_px)
    }

    fn row_number_width(&self) -> f64 {
        self.row_number_px
    }
}

/// Everything that can change a pinned column's offset
#[derive(Debug, Clone, Copy)]
pub struct LayoutInputs<'a> {
    pub visible: &'a [String],
    pub anchor: Option<&'a str>,
    pub styles: &'a FxHashMap<String, ColumnStyle>,
    pub font_size: f64,
    pub show_row_numbers: bool,
    pub show_filter_row: bool,
}

impl LayoutInputs<'_> {
    /// Hash of every width-affecting input
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.visible.hash(&mut hasher);
        self.anchor.hash(&mut hasher);
        for column in self.visible {
            let width = self.styles.get(column).and_then(|s| s.width.as_ref());
            match width {
                Some(Width::Px(n)) => n.to_bits().hash(&mut hasher),
                Some(Width::Css(s)) => s.hash(&mut hasher),
                None => 0u8.hash(&mut hasher),
            }
            // wrapping changes rendered width too
            self.styles
                .get(column)
                .map(ColumnStyle::is_no_wrap)
                .hash(&mut hasher);
        }
        self.font_size.to_bits().hash(&mut hasher);
        self.show_row_numbers.hash(&mut hasher);
        self.show_filter_row.hash(&mut hasher);
        hasher.finish()
    }
}

/// Left offsets of the pinned columns, in visible order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PinnedOffsets {
    entries: Vec<(String, f64)>,
}

impl PinnedOffsets {
    pub fn get(&self, column: &str) -> Option<f64> {
        self.entries.iter().find(|(c, _)| c == column).map(|(_, px)| *px)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(c, px)| (c.as_str(), *px))
    }
}

/// Compute offsets without caching
pub fn compute_offsets(inputs: &LayoutInputs<'_>, widths: &dyn WidthProvider) -> PinnedOffsets {
    let Some(pin) = pinned_index(inputs.visible, inputs.anchor) else {
        return PinnedOffsets::default();
    };
    let mut left = if inputs.show_row_numbers {
        widths.row_number_width()
    } else {
        0.0
    };
    let mut entries = Vec::with_capacity(pin + 1);
    for column in &inputs.visible[..=pin] {
        entries.push((column.clone(), left));
        left += widths.column_width(column);
    }
    PinnedOffsets { entries }
}

/// Caches pinned offsets between renders
#[derive(Debug, Default)]
pub struct PinnedLayout {
    cached: Option<(u64, PinnedOffsets)>,
}

impl PinnedLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offsets for `inputs`, recomputed only when the fingerprint changed
    /// or after [`invalidate`](Self::invalidate)
    pub fn offsets(&mut self, inputs: &LayoutInputs<'_>, widths: &dyn WidthProvider) -> &PinnedOffsets {
        let fingerprint = inputs.fingerprint();
        let stale = !matches!(&self.cached, Some((fp, _)) if *fp == fingerprint);
        if stale {
            self.cached = None;
        }
        let (_, offsets) = self
            .cached
            .get_or_insert_with(|| (fingerprint, compute_offsets(inputs, widths)));
        offsets
    }

    /// Drop cached offsets (e.g. after the viewport was resized)
    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    pub fn is_cached(&self) -> bool {
        self.cached.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_visible_and_pinned() {
        let hidden: BTreeSet<String> = ["b".to_string()].into_iter().collect();
        let visible = visible_columns(&cols(&["a", "b", "c", "d"]), &hidden);
        assert_eq!(visible, cols(&["a", "c", "d"]));
        assert_eq!(pinned_index(&visible, Some("c")), Some(1));
        assert_eq!(pinned_index(&visible, Some("b")), None);
        assert!(is_pinned(&visible, Some("c"), "a"));
        assert!(!is_pinned(&visible, Some("c"), "d"));
        assert!(!is_pinned(&visible, None, "a"));
    }

    #[test]
    fn test_toggle_pin() {
        let visible = cols(&["a", "b", "c"]);
        assert_eq!(toggle_pin(&visible, None, "b"), Some("b".into()));
        assert_eq!(toggle_pin(&visible, Some("c"), "c"), Some("b".into()));
        assert_eq!(toggle_pin(&visible, Some("b"), "a"), None);
        assert_eq!(toggle_pin(&visible, Some("b"), "zzz"), None);
    }

    #[test]
    fn test_move_column() {
        let mut order = cols(&["a", "b", "c", "d"]);
        assert!(move_column(&mut order, "a", "c"));
        assert_eq!(order, cols(&["b", "c", "a", "d"]));
        assert!(move_column(&mut order, "d", "b"));
        assert_eq!(order, cols(&["d", "b", "c", "a"]));
        assert!(!move_column(&mut order, "d", "d"));
        assert!(!move_column(&mut order, "x", "d"));
    }

    #[test]
    fn test_resize_minimum() {
        assert_eq!(resize_width(100.0, -80.0), Width::Css("60px".into()));
        assert_eq!(resize_width(100.0, 20.4), Width::Css("120px".into()));
    }

    #[test]
    fn test_toggle_hidden() {
        let mut hidden = BTreeSet::new();
        assert!(toggle_hidden(&mut hidden, "a"));
        assert!(!toggle_hidden(&mut hidden, "a"));
        assert!(hidden.is_empty());
    }

    #[test]
    fn test_offsets_start_after_row_numbers() {
        let mut styles = FxHashMap::default();
        styles.insert("a".to_string(), ColumnStyle { width: Some(Width::Css("120px".into())), ..Default::default() });
        let visible = cols(&["a", "b", "c"]);
        let widths = StyleWidths::new(&styles, 100.0, 40.0);
        let mut inputs = LayoutInputs {
            visible: &visible,
            anchor: Some("b"),
            styles: &styles,
            font_size: 14.0,
            show_row_numbers: true,
            show_filter_row: false,
        };
        let offsets = compute_offsets(&inputs, &widths);
        assert_eq!(offsets.get("a"), Some(40.0));
        assert_eq!(offsets.get("b"), Some(160.0));
        assert_eq!(offsets.get("c"), None);

        inputs.show_row_numbers = false;
        let offsets = compute_offsets(&inputs, &widths);
        assert_eq!(offsets.get("a"), Some(0.0));

        inputs.anchor = None;
        assert!(compute_offsets(&inputs, &widths).is_empty());
    }

    struct Counting {
        calls: std::cell::Cell<usize>,
    }

    impl WidthProvider for Counting {
        fn column_width(&self, _column: &str) -> f64 {
            self.calls.set(self.calls.get() + 1);
            50.0
        }

        fn row_number_width(&self) -> f64 {
            0.0
        }
    }

    #[test]
    fn test_cache_and_invalidate() {
        let styles = FxHashMap::default();
        let visible = cols(&["a", "b"]);
        let widths = Counting { calls: std::cell::Cell::new(0) };
        let mut layout = PinnedLayout::new();
        let mut inputs = LayoutInputs {
            visible: &visible,
            anchor: Some("b"),
            styles: &styles,
            font_size: 14.0,
            show_row_numbers: false,
            show_filter_row: false,
        };

        assert_eq!(layout.offsets(&inputs, &widths).get("b"), Some(50.0));
        layout.offsets(&inputs, &widths);
        assert_eq!(widths.calls.get(), 2, "second call served from cache");

        inputs.show_filter_row = true;
        layout.offsets(&inputs, &widths);
        assert_eq!(widths.calls.get(), 4, "fingerprint change recomputes");

        layout.invalidate();
        assert!(!layout.is_cached());
        layout.offsets(&inputs, &widths);
        assert_eq!(widths.calls.get(), 6);
    }
}
