//! Virtualized row window
//!
//! Only the rows intersecting the viewport (plus an overscan margin on each
//! side) are rendered; the rest is replaced by top and bottom padding so the
//! scrollbar keeps its full extent.

/// Rows rendered beyond each edge of the viewport
pub const OVERSCAN: usize = 10;

/// Smallest row height, in pixels
pub const MIN_ROW_HEIGHT: f64 = 24.0;

/// Row height for a font size: `max(24, font_size + 16)`
pub fn row_height_for_font(font_size: f64) -> f64 {
    (font_size + 16.0).max(MIN_ROW_HEIGHT)
}

/// Slice of rows to render
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VirtualWindow {
    /// First rendered row (inclusive)
    pub start: usize,
    /// Last rendered row (exclusive)
    pub end: usize,
    pub top_padding: f64,
    pub bottom_padding: f64,
}

impl VirtualWindow {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

/// Compute the window for a scroll position.
///
/// `start = max(0, floor(scroll_top / row_height) - overscan)`,
/// `end = min(row_count, ceil((scroll_top + viewport) / row_height) + overscan)`.
/// A non-positive row height renders every row.
pub fn compute_window(
    scroll_top: f64,
    viewport_height: f64,
    row_height: f64,
    row_count: usize,
    overscan: usize,
) -> VirtualWindow {
    if row_height.is_nan() || row_height <= 0.0 {
        return VirtualWindow {
            start: 0,
            end: row_count,
            top_padding: 0.0,
            bottom_padding: 0.0,
        };
    }
    let scroll_top = scroll_top.max(0.0);
    let viewport_height = viewport_height.max(0.0);

    let first = (scroll_top / row_height).floor() as usize;
    let last = ((scroll_top + viewport_height) / row_height).ceil() as usize;
    let start = first.saturating_sub(overscan).min(row_count);
    let end = last.saturating_add(overscan).min(row_count).max(start);

    VirtualWindow {
        start,
        end,
        top_padding: start as f64 * row_height,
        bottom_padding: (row_count - end) as f64 * row_height,
    }
}
