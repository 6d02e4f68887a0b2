//! Number display formats
//!
//! `general` on a numeric column resolves to a grouped format (no decimals
//! for integer columns, two for fractional ones). Values that do not coerce
//! to a number are displayed unchanged.

use serde::{Deserialize, Serialize};

use crate::style::{ColumnStyle, ColumnType};
use crate::value::Value;

/// Display format for numeric cells
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NumFormat {
    #[default]
    General,
    /// No grouping, no decimals
    Int,
    /// No grouping, two decimals
    Fixed2,
    /// Grouped, no decimals
    Thousand,
    /// Grouped, two decimals
    Thousand2,
    /// USD
    Currency,
    /// USD, negatives highlighted
    CurrencyRed,
    /// USD, negatives as `($1.00)` and highlighted
    CurrencyParenRed,
    /// Grouped two decimals, negatives as `(1.00)` and highlighted
    ParenRed,
}

impl NumFormat {
    pub const ALL: [NumFormat; 9] = [
        NumFormat::General,
        NumFormat::Int,
        NumFormat::Fixed2,
        NumFormat::Thousand,
        NumFormat::Thousand2,
        NumFormat::Currency,
        NumFormat::CurrencyRed,
        NumFormat::CurrencyParenRed,
        NumFormat::ParenRed,
    ];

    /// Whether negatives should be rendered in the highlight color
    pub fn highlights_negative(self) -> bool {
        matches!(
            self,
            NumFormat::CurrencyRed | NumFormat::CurrencyParenRed | NumFormat::ParenRed
        )
    }
}

/// A cell ready for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayCell {
    pub text: String,
    /// Render in the negative highlight color
    pub negative_highlight: bool,
}

impl DisplayCell {
    fn plain(text: String) -> Self {
        Self {
            text,
            negative_highlight: false,
        }
    }
}

/// Format a cell for display given its column style and effective type
pub fn format_cell(value: &Value, style: Option<&ColumnStyle>, effective: ColumnType) -> DisplayCell {
    let declared = style.map(ColumnStyle::declared_type).unwrap_or_default();
    if declared == ColumnType::Text || !(declared.is_numeric() || effective.is_numeric()) {
        return DisplayCell::plain(value.to_string());
    }
    let Some(n) = value.as_number().filter(|n| n.is_finite()) else {
        return DisplayCell::plain(value.to_string());
    };

    let mut fmt = style.and_then(|s| s.num_format).unwrap_or_default();
    if fmt == NumFormat::General {
        fmt = if effective == ColumnType::Integer {
            NumFormat::Thousand
        } else {
            NumFormat::Thousand2
        };
    }
    DisplayCell {
        text: format_number_as(n, fmt),
        negative_highlight: fmt.highlights_negative() && n < 0.0,
    }
}

/// Render a number in the given format
pub fn format_number_as(n: f64, fmt: NumFormat) -> String {
    match fmt {
        NumFormat::General => crate::value::format_number(n),
        NumFormat::Int => fixed(n, 0, false),
        NumFormat::Fixed2 => fixed(n, 2, false),
        NumFormat::Thousand => fixed(n, 0, true),
        NumFormat::Thousand2 => fixed(n, 2, true),
        NumFormat::Currency | NumFormat::CurrencyRed => currency(n),
        NumFormat::CurrencyParenRed => parenthesize(n, currency(n.abs())),
        NumFormat::ParenRed => parenthesize(n, fixed(n.abs(), 2, true)),
    }
}

fn parenthesize(n: f64, base: String) -> String {
    if n < 0.0 {
        format!("({})", base)
    } else {
        base
    }
}

fn currency(n: f64) -> String {
    let body = fixed(n.abs(), 2, true);
    if n < 0.0 && body.bytes().any(|b| matches!(b, b'1'..=b'9')) {
        format!("-${}", body)
    } else {
        format!("${}", body)
    }
}

/// Fixed decimals with optional `,` thousands grouping
fn fixed(n: f64, decimals: usize, grouping: bool) -> String {
    let raw = format!("{:.*}", decimals, n.abs());
    let (int_part, frac_part) = match raw.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (raw.as_str(), None),
    };

    let mut out = String::with_capacity(raw.len() + raw.len() / 3 + 1);
    let is_zero = !raw.bytes().any(|b| matches!(b, b'1'..=b'9'));
    if n < 0.0 && !is_zero {
        out.push('-');
    }
    if grouping {
        let len = int_part.len();
        for (i, ch) in int_part.chars().enumerate() {
            if i > 0 && (len - i) % 3 == 0 {
                out.push(',');
            }
            out.push(ch);
        }
    } else {
        out.push_str(int_part);
    }
    if let Some(f) = frac_part {
        out.push('.');
        out.push_str(f);
    }
    out
}
