//! Per-column presentation and behavior settings
//!
//! Every field is optional. Styles arrive from persisted or hand-written
//! configuration documents, so deserialization is lenient: a field with the
//! wrong shape is dropped on its own instead of failing the whole style.

use serde::{Deserialize, Deserializer, Serialize};

use crate::format::NumFormat;
use crate::group::Reducer;

/// Horizontal cell alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Left,
    Center,
    Right,
}

/// Column width: a CSS length (`"120px"`) or a bare pixel count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Width {
    Px(f64),
    Css(String),
}

impl Width {
    /// Pixel value, if expressible (`"120px"`, `"120"`, `120`)
    pub fn pixels(&self) -> Option<f64> {
        match self {
            Width::Px(n) if n.is_finite() => Some(*n),
            Width::Px(_) => None,
            Width::Css(s) => {
                let t = s.trim();
                let t = t.strip_suffix("px").unwrap_or(t).trim();
                t.parse::<f64>().ok().filter(|n| n.is_finite())
            }
        }
    }

    /// Width as stored after a resize
    pub fn from_pixels(px: f64) -> Self {
        Width::Css(format!("{}px", px.round() as i64))
    }
}

/// Per-column sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortMode {
    #[default]
    #[serde(rename = "none")]
    None,
    #[serde(rename = "up")]
    Up,
    #[serde(rename = "down")]
    Down,
    #[serde(rename = "up numbers")]
    UpNumbers,
    #[serde(rename = "down numbers")]
    DownNumbers,
}

impl SortMode {
    pub fn is_active(self) -> bool {
        self != SortMode::None
    }

    pub fn is_ascending(self) -> bool {
        matches!(self, SortMode::Up | SortMode::UpNumbers)
    }

    pub fn is_descending(self) -> bool {
        matches!(self, SortMode::Down | SortMode::DownNumbers)
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, SortMode::UpNumbers | SortMode::DownNumbers)
    }

    /// Header click cycle: none → up → down → none.
    /// Numeric modes are only reachable through explicit settings and
    /// fall back to `none` on click.
    pub fn next(self) -> Self {
        match self {
            SortMode::None => SortMode::Up,
            SortMode::Up => SortMode::Down,
            _ => SortMode::None,
        }
    }
}

/// Declared column type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    #[default]
    Auto,
    Text,
    Number,
    Integer,
}

impl ColumnType {
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Number | ColumnType::Integer)
    }
}

/// Style settings for one column
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub align: Option<Align>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<Width>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_wrap: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortMode>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub column_type: Option<ColumnType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_format: Option<NumFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_by: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split_by: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reducer: Option<Reducer>,
}

impl ColumnStyle {
    /// Read a style object, keeping every well-formed field.
    /// Non-object input yields the default (empty) style.
    pub fn from_json(json: &serde_json::Value) -> Self {
        let Some(obj) = json.as_object() else {
            return Self::default();
        };
        fn field<T: serde::de::DeserializeOwned>(
            obj: &serde_json::Map<String, serde_json::Value>,
            key: &str,
        ) -> Option<T> {
            let raw = obj.get(key)?;
            match serde_json::from_value(raw.clone()) {
                Ok(v) => Some(v),
                Err(_) => {
                    if !raw.is_null() {
                        log::warn!("ignoring column style field {key}: {raw}");
                    }
                    None
                }
            }
        }
        Self {
            color: field(obj, "color"),
            background_color: field(obj, "backgroundColor"),
            bold: field(obj, "bold"),
            align: field(obj, "align"),
            width: field(obj, "width"),
            no_wrap: field(obj, "noWrap"),
            sort: field(obj, "sort"),
            column_type: field(obj, "type"),
            num_format: field(obj, "numFormat"),
            group_by: field(obj, "groupBy"),
            split_by: field(obj, "splitBy"),
            reducer: field(obj, "reducer"),
        }
    }

    pub fn sort_mode(&self) -> SortMode {
        self.sort.unwrap_or_default()
    }

    pub fn declared_type(&self) -> ColumnType {
        self.column_type.unwrap_or_default()
    }

    pub fn is_group_by(&self) -> bool {
        self.group_by.unwrap_or(false)
    }

    pub fn is_split_by(&self) -> bool {
        self.split_by.unwrap_or(false)
    }

    pub fn is_no_wrap(&self) -> bool {
        self.no_wrap.unwrap_or(false)
    }

    /// Reducer used when this column is aggregated. Group-by columns pass
    /// through unchanged, so they have none.
    pub fn effective_reducer(&self) -> Option<Reducer> {
        if self.is_group_by() {
            None
        } else {
            Some(self.reducer.unwrap_or_default())
        }
    }

    pub fn width_px(&self) -> Option<f64> {
        self.width.as_ref().and_then(Width::pixels)
    }
}

impl<'de> Deserialize<'de> for ColumnStyle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Ok(ColumnStyle::from_json(&raw))
    }
}
