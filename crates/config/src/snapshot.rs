//! View configuration snapshots.
//!
//! A snapshot is the JSON document persisted per storage key, exported,
//! imported and embedded in share URLs. Fields are camelCase and every one
//! is validated on its own when applied: a field with the wrong shape is
//! ignored (with a warning) and the rest still apply.
//!
//! Documents pass through [`migrate`] first. Legacy documents (no version,
//! or an older one) are upgraded; a newer version is rejected.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value as Json};
use tabview_engine::filter::{FilterMode, FilterState};
use tabview_engine::view::TableSize;
use tabview_engine::{ColumnStyle, Value, ViewState};

/// Current document version
pub const SETTINGS_VERSION: &str = "0.1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    /// Not JSON, or not a JSON object
    Parse(String),
    /// Written by a newer version
    UnsupportedVersion(String),
    /// The key-value store failed
    Store(String),
    /// Import before any dataset was restored: no headers to reconcile against
    NotRestored,
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::Parse(msg) => write!(f, "Invalid JSON: {}", msg),
            SnapshotError::UnsupportedVersion(v) => {
                write!(f, "Unsupported settings version {} (expected {})", v, SETTINGS_VERSION)
            }
            SnapshotError::Store(msg) => write!(f, "Settings store error: {}", msg),
            SnapshotError::NotRestored => write!(f, "No dataset loaded to apply settings to"),
        }
    }
}

impl std::error::Error for SnapshotError {}

impl From<serde_json::Error> for SnapshotError {
    fn from(e: serde_json::Error) -> Self {
        SnapshotError::Parse(e.to_string())
    }
}

/// Serialized form of a [`ViewState`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub version: String,
    pub theme: String,
    pub column_styles: BTreeMap<String, ColumnStyle>,
    pub column_order: Vec<String>,
    pub hidden_columns: Vec<String>,
    pub filters: BTreeMap<String, String>,
    pub dropdown_filters: BTreeMap<String, Vec<Value>>,
    pub filter_mode: BTreeMap<String, FilterMode>,
    pub show_filter_row: bool,
    pub pinned_anchor: Option<String>,
    pub show_row_numbers: bool,
    pub customize: bool,
    pub table_max_height: TableSize,
    pub table_max_width: TableSize,
    pub font_size: f64,
}

impl Snapshot {
    pub fn to_json(&self) -> Result<Json, SnapshotError> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn to_string_pretty(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Capture every persisted field of `state`
pub fn build_snapshot(state: &ViewState) -> Snapshot {
    Snapshot {
        version: SETTINGS_VERSION.to_string(),
        theme: state.theme.clone(),
        column_styles: state
            .column_styles
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        column_order: state.column_order.clone(),
        hidden_columns: state.hidden.iter().cloned().collect(),
        filters: state.filters.text.clone(),
        dropdown_filters: state
            .filters
            .dropdown
            .iter()
            .map(|(k, set)| (k.clone(), set.iter().cloned().collect()))
            .collect(),
        filter_mode: state.filters.mode.clone(),
        show_filter_row: state.show_filter_row,
        pinned_anchor: state.pinned_anchor.clone(),
        show_row_numbers: state.show_row_numbers,
        customize: state.customize,
        table_max_height: state.table_max_height.clone(),
        table_max_width: state.table_max_width.clone(),
        font_size: state.font_size,
    }
}

// =============================================================================
// Migration
// =============================================================================

fn version_parts(v: &str) -> Option<Vec<u64>> {
    v.split('.').map(|p| p.trim().parse().ok()).collect()
}

/// Upgrade a document to the current version.
///
/// - not an object → `Parse`
/// - a version newer than [`SETTINGS_VERSION`] (or unreadable) → `UnsupportedVersion`
/// - `editable` becomes `customize` unless `customize` is already a boolean
pub fn migrate(doc: Json) -> Result<Json, SnapshotError> {
    let Json::Object(mut obj) = doc else {
        return Err(SnapshotError::Parse("settings must be a JSON object".into()));
    };

    match obj.get("version") {
        None | Some(Json::Null) => {}
        Some(Json::String(v)) if v == SETTINGS_VERSION => {}
        Some(Json::String(v)) => {
            let current = version_parts(SETTINGS_VERSION).unwrap_or_default();
            match version_parts(v) {
                Some(parts) if parts < current => log::debug!("migrating settings from version {}", v),
                _ => return Err(SnapshotError::UnsupportedVersion(v.clone())),
            }
        }
        Some(other) => return Err(SnapshotError::UnsupportedVersion(other.to_string())),
    }

    if let Some(editable) = obj.remove("editable") {
        if !obj.get("customize").is_some_and(Json::is_boolean) && editable.is_boolean() {
            obj.insert("customize".into(), editable);
        }
    }
    obj.insert("version".into(), Json::String(SETTINGS_VERSION.into()));
    Ok(Json::Object(obj))
}

/// Parse text and migrate it
pub fn parse_document(text: &str) -> Result<Json, SnapshotError> {
    let doc: Json = serde_json::from_str(text)?;
    migrate(doc)
}

// =============================================================================
// Apply
// =============================================================================

fn ignored(field: &str, raw: &Json) {
    log::warn!("ignoring settings field {}: {}", field, raw);
}

fn string_list(raw: &Json) -> Option<Vec<String>> {
    let items = raw.as_array()?;
    Some(items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
}

/// Keep known headers (first occurrence), then append the missing ones in header order
pub fn reconcile_order(order: &[String], headers: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(headers.len());
    for column in order {
        if headers.contains(column) && !out.contains(column) {
            out.push(column.clone());
        }
    }
    for header in headers {
        if !out.contains(header) {
            out.push(header.clone());
        }
    }
    out
}

fn apply_filters(filters: &mut FilterState, obj: &Map<String, Json>) {
    if let Some(raw) = obj.get("filters") {
        match raw.as_object() {
            Some(map) => {
                filters.text = map
                    .iter()
                    .filter_map(|(k, v)| v.as_str().filter(|s| !s.is_empty()).map(|s| (k.clone(), s.to_string())))
                    .collect();
            }
            None => ignored("filters", raw),
        }
    }
    if let Some(raw) = obj.get("dropdownFilters") {
        match raw.as_object() {
            Some(map) => {
                filters.dropdown = map
                    .iter()
                    .filter_map(|(k, v)| {
                        let items = v.as_array()?;
                        let set: BTreeSet<Value> = items.iter().map(Value::from_json).collect();
                        (!set.is_empty()).then(|| (k.clone(), set))
                    })
                    .collect();
            }
            None => ignored("dropdownFilters", raw),
        }
    }
    if let Some(raw) = obj.get("filterMode") {
        match raw.as_object() {
            Some(map) => {
                filters.mode = map
                    .iter()
                    .filter_map(|(k, v)| serde_json::from_value::<FilterMode>(v.clone()).ok().map(|m| (k.clone(), m)))
                    .collect();
            }
            None => ignored("filterMode", raw),
        }
    }
}

fn bool_field(obj: &Map<String, Json>, key: &str) -> Option<bool> {
    let raw = obj.get(key)?;
    let value = raw.as_bool();
    if value.is_none() {
        ignored(key, raw);
    }
    value
}

fn size_field(obj: &Map<String, Json>, key: &str) -> Option<TableSize> {
    match obj.get(key)? {
        Json::String(s) => Some(TableSize::parse(s)),
        Json::Number(n) => n.as_f64().map(|px| TableSize::parse(&format!("{}px", px))),
        raw => {
            ignored(key, raw);
            None
        }
    }
}

/// Apply a document onto `state`, field by field.
///
/// Column order is intersected with `headers` and completed with the
/// missing ones; hidden columns are restricted to `headers`. Non-object
/// documents are ignored.
pub fn apply_snapshot(state: &mut ViewState, doc: &Json, headers: &[String]) {
    let Some(obj) = doc.as_object() else {
        log::warn!("ignoring settings: not an object");
        return;
    };

    if let Some(raw) = obj.get("theme") {
        match raw.as_str() {
            Some(theme) => state.theme = theme.to_string(),
            None => ignored("theme", raw),
        }
    }
    if let Some(raw) = obj.get("columnStyles") {
        match raw.as_object() {
            Some(map) => {
                state.column_styles = map
                    .iter()
                    .map(|(k, v)| (k.clone(), ColumnStyle::from_json(v)))
                    .collect();
            }
            None => ignored("columnStyles", raw),
        }
    }
    if let Some(raw) = obj.get("columnOrder") {
        match string_list(raw) {
            Some(order) => state.column_order = reconcile_order(&order, headers),
            None => ignored("columnOrder", raw),
        }
    }
    if let Some(raw) = obj.get("hiddenColumns") {
        match string_list(raw) {
            Some(hidden) => state.hidden = hidden.into_iter().filter(|h| headers.contains(h)).collect(),
            None => ignored("hiddenColumns", raw),
        }
    }

    apply_filters(&mut state.filters, obj);

    if let Some(v) = bool_field(obj, "showFilterRow") {
        state.show_filter_row = v;
    }
    match obj.get("pinnedAnchor") {
        Some(Json::String(anchor)) => state.pinned_anchor = Some(anchor.clone()),
        Some(Json::Null) => state.pinned_anchor = None,
        Some(raw) => ignored("pinnedAnchor", raw),
        None => {}
    }
    if let Some(v) = bool_field(obj, "showRowNumbers") {
        state.show_row_numbers = v;
    }
    match bool_field(obj, "customize") {
        Some(v) => state.customize = v,
        None => {
            if let Some(v) = obj.get("editable").and_then(Json::as_bool) {
                state.customize = v;
            }
        }
    }
    if let Some(size) = size_field(obj, "tableMaxHeight") {
        state.table_max_height = size;
    }
    if let Some(size) = size_field(obj, "tableMaxWidth") {
        state.table_max_width = size;
    }
    if let Some(raw) = obj.get("fontSize") {
        match raw.as_f64().filter(|n| n.is_finite() && *n > 0.0) {
            Some(size) => state.font_size = size,
            None => ignored("fontSize", raw),
        }
    }
}

/// Whether the document carries any filter field
pub fn has_filter_fields(doc: &Json) -> bool {
    doc.as_object().is_some_and(|obj| {
        ["filters", "dropdownFilters", "filterMode"]
            .iter()
            .any(|k| obj.get(*k).is_some_and(|v| !v.is_null()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tabview_engine::style::Width;
    use tabview_engine::SortMode;

    fn headers() -> Vec<String> {
        vec!["a".into(), "b".into(), "c".into()]
    }

    fn busy_state() -> ViewState {
        let mut state = ViewState::new(&headers());
        state.theme = "dracula".into();
        state.set_sort("b", SortMode::DownNumbers);
        state.update_style("a", |s| s.width = Some(Width::Px(120.0)));
        state.move_column("c", "a");
        state.toggle_hidden("b");
        state.filters.set_text("a", ">= 3");
        state.filters.toggle_mode("c");
        state.filters.toggle_value("c", Value::from("x"));
        state.filters.toggle_value("c", Value::Number(2.0));
        state.show_filter_row = true;
        state.pinned_anchor = Some("a".into());
        state.show_row_numbers = true;
        state.customize = true;
        state.table_max_height = TableSize::parse("400px");
        state.font_size = 15.0;
        state
    }

    #[test]
    fn test_round_trip() {
        let state = busy_state();
        let doc = build_snapshot(&state).to_json().unwrap();
        assert_eq!(doc["version"], json!("0.1"));
        assert_eq!(doc["dropdownFilters"]["c"], json!([2, "x"]));
        assert_eq!(doc["columnStyles"]["b"]["sort"], json!("down numbers"));

        let mut restored = ViewState::new(&headers());
        apply_snapshot(&mut restored, &doc, &headers());
        assert_eq!(restored, state);
    }

    #[test]
    fn test_order_reconciliation() {
        let mut state = ViewState::new(&headers());
        apply_snapshot(
            &mut state,
            &json!({"columnOrder": ["c", "gone", "a", "c"], "hiddenColumns": ["gone", "b"]}),
            &headers(),
        );
        assert_eq!(state.column_order, vec!["c", "a", "b"]);
        assert_eq!(state.hidden.iter().collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn test_wrong_shapes_are_ignored_individually() {
        let mut state = ViewState::new(&headers());
        apply_snapshot(
            &mut state,
            &json!({
                "theme": 7,
                "columnOrder": "a,b",
                "filters": ["x"],
                "showFilterRow": "yes",
                "pinnedAnchor": 3,
                "fontSize": -1,
                "showRowNumbers": true
            }),
            &headers(),
        );
        assert_eq!(state.theme, "lite");
        assert_eq!(state.column_order, headers());
        assert!(state.filters.text.is_empty());
        assert!(!state.show_filter_row);
        assert_eq!(state.pinned_anchor, None);
        assert_eq!(state.font_size, 13.0);
        assert!(state.show_row_numbers);
    }

    #[test]
    fn test_pinned_anchor_null_clears() {
        let mut state = ViewState::new(&headers());
        state.pinned_anchor = Some("b".into());
        apply_snapshot(&mut state, &json!({"pinnedAnchor": null}), &headers());
        assert_eq!(state.pinned_anchor, None);
    }

    #[test]
    fn test_legacy_editable() {
        let doc = migrate(json!({"editable": true, "theme": "dark"})).unwrap();
        assert_eq!(doc["customize"], json!(true));
        assert_eq!(doc["version"], json!("0.1"));
        assert!(doc.get("editable").is_none());

        let doc = migrate(json!({"editable": true, "customize": false})).unwrap();
        assert_eq!(doc["customize"], json!(false));

        let mut state = ViewState::new(&headers());
        apply_snapshot(&mut state, &json!({"editable": true}), &headers());
        assert!(state.customize);
    }

    #[test]
    fn test_version_gate() {
        assert!(migrate(json!({"version": "0.0"})).is_ok());
        assert_eq!(
            migrate(json!({"version": "0.2"})),
            Err(SnapshotError::UnsupportedVersion("0.2".into()))
        );
        assert!(matches!(migrate(json!({"version": "next"})), Err(SnapshotError::UnsupportedVersion(_))));
        assert!(matches!(migrate(json!([1, 2])), Err(SnapshotError::Parse(_))));
        assert!(matches!(parse_document("{oops"), Err(SnapshotError::Parse(_))));
    }

    #[test]
    fn test_numeric_table_size() {
        let mut state = ViewState::new(&headers());
        apply_snapshot(&mut state, &json!({"tableMaxWidth": 640, "tableMaxHeight": "unlimited"}), &headers());
        assert_eq!(state.table_max_width, TableSize::parse("640px"));
        assert!(state.table_max_height.is_unlimited());
    }

    #[test]
    fn test_has_filter_fields() {
        assert!(has_filter_fields(&json!({"filters": {}})));
        assert!(!has_filter_fields(&json!({"theme": "dark", "filters": null})));
    }
}
