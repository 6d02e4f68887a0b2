//! Row normalization for pre-parsed and query-shaped input
//!
//! Accepted JSON shapes:
//! - `{"headers": [...], "rows": [...]}` or `{"headers": [...], "data": [...]}`
//! - `{"meta": {"fields": [...]}, "data": [...]}` (parser output)
//! - `{"columns": [{"name", "type"}...], "rows": [[...]]}` (query result with column metadata)
//! - `{"schema": {"fields": [{"name"}...]}, "data": [[...]]}` (query result with a schema)
//! - a bare array of objects (headers in first-seen order)
//!
//! Rows may be objects keyed by column or positional arrays. Every output
//! row carries every header; missing and null values become `Empty`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value as Json};
use tabview_engine::{Row, RowId, RowSet, Value};

use crate::error::SourceError;

/// Declared column type hint, when the source has one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalKind {
    Date,
    Timestamp,
}

impl TemporalKind {
    /// Recognize date/time type names (`DATE`, `TIMESTAMP WITH TIME ZONE`, `datetime`, ...)
    pub fn from_type_name(name: &str) -> Option<Self> {
        let upper = name.trim().to_ascii_uppercase();
        if upper.starts_with("TIMESTAMP") || upper.starts_with("DATETIME") {
            Some(TemporalKind::Timestamp)
        } else if upper.starts_with("DATE") {
            Some(TemporalKind::Date)
        } else if upper.starts_with("TIME") {
            Some(TemporalKind::Timestamp)
        } else {
            None
        }
    }
}

/// Unit of numeric temporal values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpochUnit {
    Seconds,
    Millis,
}

/// ISO-8601 (UTC, millisecond precision) for an epoch value
pub fn epoch_to_iso(n: f64, unit: EpochUnit) -> Option<String> {
    if !n.is_finite() {
        return None;
    }
    let millis = match unit {
        EpochUnit::Seconds => n * 1000.0,
        EpochUnit::Millis => n,
    };
    let dt: DateTime<Utc> = DateTime::from_timestamp_millis(millis.round() as i64)?;
    Some(dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Coerce a numeric value of a temporal column to an ISO string; anything else passes through
pub fn coerce_temporal(value: Value, kind: Option<TemporalKind>, unit: EpochUnit) -> Value {
    match (kind, &value) {
        (Some(_), Value::Number(n)) => epoch_to_iso(*n, unit).map(Value::Text).unwrap_or(value),
        _ => value,
    }
}

struct Column {
    name: String,
    kind: Option<TemporalKind>,
}

fn column_from_json(field: &Json) -> Option<Column> {
    match field {
        Json::String(name) => Some(Column { name: name.clone(), kind: None }),
        Json::Object(obj) => {
            let name = obj.get("name")?.as_str()?.to_string();
            let kind = obj
                .get("type")
                .or_else(|| obj.get("typeName"))
                .and_then(Json::as_str)
                .and_then(TemporalKind::from_type_name);
            Some(Column { name, kind })
        }
        _ => None,
    }
}

fn columns_from(list: Option<&Json>) -> Option<Vec<Column>> {
    let list = list?.as_array()?;
    Some(list.iter().filter_map(column_from_json).collect())
}

fn find_columns(obj: &Map<String, Json>) -> Option<Vec<Column>> {
    columns_from(obj.get("meta").and_then(|m| m.get("fields")))
        .filter(|c| !c.is_empty())
        .or_else(|| columns_from(obj.get("headers")))
        .or_else(|| columns_from(obj.get("columns")))
        .or_else(|| columns_from(obj.get("schema").and_then(|s| s.get("fields"))))
}

/// Normalize a pre-parsed JSON dataset
pub fn normalize_json(doc: &Json) -> Result<RowSet, SourceError> {
    match doc {
        Json::Array(rows) => normalize_object_rows(rows),
        Json::Object(obj) => {
            let rows = match obj.get("data").or_else(|| obj.get("rows")) {
                Some(Json::Array(rows)) => rows.as_slice(),
                Some(Json::Null) | None => &[],
                Some(other) => {
                    return Err(SourceError::Parse(format!("rows must be an array, got {}", json_kind(other))))
                }
            };
            match find_columns(obj) {
                Some(columns) => Ok(build(columns, rows)),
                None if rows.iter().all(Json::is_object) => normalize_object_rows(rows),
                None => Err(SourceError::parse("positional rows need a header or column list")),
            }
        }
        other => Err(SourceError::Parse(format!("expected an object or array, got {}", json_kind(other)))),
    }
}

/// Parse then normalize JSON text
pub fn normalize_json_str(text: &str) -> Result<RowSet, SourceError> {
    let doc: Json = serde_json::from_str(text)?;
    normalize_json(&doc)
}

fn normalize_object_rows(rows: &[Json]) -> Result<RowSet, SourceError> {
    let mut columns: Vec<Column> = Vec::new();
    for row in rows {
        let Json::Object(obj) = row else {
            return Err(SourceError::Parse(format!("expected object rows, got {}", json_kind(row))));
        };
        for key in obj.keys() {
            if !columns.iter().any(|c| &c.name == key) {
                columns.push(Column { name: key.clone(), kind: None });
            }
        }
    }
    Ok(build(columns, rows))
}

fn build(columns: Vec<Column>, rows: &[Json]) -> RowSet {
    let out = rows
        .iter()
        .enumerate()
        .map(|(idx, raw)| {
            let mut row = Row::new(RowId::Seq(idx as u64 + 1));
            for (pos, column) in columns.iter().enumerate() {
                let cell = match raw {
                    Json::Object(obj) => obj.get(&column.name),
                    Json::Array(items) => items.get(pos),
                    _ => None,
                };
                let value = cell.map(Value::from_json).unwrap_or_default();
                row.set(column.name.clone(), coerce_temporal(value, column.kind, EpochUnit::Millis));
            }
            row
        })
        .collect();
    RowSet::new(columns.into_iter().map(|c| c.name).collect(), out)
}

fn json_kind(v: &Json) -> &'static str {
    match v {
        Json::Null => "null",
        Json::Bool(_) => "a boolean",
        Json::Number(_) => "a number",
        Json::String(_) => "a string",
        Json::Array(_) => "an array",
        Json::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_headers_and_data() {
        let set = normalize_json(&json!({
            "headers": ["a", "b"],
            "data": [{"a": 1, "b": null}, {"a": "x"}]
        }))
        .unwrap();
        assert_eq!(set.headers, vec!["a", "b"]);
        assert_eq!(set.rows[0].get("a"), &Value::Number(1.0));
        assert_eq!(set.rows[0].get("b"), &Value::Empty);
        assert!(set.rows[1].contains("b"));
        assert_eq!(set.rows[1].id, RowId::Seq(2));
    }

    #[test]
    fn test_meta_fields_take_precedence() {
        let set = normalize_json(&json!({
            "meta": {"fields": ["x"]},
            "headers": ["ignored"],
            "data": [{"x": true}]
        }))
        .unwrap();
        assert_eq!(set.headers, vec!["x"]);
        assert_eq!(set.rows[0].get("x"), &Value::from("true"));
    }

    #[test]
    fn test_positional_rows_with_column_metadata() {
        let set = normalize_json(&json!({
            "columns": [{"name": "id", "type": "INTEGER"}, {"name": "day", "type": "DATE"}],
            "rows": [[1, 0], [2, 86400000], [3]]
        }))
        .unwrap();
        assert_eq!(set.headers, vec!["id", "day"]);
        assert_eq!(set.rows[0].get("day"), &Value::from("1970-01-01T00:00:00.000Z"));
        assert_eq!(set.rows[1].get("day"), &Value::from("1970-01-02T00:00:00.000Z"));
        assert_eq!(set.rows[2].get("day"), &Value::Empty);
    }

    #[test]
    fn test_schema_fields() {
        let set = normalize_json(&json!({
            "schema": {"fields": [{"name": "k"}]},
            "data": [["v"]]
        }))
        .unwrap();
        assert_eq!(set.rows[0].get("k"), &Value::from("v"));
    }

    #[test]
    fn test_bare_object_array() {
        let set = normalize_json(&json!([{"b": 1}, {"a": 2, "b": 3}])).unwrap();
        assert_eq!(set.headers, vec!["b", "a"]);
        assert_eq!(set.rows[0].get("a"), &Value::Empty);
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(matches!(normalize_json(&json!(42)), Err(SourceError::Parse(_))));
        assert!(matches!(normalize_json(&json!({"data": [[1, 2]]})), Err(SourceError::Parse(_))));
        assert!(matches!(normalize_json(&json!({"headers": ["a"], "data": 5})), Err(SourceError::Parse(_))));
        assert!(matches!(normalize_json_str("{not json"), Err(SourceError::Parse(_))));
    }

    #[test]
    fn test_empty_object_is_empty_set() {
        let set = normalize_json(&json!({})).unwrap();
        assert!(set.headers.is_empty());
        assert!(set.is_empty());
    }

    #[test]
    fn test_temporal_kinds() {
        assert_eq!(TemporalKind::from_type_name("timestamp with time zone"), Some(TemporalKind::Timestamp));
        assert_eq!(TemporalKind::from_type_name("DATE"), Some(TemporalKind::Date));
        assert_eq!(TemporalKind::from_type_name("TEXT"), None);
        assert_eq!(epoch_to_iso(1.5, EpochUnit::Seconds).as_deref(), Some("1970-01-01T00:00:01.500Z"));
    }
}
