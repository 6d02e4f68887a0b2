//! Dashboards: named datasets and databases feeding several table views.
//!
//! Datasets are loaded first (any failure fails the whole dashboard), then
//! registered with the dataset provider and databases attached. Each view
//! then runs on its own; a failing view logs a warning and shows no rows.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tabview_engine::RowSet;

use crate::csv::CsvOptions;
use crate::error::SourceError;
use crate::fetch::{CancellationToken, Fetcher};
use crate::normalize::normalize_json_str;
use crate::source::DataSource;
use crate::sql::{quote_ident, DatasetProvider};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatType {
    #[default]
    Csv,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetFormat {
    #[serde(rename = "type")]
    pub format_type: FormatType,
    pub header: bool,
    pub separator: Option<String>,
    pub columns: Option<Vec<String>>,
}

impl Default for DatasetFormat {
    fn default() -> Self {
        Self {
            format_type: FormatType::Csv,
            header: true,
            separator: None,
            columns: None,
        }
    }
}

impl DatasetFormat {
    pub fn csv_options(&self) -> CsvOptions {
        CsvOptions {
            delimiter: self.separator.as_deref().and_then(|s| s.bytes().next()),
            has_header: self.header,
            columns: self.columns.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetSpec {
    pub title: Option<String>,
    #[serde(rename = "csvURL", alias = "csvUrl")]
    pub csv_url: Option<String>,
    #[serde(rename = "csvString")]
    pub csv_string: Option<String>,
    #[serde(rename = "csvData")]
    pub csv_data: Option<serde_json::Value>,
    pub format: DatasetFormat,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbSpec {
    pub title: Option<String>,
    /// Path of the database file
    #[serde(rename = "dbURL", alias = "dbUrl")]
    pub db_url: String,
}

/// Table options a view passes to its table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TableProps {
    pub default_settings: Option<serde_json::Value>,
    pub download_filename: Option<String>,
    pub storage_key: Option<String>,
    pub max_height: Option<String>,
    pub max_width: Option<String>,
    pub font_size: Option<f64>,
    pub collapsed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewSpec {
    pub name: String,
    pub title: Option<String>,
    pub sql: Option<String>,
    pub dataset: Option<String>,
    pub props: TableProps,
}

impl ViewSpec {
    /// The view's statement: its own SQL, else everything from its dataset
    pub fn statement(&self) -> Option<String> {
        self.sql
            .clone()
            .or_else(|| self.dataset.as_deref().map(|d| format!("SELECT * FROM {}", quote_ident(d))))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DbMode {
    #[default]
    #[serde(alias = "duckdb")]
    Sqlite,
    None,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardSpec {
    pub title: Option<String>,
    pub datasets: BTreeMap<String, DatasetSpec>,
    pub dbs: BTreeMap<String, DbSpec>,
    /// Views in display order
    pub views: Vec<ViewSpec>,
    pub db: DbMode,
    /// Views per layout row
    pub layout: Vec<usize>,
}

impl DashboardSpec {
    pub fn from_json(text: &str) -> Result<Self, SourceError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, SourceError> {
        let text = std::fs::read_to_string(path).map_err(|e| SourceError::Parse(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&text)
    }
}

/// Failures that stop the whole dashboard
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardError {
    Dataset { name: String, source: SourceError },
    Attach { name: String, source: SourceError },
}

impl fmt::Display for DashboardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DashboardError::Dataset { name, source } => {
                write!(f, "Failed to load dataset '{}': {}", name, source.inline_message())
            }
            DashboardError::Attach { name, source } => {
                let message = match source {
                    SourceError::Query { message, .. } => message.clone(),
                    other => other.to_string(),
                };
                write!(f, "Failed to attach DB '{}': {}", name, message)
            }
        }
    }
}

impl std::error::Error for DashboardError {}

/// One rendered view
#[derive(Debug, Clone)]
pub struct ViewOutcome {
    pub name: String,
    pub title: Option<String>,
    pub props: TableProps,
    pub rows: RowSet,
    pub error: Option<SourceError>,
}

#[derive(Debug, Clone)]
pub struct Dashboard {
    pub title: Option<String>,
    pub views: Vec<ViewOutcome>,
    pub layout: Vec<Range<usize>>,
}

/// Split `count` views into rows: `layout[i]` views on row `i`, the rest one per row
pub fn layout_rows(layout: &[usize], count: usize) -> Vec<Range<usize>> {
    let mut rows = Vec::new();
    let mut next = 0;
    for &width in layout {
        if next >= count {
            break;
        }
        if width == 0 {
            continue;
        }
        let end = (next + width).min(count);
        rows.push(next..end);
        next = end;
    }
    rows.extend((next..count).map(|i| i..i + 1));
    rows
}

fn load_dataset(
    spec: &DatasetSpec,
    fetcher: Option<&Fetcher>,
    token: &CancellationToken,
) -> Result<Option<RowSet>, SourceError> {
    let source = DataSource::resolve(
        spec.csv_string.clone(),
        spec.csv_data.clone(),
        spec.csv_url.clone(),
        spec.format.csv_options(),
    )?;
    if spec.format.format_type == FormatType::Csv {
        return source.read(fetcher, token);
    }
    match source {
        DataSource::Text { content, .. } => normalize_json_str(&content).map(Some),
        DataSource::Url { url, .. } => {
            let text = match fetcher {
                Some(f) => f.fetch_text(&url, token)?,
                None => Fetcher::new()?.fetch_text(&url, token)?,
            };
            text.map(|t| normalize_json_str(&t)).transpose()
        }
        parsed @ DataSource::Parsed(_) => parsed.read(fetcher, token),
    }
}

/// Load, attach and run every view. `Ok(None)` when cancelled.
pub fn run_dashboard(
    spec: &DashboardSpec,
    provider: &mut dyn DatasetProvider,
    fetcher: Option<&Fetcher>,
    token: &CancellationToken,
) -> Result<Option<Dashboard>, DashboardError> {
    let mut datasets: BTreeMap<&str, RowSet> = BTreeMap::new();
    for (name, dataset) in &spec.datasets {
        let loaded = load_dataset(dataset, fetcher, token).map_err(|source| DashboardError::Dataset {
            name: name.clone(),
            source,
        })?;
        match loaded {
            Some(rows) => datasets.insert(name, rows),
            None => return Ok(None),
        };
    }

    if spec.db == DbMode::Sqlite {
        for (name, rows) in &datasets {
            provider.register_rows(name, rows).map_err(|source| DashboardError::Dataset {
                name: name.to_string(),
                source,
            })?;
        }
        for (name, db) in &spec.dbs {
            provider
                .attach(name, Path::new(&db.db_url))
                .map_err(|source| DashboardError::Attach { name: name.clone(), source })?;
        }
    }
    if token.is_cancelled() {
        return Ok(None);
    }

    let views = spec
        .views
        .iter()
        .map(|view| {
            let outcome = match spec.db {
                DbMode::Sqlite => run_view(view, &*provider),
                DbMode::None => view
                    .dataset
                    .as_deref()
                    .and_then(|d| datasets.get(d).cloned())
                    .ok_or_else(|| SourceError::Query {
                        statement: String::new(),
                        message: format!("view '{}' has no dataset", view.name),
                    }),
            };
            let (rows, error) = match outcome {
                Ok(rows) => (rows, None),
                Err(err) => {
                    log::warn!("view {}: {}", view.name, err);
                    (RowSet::default(), Some(err))
                }
            };
            ViewOutcome {
                name: view.name.clone(),
                title: view.title.clone(),
                props: view.props.clone(),
                rows,
                error,
            }
        })
        .collect::<Vec<_>>();

    let layout = layout_rows(&spec.layout, views.len());
    Ok(Some(Dashboard {
        title: spec.title.clone(),
        views,
        layout,
    }))
}

fn run_view(view: &ViewSpec, provider: &dyn DatasetProvider) -> Result<RowSet, SourceError> {
    let statement = view.statement().ok_or_else(|| SourceError::Query {
        statement: String::new(),
        message: format!("view '{}' has neither sql nor dataset", view.name),
    })?;
    Ok(provider.query(&statement)?.into_row_set())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::SqliteProvider;
    use tabview_engine::Value;

    fn spec(json: &str) -> DashboardSpec {
        DashboardSpec::from_json(json).unwrap()
    }

    #[test]
    fn test_layout_rows() {
        assert_eq!(layout_rows(&[2, 1], 5), vec![0..2, 2..3, 3..4, 4..5]);
        assert_eq!(layout_rows(&[3], 2), vec![0..2]);
        assert_eq!(layout_rows(&[], 2), vec![0..1, 1..2]);
        assert_eq!(layout_rows(&[0, 2], 2), vec![0..2]);
    }

    #[test]
    fn test_parse_spec() {
        let s = spec(
            r#"{
                "datasets": {"people": {"csvString": "a;b\n1;2", "format": {"separator": ";"}}},
                "views": [{"name": "v", "dataset": "people", "props": {"storageKey": "k", "collapsed": true}}],
                "db": "duckdb",
                "layout": [1]
            }"#,
        );
        assert_eq!(s.db, DbMode::Sqlite);
        assert_eq!(s.datasets["people"].format.csv_options().delimiter, Some(b';'));
        assert!(s.views[0].props.collapsed);
        assert_eq!(s.views[0].statement().as_deref(), Some("SELECT * FROM \"people\""));
    }

    #[test]
    fn test_views_run_independently() {
        let s = spec(
            r#"{
                "datasets": {"sales": {"csvString": "region,amount\nN,10\nS,5\nN,7"}},
                "views": [
                    {"name": "totals", "sql": "SELECT region, SUM(amount) AS total FROM sales GROUP BY region ORDER BY region"},
                    {"name": "broken", "sql": "SELECT nope FROM sales"},
                    {"name": "raw", "dataset": "sales"}
                ]
            }"#,
        );
        let mut provider = SqliteProvider::new().unwrap();
        let dash = run_dashboard(&s, &mut provider, None, &CancellationToken::new()).unwrap().unwrap();

        assert_eq!(dash.views.len(), 3);
        assert_eq!(dash.views[0].rows.rows[0].get("total"), &Value::Number(17.0));
        assert!(dash.views[1].rows.is_empty());
        assert!(matches!(dash.views[1].error, Some(SourceError::Query { .. })));
        assert_eq!(dash.views[2].rows.len(), 3);
        assert_eq!(dash.layout, vec![0..1, 1..2, 2..3]);
    }

    #[test]
    fn test_json_dataset_without_db() {
        let s = spec(
            r#"{
                "db": "none",
                "datasets": {"d": {"csvString": "{\"headers\":[\"x\"],\"rows\":[{\"x\":1}]}", "format": {"type": "json"}}},
                "views": [{"name": "v", "dataset": "d"}, {"name": "w", "dataset": "other"}]
            }"#,
        );
        let mut provider = SqliteProvider::new().unwrap();
        let dash = run_dashboard(&s, &mut provider, None, &CancellationToken::new()).unwrap().unwrap();
        assert_eq!(dash.views[0].rows.rows[0].get("x"), &Value::Number(1.0));
        assert!(dash.views[1].error.is_some());
    }

    #[test]
    fn test_attach_failure_is_dashboard_error() {
        let s = spec(r#"{"dbs": {"main2": {"dbURL": "/nonexistent/dir/x.db"}}, "views": []}"#);
        let mut provider = SqliteProvider::new().unwrap();
        let err = run_dashboard(&s, &mut provider, None, &CancellationToken::new()).unwrap_err();
        assert!(err.to_string().starts_with("Failed to attach DB 'main2': "));
    }

    #[test]
    fn test_dataset_without_input_fails() {
        let s = spec(r#"{"datasets": {"empty": {}}}"#);
        let mut provider = SqliteProvider::new().unwrap();
        let err = run_dashboard(&s, &mut provider, None, &CancellationToken::new()).unwrap_err();
        assert_eq!(
            err,
            DashboardError::Dataset { name: "empty".into(), source: SourceError::DataSource }
        );
    }
}
