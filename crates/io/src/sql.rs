//! SQL dataset provider.
//!
//! [`DatasetProvider`] is the seam between dashboards and a query engine.
//! [`SqliteProvider`] runs everything in an in-memory SQLite database:
//! database files are attached under a schema name, row sets become tables.

use std::path::Path;

use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use tabview_engine::infer::infer_column;
use tabview_engine::{ColumnType, RowSet, Value};

use crate::csv::unique_headers;
use crate::error::SourceError;
use crate::normalize::{coerce_temporal, EpochUnit, TemporalKind};

/// Column names plus positional records, as returned by a statement
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub records: Vec<Vec<Value>>,
}

impl QueryResult {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_row_set(self) -> RowSet {
        RowSet::from_records(self.columns, self.records)
    }
}

/// Something that can hold named datasets and answer SQL over them
pub trait DatasetProvider {
    /// Make a database file queryable as `"<name>".<table>`
    fn attach(&mut self, name: &str, source: &Path) -> Result<(), SourceError>;

    /// Expose a row set as table `"<name>"`, replacing any previous one
    fn register_rows(&mut self, name: &str, rows: &RowSet) -> Result<(), SourceError>;

    fn query(&self, sql: &str) -> Result<QueryResult, SourceError>;
}

pub struct SqliteProvider {
    conn: Connection,
}

impl SqliteProvider {
    pub fn new() -> Result<Self, SourceError> {
        let conn = Connection::open_in_memory().map_err(|e| query_error("open in-memory database", e))?;
        Ok(Self { conn })
    }
}

/// Double-quoted SQL identifier
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn query_error(statement: &str, e: rusqlite::Error) -> SourceError {
    SourceError::Query {
        statement: statement.to_string(),
        message: e.to_string(),
    }
}

fn affinity(column_type: ColumnType) -> &'static str {
    match column_type {
        ColumnType::Integer => "INTEGER",
        ColumnType::Number => "REAL",
        ColumnType::Auto | ColumnType::Text => "TEXT",
    }
}

fn to_sql(value: &Value, column_type: ColumnType) -> SqlValue {
    match (value, column_type) {
        (Value::Empty, _) => SqlValue::Null,
        (v, ColumnType::Integer) => match v.strict_number() {
            Some(n) => SqlValue::Integer(n as i64),
            None => SqlValue::Text(v.to_string()),
        },
        (v, ColumnType::Number) => match v.strict_number() {
            Some(n) => SqlValue::Real(n),
            None => SqlValue::Text(v.to_string()),
        },
        (v, _) => SqlValue::Text(v.to_string()),
    }
}

fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Empty,
        ValueRef::Integer(i) => Value::Number(i as f64),
        ValueRef::Real(f) => Value::Number(f),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => Value::from(String::from_utf8_lossy(bytes).into_owned()),
    }
}

impl DatasetProvider for SqliteProvider {
    fn attach(&mut self, name: &str, source: &Path) -> Result<(), SourceError> {
        let statement = format!("ATTACH DATABASE ?1 AS {}", quote_ident(name));
        let path = source.to_string_lossy().into_owned();
        self.conn
            .execute(&statement, [&path])
            .map_err(|e| query_error(&statement, e))?;
        log::debug!("sql: attached {} as {}", source.display(), name);
        Ok(())
    }

    fn register_rows(&mut self, name: &str, rows: &RowSet) -> Result<(), SourceError> {
        let table = quote_ident(name);
        let types: Vec<ColumnType> = rows.headers.iter().map(|h| infer_column(&rows.rows, h)).collect();
        let columns: Vec<String> = rows
            .headers
            .iter()
            .zip(&types)
            .map(|(h, t)| format!("{} {}", quote_ident(h), affinity(*t)))
            .collect();

        let drop = format!("DROP TABLE IF EXISTS {}", table);
        self.conn.execute(&drop, []).map_err(|e| query_error(&drop, e))?;
        let create = format!("CREATE TABLE {} ({})", table, columns.join(", "));
        self.conn.execute(&create, []).map_err(|e| query_error(&create, e))?;
        if rows.headers.is_empty() {
            return Ok(());
        }

        let placeholders: Vec<String> = (1..=rows.headers.len()).map(|i| format!("?{}", i)).collect();
        let insert = format!("INSERT INTO {} VALUES ({})", table, placeholders.join(", "));
        let tx = self.conn.transaction().map_err(|e| query_error("BEGIN", e))?;
        {
            let mut stmt = tx.prepare(&insert).map_err(|e| query_error(&insert, e))?;
            for row in &rows.rows {
                let values = rows.headers.iter().zip(&types).map(|(h, t)| to_sql(row.get(h), *t));
                stmt.execute(params_from_iter(values)).map_err(|e| query_error(&insert, e))?;
            }
        }
        tx.commit().map_err(|e| query_error("COMMIT", e))?;
        log::debug!("sql: registered {} ({} rows)", name, rows.len());
        Ok(())
    }

    fn query(&self, sql: &str) -> Result<QueryResult, SourceError> {
        let mut stmt = self.conn.prepare(sql).map_err(|e| query_error(sql, e))?;
        let (names, kinds): (Vec<String>, Vec<Option<TemporalKind>>) = stmt
            .columns()
            .iter()
            .map(|c| (c.name().to_string(), c.decl_type().and_then(TemporalKind::from_type_name)))
            .unzip();
        let width = names.len();

        let mut records = Vec::new();
        let mut rows = stmt.query([]).map_err(|e| query_error(sql, e))?;
        while let Some(row) = rows.next().map_err(|e| query_error(sql, e))? {
            let mut record = Vec::with_capacity(width);
            for (i, kind) in kinds.iter().enumerate() {
                let raw = row.get_ref(i).map_err(|e| query_error(sql, e))?;
                record.push(coerce_temporal(from_sql(raw), *kind, EpochUnit::Seconds));
            }
            records.push(record);
        }

        Ok(QueryResult {
            columns: unique_headers(names.iter().map(String::as_str)),
            records,
        })
    }
}
