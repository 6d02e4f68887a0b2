//! Source selection and the committed load state.
//!
//! Inputs are mutually exclusive with precedence literal text > pre-parsed
//! object > URL. [`DataLoader`] hands out one [`LoadTicket`] per load; a new
//! load cancels the previous ticket, and only the current, uncancelled
//! ticket may commit.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use tabview_engine::RowSet;

use crate::csv::{parse_csv_with, CsvOptions};
use crate::error::SourceError;
use crate::fetch::{CancellationToken, Fetcher};
use crate::normalize::normalize_json;

/// A resolved data source
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    Text { content: String, options: CsvOptions },
    Parsed(serde_json::Value),
    Url { url: String, options: CsvOptions },
}

impl DataSource {
    /// Pick one input by precedence; `DataSource` error when none is given
    pub fn resolve(
        csv_string: Option<String>,
        csv_data: Option<serde_json::Value>,
        csv_url: Option<String>,
        options: CsvOptions,
    ) -> Result<Self, SourceError> {
        if let Some(content) = csv_string {
            return Ok(DataSource::Text { content, options });
        }
        if let Some(data) = csv_data {
            return Ok(DataSource::Parsed(data));
        }
        match csv_url {
            Some(url) => Ok(DataSource::Url { url, options }),
            None => Err(SourceError::DataSource),
        }
    }

    /// Stable identity for restore bookkeeping. Changes whenever the input does.
    pub fn identity(&self) -> String {
        match self {
            DataSource::Url { url, .. } => format!("url:{}", url),
            DataSource::Text { content, .. } => format!("text:{:016x}", hash_of(content)),
            DataSource::Parsed(doc) => format!("parsed:{:016x}", hash_of(&doc.to_string())),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, DataSource::Url { .. })
    }

    /// Produce rows. `Ok(None)` means the load was cancelled.
    pub fn read(&self, fetcher: Option<&Fetcher>, token: &CancellationToken) -> Result<Option<RowSet>, SourceError> {
        match self {
            DataSource::Text { content, options } => parse_csv_with(content, options).map(Some),
            DataSource::Parsed(doc) => normalize_json(doc).map(Some),
            DataSource::Url { url, options } => match fetcher {
                Some(fetcher) => fetcher.fetch_csv(url, options, token),
                None => Fetcher::new()?.fetch_csv(url, options, token),
            },
        }
    }
}

fn hash_of(s: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    s.hash(&mut hasher);
    hasher.finish()
}

/// Handle for one in-flight load
#[derive(Debug, Clone)]
pub struct LoadTicket {
    generation: u64,
    token: CancellationToken,
}

impl LoadTicket {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Committed `{rows, error}` state plus the current ticket
#[derive(Default)]
pub struct DataLoader {
    fetcher: Option<Fetcher>,
    generation: u64,
    current: Option<CancellationToken>,
    rows: RowSet,
    error: Option<SourceError>,
    loading: bool,
}

impl DataLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fetcher(fetcher: Fetcher) -> Self {
        Self {
            fetcher: Some(fetcher),
            ..Self::default()
        }
    }

    /// Start a load, cancelling whatever was in flight
    pub fn begin(&mut self) -> LoadTicket {
        if let Some(previous) = self.current.take() {
            previous.cancel();
        }
        self.generation += 1;
        let token = CancellationToken::new();
        self.current = Some(token.clone());
        self.loading = true;
        self.error = None;
        LoadTicket {
            generation: self.generation,
            token,
        }
    }

    /// Commit an outcome. Returns whether state changed.
    ///
    /// Stale or cancelled tickets are dropped silently; `Ok(None)` is a
    /// cancelled fetch and leaves state alone.
    pub fn commit(&mut self, ticket: &LoadTicket, outcome: Result<Option<RowSet>, SourceError>) -> bool {
        if ticket.generation != self.generation || ticket.token.is_cancelled() {
            log::debug!("load {}: superseded, outcome dropped", ticket.generation);
            return false;
        }
        match outcome {
            Ok(Some(rows)) => {
                log::debug!("load {}: committed {} rows", ticket.generation, rows.len());
                self.rows = rows;
                self.error = None;
            }
            Ok(None) => return false,
            Err(err) => {
                log::debug!("load {}: failed: {}", ticket.generation, err);
                self.rows = RowSet::default();
                self.error = Some(err);
            }
        }
        self.loading = false;
        self.current = None;
        true
    }

    /// Synchronous load: begin, read, commit
    pub fn load(&mut self, source: &DataSource) -> bool {
        let ticket = self.begin();
        let outcome = source.read(self.fetcher.as_ref(), ticket.token());
        self.commit(&ticket, outcome)
    }

    /// Cancel the in-flight load, if any
    pub fn cancel(&mut self) {
        if let Some(token) = self.current.take() {
            token.cancel();
            self.loading = false;
        }
    }

    pub fn rows(&self) -> &RowSet {
        &self.rows
    }

    pub fn error(&self) -> Option<&SourceError> {
        self.error.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tabview_engine::Value;

    fn text(content: &str) -> DataSource {
        DataSource::Text { content: content.into(), options: CsvOptions::default() }
    }

    #[test]
    fn test_resolve_precedence() {
        let src = DataSource::resolve(
            Some("a\n1".into()),
            Some(json!({"headers": ["b"], "rows": []})),
            Some("http://x/y.csv".into()),
            CsvOptions::default(),
        )
        .unwrap();
        assert!(matches!(src, DataSource::Text { .. }));

        let src = DataSource::resolve(None, Some(json!([])), Some("http://x".into()), CsvOptions::default()).unwrap();
        assert!(matches!(src, DataSource::Parsed(_)));

        let src = DataSource::resolve(None, None, Some("http://x".into()), CsvOptions::default()).unwrap();
        assert!(src.is_remote());

        let err = DataSource::resolve(None, None, None, CsvOptions::default()).unwrap_err();
        assert_eq!(err, SourceError::DataSource);
    }

    #[test]
    fn test_identity_tracks_content() {
        assert_eq!(text("a\n1").identity(), text("a\n1").identity());
        assert_ne!(text("a\n1").identity(), text("a\n2").identity());
        assert!(text("a").identity().starts_with("text:"));
    }

    #[test]
    fn test_load_commits_rows() {
        let mut loader = DataLoader::new();
        assert!(loader.load(&text("x,y\n1,2\n")));
        assert!(!loader.is_loading());
        assert_eq!(loader.rows().rows[0].get("y"), &Value::Number(2.0));
        assert!(loader.error().is_none());
    }

    #[test]
    fn test_parse_failure_sets_error() {
        let mut loader = DataLoader::new();
        loader.load(&DataSource::Parsed(json!("not a table")));
        assert!(matches!(loader.error(), Some(SourceError::Parse(_))));
        assert!(loader.rows().is_empty());
    }

    #[test]
    fn test_superseded_ticket_cannot_commit() {
        let mut loader = DataLoader::new();
        let first = loader.begin();
        let second = loader.begin();
        assert!(first.token().is_cancelled());

        let late = RowSet::from_records(vec!["a".into()], vec![vec![Value::from("old")]]);
        assert!(!loader.commit(&first, Ok(Some(late))));
        assert!(loader.rows().is_empty());
        assert!(loader.is_loading());

        let fresh = RowSet::from_records(vec!["a".into()], vec![vec![Value::from("new")]]);
        assert!(loader.commit(&second, Ok(Some(fresh))));
        assert_eq!(loader.rows().rows[0].get("a"), &Value::from("new"));
    }

    #[test]
    fn test_cancelled_load_keeps_committed_data() {
        let mut loader = DataLoader::new();
        loader.load(&text("a\n1\n"));

        let ticket = loader.begin();
        loader.cancel();
        let err = SourceError::Fetch { status: 500, message: "Internal Server Error".into() };
        assert!(!loader.commit(&ticket, Err(err)));
        assert!(loader.error().is_none());
        assert_eq!(loader.rows().len(), 1);
        assert!(!loader.is_loading());
    }
}
