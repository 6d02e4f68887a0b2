//! Data source errors.

use std::fmt;

/// Shown when the source failed to parse; parser diagnostics stay in the logs.
pub const GENERIC_LOAD_FAILURE: &str = "Failed to load CSV data.";

/// Shown when no input was supplied at all.
pub const MISSING_SOURCE: &str = "One of csv text, parsed data, or a csv URL must be provided.";

/// Error type for loading and querying data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// No input was supplied
    DataSource,
    /// Remote load returned a non-success status (0 for transport failures)
    Fetch { status: u16, message: String },
    /// Malformed input
    Parse(String),
    /// The dataset provider rejected a statement
    Query { statement: String, message: String },
}

impl SourceError {
    pub fn parse(msg: impl fmt::Display) -> Self {
        SourceError::Parse(msg.to_string())
    }

    /// HTTP status for fetch errors, 0 otherwise
    pub fn status(&self) -> u16 {
        match self {
            SourceError::Fetch { status, .. } => *status,
            _ => 0,
        }
    }

    /// The message rendered in place of the table.
    ///
    /// Fetch errors read `"<status>: <message>"` (or just the message without
    /// a status); parse errors collapse to a generic text.
    pub fn inline_message(&self) -> String {
        match self {
            SourceError::DataSource => MISSING_SOURCE.to_string(),
            SourceError::Fetch { status: 0, message } => message.clone(),
            SourceError::Fetch { status, message } => format!("{}: {}", status, message),
            SourceError::Parse(_) => GENERIC_LOAD_FAILURE.to_string(),
            SourceError::Query { statement, message } => {
                format!("Query failed: {}\n{}", message, statement)
            }
        }
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::DataSource => write!(f, "{}", MISSING_SOURCE),
            SourceError::Fetch { status, message } => write!(f, "HTTP {}: {}", status, message),
            SourceError::Parse(msg) => write!(f, "Parse error: {}", msg),
            SourceError::Query { statement, message } => {
                write!(f, "Query error: {} (statement: {})", message, statement)
            }
        }
    }
}

impl std::error::Error for SourceError {}

impl From<csv::Error> for SourceError {
    fn from(e: csv::Error) -> Self {
        SourceError::Parse(e.to_string())
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(e: serde_json::Error) -> Self {
        SourceError::Parse(e.to_string())
    }
}
