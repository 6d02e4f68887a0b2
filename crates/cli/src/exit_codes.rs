//! CLI Exit Code Registry
//!
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success                                              |
//! | 1    | General error                                        |
//! | 2    | Usage error (bad args, unknown column or enum value) |
//! | 3    | Source error (no input, HTTP status, parse failure)  |
//! | 4    | Settings error (invalid or newer document, store)    |
//! | 5    | Query error (SQL statement or attach failure)        |
//! | 6    | Nothing to export (no visible columns)               |

use tabview_config::SnapshotError;
use tabview_io::dashboard::DashboardError;
use tabview_io::SourceError;

pub const EXIT_SUCCESS: u8 = 0;

/// Unspecified failure (output write errors and the like)
pub const EXIT_ERROR: u8 = 1;

pub const EXIT_USAGE: u8 = 2;

/// Loading the data failed
pub const EXIT_SOURCE: u8 = 3;

/// A settings document was rejected
pub const EXIT_SETTINGS: u8 = 4;

/// The dataset provider rejected a statement or database
pub const EXIT_QUERY: u8 = 5;

/// Export requested with every column hidden
pub const EXIT_EMPTY_EXPORT: u8 = 6;

pub fn source_exit_code(err: &SourceError) -> u8 {
    match err {
        SourceError::Query { .. } => EXIT_QUERY,
        SourceError::DataSource | SourceError::Fetch { .. } | SourceError::Parse(_) => EXIT_SOURCE,
    }
}

pub fn settings_exit_code(err: &SnapshotError) -> u8 {
    match err {
        SnapshotError::Parse(_)
        | SnapshotError::UnsupportedVersion(_)
        | SnapshotError::Store(_)
        | SnapshotError::NotRestored => EXIT_SETTINGS,
    }
}

pub fn dashboard_exit_code(err: &DashboardError) -> u8 {
    match err {
        DashboardError::Dataset { source, .. } => source_exit_code(source),
        DashboardError::Attach { .. } => EXIT_QUERY,
    }
}
