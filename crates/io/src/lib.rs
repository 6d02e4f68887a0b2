// Data sources and sinks

pub mod csv;
pub mod dashboard;
pub mod error;
pub mod export;
pub mod fetch;
pub mod normalize;
pub mod source;
pub mod sql;

pub use error::SourceError;
pub use fetch::{CancellationToken, Fetcher};
pub use source::{DataLoader, DataSource, LoadTicket};
