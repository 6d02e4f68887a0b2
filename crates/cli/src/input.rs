// Source and settings-store selection

use std::io::Read;
use std::path::{Path, PathBuf};

use clap::Args;
use tabview_config::{ConfigSession, FileStore, KeyValueStore, MemoryStore, SnapshotError};
use tabview_engine::RowSet;
use tabview_io::csv::{read_text_file, CsvOptions};
use tabview_io::{DataLoader, DataSource};

use crate::exit_codes::source_exit_code;
use crate::CliError;

#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Delimited text file ('-' reads stdin)
    #[arg(long, short = 'f', value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// JSON document with headers and rows (or an array of objects)
    #[arg(long, value_name = "PATH")]
    pub json: Option<PathBuf>,

    /// Fetch delimited text over HTTP
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,

    /// Field delimiter (sniffed when omitted)
    #[arg(long, short = 'd')]
    pub delimiter: Option<char>,

    /// The first line is data, not column names
    #[arg(long)]
    pub no_header: bool,

    /// Column names, comma-separated
    #[arg(long, value_name = "NAMES", value_delimiter = ',')]
    pub columns: Vec<String>,
}

impl SourceArgs {
    fn csv_options(&self) -> Result<CsvOptions, CliError> {
        let delimiter = match self.delimiter {
            None => None,
            Some('\t') => Some(b'\t'),
            Some(c) if c.is_ascii() => Some(c as u8),
            Some(c) => return Err(CliError::args(format!("delimiter must be ASCII, got '{}'", c))),
        };
        Ok(CsvOptions {
            delimiter,
            has_header: !self.no_header,
            columns: (!self.columns.is_empty()).then(|| self.columns.clone()),
        })
    }

    /// Pick one input, text file first, then JSON, then URL
    pub fn resolve(&self) -> Result<DataSource, CliError> {
        let text = self.file.as_deref().map(read_text).transpose()?;
        let parsed = match &self.json {
            Some(path) => {
                let raw = read_text(path)?;
                Some(serde_json::from_str(&raw).map_err(|e| {
                    CliError::parse(format!("{}: {}", path.display(), e))
                })?)
            }
            None => None,
        };
        DataSource::resolve(text, parsed, self.url.clone(), self.csv_options()?).map_err(|e| {
            CliError::source(&e).with_hint("pass --file, --json or --url")
        })
    }

    /// Resolve and load the rows
    pub fn load(&self) -> Result<(DataSource, RowSet), CliError> {
        let source = self.resolve()?;
        let mut loader = DataLoader::new();
        loader.load(&source);
        if let Some(err) = loader.error() {
            return Err(CliError::source(err));
        }
        log::debug!("loaded {} rows from {}", loader.rows().len(), source.identity());
        Ok((source, loader.rows().clone()))
    }
}

fn read_text(path: &Path) -> Result<String, CliError> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| CliError::io(format!("stdin: {}", e)))?;
        return Ok(buf);
    }
    read_text_file(path).map_err(|e| CliError::io(e.to_string()))
}

#[derive(Args, Debug, Clone, Default)]
pub struct StoreArgs {
    /// Persist the view configuration under this key
    #[arg(long, env = "TABVIEW_STORAGE_KEY")]
    pub storage_key: Option<String>,

    /// Directory for persisted configurations
    #[arg(long, env = "TABVIEW_STORE_DIR", value_name = "DIR")]
    pub store_dir: Option<PathBuf>,

    /// Default configuration (JSON file) used when nothing is stored
    #[arg(long, value_name = "PATH")]
    pub settings: Option<PathBuf>,
}

/// Where configurations live for this run
#[derive(Debug)]
pub enum CliStore {
    /// No storage key: nothing outlives the process
    Memory(MemoryStore),
    File(FileStore),
}

impl KeyValueStore for CliStore {
    fn get(&self, key: &str) -> Result<Option<String>, SnapshotError> {
        match self {
            CliStore::Memory(s) => s.get(key),
            CliStore::File(s) => s.get(key),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), SnapshotError> {
        match self {
            CliStore::Memory(s) => s.set(key, value),
            CliStore::File(s) => s.set(key, value),
        }
    }

    fn remove(&mut self, key: &str) -> Result<(), SnapshotError> {
        match self {
            CliStore::Memory(s) => s.remove(key),
            CliStore::File(s) => s.remove(key),
        }
    }
}

const EPHEMERAL_KEY: &str = "default";

impl StoreArgs {
    pub fn is_persistent(&self) -> bool {
        self.storage_key.is_some()
    }

    /// Open a session and restore it for `source`
    pub fn open(&self, source: &DataSource, headers: &[String]) -> Result<ConfigSession<CliStore>, CliError> {
        let defaults = self.settings.as_deref().map(read_text).transpose()?;
        let (store, key) = match &self.storage_key {
            Some(key) => {
                let store = match &self.store_dir {
                    Some(dir) => FileStore::new(dir),
                    None => FileStore::open_default(),
                };
                (CliStore::File(store), key.clone())
            }
            None => (CliStore::Memory(MemoryStore::new()), EPHEMERAL_KEY.to_string()),
        };
        let mut session = ConfigSession::new(store, key, defaults.as_deref());
        session.restore(&source.identity(), headers);
        Ok(session)
    }
}

impl CliError {
    pub fn source(err: &tabview_io::SourceError) -> Self {
        let hint = match err {
            tabview_io::SourceError::Fetch { status: 0, .. } => Some("check the URL and network access".to_string()),
            _ => None,
        };
        Self { code: source_exit_code(err), message: err.to_string(), hint }
    }
}
