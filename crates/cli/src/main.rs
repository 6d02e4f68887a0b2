// tabview - view, filter, group and export tabular data from the terminal

mod exit_codes;
mod input;
mod options;
mod render;

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tabview_config::share::settings_from_url;
use tabview_config::{apply_snapshot, migrate, SnapshotError};
use tabview_engine::filter::{distinct_values, search_values};
use tabview_engine::view::TableSize;
use tabview_engine::{process, ProcessedTable, RowSet, ViewState};
use tabview_io::csv::load_csv_file;
use tabview_io::dashboard::{run_dashboard, DashboardError, DashboardSpec, ViewOutcome};
use tabview_io::export::{to_csv, to_markdown};
use tabview_io::sql::{DatasetProvider, SqliteProvider};
use tabview_io::{CancellationToken, Fetcher};

use exit_codes::{
    dashboard_exit_code, settings_exit_code, EXIT_EMPTY_EXPORT, EXIT_ERROR, EXIT_SOURCE, EXIT_SUCCESS, EXIT_USAGE,
};
use input::{SourceArgs, StoreArgs};
use options::{check_column, split_assignment, ViewArgs};
use render::{render_table, WindowOptions};

#[derive(Parser)]
#[command(name = "tabview")]
#[command(about = "Interactive-table engine for the terminal: sort, filter, group, split, export")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the processed table
    #[command(after_help = "\
Examples:
  tabview view -f sales.csv --sort 'Amount=down numbers'
  tabview view -f sales.csv --filter 'Amount=>1000' --group-by Region --reducer Amount=sum
  tabview view --url https://example.com/data.csv --split-by State
  tabview view -f big.csv --scroll-top 2400 --viewport 600
  tabview view -f sales.csv --storage-key sales --pin Region")]
    View {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        store: StoreArgs,

        #[command(flatten)]
        view: ViewArgs,

        #[command(flatten)]
        window: WindowArgs,
    },

    /// Export the processed table (visible columns, live filters, sort and grouping)
    #[command(after_help = "\
Examples:
  tabview export -f sales.csv --hide Notes -o sales-clean.csv
  tabview export -f sales.csv --group-by Region --reducer Amount=avg -t markdown")]
    Export {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        store: StoreArgs,

        #[command(flatten)]
        view: ViewArgs,

        /// Output format
        #[arg(long, short = 't', value_enum, default_value_t = ExportFormat::Csv)]
        to: ExportFormat,

        /// Output file (omit for stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// List the distinct values of a column
    Values {
        #[command(flatten)]
        source: SourceArgs,

        column: String,

        /// Case-insensitive substring match
        #[arg(long)]
        search: Option<String>,
    },

    /// Manage the persisted view configuration
    #[command(subcommand)]
    Settings(SettingsCommands),

    /// Run SQL over CSV files and SQLite databases
    #[command(after_help = "\
Examples:
  tabview query --table sales=sales.csv --sql 'SELECT Region, SUM(Amount) FROM sales GROUP BY Region'
  tabview query --sqlite crm=crm.db --sql 'SELECT * FROM crm.accounts' -t csv")]
    Query {
        /// Register a CSV file as a table: NAME=PATH. Repeatable.
        #[arg(long, value_name = "NAME=PATH")]
        table: Vec<String>,

        /// Attach a SQLite database: NAME=PATH. Repeatable.
        #[arg(long, value_name = "NAME=PATH")]
        sqlite: Vec<String>,

        #[arg(long)]
        sql: String,

        #[command(flatten)]
        view: ViewArgs,

        /// Output format (omit for a text table)
        #[arg(long, short = 't', value_enum)]
        to: Option<ExportFormat>,
    },

    /// Load a dashboard description and print every view
    Dashboard {
        /// Dashboard JSON (datasets, dbs, views, layout)
        spec: PathBuf,

        #[command(flatten)]
        window: WindowArgs,
    },
}

#[derive(Subcommand)]
enum SettingsCommands {
    /// Print the configuration as JSON
    Show {
        #[command(flatten)]
        target: Target,
    },
    /// Apply a configuration document and persist it
    Import {
        /// Settings document (JSON)
        document: PathBuf,

        #[command(flatten)]
        target: Target,
    },
    /// Back to the default configuration
    Reset {
        #[command(flatten)]
        target: Target,
    },
    /// Clear every filter (or restore the default's filters)
    ClearFilters {
        #[command(flatten)]
        target: Target,
    },
    /// Switch to the next theme
    Theme {
        #[command(flatten)]
        target: Target,
    },
    /// Print a share link carrying the configuration
    Url {
        base: String,

        #[command(flatten)]
        target: Target,
    },
    /// Print the configuration carried by a share link
    Decode { url: String },
}

#[derive(Args)]
struct Target {
    #[command(flatten)]
    source: SourceArgs,

    #[command(flatten)]
    store: StoreArgs,
}

#[derive(Args, Debug, Clone, Copy)]
struct WindowArgs {
    /// Scroll offset in pixels
    #[arg(long, default_value_t = 0.0)]
    scroll_top: f64,

    /// Viewport height in pixels (omit to print every row)
    #[arg(long)]
    viewport: Option<f64>,
}

impl WindowArgs {
    fn options(self) -> WindowOptions {
        WindowOptions {
            scroll_top: self.scroll_top,
            viewport_height: self.viewport.unwrap_or(0.0),
            all_rows: self.viewport.is_none(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ExportFormat {
    Csv,
    #[value(alias = "md")]
    Markdown,
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  tabview-engine ", env!("CARGO_PKG_VERSION"),
        "\nsettings: v", "0.1",
    )
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::View { source, store, view, window } => cmd_view(&source, &store, &view, window),
        Commands::Export { source, store, view, to, output } => cmd_export(&source, &store, &view, to, output),
        Commands::Values { source, column, search } => cmd_values(&source, &column, search.as_deref()),
        Commands::Settings(action) => cmd_settings(action),
        Commands::Query { table, sqlite, sql, view, to } => cmd_query(&table, &sqlite, &sql, &view, to),
        Commands::Dashboard { spec, window } => cmd_dashboard(&spec, window),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self { code: EXIT_SOURCE, message: msg.into(), hint: None }
    }

    pub fn settings(err: SnapshotError) -> Self {
        let hint = match &err {
            SnapshotError::UnsupportedVersion(_) => Some("the document was written by a newer tabview".to_string()),
            SnapshotError::Store(_) => Some("check --store-dir permissions".to_string()),
            SnapshotError::NotRestored => Some("the source has no columns to apply settings to".to_string()),
            SnapshotError::Parse(_) => None,
        };
        Self { code: settings_exit_code(&err), message: err.to_string(), hint }
    }

    pub fn dashboard(err: DashboardError) -> Self {
        Self { code: dashboard_exit_code(&err), message: err.to_string(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

fn write_stdout(text: &str) -> Result<(), CliError> {
    io::stdout()
        .write_all(text.as_bytes())
        .map_err(|e| CliError::io(e.to_string()))
}

// ============================================================================
// view / export
// ============================================================================

/// Load, restore the stored configuration and apply the flags on top
fn prepare(source: &SourceArgs, store: &StoreArgs, view: &ViewArgs) -> Result<(RowSet, ViewState), CliError> {
    let (data, rows) = source.load()?;
    let mut session = store.open(&data, &rows.headers)?;
    if !view.is_empty() {
        session.update(|state| view.apply(state, &rows))?;
    }
    Ok((rows, session.state().clone()))
}

fn cmd_view(source: &SourceArgs, store: &StoreArgs, view: &ViewArgs, window: WindowArgs) -> Result<(), CliError> {
    let (rows, state) = prepare(source, store, view)?;
    let table = process(&rows, &state);
    write_stdout(&render_table(&table, &state, window.options()))
}

fn export_text(table: &ProcessedTable, format: ExportFormat) -> Result<String, CliError> {
    let text = match format {
        ExportFormat::Csv => to_csv(table).map_err(|e| CliError::source(&e))?,
        ExportFormat::Markdown => to_markdown(table),
    };
    text.ok_or_else(|| CliError {
        code: EXIT_EMPTY_EXPORT,
        message: "nothing to export: every column is hidden".to_string(),
        hint: Some("unhide a column or run `tabview settings reset`".to_string()),
    })
}

fn cmd_export(
    source: &SourceArgs,
    store: &StoreArgs,
    view: &ViewArgs,
    to: ExportFormat,
    output: Option<PathBuf>,
) -> Result<(), CliError> {
    let (rows, state) = prepare(source, store, view)?;
    let text = export_text(&process(&rows, &state), to)?;
    match output {
        Some(path) => std::fs::write(&path, text).map_err(|e| CliError::io(format!("{}: {}", path.display(), e))),
        None => write_stdout(&text),
    }
}

fn cmd_values(source: &SourceArgs, column: &str, search: Option<&str>) -> Result<(), CliError> {
    let (_, rows) = source.load()?;
    check_column(column, &rows.headers)?;
    let values = distinct_values(&rows.rows, column);
    let shown = match search {
        Some(term) => search_values(&values, term),
        None => values.iter().collect(),
    };
    let mut out = String::new();
    for value in shown {
        if value.is_empty() {
            out.push_str("(blank)\n");
        } else {
            out.push_str(&format!("{}\n", value));
        }
    }
    write_stdout(&out)
}

// ============================================================================
// settings
// ============================================================================

fn cmd_settings(action: SettingsCommands) -> Result<(), CliError> {
    let target = match &action {
        SettingsCommands::Decode { url } => {
            return match settings_from_url(url).map_err(CliError::settings)? {
                Some(doc) => {
                    let text = serde_json::to_string_pretty(&doc).map_err(|e| CliError::io(e.to_string()))?;
                    write_stdout(&format!("{}\n", text))
                }
                None => Err(CliError::args("the URL carries no settings")),
            };
        }
        SettingsCommands::Show { target }
        | SettingsCommands::Import { target, .. }
        | SettingsCommands::Reset { target }
        | SettingsCommands::ClearFilters { target }
        | SettingsCommands::Theme { target }
        | SettingsCommands::Url { target, .. } => target,
    };

    let (data, rows) = target.source.load()?;
    if !target.store.is_persistent() {
        log::info!("no --storage-key: changes are not persisted");
    }
    let mut session = target.store.open(&data, &rows.headers)?;

    match &action {
        SettingsCommands::Show { .. } => {}
        SettingsCommands::Import { document, .. } => {
            let text = std::fs::read_to_string(document)
                .map_err(|e| CliError::io(format!("{}: {}", document.display(), e)))?;
            session.import(&text).map_err(CliError::settings)?;
        }
        SettingsCommands::Reset { .. } => session.reset(),
        SettingsCommands::ClearFilters { .. } => session.clear_filters(),
        SettingsCommands::Theme { .. } => {
            let theme = session.cycle_theme();
            return write_stdout(&format!("{}\n", theme));
        }
        SettingsCommands::Url { base, .. } => {
            let url = session.share_url(base).map_err(CliError::settings)?;
            return write_stdout(&format!("{}\n", url));
        }
        SettingsCommands::Decode { .. } => return Ok(()),
    }
    let text = session.export().map_err(CliError::settings)?;
    write_stdout(&format!("{}\n", text))
}

// ============================================================================
// query / dashboard
// ============================================================================

fn cmd_query(
    tables: &[String],
    databases: &[String],
    sql: &str,
    view: &ViewArgs,
    to: Option<ExportFormat>,
) -> Result<(), CliError> {
    let mut provider = SqliteProvider::new().map_err(|e| CliError::source(&e))?;
    for arg in tables {
        let (name, path) = split_assignment(arg)?;
        let rows = load_csv_file(Path::new(path), &Default::default()).map_err(|e| CliError::source(&e))?;
        provider.register_rows(name, &rows).map_err(|e| CliError::source(&e))?;
    }
    for arg in databases {
        let (name, path) = split_assignment(arg)?;
        provider.attach(name, Path::new(path)).map_err(|e| CliError::source(&e))?;
    }

    let rows = provider.query(sql).map_err(|e| CliError::source(&e))?.into_row_set();
    let mut state = ViewState::new(&rows.headers);
    view.apply(&mut state, &rows)?;
    let table = process(&rows, &state);
    match to {
        Some(format) => write_stdout(&export_text(&table, format)?),
        None => write_stdout(&render_table(&table, &state, WindowArgs { scroll_top: 0.0, viewport: None }.options())),
    }
}

/// View state for a dashboard view: its default settings, then its size props
fn dashboard_state(view: &ViewOutcome) -> ViewState {
    let headers = &view.rows.headers;
    let mut state = ViewState::new(headers);
    if let Some(doc) = &view.props.default_settings {
        match migrate(doc.clone()) {
            Ok(doc) => apply_snapshot(&mut state, &doc, headers),
            Err(e) => log::warn!("view {}: default settings ignored: {}", view.name, e),
        }
    }
    if let Some(size) = view.props.font_size {
        state.set_font_size(size);
    }
    if let Some(height) = &view.props.max_height {
        state.table_max_height = TableSize::parse(height);
    }
    if let Some(width) = &view.props.max_width {
        state.table_max_width = TableSize::parse(width);
    }
    state
}

fn cmd_dashboard(path: &Path, window: WindowArgs) -> Result<(), CliError> {
    let spec = DashboardSpec::load(path).map_err(|e| CliError::source(&e))?;
    let mut provider = SqliteProvider::new().map_err(|e| CliError::source(&e))?;
    let fetcher = Fetcher::new().map_err(|e| CliError::source(&e))?;
    let token = CancellationToken::new();

    let Some(dashboard) =
        run_dashboard(&spec, &mut provider, Some(&fetcher), &token).map_err(CliError::dashboard)?
    else {
        return Ok(());
    };

    let mut out = String::new();
    if let Some(title) = &dashboard.title {
        out.push_str(&format!("# {}\n\n", title));
    }
    for (row, range) in dashboard.layout.iter().enumerate() {
        if dashboard.layout.len() > 1 {
            out.push_str(&format!("=== row {} ===\n\n", row + 1));
        }
        for view in &dashboard.views[range.clone()] {
            out.push_str(&format!("## {}\n", view.title.as_deref().unwrap_or(&view.name)));
            if let Some(err) = &view.error {
                out.push_str(&format!("{}\n\n", err.inline_message()));
                continue;
            }
            if view.props.collapsed {
                out.push_str(&format!("({} rows, collapsed)\n\n", view.rows.len()));
                continue;
            }
            let state = dashboard_state(view);
            out.push_str(&render_table(&process(&view.rows, &state), &state, window.options()));
        }
    }
    write_stdout(&out)
}
