// End-to-end tests for the `tabview` binary.
// Run with: cargo test -p tabview-cli --test cli_tests

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

const FRUIT: &str = "name,qty\napple,3\nfig,10\nkiwi,1\n";

fn tabview() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_tabview"));
    cmd.env_remove("TABVIEW_STORAGE_KEY");
    cmd.env_remove("TABVIEW_STORE_DIR");
    cmd
}

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn run(args: &[&str]) -> Output {
    tabview().args(args).output().expect("spawn tabview")
}

fn stdout(out: &Output) -> String {
    String::from_utf8(out.stdout.clone()).unwrap()
}

fn arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

// ── view ──

#[test]
fn test_view_sorts_numerically() {
    let dir = TempDir::new().unwrap();
    let csv = write(&dir, "fruit.csv", FRUIT);
    let out = run(&["view", "-f", arg(&csv), "--sort", "qty=up numbers"]);
    assert!(out.status.success());

    let text = stdout(&out);
    let kiwi = text.find("kiwi").unwrap();
    let apple = text.find("apple").unwrap();
    let fig = text.find("fig").unwrap();
    assert!(kiwi < apple && apple < fig, "{}", text);
}

#[test]
fn test_view_not_equal_filter() {
    let dir = TempDir::new().unwrap();
    let csv = write(&dir, "fruit.csv", FRUIT);
    let out = run(&["view", "-f", arg(&csv), "--filter", "qty=<>3"]);
    assert!(out.status.success());

    let text = stdout(&out);
    assert!(text.contains("fig") && text.contains("kiwi"), "{}", text);
    assert!(!text.contains("apple"), "{}", text);
}

#[test]
fn test_filter_help_lists_supported_operators() {
    let out = run(&["view", "--help"]);
    let text = stdout(&out);
    assert!(text.contains("'<>0'"), "{}", text);
    assert!(!text.contains("!="), "{}", text);
}

#[test]
fn test_view_reads_stdin() {
    use std::io::Write;
    use std::process::Stdio;

    let mut child = tabview()
        .args(["view", "-f", "-"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    child.stdin.take().unwrap().write_all(FRUIT.as_bytes()).unwrap();
    let out = child.wait_with_output().unwrap();
    assert!(out.status.success());
    assert!(stdout(&out).starts_with("name"));
}

#[test]
fn test_view_split_prints_one_table_per_value() {
    let dir = TempDir::new().unwrap();
    let csv = write(&dir, "s.csv", "State,City\nCA,LA\nCA,SF\nNY,NYC\n");
    let out = run(&["view", "-f", arg(&csv), "--split-by", "State"]);
    let text = stdout(&out);
    assert!(text.contains("## State: CA (2 rows)"));
    assert!(text.contains("## State: NY (1 rows)"));
}

#[test]
fn test_missing_source_exit_code() {
    let out = run(&["view"]);
    assert_eq!(out.status.code(), Some(3));
    let err = String::from_utf8_lossy(&out.stderr);
    assert!(err.contains("error: "));
    assert!(err.contains("hint:  pass --file, --json or --url"));
}

#[test]
fn test_unknown_column_is_usage_error() {
    let dir = TempDir::new().unwrap();
    let csv = write(&dir, "fruit.csv", FRUIT);
    let out = run(&["view", "-f", arg(&csv), "--hide", "price"]);
    assert_eq!(out.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&out.stderr).contains("unknown column 'price'"));
}

// ── export ──

#[test]
fn test_export_csv_reflects_filters_and_hidden_columns() {
    let dir = TempDir::new().unwrap();
    let csv = write(&dir, "fruit.csv", FRUIT);
    let out = run(&["export", "-f", arg(&csv), "--filter", "qty=>2", "--hide", "qty"]);
    assert!(out.status.success());
    assert_eq!(stdout(&out), "\u{feff}name\r\napple\r\nfig");
}

#[test]
fn test_export_markdown_to_file() {
    let dir = TempDir::new().unwrap();
    let csv = write(&dir, "fruit.csv", FRUIT);
    let target = dir.path().join("out.md");
    let out = run(&["export", "-f", arg(&csv), "-t", "md", "--sort", "name=down", "-o", arg(&target)]);
    assert!(out.status.success());
    assert_eq!(
        fs::read_to_string(&target).unwrap(),
        "| name | qty |\n| --- | --- |\n| kiwi | 1 |\n| fig | 10 |\n| apple | 3 |"
    );
}

#[test]
fn test_export_with_every_column_hidden() {
    let dir = TempDir::new().unwrap();
    let csv = write(&dir, "fruit.csv", FRUIT);
    let out = run(&["export", "-f", arg(&csv), "--hide", "name", "--hide", "qty"]);
    assert_eq!(out.status.code(), Some(6));
    assert!(out.stdout.is_empty());
}

// ── values ──

#[test]
fn test_values_search() {
    let dir = TempDir::new().unwrap();
    let csv = write(&dir, "fruit.csv", FRUIT);
    let out = run(&["values", "-f", arg(&csv), "name", "--search", "I"]);
    assert_eq!(stdout(&out), "fig\nkiwi\n");
}

// ── settings ──

#[test]
fn test_settings_persist_between_runs() {
    let dir = TempDir::new().unwrap();
    let csv = write(&dir, "fruit.csv", FRUIT);
    let store = dir.path().join("store");

    let out = run(&[
        "view", "-f", arg(&csv), "--storage-key", "fruit", "--store-dir", arg(&store), "--hide", "qty",
    ]);
    assert!(out.status.success());

    let out = run(&["settings", "show", "-f", arg(&csv), "--storage-key", "fruit", "--store-dir", arg(&store)]);
    assert!(out.status.success());
    let doc: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(doc["hiddenColumns"], serde_json::json!(["qty"]));
    assert_eq!(doc["version"], "0.1");

    // a later plain view honours the stored configuration
    let out = run(&["view", "-f", arg(&csv), "--storage-key", "fruit", "--store-dir", arg(&store)]);
    assert!(!stdout(&out).contains("qty"));
}

#[test]
fn test_settings_import_rejects_newer_version() {
    let dir = TempDir::new().unwrap();
    let csv = write(&dir, "fruit.csv", FRUIT);
    let doc = write(&dir, "settings.json", r#"{"version": "2.0", "theme": "dark"}"#);
    let out = run(&["settings", "import", arg(&doc), "-f", arg(&csv)]);
    assert_eq!(out.status.code(), Some(4));
}

#[test]
fn test_settings_share_url_round_trip() {
    let dir = TempDir::new().unwrap();
    let csv = write(&dir, "fruit.csv", FRUIT);
    let out = run(&["settings", "url", "https://example.com/table", "-f", arg(&csv)]);
    assert!(out.status.success());
    let url = stdout(&out).trim().to_string();
    assert!(url.starts_with("https://example.com/table?defaultSetting="));

    let out = run(&["settings", "decode", &url]);
    let doc: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(doc["columnOrder"], serde_json::json!(["name", "qty"]));
}

// ── query / dashboard ──

#[test]
fn test_query_over_registered_csv() {
    let dir = TempDir::new().unwrap();
    let csv = write(&dir, "fruit.csv", FRUIT);
    let table = format!("fruit={}", arg(&csv));
    let out = run(&[
        "query", "--table", &table, "--sql", "SELECT name FROM fruit WHERE qty > 2 ORDER BY name", "-t", "csv",
    ]);
    assert!(out.status.success());
    assert_eq!(stdout(&out), "\u{feff}name\r\napple\r\nfig");
}

#[test]
fn test_query_error_exit_code() {
    let out = run(&["query", "--sql", "SELECT * FROM missing"]);
    assert_eq!(out.status.code(), Some(5));
}

#[test]
fn test_dashboard_renders_failed_views_inline() {
    let dir = TempDir::new().unwrap();
    let spec = write(
        &dir,
        "dash.json",
        r#"{
            "title": "Sales",
            "datasets": {"sales": {"csvString": "region,amount\nN,10\nS,5\nN,7"}},
            "views": [
                {"name": "totals", "title": "Totals", "sql": "SELECT region, SUM(amount) AS total FROM sales GROUP BY region ORDER BY region"},
                {"name": "broken", "sql": "SELECT nope FROM sales"}
            ],
            "layout": [2]
        }"#,
    );
    let out = run(&["dashboard", arg(&spec)]);
    assert!(out.status.success());
    let text = stdout(&out);
    assert!(text.starts_with("# Sales\n"));
    assert!(text.contains("## Totals\n"));
    assert!(text.contains("## broken\nQuery failed: "));
}
