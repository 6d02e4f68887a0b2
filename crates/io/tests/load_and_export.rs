// End-to-end: load a source, run the pipeline, export the result.

use httpmock::prelude::*;
use tabview_engine::filter::FilterState;
use tabview_engine::{process, ColumnStyle, SortMode, Value, ViewState};
use tabview_io::csv::CsvOptions;
use tabview_io::export::{to_csv, to_markdown};
use tabview_io::{DataLoader, DataSource, Fetcher, SourceError};

const STAFF: &str = "Name,Department,Salary\nAnn,Ops,50000\nBob,Eng,70000\nCid,Eng,90000\n";

#[test]
fn test_text_source_filter_sort_export() {
    let mut loader = DataLoader::new();
    let source = DataSource::resolve(Some(STAFF.into()), None, None, CsvOptions::default()).unwrap();
    assert!(loader.load(&source));

    let rows = loader.rows();
    let mut state = ViewState::new(&rows.headers);
    let mut filters = FilterState::new();
    filters.set_text("Salary", ">60000");
    state.filters = filters;
    state.set_sort("Salary", SortMode::Down);

    let table = process(rows, &state);
    let csv = to_csv(&table).unwrap().unwrap();
    assert_eq!(
        csv,
        "\u{feff}Name,Department,Salary\r\nCid,Eng,90000\r\nBob,Eng,70000"
    );
}

#[test]
fn test_grouped_markdown() {
    let mut loader = DataLoader::new();
    loader.load(&DataSource::Text { content: STAFF.into(), options: CsvOptions::default() });

    let rows = loader.rows();
    let mut state = ViewState::new(&rows.headers);
    state.column_styles.insert(
        "Department".into(),
        ColumnStyle { group_by: Some(true), sort: Some(SortMode::Up), ..Default::default() },
    );
    state.toggle_hidden("Name");
    state.update_style("Salary", |s| s.reducer = Some(tabview_engine::group::Reducer::Sum));

    let table = process(rows, &state);
    let md = to_markdown(&table).unwrap();
    assert_eq!(
        md,
        "| Department | Salary |\n| --- | --- |\n| Eng | 160000 |\n| Ops | 50000 |"
    );
}

#[test]
fn test_url_source_through_loader() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/staff.csv");
        then.status(200).body(STAFF);
    });
    server.mock(|when, then| {
        when.method(GET).path("/forbidden.csv");
        then.status(403);
    });

    let mut loader = DataLoader::with_fetcher(Fetcher::new().unwrap());
    let ok = DataSource::Url { url: server.url("/staff.csv"), options: CsvOptions::default() };
    assert!(loader.load(&ok));
    assert_eq!(loader.rows().rows[2].get("Name"), &Value::from("Cid"));

    let denied = DataSource::Url { url: server.url("/forbidden.csv"), options: CsvOptions::default() };
    assert!(loader.load(&denied));
    let err = loader.error().unwrap();
    assert_eq!(err, &SourceError::Fetch { status: 403, message: "Forbidden".into() });
    assert_eq!(err.inline_message(), "403: Forbidden");
    assert!(loader.rows().is_empty());
}
