// End-to-end pipeline scenarios over small hand-built tables.

use tabview_engine::filter::FilterState;
use tabview_engine::group::Reducer;
use tabview_engine::window::{compute_window, OVERSCAN};
use tabview_engine::{process, ColumnType, RowId, RowSet, SortMode, Value, ViewState};

fn table(headers: &[&str], records: Vec<Vec<Value>>) -> RowSet {
    RowSet::from_records(headers.iter().map(|h| h.to_string()).collect(), records)
}

fn column(rows: &[tabview_engine::Row], name: &str) -> Vec<Value> {
    rows.iter().map(|r| r.get(name).clone()).collect()
}

#[test]
fn sort_up_orders_ids() {
    let src = table(&["id"], vec![vec![Value::from(2.0)], vec![Value::from(1.0)]]);
    let mut state = ViewState::new(&src.headers);
    state.set_sort("id", SortMode::Up);

    let out = process(&src, &state);
    assert_eq!(column(&out.rows, "id"), vec![Value::from(1.0), Value::from(2.0)]);
}

#[test]
fn numeric_filter_on_salary() {
    let src = table(
        &["Name", "Salary"],
        vec![
            vec![Value::from("Alice"), Value::from(50000.0)],
            vec![Value::from("Bob"), Value::from(70000.0)],
        ],
    );
    let mut state = ViewState::new(&src.headers);
    state.update_style("Salary", |s| s.column_type = Some(ColumnType::Number));
    state.filters.set_text("Salary", ">60000");

    let out = process(&src, &state);
    assert_eq!(column(&out.rows, "Salary"), vec![Value::from(70000.0)]);
}

#[test]
fn group_average() {
    let src = table(
        &["Department", "Salary"],
        vec![
            vec![Value::from("Eng"), Value::from(100.0)],
            vec![Value::from("Eng"), Value::from(200.0)],
            vec![Value::from("Ops"), Value::from("n/a")],
        ],
    );
    let mut state = ViewState::new(&src.headers);
    state.update_style("Department", |s| s.group_by = Some(true));
    state.update_style("Salary", |s| s.reducer = Some(Reducer::Avg));

    let out = process(&src, &state);
    assert_eq!(out.rows.len(), 2);
    assert_eq!(out.rows[0].get("Salary"), &Value::Number(150.0));
    assert_eq!(out.rows[1].get("Salary"), &Value::Empty);
    assert_eq!(out.rows[1].id, RowId::Group("Ops".into()));
}

#[test]
fn split_by_state() {
    let src = table(
        &["State", "City"],
        vec![
            vec![Value::from("CA"), Value::from("LA")],
            vec![Value::from("CA"), Value::from("SF")],
            vec![Value::from("NY"), Value::from("NYC")],
        ],
    );
    let mut state = ViewState::new(&src.headers);
    state.update_style("State", |s| s.split_by = Some(true));

    let out = process(&src, &state);
    let sizes: Vec<(String, usize)> = out.partitions.iter().map(|p| (p.title(), p.rows.len())).collect();
    assert_eq!(sizes, vec![("State: CA".to_string(), 2), ("State: NY".to_string(), 1)]);
}

#[test]
fn virtual_window_near_top() {
    let w = compute_window(240.0, 480.0, 24.0, 1000, OVERSCAN);
    assert_eq!((w.start, w.end), (0, 40));
}

#[test]
fn hidden_columns_do_not_sort() {
    let src = table(
        &["a", "b"],
        vec![
            vec![Value::from("x"), Value::from(2.0)],
            vec![Value::from("y"), Value::from(1.0)],
        ],
    );
    let mut state = ViewState::new(&src.headers);
    state.set_sort("b", SortMode::Up);
    state.toggle_hidden("b");

    let out = process(&src, &state);
    assert_eq!(out.visible_columns, vec!["a".to_string()]);
    assert_eq!(column(&out.rows, "a"), vec![Value::from("x"), Value::from("y")]);
}

#[test]
fn dropdown_and_text_filters_combine() {
    let src = table(
        &["City", "Pop"],
        vec![
            vec![Value::from("Paris"), Value::from(2.1)],
            vec![Value::from("Parma"), Value::from(0.2)],
            vec![Value::from("Lyon"), Value::from(0.5)],
        ],
    );
    let mut state = ViewState::new(&src.headers);
    state.filters = FilterState::new();
    state.filters.set_text("City", "par");
    state.filters.toggle_mode("Pop");
    state.filters.toggle_value("Pop", Value::from(0.2));
    state.filters.toggle_value("Pop", Value::from(0.5));

    let out = process(&src, &state);
    assert_eq!(column(&out.rows, "City"), vec![Value::from("Parma")]);
}
