use arena_terminal::dto::SortDirection;
use arena_terminal::table::{self, ColumnSpec, TableView, cell_text, row_id, spaced_lowercase};
use serde_json::json;

fn remote() -> TableView {
    TableView::remote(&table::COMPETITIONS, 5)
}

#[test]
fn new_remote_table_is_armed_with_defaults() {
    let mut view = remote();
    assert!(view.is_dirty());
    let (id, query) = view.take_query().expect("fresh table should fetch");
    assert_eq!(id, 1);
    assert_eq!(query.page_index, 0);
    assert_eq!(query.page_size, 5);
    assert_eq!(query.column_name_for_sorting, "status");
    assert_eq!(query.sort_direction, SortDirection::Asc);
    assert_eq!(query.request_filters.filters[0].path, "name");
    assert_eq!(query.request_filters.filters[0].value, "");
    assert!(!view.is_dirty());
}

#[test]
fn query_reflects_latest_committed_state() {
    let mut view = remote();
    let _ = view.take_query();

    view.set_filter("open");
    view.toggle_sort("name");
    view.set_page_size(10);
    let (_, query) = view.take_query().expect("changes arm a fetch");
    assert_eq!(query.page_index, 0);
    assert_eq!(query.page_size, 10);
    assert_eq!(query.column_name_for_sorting, "name");
    assert_eq!(query.request_filters.filters[0].value, "open");
}

#[test]
fn toggle_sort_same_key_flips_new_key_resets_ascending() {
    let mut view = remote();
    view.toggle_sort("name");
    assert_eq!(view.sort_key, "name");
    assert_eq!(view.sort_direction, SortDirection::Asc);

    view.toggle_sort("name");
    assert_eq!(view.sort_direction, SortDirection::Desc);

    view.toggle_sort("status");
    assert_eq!(view.sort_key, "status");
    assert_eq!(view.sort_direction, SortDirection::Asc);
}

#[test]
fn toggle_sort_ignores_unsortable_columns() {
    let mut view = remote();
    let _ = view.take_query();
    view.toggle_sort("gameType");
    assert_eq!(view.sort_key, "status");
    assert!(!view.is_dirty());
}

#[test]
fn page_size_and_filter_changes_reset_page_index() {
    let mut view = remote();
    let _ = view.take_query();
    let rows = vec![json!({"id": "a"})];
    assert!(view.set_rows(1, rows, 30));

    view.next_page();
    assert_eq!(view.page_index, 1);
    view.set_page_size(10);
    assert_eq!(view.page_index, 0);

    view.next_page();
    view.set_filter("x");
    assert_eq!(view.page_index, 0);
}

#[test]
fn next_page_respects_total() {
    let mut view = remote();
    let _ = view.take_query();
    assert!(view.set_rows(1, vec![json!({"id": "a"})], 6));

    view.next_page();
    assert_eq!(view.page_index, 1);
    // 6 rows at size 5 means two pages, no third.
    view.next_page();
    assert_eq!(view.page_index, 1);
    view.prev_page();
    assert_eq!(view.page_index, 0);
    view.prev_page();
    assert_eq!(view.page_index, 0);
    assert_eq!(view.page_count(), 2);
}

#[test]
fn superseded_response_is_dropped() {
    let mut view = remote();
    let (first, _) = view.take_query().expect("first query");
    view.set_filter("newer");
    let (second, _) = view.take_query().expect("second query");

    assert!(!view.set_rows(first, vec![json!({"id": "stale"})], 1));
    assert!(view.rows.is_empty());
    assert!(view.set_rows(second, vec![json!({"id": "fresh"})], 1));
    assert_eq!(view.rows.len(), 1);
}

#[test]
fn static_table_never_arms_a_fetch() {
    let mut view = TableView::fixed(&table::RANKING);
    assert!(!view.is_dirty());
    assert!(view.take_query().is_none());

    view.set_filter("x");
    view.refresh();
    view.reset();
    assert!(view.take_query().is_none());

    view.set_fixed_rows(vec![json!({"id": "r1"}), json!({"id": "r2"})]);
    assert_eq!(view.total, 2);
    assert!(view.take_query().is_none());
}

#[test]
fn reset_restores_declared_defaults() {
    let mut view = remote();
    view.set_filter("abc");
    view.toggle_sort("name");
    view.toggle_sort("name");
    let _ = view.take_query();

    view.reset();
    let (_, query) = view.take_query().expect("reset re-arms");
    assert_eq!(query.column_name_for_sorting, "status");
    assert_eq!(query.sort_direction, SortDirection::Asc);
    assert_eq!(query.page_index, 0);
    assert_eq!(query.request_filters.filters[0].value, "");
}

#[test]
fn selection_follows_rows_and_clamps() {
    let mut view = remote();
    let _ = view.take_query();
    assert!(view.set_rows(
        1,
        vec![json!({"id": "a"}), json!({"id": "b"}), json!({"id": "c"})],
        3
    ));
    view.select_next();
    view.select_next();
    assert_eq!(view.selected_id().as_deref(), Some("c"));
    view.select_next();
    assert_eq!(view.selected_id().as_deref(), Some("c"));

    view.set_filter("shrink");
    let (id, _) = view.take_query().expect("filter arms fetch");
    assert!(view.set_rows(id, vec![json!({"id": "only"})], 1));
    assert_eq!(view.selected_id().as_deref(), Some("only"));
}

#[test]
fn row_id_falls_back_to_embedded_competitor() {
    assert_eq!(row_id(&json!({"id": "x1"})).as_deref(), Some("x1"));
    assert_eq!(
        row_id(&json!({"competitor": {"id": "c9", "name": "A"}, "wins": 2})).as_deref(),
        Some("c9")
    );
    assert!(row_id(&json!({"wins": 2})).is_none());
}

#[test]
fn cell_text_handles_nested_dates_and_missing_values() {
    let row = json!({
        "name": "Spring open",
        "gameType": {"id": "gt1", "name": "Darts"},
        "startTime": "2026-03-09T18:30:00Z",
        "teamSize": null,
        "winAt": 11,
        "isActive": true,
    });

    let nested = ColumnSpec::nested("gameType", "name", false);
    assert_eq!(cell_text(&row, &nested), "Darts");

    let date = ColumnSpec::date("startTime", true);
    assert_eq!(cell_text(&row, &date), "09/03/2026 18:30");

    let number = ColumnSpec::number("winAt", false);
    assert_eq!(cell_text(&row, &number), "11");

    let absent = ColumnSpec::text("location", false);
    assert_eq!(cell_text(&row, &absent), "-");
    let null = ColumnSpec::number("teamSize", false);
    assert_eq!(cell_text(&row, &null), "-");

    let flag = ColumnSpec::text("isActive", false);
    assert_eq!(cell_text(&row, &flag), "yes");
}

#[test]
fn date_cells_tolerate_unparseable_text() {
    let row = json!({"startTime": "whenever"});
    let date = ColumnSpec::date("startTime", true);
    assert_eq!(cell_text(&row, &date), "whenever");
}

#[test]
fn spaced_lowercase_splits_camel_case() {
    assert_eq!(spaced_lowercase("numberOfActivePlayers"), "number of active players");
    assert_eq!(spaced_lowercase("name"), "name");
    assert_eq!(spaced_lowercase("startTime"), "start time");
}
