use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use arena_terminal::demo::paginate;
use arena_terminal::dto::{FilterRule, PaginatedPage, PaginatedQuery, RequestFilters, SortDirection};
use arena_terminal::table::{self, TableView, cell_text};
use arena_terminal::validation::{Condition, FieldSpec, FieldValue, Form};
use serde_json::{Value, json};

fn big_form() -> Form {
    let specs = (0..50)
        .map(|i| {
            let name: &'static str = Box::leak(format!("field{i}").into_boxed_str());
            FieldSpec::text(name)
                .condition(Condition::required_text("required"))
                .condition(Condition::min_text_len(3, "too short"))
        })
        .collect();
    Form::new(specs)
}

fn bench_validation_pass(c: &mut Criterion) {
    let mut form = big_form();
    for i in 0..50 {
        let value = if i % 2 == 0 { "value" } else { "x" };
        form.set_value(
            &format!("field{i}"),
            FieldValue::Text(value.to_string()),
        );
    }
    c.bench_function("validation_pass_50_fields", |b| {
        b.iter(|| black_box(form.pass()));
    });
}

fn sample_rows(count: usize) -> Vec<Value> {
    (0..count)
        .map(|i| {
            json!({
                "id": format!("row-{i}"),
                "name": format!("Competitor {i}"),
                "gameType": {"id": "gt", "name": "Darts"},
                "startTime": "2026-03-09T18:30:00Z",
                "winAt": i,
            })
        })
        .collect()
}

fn bench_cell_rendering(c: &mut Criterion) {
    let rows = sample_rows(1000);
    let columns = table::GAME_FORMATS.columns;
    c.bench_function("cell_text_1000_rows", |b| {
        b.iter(|| {
            let mut len = 0usize;
            for row in &rows {
                for col in columns {
                    len += cell_text(black_box(row), col).len();
                }
            }
            black_box(len)
        });
    });
}

fn bench_query_build(c: &mut Criterion) {
    c.bench_function("table_query_round", |b| {
        b.iter(|| {
            let mut view = TableView::remote(&table::COMPETITIONS, 10);
            view.set_filter("open");
            view.toggle_sort("name");
            black_box(view.take_query())
        });
    });
}

fn bench_paginate(c: &mut Criterion) {
    let rows = sample_rows(1000);
    let query = PaginatedQuery {
        page_index: 3,
        page_size: 10,
        column_name_for_sorting: "name".to_string(),
        sort_direction: SortDirection::Desc,
        request_filters: RequestFilters {
            logical_operator: 0,
            filters: vec![FilterRule {
                path: "name".to_string(),
                value: "competitor 1".to_string(),
            }],
        },
    };
    c.bench_function("paginate_1000_rows", |b| {
        b.iter(|| black_box(paginate(rows.clone(), &query)));
    });
}

fn bench_page_parse(c: &mut Criterion) {
    let raw = serde_json::to_string(&json!({
        "items": sample_rows(200),
        "total": 200,
    }))
    .expect("serializes");
    c.bench_function("paginated_page_parse_200", |b| {
        b.iter(|| {
            let page: PaginatedPage = serde_json::from_str(black_box(&raw)).expect("parses");
            black_box(page.items.len())
        });
    });
}

criterion_group!(
    benches,
    bench_validation_pass,
    bench_cell_rendering,
    bench_query_build,
    bench_paginate,
    bench_page_parse
);
criterion_main!(benches);
