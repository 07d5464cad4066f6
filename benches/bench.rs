// Criterion benchmarks for roofscope

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use roofscope::core::aggregation::{map_view, summarize, MapDefaults};
use roofscope::core::csv::{to_csv, CSV_EXCLUDED_COLUMNS};
use roofscope::core::filters::{Dimension, FilterSelection};
use roofscope::core::report::ReportText;
use roofscope::models::Property;

const CITIES: [&str; 5] = ["Dallas", "Plano", "Frisco", "Irving", "Garland"];

fn create_property(id: usize) -> Property {
    Property {
        property_id: format!("TX-{}", id),
        formatted_address: Some(format!("{} Main St", id)),
        city: Some(CITIES[id % CITIES.len()].to_string()),
        zip: Some(75000 + (id % 90) as i64),
        owner_name: Some(format!("Owner {}", id)),
        estimated_value: Some(200_000.0 + (id % 40) as f64 * 25_000.0),
        combined_score: Some((id % 4) as i64),
        latitude: Some(32.5 + (id % 100) as f64 * 0.01),
        longitude: Some(-97.0 + (id % 100) as f64 * 0.01),
        year_built: Some(1960 + (id % 60) as i32),
        roof_type: Some("Composition Shingle".to_string()),
        count_gusts: Some(3),
        gust_1: Some(61.2),
        gust_1_date: Some("2021-03-01".to_string()),
        gust_2: Some(66.8),
        gust_2_date: Some("2022-05-14".to_string()),
        gust_4: Some(72.4),
        gust_4_date: Some("2023-04-12".to_string()),
        ..Default::default()
    }
}

fn create_selection() -> FilterSelection {
    let mut selection = FilterSelection::default();
    selection.toggle(Dimension::City, "Dallas", &[]);
    selection.toggle(Dimension::City, "Frisco", &[]);
    selection.toggle(Dimension::Score, "2", &[]);
    selection.toggle(Dimension::Score, "3", &[]);
    selection.set_max_price(900_000.0).ok();
    selection
}

fn bench_property_query(c: &mut Criterion) {
    let selection = create_selection();

    c.bench_function("property_query_to_params", |b| {
        b.iter(|| black_box(selection.property_query(black_box("properties")).to_params()))
    });
}

fn bench_filter_matches(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_matches");
    let selection = create_selection();

    for size in [100, 1000, 10000].iter() {
        let properties: Vec<Property> = (0..*size).map(create_property).collect();

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                properties
                    .iter()
                    .filter(|p| selection.matches(black_box(p)))
                    .count()
            })
        });
    }

    group.finish();
}

fn bench_aggregation(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregation");
    let defaults = MapDefaults::default();

    for size in [100, 1000, 10000].iter() {
        let properties: Vec<Property> = (0..*size).map(create_property).collect();

        group.bench_with_input(BenchmarkId::new("summarize", size), size, |b, _| {
            b.iter(|| summarize(black_box(&properties)))
        });
        group.bench_with_input(BenchmarkId::new("map_view", size), size, |b, _| {
            b.iter(|| map_view(black_box(&properties), &defaults))
        });
    }

    group.finish();
}

fn bench_csv(c: &mut Criterion) {
    let properties: Vec<Property> = (0..1000).map(create_property).collect();

    c.bench_function("csv_1000_rows", |b| {
        b.iter(|| to_csv(black_box(&properties), &CSV_EXCLUDED_COLUMNS))
    });
}

fn bench_report_text(c: &mut Criterion) {
    let property = create_property(7);

    c.bench_function("report_text", |b| {
        b.iter(|| ReportText::for_property(black_box(&property)))
    });
}

criterion_group!(
    benches,
    bench_property_query,
    bench_filter_matches,
    bench_aggregation,
    bench_csv,
    bench_report_text
);
criterion_main!(benches);
