use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tidytable::*;

const HOTELS: [&str; 3] = ["City Hotel", "Resort Hotel", "Airport Hotel"];
const DAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

fn bookings(size: usize) -> Table {
    let mut hotel = Vec::with_capacity(size);
    let mut day = Vec::with_capacity(size);
    let mut nights = Vec::with_capacity(size);
    let mut adr = Vec::with_capacity(size);
    for i in 0..size {
        hotel.push(ColumnValue::from(HOTELS[i % HOTELS.len()]));
        day.push(ColumnValue::from(DAYS[(i / HOTELS.len()) % DAYS.len()]));
        nights.push(ColumnValue::from((i % 9) as i64));
        adr.push(if i % 17 == 0 {
            ColumnValue::Null
        } else {
            ColumnValue::from(((i * 37) % 250) as f64 + 0.5)
        });
    }
    Table::from_columns(vec![
        Column::from_values("hotel", ColumnType::String, hotel).unwrap(),
        Column::from_values("day", ColumnType::String, day).unwrap(),
        Column::from_values("nights", ColumnType::Int64, nights).unwrap(),
        Column::from_values("adr", ColumnType::Float64, adr).unwrap(),
    ])
    .unwrap()
}

fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter");
    let expr = col("adr").gt(100.0).and(col("hotel").ne("Airport Hotel"));

    for size in [100, 1000, 10000].iter() {
        let table = bookings(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| table.filter(black_box(&expr)).unwrap());
        });
    }
    group.finish();
}

fn bench_filter_parse(c: &mut Criterion) {
    c.bench_function("filter_parse", |b| {
        b.iter(|| {
            parse_expr(black_box(
                "adr > 100 AND (hotel IN ('City Hotel', 'Resort Hotel') OR nights IS NULL)",
            ))
            .unwrap()
        });
    });
}

fn bench_arrange(c: &mut Criterion) {
    let mut group = c.benchmark_group("arrange");
    let keys = [SortKey::asc("hotel"), SortKey::desc("adr")];

    for size in [100, 1000, 10000].iter() {
        let table = bookings(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| table.arrange(black_box(&keys)).unwrap());
        });
    }
    group.finish();
}

fn bench_group_summarize(c: &mut Criterion) {
    let mut group = c.benchmark_group("group_summarize");
    let aggregations = [
        Aggregation::new("n", n()),
        Aggregation::new("mean_adr", mean("adr")),
        Aggregation::new("max_nights", max("nights")),
    ];

    for size in [100, 1000, 10000].iter() {
        let table = bookings(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                table
                    .group_by(black_box(&["hotel", "day"]))
                    .unwrap()
                    .summarize(&aggregations)
                    .unwrap()
            });
        });
    }
    group.finish();
}

fn bench_mutate(c: &mut Criterion) {
    let mut group = c.benchmark_group("mutate");

    for size in [100, 1000, 10000].iter() {
        let table = bookings(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let revenue = Assignment::new("revenue", |row| {
                    let nights = row.get_i64("nights")?;
                    let adr = row.get_f64("adr")?;
                    Ok(nights.zip(adr).map(|(n, a)| n as f64 * a))
                });
                table.mutate(vec![revenue], Position::after("adr")).unwrap()
            });
        });
    }
    group.finish();
}

fn bench_inner_join(c: &mut Criterion) {
    let mut group = c.benchmark_group("inner_join");
    let rates = Table::from_columns(vec![
        Column::from_values(
            "hotel",
            ColumnType::String,
            HOTELS.iter().map(|&h| ColumnValue::from(h)).collect(),
        )
        .unwrap(),
        Column::from_values(
            "stars",
            ColumnType::Int64,
            vec![ColumnValue::from(4), ColumnValue::from(5), ColumnValue::from(3)],
        )
        .unwrap(),
    ])
    .unwrap();

    for size in [100, 1000, 10000].iter() {
        let table = bookings(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| table.inner_join(black_box(&rates), &["hotel"]).unwrap());
        });
    }
    group.finish();
}

fn bench_pivot(c: &mut Criterion) {
    let mut group = c.benchmark_group("pivot_wider_longer");

    for size in [100, 1000, 10000].iter() {
        let counts = bookings(*size).count(&["hotel", "day"]).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let wide = counts.pivot_wider(black_box("day"), "n").unwrap();
                wide.pivot_longer(&[!Selector::from("hotel")], "day", "n")
                    .unwrap()
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_filter,
    bench_filter_parse,
    bench_arrange,
    bench_group_summarize,
    bench_mutate,
    bench_inner_join,
    bench_pivot
);
criterion_main!(benches);
