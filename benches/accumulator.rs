//! Criterion comparison of collecting mapped rows into a `ResultAccumulator` versus a plain
//! growing `Vec`, plus the end-to-end cost of mapping an in-memory result set.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use sql_mapper::prelude::*;

#[derive(Debug)]
struct BenchRow {
    id: i64,
    name: String,
    score: f64,
}
sql_mapper::impl_from_record!(BenchRow {
    id: i64,
    name: String,
    score: f64,
});

/// Resolve row counts from `BENCH_ROWS` (comma separated), falling back to a fixed ladder.
fn row_counts() -> Vec<usize> {
    std::env::var("BENCH_ROWS")
        .ok()
        .map(|value| {
            value
                .split(',')
                .filter_map(|n| n.trim().parse().ok())
                .collect::<Vec<_>>()
        })
        .filter(|counts| !counts.is_empty())
        .unwrap_or_else(|| vec![10, 1_000, 100_000])
}

fn make_row(i: usize) -> BenchRow {
    BenchRow {
        id: i as i64,
        name: format!("name-{i}"),
        score: i as f64 * 0.5,
    }
}

fn benchmark_collect(c: &mut Criterion) {
    let mut group = c.benchmark_group("collect");
    for n in row_counts() {
        group.throughput(Throughput::Elements(n as u64));

        group.bench_with_input(BenchmarkId::new("vec", n), &n, |b, &n| {
            b.iter(|| {
                let mut out = Vec::new();
                for i in 0..n {
                    out.push(make_row(i));
                }
                black_box(out)
            });
        });

        group.bench_with_input(BenchmarkId::new("accumulator", n), &n, |b, &n| {
            b.iter(|| {
                let mut acc = ResultAccumulator::new();
                for i in 0..n {
                    acc.push(make_row(i));
                }
                black_box(acc.freeze())
            });
        });
    }
    group.finish();
}

fn benchmark_map_result_set(c: &mut Criterion) {
    let mapper = RecordMapper::builder().build().expect("build mapper");
    let mut group = c.benchmark_group("map_result_set");
    for n in row_counts() {
        let mut set = MemoryResultSet::with_columns(["id", "name", "score"]);
        for i in 0..n {
            set.add_row_values(vec![
                RowValues::Int(i as i64),
                RowValues::Text(format!("name-{i}")),
                RowValues::Float(i as f64 * 0.5),
            ]);
        }
        let cancel = CancellationToken::new();

        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(BenchmarkId::new("mapper", n), |b| {
            b.iter(|| {
                set.rewind();
                let rows: ResultList<BenchRow> =
                    mapper.collect(&mut set, &cancel).expect("map rows");
                black_box(rows)
            });
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_collect, benchmark_map_result_set);
criterion_main!(benches);
