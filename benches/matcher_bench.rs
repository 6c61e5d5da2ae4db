//! Benchmarks for IOC matching and indicator de-duplication.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use triage_report::accumulator::{IndicatorAccumulator, IndicatorKind};
use triage_report::matcher::IndicatorMatcher;
use triage_report::models::{NormalizedRecord, SourceKind};

fn patterns(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("indicator-{:04}.exe", i)).collect()
}

fn records(count: usize) -> Vec<NormalizedRecord> {
    (0..count)
        .map(|i| {
            NormalizedRecord::new(SourceKind::BrowserVisit)
                .with_field("Visit Time", "2024-01-01 10:00:00")
                .with_field("Title", format!("Download page {}", i))
                .with_field("URL", format!("https://host{}.example.com/files/setup-{}.exe", i % 50, i))
        })
        .collect()
}

/// Tagging a fixed batch of records against growing IOC lists
fn bench_tag_records(c: &mut Criterion) {
    let mut group = c.benchmark_group("tag_records");
    let batch = records(1_000);

    for count in [1, 10, 100] {
        group.throughput(Throughput::Elements(batch.len() as u64));
        group.bench_with_input(BenchmarkId::new("patterns", count), &count, |b, &count| {
            b.iter(|| {
                let mut matcher = IndicatorMatcher::new(&patterns(count));
                for record in &batch {
                    black_box(matcher.tag(black_box(record)));
                }
                matcher.total_hits()
            });
        });
    }

    group.finish();
}

/// Finalizing accumulators with a high duplicate ratio
fn bench_finalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("finalize");

    for (observations, distinct) in [(1_000, 100), (10_000, 500)] {
        let values: Vec<String> = (0..observations)
            .map(|i| format!("10.0.{}.{}", (i % distinct) / 256, (i % distinct) % 256))
            .collect();

        group.throughput(Throughput::Elements(observations as u64));
        group.bench_with_input(
            BenchmarkId::new("ip", format!("{}_of_{}", distinct, observations)),
            &values,
            |b, values| {
                b.iter(|| {
                    let mut accumulator = IndicatorAccumulator::new(IndicatorKind::Ip);
                    for value in values {
                        accumulator.accumulate(value).unwrap();
                    }
                    black_box(accumulator.finalize().unwrap())
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_tag_records, bench_finalize);
criterion_main!(benches);
