use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use review_charts::config::{Config, LayoutConfig};
use review_charts::dispatch::{MemorySink, dispatch};
use review_charts::layout::compute_layout;
use review_charts::layout::prisma::compute_flow_layout;
use review_charts::render::render_svg;
use review_charts::request::{DatabaseHits, ReasonCounts};
use review_charts::theme::Theme;
use review_charts::threshold::ThresholdDetector;
use review_charts::{ChartRequest, StageCounts};
use std::hint::black_box;

const FULL_REQUEST: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/tests/fixtures/full_request.json"
));

/// Smoothly decaying scores with a knee a third of the way down.
fn synthetic_scores(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let t = i as f64 / n.max(1) as f64;
            if t < 0.33 {
                0.95 - t * 0.3
            } else {
                0.4 * (1.0 - t)
            }
        })
        .rev()
        .collect()
}

fn stage_counts(databases: usize, reasons: usize) -> StageCounts {
    StageCounts {
        identified: 5000,
        databases: (0..databases)
            .map(|i| DatabaseHits::new(format!("Source {i}"), 50))
            .collect(),
        duplicates: 800,
        screened: 4200,
        excluded: Some(3900),
        screening_exclusion_reasons: (0..reasons)
            .map(|i| (format!("Reason {i}"), 10))
            .collect::<ReasonCounts>(),
        retrieved: 300,
        not_retrieved: 12,
        assessed: 288,
        excluded_reasons: (0..reasons)
            .map(|i| (format!("Criterion {i}"), 4))
            .collect::<ReasonCounts>(),
        included: 61,
        ..StageCounts::default()
    }
}

fn bench_threshold(c: &mut Criterion) {
    let mut group = c.benchmark_group("threshold");
    let detector = ThresholdDetector::new();
    for n in [10usize, 100, 1_000, 10_000] {
        let scores = synthetic_scores(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &scores, |b, data| {
            b.iter(|| {
                let result = detector.detect(black_box(data));
                black_box(result.map(|r| r.elbow));
            });
        });
    }
    group.finish();
}

fn bench_prisma_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("prisma_layout");
    let config = LayoutConfig::default();
    for (databases, reasons) in [(0usize, 0usize), (3, 5), (12, 20), (50, 50)] {
        let counts = stage_counts(databases, reasons);
        group.bench_with_input(
            BenchmarkId::new("databases_reasons", format!("{databases}x{reasons}")),
            &counts,
            |b, data| {
                b.iter(|| {
                    let flow = compute_flow_layout(black_box(data), &config.prisma);
                    black_box(flow.primitives.len());
                });
            },
        );
    }
    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    let theme = Theme::academic();
    let config = LayoutConfig::default();
    let requests = [
        ("prisma", ChartRequest::Prisma(stage_counts(5, 8))),
        (
            "scree",
            ChartRequest::Scree(review_charts::request::ScreeRequest {
                scores: synthetic_scores(400),
            }),
        ),
    ];
    for (name, request) in requests {
        let layout = compute_layout(&request, &theme, &config).expect("layout failed");
        group.bench_with_input(BenchmarkId::from_parameter(name), &layout, |b, data| {
            b.iter(|| {
                let svg = render_svg(black_box(data), &theme, &config);
                black_box(svg.len());
            });
        });
    }
    group.finish();
}

fn bench_end_to_end(c: &mut Criterion) {
    let mut group = c.benchmark_group("end_to_end");
    let config = Config::default();
    group.bench_function("full_request", |b| {
        b.iter(|| {
            let mut sink = MemorySink::new();
            let manifest =
                dispatch(black_box(FULL_REQUEST), &mut sink, &config).expect("dispatch failed");
            let total: usize = sink
                .artifacts
                .iter()
                .map(|(_, layout)| render_svg(layout, &config.theme, &config.layout).len())
                .sum();
            black_box((manifest.len(), total));
        });
    });
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default();
    targets = bench_threshold, bench_prisma_layout, bench_render, bench_end_to_end
);
criterion_main!(benches);
