//! Benchmark for star contraction
//!
//! Measures:
//! - Full pipeline time on chains (worst case for round count)
//! - Full pipeline time on many small components
//! - A single Large-Star round

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use starcc_orchestration::pipeline::execute_stage;
use starcc_orchestration::{
    PipelineConfig, PipelineOrchestrator, StageContext, StageInput, StarMode, StarStage,
};
use starcc_storage::{write_record_set, EdgeRecord, MemoryRecordStore, RecordPath, RecordStore};
use std::sync::Arc;

/// Adjacency text of a path 0 - 1 - ... - n.
fn chain(num_nodes: i32) -> String {
    (0..num_nodes - 1)
        .map(|n| format!("{}\t{}\n", n, n + 1))
        .collect()
}

/// Adjacency text of `count` disjoint stars with `size` leaves each.
fn stars(count: i32, size: i32) -> String {
    let mut text = String::new();
    for s in 0..count {
        let hub = s * (size + 1);
        let leaves: Vec<String> = (1..=size).map(|l| (hub + l).to_string()).collect();
        text.push_str(&format!("{}\t{}\n", hub, leaves.join(",")));
    }
    text
}

fn run_pipeline(rt: &tokio::runtime::Runtime, text: &str) {
    rt.block_on(async {
        let store = Arc::new(MemoryRecordStore::new());
        store
            .create(&RecordPath::new("input.txt"), text.as_bytes())
            .await
            .expect("Seed failed");

        let report = PipelineOrchestrator::new(store, PipelineConfig::default())
            .expect("Invalid config")
            .run(&RecordPath::new("input.txt"), &RecordPath::new("out"))
            .await
            .expect("Pipeline failed");

        black_box(report);
    });
}

fn bench_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain");
    group.sample_size(10);
    let rt = tokio::runtime::Runtime::new().unwrap();

    for num_nodes in [1_000, 10_000, 100_000].iter() {
        let text = chain(*num_nodes);
        group.bench_with_input(BenchmarkId::from_parameter(num_nodes), &text, |b, text| {
            b.iter(|| run_pipeline(&rt, text));
        });
    }

    group.finish();
}

fn bench_stars(c: &mut Criterion) {
    let mut group = c.benchmark_group("stars");
    group.sample_size(10);
    let rt = tokio::runtime::Runtime::new().unwrap();

    for count in [100, 1_000, 10_000].iter() {
        let text = stars(*count, 8);
        group.bench_with_input(BenchmarkId::from_parameter(count), &text, |b, text| {
            b.iter(|| run_pipeline(&rt, text));
        });
    }

    group.finish();
}

fn bench_large_star_round(c: &mut Criterion) {
    let mut group = c.benchmark_group("large_star_round");
    let rt = tokio::runtime::Runtime::new().unwrap();

    for num_edges in [10_000, 100_000].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(num_edges),
            num_edges,
            |b, &num_edges| {
                let store = Arc::new(MemoryRecordStore::new());
                let edges: Vec<EdgeRecord> =
                    (1..=num_edges).map(|n| EdgeRecord::new(n, n / 2)).collect();
                rt.block_on(write_record_set(
                    store.as_ref(),
                    &RecordPath::new("graph_0"),
                    vec![edges],
                ))
                .expect("Seed failed");
                let ctx = StageContext::new(store.clone(), Arc::new(PipelineConfig::default()));

                b.iter(|| {
                    rt.block_on(async {
                        let output = RecordPath::new("graph_1");
                        let result = execute_stage(
                            &StarStage::new(StarMode::Large),
                            StageInput::new(RecordPath::new("graph_0"), Some(output.clone())),
                            &ctx,
                        )
                        .await
                        .expect("Round failed");
                        store.delete_subtree(&output).await.expect("Cleanup failed");
                        black_box(result);
                    });
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_chain, bench_stars, bench_large_star_round);
criterion_main!(benches);
