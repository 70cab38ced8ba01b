// SPDX-License-Identifier: PMPL-1.0-or-later
//! Performance benchmarks for the DataManager matcher and stores

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;
use tokio::runtime::Runtime;

use datamanager_model::{Collection, Criterion as FilterCriterion, FilterSpec, Record};
use datamanager_storage::{
    Adapter, IndexedDbAdapter, MemoryAdapter, SaveOptions, StoreSettings,
};

fn task(i: u64) -> Record {
    let user = if i % 10 == 0 { "admin" } else { "bob" };
    Record::try_from(json!({
        "id": i,
        "user": user,
        "tags": [format!("t{}", i % 7), "all"],
        "profile": {"address": {"city": if i % 2 == 0 { "NYC" } else { "LA" }}}
    }))
    .unwrap()
}

fn tasks(n: u64) -> Vec<Record> {
    (0..n).map(task).collect()
}

// ============================================================================
// Matcher Benchmarks
// ============================================================================

fn bench_filter(c: &mut Criterion) {
    let mut collection = Collection::default();
    collection.save(tasks(1000), true);

    let specs = [
        ("exact", FilterSpec::new().with("user", "admin")),
        (
            "nested_path",
            FilterSpec::from_value(json!({"profile": {"address": {"city": "NYC"}}})).unwrap(),
        ),
        (
            "multi_any",
            FilterSpec::new().with("tags", FilterCriterion::any_of(["t3", "t5"])),
        ),
    ];

    let mut group = c.benchmark_group("filter");
    group.throughput(Throughput::Elements(1000));

    for (name, spec) in &specs {
        group.bench_with_input(BenchmarkId::new("and", name), spec, |b, spec| {
            b.iter(|| black_box(collection.filter(Some(spec), false)))
        });
    }

    group.finish();
}

// ============================================================================
// Mutation Benchmarks
// ============================================================================

fn bench_upsert(c: &mut Criterion) {
    let mut group = c.benchmark_group("upsert");

    for size in [100u64, 1000] {
        let base = tasks(size);
        group.bench_with_input(BenchmarkId::new("update_last", size), &base, |b, base| {
            b.iter_batched(
                || {
                    let mut collection = Collection::default();
                    collection.save(base.clone(), true);
                    collection
                },
                |mut collection| {
                    collection.save(task(size - 1), false);
                    black_box(collection.len())
                },
                criterion::BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

// ============================================================================
// Store Benchmarks
// ============================================================================

fn bench_memory_store(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let store = MemoryAdapter::new("bench", "id");
    rt.block_on(async {
        store.save(tasks(1000).into(), SaveOptions::default()).await.unwrap();
    });

    let spec = FilterSpec::new().with("user", "admin");
    let mut group = c.benchmark_group("memory_store");

    group.bench_function("filter", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(store.filter(Some(&spec), false).await.unwrap()) });
    });

    group.bench_function("read_by_id", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(store.read(Some(&json!(500))).await.unwrap()) });
    });

    group.finish();
}

fn bench_redb_store(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let temp_dir = std::env::temp_dir().join(format!("bench-redb-{}", uuid::Uuid::new_v4()));
    let settings = StoreSettings {
        auto: true,
        data_dir: Some(temp_dir.clone()),
        ..Default::default()
    };
    let store = IndexedDbAdapter::new("bench", &settings);
    rt.block_on(async {
        store.save(tasks(1000).into(), SaveOptions::default()).await.unwrap();
    });

    let mut group = c.benchmark_group("redb_store");

    group.bench_function("read_by_id", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(store.read(Some(&json!(500))).await.unwrap()) });
    });

    group.bench_function("save_one", |b| {
        b.to_async(&rt).iter(|| async {
            black_box(
                store
                    .save(task(1).into(), SaveOptions::default())
                    .await
                    .unwrap(),
            )
        });
    });

    group.finish();
    rt.block_on(store.close());
    std::fs::remove_dir_all(&temp_dir).ok();
}

criterion_group!(engine_benches, bench_filter, bench_upsert);

criterion_group!(store_benches, bench_memory_store, bench_redb_store);

criterion_main!(engine_benches, store_benches);
