//! Commit and diff throughput benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use strata_core::MemoryContentStore;
use strata_engine::{DiffMode, NewVersion, VersionEngine};

fn bench_commit(c: &mut Criterion) {
    c.bench_function("commit_small_version", |b| {
        let engine = VersionEngine::new(Arc::new(MemoryContentStore::new()));
        let mut revision = 0u64;
        b.iter(|| {
            revision += 1;
            let version = engine
                .create_version(NewVersion::new(
                    "bench-doc",
                    "u1",
                    "Bench User",
                    format!("revision {revision}").as_bytes(),
                ))
                .unwrap();
            black_box(version.version_number)
        });
    });
}

fn bench_diff(c: &mut Criterion) {
    let engine = VersionEngine::new(Arc::new(MemoryContentStore::new()));

    let old: String = (0..1000).map(|i| format!("line {i}\n")).collect();
    let new: String = (0..1000)
        .map(|i| {
            if i % 50 == 0 {
                format!("edited line {i}\n")
            } else {
                format!("line {i}\n")
            }
        })
        .collect();

    let v1 = engine
        .create_version(NewVersion::new("bench-doc", "u1", "Bench User", old.as_str()))
        .unwrap();
    let v2 = engine
        .create_version(NewVersion::new("bench-doc", "u1", "Bench User", new.as_str()))
        .unwrap();

    c.bench_function("diff_1k_lines", |b| {
        b.iter(|| {
            let result = engine
                .compare_versions("bench-doc", &v1.id, &v2.id, DiffMode::Unified)
                .unwrap();
            black_box(result.stats.lines_changed)
        });
    });
}

criterion_group!(benches, bench_commit, bench_diff);
criterion_main!(benches);
