#![allow(clippy::unwrap_used)]
//! Benchmarks for atomic file replacement and locked reads

#![allow(missing_docs)]

use common_utils::io::{
    AtomicWriteOptions, FileSyncPolicy, NamedLock, atomic_read, atomic_write_with_options,
};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn bench_atomic_write(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bench.dat");
    let mut group = c.benchmark_group("atomic_write");

    for size in [1024usize, 64 * 1024, 1024 * 1024] {
        let payload = vec![0xA5u8; size];
        for (label, file_sync) in [
            ("sync", FileSyncPolicy::SyncAll),
            ("no_sync", FileSyncPolicy::SkipSync),
        ] {
            let options = AtomicWriteOptions {
                file_sync,
                ..AtomicWriteOptions::default()
            };
            group.bench_with_input(BenchmarkId::new(label, size), &payload, |b, payload| {
                b.iter(|| atomic_write_with_options(&path, black_box(payload), options).unwrap());
            });
        }
    }

    group.finish();
}

fn bench_atomic_read(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bench.dat");
    let options = AtomicWriteOptions {
        file_sync: FileSyncPolicy::SkipSync,
        ..AtomicWriteOptions::default()
    };
    atomic_write_with_options(&path, &vec![0x5Au8; 64 * 1024], options).unwrap();

    c.bench_function("atomic_read_64k", |b| {
        b.iter(|| black_box(atomic_read(black_box(&path)).unwrap()));
    });
}

fn bench_named_lock(c: &mut Criterion) {
    let lock = NamedLock::new("common-utils-bench");

    c.bench_function("named_lock_uncontended", |b| {
        b.iter(|| {
            let guard = lock.acquire().unwrap();
            black_box(&guard);
        });
    });
}

criterion_group!(
    benches,
    bench_atomic_write,
    bench_atomic_read,
    bench_named_lock
);
criterion_main!(benches);
