#![allow(clippy::unwrap_used)]
//! Benchmarks for the collection types

#![allow(missing_docs)]

use common_utils::collections::{LanguageSet, LanguageTag, MultiMap, Named, NamedCollection};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

struct Entry {
    name: String,
}

impl Named for Entry {
    fn name(&self) -> &str {
        &self.name
    }
}

fn bench_multi_map(c: &mut Criterion) {
    // Mostly single-valued keys, a few with many values
    let pairs: Vec<(u32, u32)> = (0..10_000).map(|i| (i % 9_000, i)).collect();

    c.bench_function("multi_map_build_10k", |b| {
        b.iter(|| {
            let map: MultiMap<u32, u32> = black_box(&pairs).iter().copied().collect();
            black_box(map);
        });
    });

    let map: MultiMap<u32, u32> = pairs.iter().copied().collect();
    c.bench_function("multi_map_get", |b| {
        b.iter(|| {
            for key in (0..9_000).step_by(97) {
                black_box(map.get(black_box(&key)));
            }
        });
    });
}

fn bench_named_collection(c: &mut Criterion) {
    let entries: NamedCollection<Entry> = (0..1_000)
        .map(|i| Entry {
            name: format!("entry-{i}"),
        })
        .collect::<Vec<_>>()
        .try_into()
        .unwrap();

    c.bench_function("named_collection_lookup", |b| {
        b.iter(|| black_box(entries.get(black_box("entry-742"))));
    });

    c.bench_function("named_collection_remove_front", |b| {
        b.iter_batched(
            || {
                NamedCollection::try_from(
                    (0..200)
                        .map(|i| Entry {
                            name: format!("entry-{i}"),
                        })
                        .collect::<Vec<_>>(),
                )
                .unwrap()
            },
            |mut entries| black_box(entries.remove("entry-0")),
            criterion::BatchSize::SmallInput,
        );
    });
}

fn bench_language_set(c: &mut Criterion) {
    let list = "en, en-US, en-GB, de, de-AT, fr, fr-CA, pt-BR, es-419, zh-Hant-TW, ja, ko";

    c.bench_function("language_set_parse", |b| {
        b.iter(|| black_box(LanguageSet::parse(black_box(list)).unwrap()));
    });

    let set = LanguageSet::parse(list).unwrap();
    let requested: Vec<LanguageTag> = ["it-IT", "nl-BE", "zh-Hant-HK", "pt-BR"]
        .iter()
        .map(|s| s.parse().unwrap())
        .collect();
    c.bench_function("language_set_best_match", |b| {
        b.iter(|| black_box(set.best_match(black_box(&requested))));
    });
}

criterion_group!(
    benches,
    bench_multi_map,
    bench_named_collection,
    bench_language_set
);
criterion_main!(benches);
