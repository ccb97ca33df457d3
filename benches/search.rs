use ai_knower::index::FlatIndex;
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

const DIMENSION: usize = 1536;

fn vectors(count: usize) -> Vec<Vec<f32>> {
    (0..count)
        .map(|i| {
            (0..DIMENSION)
                .map(|j| ((i * 31 + j * 7) % 1000) as f32 / 1000.0)
                .collect()
        })
        .collect()
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let index = FlatIndex::build(DIMENSION, &vectors(5_000)).expect("vectors match dimension");
    let query = vectors(1).remove(0);

    c.bench_function("flat_search_top3", |b| {
        b.iter(|| index.search(black_box(&query), black_box(3)))
    });
    c.bench_function("flat_search_top100", |b| {
        b.iter(|| index.search(black_box(&query), black_box(100)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
