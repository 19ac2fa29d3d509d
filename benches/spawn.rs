use criterion::*;
use std::hint::black_box;

mod common;
use common::*;

fn spawn_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("spawn");

    for &(label, n) in &[
        ("spawn_10k", ENTITIES_SMALL),
        ("spawn_100k", ENTITIES_MED),
    ] {
        group.bench_function(label, |b| {
            b.iter_batched(
                make_registry,
                |mut registry| {
                    populate(&mut registry, n);
                    black_box(registry);
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, spawn_benchmark);
criterion_main!(benches);
