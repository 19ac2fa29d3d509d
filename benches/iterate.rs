use criterion::*;
use std::hint::black_box;

mod common;
use common::*;

fn iterate_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("iterate");

    for &(label, n) in &[
        ("integrate_10k", ENTITIES_SMALL),
        ("integrate_100k", ENTITIES_MED),
    ] {
        let mut registry = make_registry();
        populate(&mut registry, n);

        group.bench_function(label, |b| {
            b.iter(|| {
                for mut view in registry.query::<(Position, Velocity)>().unwrap() {
                    let (dx, dy) = {
                        let velocity = view.get::<Velocity>().unwrap();
                        (velocity.dx, velocity.dy)
                    };
                    let position = view.get_mut::<Position>().unwrap();
                    position.x += dx;
                    position.y += dy;
                }
                black_box(&registry);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, iterate_benchmark);
criterion_main!(benches);
