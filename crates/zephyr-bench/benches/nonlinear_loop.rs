//! Criterion benchmarks for the timestep loop over the reference profile.

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

/// Benchmark: one timestep of heat conduction plus SST on 1000 elements.
fn bench_reference_step(c: &mut Criterion) {
    c.bench_function("reference_step_1k_elements", |b| {
        b.iter_batched(
            || zephyr_bench::reference_profile().unwrap(),
            |mut sim| sim.step().unwrap(),
            BatchSize::LargeInput,
        );
    });
}

/// Benchmark: ten consecutive timesteps on a warm simulation.
fn bench_ten_steps(c: &mut Criterion) {
    let mut sim = zephyr_bench::reference_profile().unwrap();

    c.bench_function("reference_ten_steps", |b| {
        b.iter(|| sim.run(10).unwrap());
    });
}

criterion_group!(benches, bench_reference_step, bench_ten_steps);
criterion_main!(benches);
