//! Criterion micro-benchmarks for field catalog lookup and registration.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use zephyr_core::{FieldState, ScalarField};
use zephyr_fields::{FieldManager, FieldOverrides, FieldRegistry};

/// Benchmark: look up every catalog name under the 3-D, 2-state key.
fn bench_registry_lookup(c: &mut Criterion) {
    let registry = FieldRegistry::get(3, 2).unwrap();
    let names: Vec<&str> = registry.names().collect();

    c.bench_function("registry_lookup_all", |b| {
        b.iter(|| {
            for name in &names {
                black_box(registry.lookup(name).unwrap());
            }
        });
    });
}

/// Benchmark: register every catalog name on the block of a 1000-element
/// channel, starting from an empty mesh each time.
fn bench_register_catalog(c: &mut Criterion) {
    let names: Vec<&str> = FieldRegistry::get(3, 2).unwrap().names().collect();

    c.bench_function("register_catalog_1k_elements", |b| {
        b.iter(|| {
            let (mut mesh, _) = zephyr_bench::channel(1000).unwrap();
            let block = mesh.get_part("block_1").unwrap().id();
            let fm = FieldManager::new(&mesh, 2).unwrap();
            let none = FieldOverrides::default();
            for name in &names {
                black_box(fm.register_field_with(&mut mesh, name, &[block], &none).unwrap());
            }
        });
    });
}

/// Benchmark: fetch old-state handles of an already registered field.
fn bench_get_field_ptr(c: &mut Criterion) {
    let (mut mesh, _) = zephyr_bench::channel(100).unwrap();
    let block = mesh.get_part("block_1").unwrap().id();
    let fm = FieldManager::new(&mesh, 3).unwrap();
    fm.register_field::<ScalarField>(&mut mesh, "temperature", &[block], None, FieldState::NONE)
        .unwrap();

    c.bench_function("get_field_ptr_states", |b| {
        b.iter(|| {
            for state in [FieldState::NP1, FieldState::N, FieldState::NM1] {
                let f: ScalarField = fm.get_field_ptr(&mesh, "temperature", state).unwrap();
                black_box(f);
            }
        });
    });
}

criterion_group!(
    benches,
    bench_registry_lookup,
    bench_register_catalog,
    bench_get_field_ptr
);
criterion_main!(benches);
