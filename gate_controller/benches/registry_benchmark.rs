//! Credential registry benchmarks.
//!
//! Lookup is a linear scan of the slot array, so the worst case is a miss
//! on a full 255-slot registry.

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use gate_common::credential::Identifier;
use gate_controller::CredentialRegistry;
use gate_controller::drivers::simulation::MemoryStore;
use std::hint::black_box;

const MASTER: Identifier = Identifier::new([0x11, 0x22, 0x33, 0x44]);

fn id(n: u32) -> Identifier {
    Identifier::new((n + 0x0100_0000).to_be_bytes())
}

fn full_registry() -> CredentialRegistry<MemoryStore> {
    let mut registry = CredentialRegistry::open(MemoryStore::new(1030)).expect("open");
    registry.define_master(MASTER).expect("master");
    for n in 0..registry.capacity() as u32 {
        registry.add(id(n)).expect("add");
    }
    registry
}

fn bench_find_miss(c: &mut Criterion) {
    let registry = full_registry();
    let missing = id(9999);

    c.bench_function("registry_find_miss_255", |b| {
        b.iter(|| black_box(registry.find(black_box(&missing)).unwrap()));
    });
}

fn bench_find_last(c: &mut Criterion) {
    let registry = full_registry();
    let last = id(254);

    c.bench_function("registry_find_last_255", |b| {
        b.iter(|| black_box(registry.find(black_box(&last)).unwrap()));
    });
}

fn bench_remove_first(c: &mut Criterion) {
    c.bench_function("registry_remove_first_255", |b| {
        b.iter_batched(
            full_registry,
            |mut registry| {
                registry.remove(&id(0)).unwrap();
                registry
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_add_after_remove(c: &mut Criterion) {
    let mut registry = full_registry();
    registry.remove(&id(0)).unwrap();

    c.bench_function("registry_add_remove_cycle", |b| {
        b.iter(|| {
            registry.add(black_box(id(0))).unwrap();
            registry.remove(black_box(&id(0))).unwrap();
        });
    });
}

criterion_group!(
    benches,
    bench_find_miss,
    bench_find_last,
    bench_remove_first,
    bench_add_after_remove
);
criterion_main!(benches);
