//! # Sample Maintenance Benchmark
//!
//! Every component change re-evaluates the entity against every sample, so
//! mutation cost grows with the number of samples in the world.
//!
//! Measures:
//! 1. Component add/remove round trip with 1, 16, 64 and 256 samples
//! 2. Backfill of a new sample over a populated world

#![allow(dead_code)]
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tessera_core::{Component, EcsWorld, Entity, EntityAspect, SampleFlags};

const ENTITY_COUNT: usize = 10_000;

#[derive(Clone, Copy)]
struct Position(f32);
impl Component for Position {}

#[derive(Clone, Copy)]
struct Marker;
impl Component for Marker {}

fn populated_world(sample_count: u32) -> (EcsWorld, Vec<tessera_core::EntitiesSample>) {
    let mut world = EcsWorld::new("bench").unwrap();
    world.reserve_entity_indices(ENTITY_COUNT);
    for i in 0..ENTITY_COUNT {
        #[allow(clippy::cast_precision_loss)]
        let entity = Entity::new().with_component(Position(i as f32));
        world.add_entity(entity).ok();
    }

    // Distinct aspects over dynamic ids so every sample is a separate cache entry.
    let marker = world.component_registry_mut().register::<Marker>();
    let samples = (0..sample_count)
        .map(|i| {
            let filler = world
                .component_registry_mut()
                .register_dynamic(&format!("filler_{i}"), &[]);
            world.request_sample(EntityAspect::any_of([marker, filler]), SampleFlags::NONE)
        })
        .collect();
    (world, samples)
}

fn bench_component_change(c: &mut Criterion) {
    let mut group = c.benchmark_group("component_change_per_sample_count");

    for sample_count in [1u32, 16, 64, 256] {
        let (mut world, samples) = populated_world(sample_count);
        let ids = world.entity_ids();

        group.bench_with_input(
            BenchmarkId::new("add_remove_marker", sample_count),
            &sample_count,
            |b, _| {
                let mut cursor = 0;
                b.iter(|| {
                    let id = ids[cursor % ids.len()];
                    cursor += 1;
                    world.add_component(id, Marker).ok();
                    black_box(world.remove_component::<Marker>(id));
                });
            },
        );
        black_box(samples.len());
    }

    group.finish();
}

fn bench_sample_backfill(c: &mut Criterion) {
    let (mut world, _samples) = populated_world(0);
    let position = world.component_registry_mut().register::<Position>();

    c.bench_function("sample_backfill_10k", |b| {
        b.iter(|| {
            let sample = world.request_sample(
                EntityAspect::all_of([position]),
                SampleFlags::INCLUDE_INACTIVE,
            );
            black_box(sample.len());
            drop(sample);
            // Forces the unreferenced sample out of the cache.
            world.update(0.0).ok();
        });
    });
}

criterion_group!(benches, bench_component_change, bench_sample_backfill);
criterion_main!(benches);
