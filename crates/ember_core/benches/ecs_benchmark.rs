//! # ECS Performance Benchmark
//!
//! Entity churn, component add/remove and a full movement tick at the
//! default world capacity.
//!
//! Run with: `cargo bench --package ember_core`

// Benchmarks don't need docs
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ember_core::{
    Component, Entity, FnSystem, ObjectPool, StackAllocator, World, MAX_ENTITIES,
};

#[derive(Clone, Copy)]
struct Position {
    x: f32,
    y: f32,
}
impl Component for Position {}

#[derive(Clone, Copy)]
struct Velocity {
    dx: f32,
    dy: f32,
}
impl Component for Velocity {}

fn populated_world(count: usize) -> (World, Vec<Entity>) {
    let mut world = World::new();
    world.register_component::<Position>();
    world.register_component::<Velocity>();

    let entities: Vec<Entity> = (0..count).map(|_| world.create_entity()).collect();
    for (i, &entity) in entities.iter().enumerate() {
        let f = i as f32;
        world.add(entity, Position { x: f, y: f });
        if i % 2 == 0 {
            world.add(entity, Velocity { dx: 0.1, dy: 0.2 });
        }
    }
    (world, entities)
}

/// Benchmark: Create and destroy every entity.
fn bench_entity_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("entity_churn");

    for count in [1_000, MAX_ENTITIES] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let mut world = World::new();
            let mut ids = Vec::with_capacity(count);
            b.iter(|| {
                ids.extend((0..count).map(|_| world.create_entity()));
                for id in ids.drain(..) {
                    world.destroy_entity(id);
                }
                black_box(world.alive_count())
            });
        });
    }

    group.finish();
}

/// Benchmark: Add then remove a component on every entity.
fn bench_add_remove(c: &mut Criterion) {
    let (mut world, entities) = populated_world(MAX_ENTITIES);
    let odd: Vec<Entity> = entities.iter().copied().skip(1).step_by(2).collect();

    c.bench_function("add_remove_velocity_5K", |b| {
        b.iter(|| {
            for &entity in &odd {
                world.add(entity, Velocity { dx: 1.0, dy: 1.0 });
            }
            for &entity in &odd {
                black_box(world.remove::<Velocity>(entity));
            }
        });
    });
}

/// Benchmark: One tick of a movement system over half the world.
fn bench_movement_tick(c: &mut Criterion) {
    let (mut world, _) = populated_world(MAX_ENTITIES);
    world.register_system_for::<(Position, Velocity), _>(
        FnSystem::new("movement", |world: &mut World, entities: &[Entity], dt| {
            for &entity in entities {
                let velocity = *world.get::<Velocity>(entity);
                let position = world.get_mut::<Position>(entity);
                position.x += velocity.dx * dt;
                position.y += velocity.dy * dt;
            }
        }),
        0,
    );

    c.bench_function("movement_tick_10K", |b| {
        b.iter(|| world.tick(black_box(0.016)));
    });
}

/// Benchmark: Query iteration versus raw slice access.
fn bench_queries(c: &mut Criterion) {
    let (world, _) = populated_world(MAX_ENTITIES);
    let mut group = c.benchmark_group("queries");

    group.bench_function("for_each_position_velocity", |b| {
        b.iter(|| {
            let mut sum = 0.0_f32;
            world.for_each::<(Position, Velocity)>(|_, (position, velocity)| {
                sum += position.x * velocity.dx;
            });
            black_box(sum)
        });
    });

    group.bench_function("raw_positions", |b| {
        b.iter(|| black_box(world.raw::<Position>().iter().map(|p| p.x).sum::<f32>()));
    });

    group.finish();
}

/// Benchmark: Allocator hot paths.
fn bench_allocators(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocators");

    let stack = StackAllocator::new(1 << 20, 16).expect("stack");
    group.bench_function("stack_scope_64x256", |b| {
        b.iter(|| {
            let scope = stack.scope();
            for _ in 0..64 {
                black_box(scope.push(256, 16));
            }
        });
    });

    let pool: ObjectPool<[f32; 4]> = ObjectPool::new(1024, false, 0).expect("pool");
    group.bench_function("object_pool_acquire_release_1K", |b| {
        let mut handles = Vec::with_capacity(1024);
        b.iter(|| {
            handles.extend((0..1024).filter_map(|_| pool.acquire([0.0; 4])));
            for handle in handles.drain(..) {
                black_box(pool.release(handle));
            }
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_entity_churn,
    bench_add_remove,
    bench_movement_tick,
    bench_queries,
    bench_allocators,
);
criterion_main!(benches);
