//! # ECS Frame Benchmark
//!
//! Measures one frame of entity updates with colliders, the shape of a busy
//! gameplay frame: a full note pool tested against two sabers.
//!
//! Run with: `cargo bench --package saberlink_core`

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use saberlink_core::{
    ColliderComponent, Entity, EntityRegistry, Geometry, Material, Mesh, SceneGraph,
};
use saberlink_shared::Vec3;

fn populated(notes: usize) -> (SceneGraph, EntityRegistry) {
    let mut scene = SceneGraph::new();
    let mut registry = EntityRegistry::new();

    let mut sabers = Vec::new();
    for x in [-0.2, 0.2] {
        let mesh = Mesh::new(Geometry::cuboid(Vec3::new(0.02, 0.02, 2.0)), Material::new(0));
        let mut saber = Entity::with_mesh(&mut scene, "saber", mesh);
        saber.set_position(Vec3::new(x, 1.0, -1.0));
        saber.add_component(ColliderComponent::new());
        sabers.push(registry.add_entity(&mut scene, saber, None).expect("saber"));
    }

    for i in 0..notes {
        let mesh = Mesh::new(Geometry::cuboid(Vec3::new(0.4, 0.4, 0.4)), Material::new(0));
        let mut note = Entity::with_mesh(&mut scene, "note", mesh);
        note.set_position(Vec3::new((i % 4) as f32 * 0.5 - 0.75, 1.0, -(i as f32)));
        let mut collider = ColliderComponent::with_callback(|hit| {
            black_box(hit);
        });
        collider.set_collidables(sabers.iter().copied());
        note.add_component(collider);
        registry.add_entity(&mut scene, note, None).expect("note");
    }

    (scene, registry)
}

fn bench_frame_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_update");

    for notes in [20, 200, 2_000] {
        group.bench_with_input(BenchmarkId::from_parameter(notes), &notes, |b, &notes| {
            let (mut scene, mut registry) = populated(notes);
            b.iter(|| {
                registry.update(&mut scene, black_box(1.0 / 90.0));
            });
        });
    }

    group.finish();
}

fn bench_scene_stats(c: &mut Criterion) {
    let (scene, _registry) = populated(2_000);
    c.bench_function("scene_stats_2k", |b| {
        b.iter(|| black_box(scene.stats()));
    });
}

criterion_group!(benches, bench_frame_update, bench_scene_stats);
criterion_main!(benches);
