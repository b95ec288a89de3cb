//! # Collider Component
//!
//! Axis-aligned bounding boxes in world space, tested pairwise against a list
//! of collidable entities. No spatial partitioning: collider counts are
//! bounded by pool sizes.
//!
//! Each collider publishes its bounds into the scene graph so that other
//! colliders can test against it without borrowing the owning entity.

use super::{Component, ComponentContext, ComponentKind, EntityId};
use crate::scene::{NodeId, SceneGraph};
use saberlink_shared::Aabb;
use std::any::Any;

/// A positive intersection test.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CollisionHit {
    /// Entity whose collider ran the test.
    pub collider: EntityId,
    /// Collidable entity it intersected.
    pub other: EntityId,
}

/// Callback invoked once per hit, in collidable order.
pub type CollisionCallback = Box<dyn FnMut(CollisionHit) + Send>;

/// World-space AABB collider.
#[derive(Default)]
pub struct ColliderComponent {
    /// Insertion-ordered, no duplicates.
    collidables: Vec<EntityId>,
    on_collide: Option<CollisionCallback>,
    bounds: Option<Aabb>,
    hits: Vec<EntityId>,
}

impl ColliderComponent {
    /// Collider with no collidables and no callback.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collider that reports hits to `callback`.
    #[must_use]
    pub fn with_callback(callback: impl FnMut(CollisionHit) + Send + 'static) -> Self {
        Self {
            on_collide: Some(Box::new(callback)),
            ..Self::default()
        }
    }

    /// Replaces the collision callback.
    pub fn set_on_collide(&mut self, callback: impl FnMut(CollisionHit) + Send + 'static) {
        self.on_collide = Some(Box::new(callback));
    }

    /// Removes the collision callback. Hits are still recorded.
    pub fn clear_on_collide(&mut self) {
        self.on_collide = None;
    }

    /// Replaces the collidable set. Duplicates keep their first position.
    pub fn set_collidables(&mut self, entities: impl IntoIterator<Item = EntityId>) {
        self.collidables.clear();
        for entity in entities {
            self.add_collidable(entity);
        }
    }

    /// Appends a collidable. Returns false if it was already present.
    pub fn add_collidable(&mut self, entity: EntityId) -> bool {
        if self.collidables.contains(&entity) {
            return false;
        }
        self.collidables.push(entity);
        true
    }

    /// Removes a collidable. Returns whether it was present.
    pub fn remove_collidable(&mut self, entity: EntityId) -> bool {
        let before = self.collidables.len();
        self.collidables.retain(|&e| e != entity);
        self.collidables.len() != before
    }

    /// Collidables in test order.
    #[must_use]
    pub fn collidables(&self) -> &[EntityId] {
        &self.collidables
    }

    /// Bounds computed by the last update. `None` while hidden or mesh-less.
    #[must_use]
    pub const fn bounds(&self) -> Option<Aabb> {
        self.bounds
    }

    /// Collidables hit during the last update, in test order.
    #[must_use]
    pub fn last_hits(&self) -> &[EntityId] {
        &self.hits
    }
}

impl std::fmt::Debug for ColliderComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColliderComponent")
            .field("collidables", &self.collidables)
            .field("bounds", &self.bounds)
            .field("has_callback", &self.on_collide.is_some())
            .finish_non_exhaustive()
    }
}

/// Attached to the scene and drawn.
fn is_active(scene: &SceneGraph, node: NodeId) -> bool {
    scene.is_in_scene(node) && scene.is_effectively_visible(node)
}

impl Component for ColliderComponent {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Collider
    }

    fn update(&mut self, ctx: &mut ComponentContext<'_>, _delta: f32) {
        let owner = ctx.owner;
        let node = owner.node();
        let scene = &mut *ctx.scene;

        self.hits.clear();
        self.bounds = if is_active(scene, node) {
            scene
                .mesh(node)
                .map(|mesh| mesh.geometry.bounds())
                .zip(scene.world_matrix(node))
                .map(|(local, world)| local.transformed(&world))
        } else {
            None
        };
        scene.publish_bounds(node, self.bounds);

        let Some(own) = self.bounds else {
            return;
        };

        for &other in &self.collidables {
            if other == owner || !is_active(scene, other.node()) {
                continue;
            }
            let Some(theirs) = scene.bounds(other.node()) else {
                continue;
            };
            if own.intersects(&theirs) {
                self.hits.push(other);
                if let Some(callback) = self.on_collide.as_mut() {
                    callback(CollisionHit {
                        collider: owner,
                        other,
                    });
                }
            }
        }
    }

    fn dispose(&mut self, ctx: &mut ComponentContext<'_>) {
        ctx.scene.publish_bounds(ctx.owner.node(), None);
        self.collidables.clear();
        self.hits.clear();
        self.on_collide = None;
        self.bounds = None;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::Entity;
    use crate::scene::{Geometry, Material, Mesh};
    use saberlink_shared::Vec3;
    use std::sync::{Arc, Mutex};

    fn boxed(scene: &mut SceneGraph, name: &str, x: f32) -> Entity {
        let mesh = Mesh::new(Geometry::cuboid(Vec3::ONE), Material::new(0));
        let entity = Entity::with_mesh(scene, name, mesh);
        let root = scene.root();
        scene.attach(root, entity.node()).unwrap();
        scene.transform_mut(entity.node()).unwrap().position = Vec3::new(x, 0.0, 0.0);
        entity
    }

    fn with_collider(mut entity: Entity, collider: ColliderComponent) -> Entity {
        entity.add_component(collider);
        entity
    }

    #[test]
    fn test_hits_fire_in_insertion_order() {
        let mut scene = SceneGraph::new();
        let mut a = with_collider(boxed(&mut scene, "a", 0.0), ColliderComponent::new());
        let mut b = with_collider(boxed(&mut scene, "b", 0.5), ColliderComponent::new());
        let mut far = with_collider(boxed(&mut scene, "far", 9.0), ColliderComponent::new());
        a.update(&mut scene, 0.0);
        b.update(&mut scene, 0.0);
        far.update(&mut scene, 0.0);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut probe = boxed(&mut scene, "probe", 0.2);
        let mut collider = ColliderComponent::with_callback(move |hit| sink.lock().unwrap().push(hit.other));
        collider.set_collidables([b.id(), far.id(), a.id(), b.id()]);
        assert_eq!(collider.collidables(), &[b.id(), far.id(), a.id()]);
        probe.add_component(collider);

        probe.update(&mut scene, 0.0);

        assert_eq!(*seen.lock().unwrap(), vec![b.id(), a.id()]);
        let hits = probe.get::<ColliderComponent>().unwrap().last_hits().to_vec();
        assert_eq!(hits, vec![b.id(), a.id()]);
    }

    #[test]
    fn test_hidden_collidable_is_ignored() {
        let mut scene = SceneGraph::new();
        let mut target = with_collider(boxed(&mut scene, "target", 0.0), ColliderComponent::new());
        target.update(&mut scene, 0.0);
        scene.set_visible(target.node(), false).unwrap();

        let mut collider = ColliderComponent::new();
        collider.add_collidable(target.id());
        let mut probe = with_collider(boxed(&mut scene, "probe", 0.0), collider);
        probe.update(&mut scene, 0.0);

        assert!(probe.get::<ColliderComponent>().unwrap().last_hits().is_empty());
    }

    #[test]
    fn test_hidden_collider_publishes_nothing() {
        let mut scene = SceneGraph::new();
        let mut entity = with_collider(boxed(&mut scene, "e", 0.0), ColliderComponent::new());
        entity.update(&mut scene, 0.0);
        assert!(scene.bounds(entity.node()).is_some());

        scene.set_visible(entity.node(), false).unwrap();
        entity.update(&mut scene, 0.0);
        assert!(scene.bounds(entity.node()).is_none());
        assert!(entity.get::<ColliderComponent>().unwrap().bounds().is_none());
    }
}
