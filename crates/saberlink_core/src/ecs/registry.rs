//! # Entity Registry
//!
//! The entity map every system owns. Adding an entity attaches its node into
//! the scene; removing it detaches the node and hands the entity back.

use super::{Entity, EntityId};
use crate::error::{CoreError, CoreResult};
use crate::scene::{NodeId, SceneGraph};
use std::collections::BTreeMap;

/// Entities of one system, iterated in id order.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    entities: BTreeMap<EntityId, Entity>,
}

impl EntityRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches the entity's node under `parent` (or the scene root) and
    /// registers it.
    ///
    /// # Errors
    ///
    /// Duplicate ids, stale nodes or cyclic attachment. The entity is
    /// dropped undisposed in that case, so callers that care should check
    /// [`EntityRegistry::contains`] first.
    pub fn add_entity(
        &mut self,
        scene: &mut SceneGraph,
        entity: Entity,
        parent: Option<NodeId>,
    ) -> CoreResult<EntityId> {
        let id = entity.id();
        if self.entities.contains_key(&id) {
            return Err(CoreError::DuplicateEntity(id));
        }
        let parent = parent.unwrap_or(scene.root());
        scene.attach(parent, entity.node())?;
        self.entities.insert(id, entity);
        Ok(id)
    }

    /// Detaches the entity's node and unregisters it. The entity is not
    /// disposed.
    pub fn remove_entity(&mut self, scene: &mut SceneGraph, id: EntityId) -> Option<Entity> {
        let entity = self.entities.remove(&id)?;
        if let Err(err) = scene.detach(entity.node()) {
            tracing::debug!(entity = %id, %err, "removed entity had no live node");
        }
        Some(entity)
    }

    /// Entity by id.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Mutable entity by id.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Whether the id is registered.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Registered ids.
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.keys().copied()
    }

    /// Registered entities.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Number of registered entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// True when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Updates every entity.
    pub fn update(&mut self, scene: &mut SceneGraph, delta: f32) {
        for entity in self.entities.values_mut() {
            entity.update(scene, delta);
        }
    }

    /// Disposes and unregisters every entity.
    pub fn dispose(&mut self, scene: &mut SceneGraph) {
        for entity in self.entities.values_mut() {
            entity.dispose(scene);
        }
        self.entities.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_attaches_to_root_or_parent() {
        let mut scene = SceneGraph::new();
        let mut registry = EntityRegistry::new();
        let camera = scene.spawn("camera");
        let root = scene.root();
        scene.attach(root, camera).unwrap();

        let a = Entity::new(&mut scene, "a");
        let b = Entity::new(&mut scene, "b");
        let a = registry.add_entity(&mut scene, a, None).unwrap();
        let b = registry.add_entity(&mut scene, b, Some(camera)).unwrap();

        assert_eq!(scene.parent(a.node()), Some(root));
        assert_eq!(scene.parent(b.node()), Some(camera));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_remove_detaches_without_disposing() {
        let mut scene = SceneGraph::new();
        let mut registry = EntityRegistry::new();
        let entity = Entity::new(&mut scene, "e");
        let id = registry.add_entity(&mut scene, entity, None).unwrap();

        let entity = registry.remove_entity(&mut scene, id).unwrap();
        assert!(!entity.is_disposed());
        assert!(!scene.is_in_scene(id.node()));
        assert!(registry.remove_entity(&mut scene, id).is_none());

        // Can be re-added later
        registry.add_entity(&mut scene, entity, None).unwrap();
        assert!(scene.is_in_scene(id.node()));
    }

    #[test]
    fn test_dispose_clears_everything() {
        let mut scene = SceneGraph::new();
        let mut registry = EntityRegistry::new();
        for name in ["a", "b", "c"] {
            let entity = Entity::new(&mut scene, name);
            registry.add_entity(&mut scene, entity, None).unwrap();
        }

        registry.dispose(&mut scene);
        assert!(registry.is_empty());
        assert!(scene.is_empty());
    }
}
