//! # Entity Management
//!
//! An entity is one scene node plus a set of components and owned child
//! entities. Its identity is the handle of its node.

use super::{Component, ComponentContext, ComponentKind, TransformComponent};
use crate::error::CoreResult;
use crate::scene::{Mesh, NodeId, SceneGraph};
use saberlink_shared::Vec3;
use std::collections::BTreeMap;
use std::fmt;

/// Unique identifier for an entity. Wraps the entity's scene node handle,
/// so it goes stale together with the node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct EntityId(NodeId);

impl EntityId {
    /// Identity of the entity owning `node`.
    #[inline]
    #[must_use]
    pub const fn from_node(node: NodeId) -> Self {
        Self(node)
    }

    /// The entity's scene node.
    #[inline]
    #[must_use]
    pub const fn node(self) -> NodeId {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

/// A game object.
///
/// Every entity starts with a [`TransformComponent`]. Component kinds are
/// unique: adding a second component of the same kind replaces the first.
pub struct Entity {
    id: EntityId,
    components: BTreeMap<ComponentKind, Box<dyn Component>>,
    children: Vec<Entity>,
    disposed: bool,
}

impl Entity {
    /// Creates an entity around a new, detached group node.
    pub fn new(scene: &mut SceneGraph, name: &str) -> Self {
        Self::from_node(scene.spawn(name))
    }

    /// Creates an entity around a new, detached mesh node.
    pub fn with_mesh(scene: &mut SceneGraph, name: &str, mesh: Mesh) -> Self {
        Self::from_node(scene.spawn_mesh(name, mesh))
    }

    fn from_node(node: NodeId) -> Self {
        let mut entity = Self {
            id: EntityId::from_node(node),
            components: BTreeMap::new(),
            children: Vec::new(),
            disposed: false,
        };
        entity.add_component(TransformComponent::new());
        entity
    }

    /// Entity id.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Scene node owned by this entity.
    #[inline]
    #[must_use]
    pub const fn node(&self) -> NodeId {
        self.id.node()
    }

    /// Whether [`Entity::dispose`] has run.
    #[inline]
    #[must_use]
    pub const fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Attaches a component.
    ///
    /// # Returns
    ///
    /// The component previously occupying the same slot, if any.
    pub fn add_component<C: Component>(&mut self, component: C) -> Option<Box<dyn Component>> {
        self.add_boxed(Box::new(component))
    }

    /// Attaches an already boxed component.
    pub fn add_boxed(&mut self, component: Box<dyn Component>) -> Option<Box<dyn Component>> {
        self.components.insert(component.kind(), component)
    }

    /// Detaches a component without disposing it.
    pub fn remove_component(&mut self, kind: ComponentKind) -> Option<Box<dyn Component>> {
        self.components.remove(&kind)
    }

    /// Whether a component of this kind is attached.
    #[must_use]
    pub fn has_component(&self, kind: ComponentKind) -> bool {
        self.components.contains_key(&kind)
    }

    /// Number of attached components.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Component by kind.
    #[must_use]
    pub fn component(&self, kind: ComponentKind) -> Option<&(dyn Component + 'static)> {
        self.components.get(&kind).map(Box::as_ref)
    }

    /// Mutable component by kind.
    pub fn component_mut(&mut self, kind: ComponentKind) -> Option<&mut (dyn Component + 'static)> {
        self.components.get_mut(&kind).map(Box::as_mut)
    }

    /// Component by concrete type.
    #[must_use]
    pub fn get<C: Component>(&self) -> Option<&C> {
        self.components
            .values()
            .find_map(|c| c.as_any().downcast_ref::<C>())
    }

    /// Mutable component by concrete type.
    pub fn get_mut<C: Component>(&mut self) -> Option<&mut C> {
        self.components
            .values_mut()
            .find_map(|c| c.as_any_mut().downcast_mut::<C>())
    }

    /// Transform component.
    #[must_use]
    pub fn transform(&self) -> Option<&TransformComponent> {
        self.get::<TransformComponent>()
    }

    fn edit_transform(&mut self, edit: impl FnOnce(&mut TransformComponent)) {
        if let Some(transform) = self.get_mut::<TransformComponent>() {
            edit(transform);
            return;
        }
        let mut transform = TransformComponent::new();
        edit(&mut transform);
        self.add_component(transform);
    }

    /// Sets the position applied on the next update.
    pub fn set_position(&mut self, position: Vec3) {
        self.edit_transform(|t| t.set_position(position));
    }

    /// Sets the Euler rotation applied on the next update.
    pub fn set_rotation(&mut self, rotation: Vec3) {
        self.edit_transform(|t| t.set_rotation(rotation));
    }

    /// Sets the scale applied on the next update.
    pub fn set_scale(&mut self, scale: Vec3) {
        self.edit_transform(|t| t.set_scale(scale));
    }

    /// Attaches `child` under this entity's node and takes ownership of it.
    ///
    /// # Errors
    ///
    /// Stale nodes or an attach that would create a cycle.
    pub fn add_child(&mut self, scene: &mut SceneGraph, child: Entity) -> CoreResult<EntityId> {
        scene.attach(self.node(), child.node())?;
        let id = child.id();
        self.children.push(child);
        Ok(id)
    }

    /// Detaches a child from the scene and hands it back.
    pub fn remove_child(&mut self, scene: &mut SceneGraph, id: EntityId) -> Option<Entity> {
        let index = self.children.iter().position(|c| c.id() == id)?;
        let child = self.children.remove(index);
        if let Err(err) = scene.detach(child.node()) {
            tracing::debug!(entity = %id, %err, "removed child had no live node");
        }
        Some(child)
    }

    /// Child by id.
    #[must_use]
    pub fn child(&self, id: EntityId) -> Option<&Entity> {
        self.children.iter().find(|c| c.id() == id)
    }

    /// Mutable child by id.
    pub fn child_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.children.iter_mut().find(|c| c.id() == id)
    }

    /// Children in insertion order.
    #[must_use]
    pub fn children(&self) -> &[Entity] {
        &self.children
    }

    /// Mutable children in insertion order.
    pub fn children_mut(&mut self) -> &mut [Entity] {
        &mut self.children
    }

    /// Runs every component, then every child.
    pub fn update(&mut self, scene: &mut SceneGraph, delta: f32) {
        if self.disposed {
            return;
        }
        let mut ctx = ComponentContext {
            owner: self.id,
            scene: &mut *scene,
        };
        for component in self.components.values_mut() {
            component.update(&mut ctx, delta);
        }
        for child in &mut self.children {
            child.update(scene, delta);
        }
    }

    /// Disposes children, then components, then detaches the node and
    /// releases every mesh below it. Safe to call more than once.
    pub fn dispose(&mut self, scene: &mut SceneGraph) {
        if std::mem::replace(&mut self.disposed, true) {
            return;
        }
        for child in &mut self.children {
            child.dispose(scene);
        }
        self.children.clear();

        let mut ctx = ComponentContext {
            owner: self.id,
            scene: &mut *scene,
        };
        for component in self.components.values_mut() {
            component.dispose(&mut ctx);
        }
        self.components.clear();

        let node = self.node();
        if !scene.contains(node) {
            return;
        }
        let released = scene.release(node);
        match scene.despawn(node) {
            Ok(nodes) => tracing::trace!(entity = %self.id, nodes, released, "entity disposed"),
            Err(err) => tracing::debug!(entity = %self.id, %err, "entity node not despawned"),
        }
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("components", &self.components.keys().collect::<Vec<_>>())
            .field("children", &self.children.len())
            .field("disposed", &self.disposed)
            .finish()
    }
}
