//! # Scene Graph Arena
//!
//! Nodes live in a slot vector with a free list, the same way entity storage
//! recycles indices: despawning bumps the slot generation so old handles go
//! stale instead of pointing at whatever reuses the slot.

use super::{Mesh, NodeId};
use crate::error::{CoreError, CoreResult};
use saberlink_shared::{Aabb, Mat4, Transform};

#[derive(Debug)]
struct Node {
    name: String,
    transform: Transform,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    visible: bool,
    mesh: Option<Mesh>,
    /// World-space collider bounds published by the owning entity.
    bounds: Option<Aabb>,
}

impl Node {
    fn new(name: String, mesh: Option<Mesh>) -> Self {
        Self {
            name,
            transform: Transform::IDENTITY,
            parent: None,
            children: Vec::new(),
            visible: true,
            mesh,
            bounds: None,
        }
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Renderer-facing counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SceneStats {
    /// Live nodes, root included.
    pub nodes: usize,
    /// Geometries not yet released.
    pub geometries: usize,
    /// Materials not yet released.
    pub materials: usize,
    /// Meshes that would be drawn: in the scene, visible, not released.
    pub visible_meshes: usize,
    /// Geometries released since creation.
    pub released_geometries: u64,
    /// Materials released since creation.
    pub released_materials: u64,
}

/// Arena of scene nodes rooted at a single scene node.
#[derive(Debug)]
pub struct SceneGraph {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
    root: NodeId,
    alive: usize,
    released_geometries: u64,
    released_materials: u64,
}

impl SceneGraph {
    /// Creates a scene containing only the root node.
    #[must_use]
    pub fn new() -> Self {
        let mut scene = Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            root: NodeId::new(0, 0),
            alive: 0,
            released_geometries: 0,
            released_materials: 0,
        };
        scene.root = scene.insert(Node::new("scene".to_owned(), None));
        scene
    }

    fn insert(&mut self, node: Node) -> NodeId {
        self.alive += 1;
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeId::new(index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId::new(index, 0)
    }

    fn node(&self, id: NodeId) -> CoreResult<&Node> {
        self.slots
            .get(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.node.as_ref())
            .ok_or(CoreError::StaleNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> CoreResult<&mut Node> {
        self.slots
            .get_mut(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.node.as_mut())
            .ok_or(CoreError::StaleNode(id))
    }

    /// The scene root.
    #[inline]
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes, root included.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.alive
    }

    /// True when only the root exists.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.alive <= 1
    }

    /// Whether the handle still refers to a live node.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_ok()
    }

    /// Creates a detached group node.
    pub fn spawn(&mut self, name: impl Into<String>) -> NodeId {
        self.insert(Node::new(name.into(), None))
    }

    /// Creates a detached node carrying a mesh.
    pub fn spawn_mesh(&mut self, name: impl Into<String>, mesh: Mesh) -> NodeId {
        self.insert(Node::new(name.into(), Some(mesh)))
    }

    /// Debug name of a node.
    #[must_use]
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.node(id).ok().map(|n| n.name.as_str())
    }

    /// Parent of a node, `None` when detached or stale.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).ok().and_then(|n| n.parent)
    }

    /// Direct children in attach order.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map_or(&[], |n| n.children.as_slice())
    }

    /// True if `ancestor` is `node` or one of its parents.
    #[must_use]
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Whether the node is reachable from the root.
    #[must_use]
    pub fn is_in_scene(&self, id: NodeId) -> bool {
        self.contains(id) && self.is_ancestor(self.root, id)
    }

    /// Moves `child` under `parent`, detaching it from its previous parent.
    ///
    /// # Errors
    ///
    /// Stale handles, moving the root, or attaching a node below itself.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) -> CoreResult<()> {
        if child == self.root {
            return Err(CoreError::RootImmutable);
        }
        self.node(parent)?;
        self.node(child)?;
        if self.is_ancestor(child, parent) {
            return Err(CoreError::CyclicAttach { parent, child });
        }

        self.detach(child)?;
        self.node_mut(child)?.parent = Some(parent);
        self.node_mut(parent)?.children.push(child);
        Ok(())
    }

    /// Removes a node from its parent. Returns whether it had one.
    ///
    /// # Errors
    ///
    /// Stale handle or the root.
    pub fn detach(&mut self, child: NodeId) -> CoreResult<bool> {
        if child == self.root {
            return Err(CoreError::RootImmutable);
        }
        let Some(parent) = self.node_mut(child)?.parent.take() else {
            return Ok(false);
        };
        if let Ok(p) = self.node_mut(parent) {
            p.children.retain(|&c| c != child);
        }
        Ok(true)
    }

    /// Node and all of its descendants, parents before children.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Ok(node) = self.node(current) else {
                continue;
            };
            out.push(current);
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    /// Detaches and frees a node and its whole subtree.
    ///
    /// # Returns
    ///
    /// Number of nodes freed.
    ///
    /// # Errors
    ///
    /// Stale handle or the root.
    pub fn despawn(&mut self, id: NodeId) -> CoreResult<usize> {
        self.detach(id)?;
        let doomed = self.descendants(id);
        for node in &doomed {
            let slot = &mut self.slots[node.index() as usize];
            slot.node = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free_list.push(node.index());
        }
        self.alive -= doomed.len();
        Ok(doomed.len())
    }

    /// Local transform.
    #[must_use]
    pub fn transform(&self, id: NodeId) -> Option<&Transform> {
        self.node(id).ok().map(|n| &n.transform)
    }

    /// Mutable local transform.
    pub fn transform_mut(&mut self, id: NodeId) -> Option<&mut Transform> {
        self.node_mut(id).ok().map(|n| &mut n.transform)
    }

    /// World matrix: ancestors' local matrices applied root first.
    #[must_use]
    pub fn world_matrix(&self, id: NodeId) -> Option<Mat4> {
        let mut matrix = self.node(id).ok()?.transform.to_matrix();
        let mut current = self.parent(id);
        while let Some(parent) = current {
            let node = self.node(parent).ok()?;
            matrix = node.transform.to_matrix().multiply(&matrix);
            current = node.parent;
        }
        Some(matrix)
    }

    /// Sets the node's own visibility flag.
    ///
    /// # Errors
    ///
    /// Stale handle.
    pub fn set_visible(&mut self, id: NodeId, visible: bool) -> CoreResult<()> {
        self.node_mut(id)?.visible = visible;
        Ok(())
    }

    /// The node's own visibility flag.
    #[must_use]
    pub fn is_visible(&self, id: NodeId) -> bool {
        self.node(id).is_ok_and(|n| n.visible)
    }

    /// Visible itself and through every ancestor.
    #[must_use]
    pub fn is_effectively_visible(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            let Ok(n) = self.node(node) else {
                return false;
            };
            if !n.visible {
                return false;
            }
            current = n.parent;
        }
        true
    }

    /// Mesh carried by the node.
    #[must_use]
    pub fn mesh(&self, id: NodeId) -> Option<&Mesh> {
        self.node(id).ok().and_then(|n| n.mesh.as_ref())
    }

    /// Mutable mesh carried by the node.
    pub fn mesh_mut(&mut self, id: NodeId) -> Option<&mut Mesh> {
        self.node_mut(id).ok().and_then(|n| n.mesh.as_mut())
    }

    /// Frees geometry and materials of every mesh in the subtree.
    ///
    /// # Returns
    ///
    /// Number of resources released by this call. Already released
    /// resources are not counted again.
    pub fn release(&mut self, id: NodeId) -> usize {
        let mut released = 0;
        for node in self.descendants(id) {
            let Some(mesh) = self.mesh_mut(node) else {
                continue;
            };
            let geometry = u64::from(mesh.geometry.release());
            let materials = mesh.materials.iter_mut().map(|m| u64::from(m.release())).sum::<u64>();
            self.released_geometries += geometry;
            self.released_materials += materials;
            released += (geometry + materials) as usize;
        }
        released
    }

    /// Publishes (or clears) the node's world-space collider bounds.
    pub fn publish_bounds(&mut self, id: NodeId, bounds: Option<Aabb>) {
        if let Ok(node) = self.node_mut(id) {
            node.bounds = bounds;
        }
    }

    /// Last published collider bounds.
    #[must_use]
    pub fn bounds(&self, id: NodeId) -> Option<Aabb> {
        self.node(id).ok().and_then(|n| n.bounds)
    }

    /// Collects renderer counters.
    #[must_use]
    pub fn stats(&self) -> SceneStats {
        let mut stats = SceneStats {
            nodes: self.alive,
            released_geometries: self.released_geometries,
            released_materials: self.released_materials,
            ..SceneStats::default()
        };
        for (index, slot) in self.slots.iter().enumerate() {
            let Some(mesh) = slot.node.as_ref().and_then(|n| n.mesh.as_ref()) else {
                continue;
            };
            let id = NodeId::new(index as u32, slot.generation);
            if !mesh.geometry.is_released() {
                stats.geometries += 1;
                if self.is_in_scene(id) && self.is_effectively_visible(id) {
                    stats.visible_meshes += 1;
                }
            }
            stats.materials += mesh.materials.iter().filter(|m| !m.is_released()).count();
        }
        stats
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}
