//! # SABERLINK Core
//!
//! Scene graph, entity / component / system framework and object pools.
//!
//! ## Architecture Rules
//!
//! 1. **Single frame thread** - Nothing here is shared across threads
//! 2. **Composition** - Entities differ by the components they carry
//! 3. **Explicit lifetimes** - Every entity is disposed exactly once
//!
//! ## Example
//!
//! ```rust,ignore
//! use saberlink_core::{Entity, EntityRegistry, SceneGraph};
//!
//! let mut scene = SceneGraph::new();
//! let mut registry = EntityRegistry::new();
//! let floor = Entity::new(&mut scene, "floor");
//! registry.add_entity(&mut scene, floor, None)?;
//! registry.update(&mut scene, 1.0 / 60.0);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod ecs;
pub mod error;
pub mod memory;
pub mod scene;

pub use ecs::{
    ColliderComponent, CollisionCallback, CollisionHit, Component, ComponentContext,
    ComponentKind, Entity, EntityId, EntityRegistry, FrameContext, System, TransformComponent,
};
pub use error::{CoreError, CoreResult};
pub use memory::{ObjectPool, PoolHandle, Poolable};
pub use scene::{Geometry, Material, Mesh, NodeId, SceneGraph, SceneStats, Shape};
