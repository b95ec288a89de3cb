//! # Entity Component System
//!
//! Composition instead of inheritance:
//!
//! - An [`Entity`] is a scene node plus components and child entities
//! - A [`Component`] is a behavior unit keyed by [`ComponentKind`]
//! - A [`System`] owns an [`EntityRegistry`] and drives it every frame
//!
//! Update order is fixed: system, then entity, then component, then child
//! entity. Everything runs on the frame thread.

mod collider;
mod component;
mod entity;
mod registry;
mod system;
mod transform;

pub use collider::{ColliderComponent, CollisionCallback, CollisionHit};
pub use component::{Component, ComponentContext, ComponentKind};
pub use entity::{Entity, EntityId};
pub use registry::EntityRegistry;
pub use system::{FrameContext, System};
pub use transform::TransformComponent;
