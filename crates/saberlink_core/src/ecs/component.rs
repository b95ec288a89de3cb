//! # Component System
//!
//! Components are behavior units owned by exactly one entity. They see their
//! owner only through a [`ComponentContext`], never through a back-pointer.

use super::EntityId;
use crate::scene::SceneGraph;
use std::any::Any;

/// Component slot identifier.
///
/// An entity holds at most one component per kind. Components run in
/// declaration order, so movement settles before colliders sample bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ComponentKind {
    /// Local position / rotation / scale.
    Transform,
    /// Pose driven by an input device.
    Controller,
    /// Self-propelled movement.
    Motion,
    /// Saber identity (side, color).
    Saber,
    /// Bounding-volume collision checks.
    Collider,
    /// Diagnostic display.
    Display,
}

/// What a component sees of its owner during a frame.
pub struct ComponentContext<'a> {
    /// Owning entity.
    pub owner: EntityId,
    /// Scene containing the owner's node.
    pub scene: &'a mut SceneGraph,
}

/// Behavior attached to an entity.
///
/// # Example
///
/// ```rust,ignore
/// struct Spin { speed: f32 }
///
/// impl Component for Spin {
///     fn kind(&self) -> ComponentKind { ComponentKind::Motion }
///     fn update(&mut self, ctx: &mut ComponentContext<'_>, delta: f32) {
///         if let Some(t) = ctx.scene.transform_mut(ctx.owner.node()) {
///             t.rotation = t.rotation * Quaternion::from_euler_xyz(0.0, self.speed * delta, 0.0);
///         }
///     }
///     fn as_any(&self) -> &dyn Any { self }
///     fn as_any_mut(&mut self) -> &mut dyn Any { self }
/// }
/// ```
pub trait Component: Any + Send {
    /// Slot this component occupies.
    fn kind(&self) -> ComponentKind;

    /// Advances the component by `delta` seconds.
    fn update(&mut self, ctx: &mut ComponentContext<'_>, delta: f32);

    /// Releases component-owned resources. Called once, before the owner's
    /// node is released.
    fn dispose(&mut self, _ctx: &mut ComponentContext<'_>) {}

    /// Upcast for typed lookup.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for typed lookup.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
