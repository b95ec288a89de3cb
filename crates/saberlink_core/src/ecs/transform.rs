//! Transform component.

use super::{Component, ComponentContext, ComponentKind};
use saberlink_shared::{Quaternion, Vec3};
use std::any::Any;

/// Position, Euler rotation (XYZ order, radians) and scale.
///
/// Setters only record the new value; it is written to the owner's node on
/// the next update, before any other component runs.
#[derive(Clone, Debug, PartialEq)]
pub struct TransformComponent {
    position: Vec3,
    rotation: Vec3,
    scale: Vec3,
    dirty: bool,
}

impl TransformComponent {
    /// Identity values. Nothing is written to the node until a setter runs.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            dirty: false,
        }
    }

    /// Pending or applied position.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// Pending or applied Euler rotation.
    #[must_use]
    pub const fn rotation(&self) -> Vec3 {
        self.rotation
    }

    /// Pending or applied scale.
    #[must_use]
    pub const fn scale(&self) -> Vec3 {
        self.scale
    }

    /// Whether a value is waiting to be applied.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Sets position.
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.dirty = true;
    }

    /// Sets Euler rotation.
    pub fn set_rotation(&mut self, rotation: Vec3) {
        self.rotation = rotation;
        self.dirty = true;
    }

    /// Sets scale.
    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
        self.dirty = true;
    }
}

impl Default for TransformComponent {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for TransformComponent {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Transform
    }

    fn update(&mut self, ctx: &mut ComponentContext<'_>, _delta: f32) {
        if !self.dirty {
            return;
        }
        if let Some(transform) = ctx.scene.transform_mut(ctx.owner.node()) {
            transform.position = self.position;
            transform.rotation =
                Quaternion::from_euler_xyz(self.rotation.x, self.rotation.y, self.rotation.z);
            transform.scale = self.scale;
            self.dirty = false;
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
