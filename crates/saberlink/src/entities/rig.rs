//! # Rigs
//!
//! A rig is a group holding one saber per hand.
//!
//! ```text
//! pointer rig (under camera, y -0.2)     XR rig (root, y = hand height)
//! ├── saber-left  (x -0.2)               ├── controller 0 ── saber-right
//! └── saber-right (x +0.2)               └── controller 1 ── saber-left
//! ```
//!
//! Remote players are drawn with pointer rigs whose saber poses are
//! overwritten from their broadcast matrices.

use super::saber::{spawn_saber, SaberSide};
use saberlink_core::{
    Component, ComponentContext, ComponentKind, CoreResult, Entity, EntityId, SceneGraph,
};
use saberlink_shared::constants::{HAND_HEIGHT, NON_XR_RIG_DROP, NON_XR_SABER_SPREAD};
use saberlink_shared::{Transform, Vec3};
use std::any::Any;

/// Ids of a rig's parts. `sabers` is ordered left, right.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RigHandle {
    /// Rig group.
    pub root: EntityId,
    /// Left and right saber.
    pub sabers: [EntityId; 2],
}

/// Ids of the XR rig's parts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct XrRigHandle {
    /// Rig group.
    pub root: EntityId,
    /// Controller groups by device index.
    pub controllers: [EntityId; 2],
    /// Left and right saber.
    pub sabers: [EntityId; 2],
}

impl XrRigHandle {
    /// Saber ids as a plain rig handle.
    #[must_use]
    pub const fn as_rig(&self) -> RigHandle {
        RigHandle {
            root: self.root,
            sabers: self.sabers,
        }
    }
}

/// Pose of a tracked controller, written to the owner's node every frame.
#[derive(Clone, Copy, Debug)]
pub struct ControllerComponent {
    index: usize,
    pose: Option<Transform>,
}

impl ControllerComponent {
    /// Controller for device `index`.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self { index, pose: None }
    }

    /// Device index.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Last pose received. `None` while untracked.
    #[must_use]
    pub const fn pose(&self) -> Option<Transform> {
        self.pose
    }

    /// Sets the pose. An untracked controller keeps its last node transform.
    pub fn set_pose(&mut self, pose: Option<Transform>) {
        self.pose = pose;
    }
}

impl Component for ControllerComponent {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Controller
    }

    fn update(&mut self, ctx: &mut ComponentContext<'_>, _delta: f32) {
        let Some(pose) = self.pose else {
            return;
        };
        if let Some(transform) = ctx.scene.transform_mut(ctx.owner.node()) {
            *transform = pose;
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Builds a pointer rig: two sabers spread sideways, slightly below the
/// parent.
///
/// # Errors
///
/// Propagates scene attach failures.
pub fn build_pointer_rig(scene: &mut SceneGraph, name: &str) -> CoreResult<(Entity, RigHandle)> {
    let mut rig = Entity::new(scene, name);
    rig.set_position(Vec3::new(0.0, NON_XR_RIG_DROP, 0.0));

    let left = spawn_saber(scene, SaberSide::Left, -NON_XR_SABER_SPREAD);
    let left = rig.add_child(scene, left)?;
    let right = spawn_saber(scene, SaberSide::Right, NON_XR_SABER_SPREAD);
    let right = rig.add_child(scene, right)?;

    let handle = RigHandle {
        root: rig.id(),
        sabers: [left, right],
    };
    Ok((rig, handle))
}

fn build_controller(
    scene: &mut SceneGraph,
    index: usize,
    saber: Entity,
) -> CoreResult<(Entity, EntityId)> {
    let mut controller = Entity::new(scene, "xr-controller");
    controller.add_component(ControllerComponent::new(index));
    let saber = controller.add_child(scene, saber)?;
    Ok((controller, saber))
}

/// Builds the XR rig at hand height. Controller 0 carries the right saber,
/// controller 1 the left one.
///
/// # Errors
///
/// Propagates scene attach failures.
pub fn build_xr_rig(scene: &mut SceneGraph) -> CoreResult<(Entity, XrRigHandle)> {
    let mut rig = Entity::new(scene, "xr-rig");
    rig.set_position(Vec3::new(0.0, HAND_HEIGHT, 0.0));

    let right = spawn_saber(scene, SaberSide::Right, 0.0);
    let (first, right) = build_controller(scene, 0, right)?;
    let left = spawn_saber(scene, SaberSide::Left, 0.0);
    let (second, left) = build_controller(scene, 1, left)?;

    let handle = XrRigHandle {
        root: rig.id(),
        controllers: [rig.add_child(scene, first)?, rig.add_child(scene, second)?],
        sabers: [left, right],
    };
    Ok((rig, handle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::saber::SaberComponent;
    use saberlink_shared::Quaternion;

    #[test]
    fn test_pointer_rig_layout() {
        let mut scene = SceneGraph::new();
        let (mut rig, handle) = build_pointer_rig(&mut scene, "rig").unwrap();
        let root = scene.root();
        scene.attach(root, rig.node()).unwrap();
        rig.update(&mut scene, 0.0);

        let left = scene.world_matrix(handle.sabers[0].node()).unwrap().position();
        let right = scene.world_matrix(handle.sabers[1].node()).unwrap().position();
        assert!((left.x + 0.2).abs() < 1e-6);
        assert!((right.x - 0.2).abs() < 1e-6);
        assert!((left.y + 0.2).abs() < 1e-6);
        assert!((left.z + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_xr_controllers_carry_crossed_sabers() {
        let mut scene = SceneGraph::new();
        let (rig, handle) = build_xr_rig(&mut scene).unwrap();

        let first = rig.child(handle.controllers[0]).unwrap();
        assert_eq!(first.get::<ControllerComponent>().map(ControllerComponent::index), Some(0));
        let blade = first.children()[0].get::<SaberComponent>().map(SaberComponent::side);
        assert_eq!(blade, Some(SaberSide::Right));
        assert_eq!(first.children()[0].id(), handle.sabers[1]);
    }

    #[test]
    fn test_controller_pose_moves_node() {
        let mut scene = SceneGraph::new();
        let (mut rig, handle) = build_xr_rig(&mut scene).unwrap();
        let root = scene.root();
        scene.attach(root, rig.node()).unwrap();

        let pose = Transform::new(Vec3::new(0.3, 0.1, -0.2), Quaternion::IDENTITY, Vec3::ONE);
        rig.child_mut(handle.controllers[0])
            .and_then(|c| c.get_mut::<ControllerComponent>())
            .unwrap()
            .set_pose(Some(pose));
        rig.update(&mut scene, 0.016);

        let world = scene.world_matrix(handle.controllers[0].node()).unwrap().position();
        assert!((world.x - 0.3).abs() < 1e-6);
        assert!((world.y - (HAND_HEIGHT + 0.1)).abs() < 1e-6);
    }
}
