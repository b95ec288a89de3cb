//! # Sabers
//!
//! A saber is a thin colored cuboid whose collider publishes its bounds every
//! frame. Notes test against those bounds; sabers never test anything.

use saberlink_core::{
    ColliderComponent, Component, ComponentContext, ComponentKind, Entity, Geometry, Material,
    Mesh, SceneGraph,
};
use saberlink_shared::constants::{COLOR_BLUE, COLOR_RED, SABER_SIZE};
use saberlink_shared::Vec3;
use std::any::Any;

/// Hand a saber belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SaberSide {
    /// Red saber.
    Left,
    /// Blue saber.
    Right,
}

impl SaberSide {
    /// Both sides, in `sabers_matrix` order.
    pub const ALL: [Self; 2] = [Self::Left, Self::Right];

    /// Blade color.
    #[inline]
    #[must_use]
    pub const fn color(self) -> u32 {
        match self {
            Self::Left => COLOR_RED,
            Self::Right => COLOR_BLUE,
        }
    }

    /// Slot in `sabers_matrix`.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Left => 0,
            Self::Right => 1,
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Left => "saber-left",
            Self::Right => "saber-right",
        }
    }
}

/// Marks an entity as a saber.
#[derive(Clone, Copy, Debug)]
pub struct SaberComponent {
    side: SaberSide,
}

impl SaberComponent {
    /// Saber of the given side.
    #[must_use]
    pub const fn new(side: SaberSide) -> Self {
        Self { side }
    }

    /// Side.
    #[must_use]
    pub const fn side(&self) -> SaberSide {
        self.side
    }
}

impl Component for SaberComponent {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Saber
    }

    fn update(&mut self, _ctx: &mut ComponentContext<'_>, _delta: f32) {}

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Builds a detached saber. The blade extends forward from the hand, one
/// meter in front of its parent.
///
/// # Arguments
///
/// * `scene` - Scene owning the saber's node
/// * `side` - Hand, which sets the color
/// * `offset_x` - Sideways offset from the parent
pub fn spawn_saber(scene: &mut SceneGraph, side: SaberSide, offset_x: f32) -> Entity {
    let mesh = Mesh::new(
        Geometry::cuboid(Vec3::from_array(SABER_SIZE)),
        Material::new(side.color()),
    );
    let mut saber = Entity::with_mesh(scene, side.name(), mesh);
    saber.set_position(Vec3::new(offset_x, 0.0, -SABER_SIZE[2] / 2.0));
    saber.add_component(SaberComponent::new(side));
    saber.add_component(ColliderComponent::new());
    saber
}
