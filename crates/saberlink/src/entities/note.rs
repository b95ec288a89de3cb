//! # Notes
//!
//! A note cube lives in the note pool for the whole game. Playing it paints
//! it, places it at the head of the runway and lets [`NoteMotion`] fly it
//! towards the player; stopping it hides it until the pool hands it out
//! again.

use crate::beatmap::NoteInfo;
use crate::events::{EventSender, GameEvent};
use saberlink_core::{
    ColliderComponent, Component, ComponentContext, ComponentKind, Entity, EntityId, Geometry,
    Material, Mesh, NodeId, Poolable, SceneGraph,
};
use saberlink_shared::constants::{COLOR_BLACK, NOTE_BASE_HEIGHT};
use saberlink_shared::Vec3;
use std::any::Any;

/// Flight parameters shared by every note.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NoteFlight {
    /// Meters per second along +z.
    pub velocity: f32,
    /// Local z past which a note stops.
    pub max_distance: f32,
}

/// Moves a playing note along +z and stops it past the flight distance.
#[derive(Clone, Copy, Debug)]
pub struct NoteMotion {
    flight: NoteFlight,
    playing: bool,
}

impl NoteMotion {
    /// Idle motion.
    #[must_use]
    pub const fn new(flight: NoteFlight) -> Self {
        Self {
            flight,
            playing: false,
        }
    }

    /// Whether the note is flying.
    #[must_use]
    pub const fn is_playing(&self) -> bool {
        self.playing
    }
}

impl Component for NoteMotion {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Motion
    }

    fn update(&mut self, ctx: &mut ComponentContext<'_>, delta: f32) {
        if !self.playing {
            return;
        }
        let node = ctx.owner.node();
        let Some(transform) = ctx.scene.transform_mut(node) else {
            self.playing = false;
            return;
        };
        if transform.position.z > self.flight.max_distance {
            self.playing = false;
            set_shown(ctx.scene, node, false);
            return;
        }
        transform.position.z += self.flight.velocity * delta;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn set_shown(scene: &mut SceneGraph, node: NodeId, visible: bool) {
    if let Err(err) = scene.set_visible(node, visible) {
        tracing::debug!(%node, %err, "note visibility not changed");
    }
}

/// A pooled note cube.
#[derive(Debug)]
pub struct NoteEntity {
    entity: Entity,
    info: Option<NoteInfo>,
}

impl NoteEntity {
    /// Builds a hidden cube whose collider reports saber hits to `events`.
    ///
    /// # Arguments
    ///
    /// * `size` - Cube edge length
    /// * `flight` - Velocity and stop distance
    /// * `events` - Receives [`GameEvent::NoteHit`]
    pub fn new(scene: &mut SceneGraph, size: f32, flight: NoteFlight, events: EventSender) -> Self {
        let mesh = Mesh::new(
            Geometry::cuboid(Vec3::new(size, size, size)),
            Material::new(COLOR_BLACK),
        );
        let mut entity = Entity::with_mesh(scene, "note", mesh);
        set_shown(scene, entity.node(), false);

        entity.add_component(NoteMotion::new(flight));
        entity.add_component(ColliderComponent::with_callback(move |hit| {
            events.send(GameEvent::NoteHit {
                note: hit.collider,
                saber: hit.other,
            });
        }));
        Self { entity, info: None }
    }

    /// Entity id.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.entity.id()
    }

    /// Scene node.
    #[must_use]
    pub const fn node(&self) -> NodeId {
        self.entity.node()
    }

    /// Beatmap entry of the current or last flight.
    #[must_use]
    pub const fn info(&self) -> Option<&NoteInfo> {
        self.info.as_ref()
    }

    /// Whether the note is flying.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.entity.get::<NoteMotion>().is_some_and(NoteMotion::is_playing)
    }

    /// Paints, places and launches the note.
    ///
    /// # Arguments
    ///
    /// * `info` - Lane, layer, type and cut direction
    /// * `cell` - Grid cell size in meters
    /// * `offset` - Beats elapsed since the note's beat was due, placing it
    ///   that far behind the runway head
    pub fn play(&mut self, scene: &mut SceneGraph, info: &NoteInfo, cell: f32, offset: f32) {
        let node = self.node();
        if let Some(material) = scene.mesh_mut(node).and_then(|m| m.materials.first_mut()) {
            material.set_color(info.note_type.color());
        }
        self.entity.set_position(Vec3::new(
            (f32::from(info.line_index) - 1.5) * cell,
            f32::from(info.line_layer) * cell + NOTE_BASE_HEIGHT,
            -offset,
        ));
        self.entity.set_rotation(Vec3::new(0.0, 0.0, info.cut_direction.roll()));
        set_shown(scene, node, true);

        if let Some(motion) = self.entity.get_mut::<NoteMotion>() {
            motion.playing = true;
        }
        self.info = Some(*info);
    }

    /// Hides the note and returns it to the pool.
    pub fn stop(&mut self, scene: &mut SceneGraph) {
        if let Some(motion) = self.entity.get_mut::<NoteMotion>() {
            motion.playing = false;
        }
        set_shown(scene, self.node(), false);
    }

    /// Sabers this note can be cut by.
    pub fn set_collidables(&mut self, sabers: &[EntityId]) {
        if let Some(collider) = self.entity.get_mut::<ColliderComponent>() {
            collider.set_collidables(sabers.iter().copied());
        }
    }

    /// Advances the note. Idle notes are skipped.
    pub fn update(&mut self, scene: &mut SceneGraph, delta: f32) {
        if self.is_playing() {
            self.entity.update(scene, delta);
        }
    }

    /// Disposes the cube.
    pub fn dispose(&mut self, scene: &mut SceneGraph) {
        self.entity.dispose(scene);
    }
}

impl Poolable for NoteEntity {
    fn is_active(&self) -> bool {
        self.is_playing()
    }
}
