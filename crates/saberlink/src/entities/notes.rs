//! # Note Field
//!
//! The runway container: a group at the far end of the floor holding the
//! note pool. Note positions are local to it, so a note reaches the player
//! when its local z equals the runway length.

use super::note::{NoteEntity, NoteFlight};
use crate::beatmap::NoteInfo;
use crate::events::EventSender;
use saberlink_core::{CoreResult, Entity, EntityId, NodeId, ObjectPool, SceneGraph};
use saberlink_shared::Vec3;

/// Pooled notes under the runway container.
#[derive(Debug)]
pub struct NoteField {
    root: Entity,
    pool: ObjectPool<NoteEntity>,
    cell: f32,
}

impl NoteField {
    /// Builds the container and every note, hidden.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Notes in the pool
    /// * `cell` - Grid cell size; cubes are `cell / sqrt(2)` wide
    /// * `flight` - Shared flight parameters
    /// * `runway_length` - Distance from the runway head to the player
    /// * `events` - Receives note hits
    ///
    /// # Errors
    ///
    /// Propagates scene attach failures.
    pub fn new(
        scene: &mut SceneGraph,
        capacity: usize,
        cell: f32,
        flight: NoteFlight,
        runway_length: f32,
        events: &EventSender,
    ) -> CoreResult<Self> {
        let mut root = Entity::new(scene, "notes");
        root.set_position(Vec3::new(0.0, 0.0, -runway_length));

        let size = (cell * cell / 2.0).sqrt();
        let pool = ObjectPool::from_fn(capacity, |_| NoteEntity::new(scene, size, flight, events.clone()));
        for (_, note) in pool.iter() {
            scene.attach(root.node(), note.node())?;
        }
        Ok(Self { root, pool, cell })
    }

    /// Container entity. Not attached anywhere until a system registers it.
    #[must_use]
    pub const fn root(&self) -> &Entity {
        &self.root
    }

    /// Container node.
    #[must_use]
    pub const fn root_node(&self) -> NodeId {
        self.root.node()
    }

    /// Notes currently flying.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.pool.active_count()
    }

    /// Pool capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    /// Spawn requests that found no lazy note.
    #[must_use]
    pub const fn dropped(&self) -> u64 {
        self.pool.dropped()
    }

    /// Ids of every pooled note, in slot order.
    pub fn note_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.pool.iter().map(|(_, n)| n.id())
    }

    /// Note by entity id.
    #[must_use]
    pub fn note(&self, id: EntityId) -> Option<&NoteEntity> {
        self.pool.iter().map(|(_, n)| n).find(|n| n.id() == id)
    }

    /// Launches one note per entry into lazy pool slots.
    ///
    /// # Returns
    ///
    /// Entries that found no lazy note. They are skipped, not queued.
    pub fn spawn(&mut self, scene: &mut SceneGraph, notes: &[NoteInfo], offset: f32) -> usize {
        let mut missed = 0;
        for info in notes {
            match self.pool.acquire() {
                Some((_, note)) => note.play(scene, info, self.cell, offset),
                None => missed += 1,
            }
        }
        missed
    }

    /// Stops a flying note.
    ///
    /// # Returns
    ///
    /// False if the note is unknown or already idle.
    pub fn stop(&mut self, scene: &mut SceneGraph, id: EntityId) -> bool {
        let Some((_, note)) = self.pool.iter_mut().find(|(_, n)| n.id() == id) else {
            return false;
        };
        if !note.is_playing() {
            return false;
        }
        note.stop(scene);
        true
    }

    /// Stops every note.
    pub fn stop_all(&mut self, scene: &mut SceneGraph) {
        for (_, note) in self.pool.iter_mut() {
            note.stop(scene);
        }
    }

    /// Points every note's collider at the given sabers.
    pub fn set_collidables(&mut self, sabers: &[EntityId]) {
        for (_, note) in self.pool.iter_mut() {
            note.set_collidables(sabers);
        }
    }

    /// Advances the container, then every flying note.
    pub fn update(&mut self, scene: &mut SceneGraph, delta: f32) {
        self.root.update(scene, delta);
        for (_, note) in self.pool.iter_mut() {
            note.update(scene, delta);
        }
    }

    /// Disposes every note, then the container.
    pub fn dispose(&mut self, scene: &mut SceneGraph) {
        for (_, note) in self.pool.iter_mut() {
            note.dispose(scene);
        }
        self.root.dispose(scene);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beatmap::{CutDirection, NoteType};
    use crate::events::EventBus;

    fn field(scene: &mut SceneGraph, capacity: usize, bus: &EventBus) -> NoteField {
        let flight = NoteFlight {
            velocity: 5.0,
            max_distance: 25.0,
        };
        let field = NoteField::new(scene, capacity, 0.5, flight, 20.0, &bus.sender()).unwrap();
        let root = scene.root();
        scene.attach(root, field.root_node()).unwrap();
        field
    }

    fn info(lane: u8) -> NoteInfo {
        NoteInfo {
            time: 0.0,
            line_index: lane,
            line_layer: 0,
            note_type: NoteType::Red,
            cut_direction: CutDirection::Any,
        }
    }

    #[test]
    fn test_cube_size_and_container_offset() {
        let mut scene = SceneGraph::new();
        let bus = EventBus::new(8);
        let mut field = field(&mut scene, 2, &bus);
        field.spawn(&mut scene, &[info(0)], 0.0);
        field.update(&mut scene, 0.0);

        let id = field.pool.iter().next().map(|(_, n)| n.node()).unwrap();
        let bounds = scene.mesh(id).unwrap().geometry.bounds();
        let edge = bounds.max.x - bounds.min.x;
        assert!((edge - 0.5 / 2.0_f32.sqrt()).abs() < 1e-6);

        let world = scene.world_matrix(id).unwrap().position();
        assert!((world.z + 20.0).abs() < 1e-5);
        assert!((world.x + 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_exhausted_pool_skips_entries() {
        let mut scene = SceneGraph::new();
        let bus = EventBus::new(8);
        let mut field = field(&mut scene, 2, &bus);

        let missed = field.spawn(&mut scene, &[info(0), info(1), info(2)], 0.0);
        assert_eq!(missed, 1);
        assert_eq!(field.active_count(), 2);
        assert_eq!(field.dropped(), 1);
    }

    #[test]
    fn test_stop_returns_note_to_pool() {
        let mut scene = SceneGraph::new();
        let bus = EventBus::new(8);
        let mut field = field(&mut scene, 1, &bus);
        field.spawn(&mut scene, &[info(1)], 0.0);
        let id = field.pool.iter().next().map(|(_, n)| n.id()).unwrap();

        assert!(field.stop(&mut scene, id));
        assert!(!field.stop(&mut scene, id));
        assert_eq!(field.active_count(), 0);
        assert_eq!(field.spawn(&mut scene, &[info(2)], 0.0), 0);
    }

    #[test]
    fn test_dispose_releases_every_cube() {
        let mut scene = SceneGraph::new();
        let bus = EventBus::new(8);
        let mut field = field(&mut scene, 3, &bus);
        assert_eq!(scene.stats().geometries, 3);
        field.dispose(&mut scene);
        assert_eq!(scene.stats().geometries, 0);
        assert_eq!(scene.len(), 1);
    }
}
