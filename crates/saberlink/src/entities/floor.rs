//! Runway floor.

use saberlink_core::{Entity, Geometry, Material, Mesh, SceneGraph};
use saberlink_shared::constants::COLOR_BLACK;
use saberlink_shared::Vec3;
use std::f32::consts::FRAC_PI_2;

/// Builds the floor: a black plane laid flat, ending at the player.
///
/// # Arguments
///
/// * `size` - Width and length in meters
pub fn spawn_floor(scene: &mut SceneGraph, size: [f32; 2]) -> Entity {
    let [width, length] = size;
    let mesh = Mesh::new(Geometry::plane(width, length), Material::new(COLOR_BLACK));
    let mut floor = Entity::with_mesh(scene, "floor", mesh);
    floor.set_rotation(Vec3::new(-FRAC_PI_2, 0.0, 0.0));
    floor.set_position(Vec3::new(0.0, 0.0, -length / 2.0));
    floor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_lies_flat_in_front_of_player() {
        let mut scene = SceneGraph::new();
        let mut floor = spawn_floor(&mut scene, [2.0, 20.0]);
        let root = scene.root();
        scene.attach(root, floor.node()).unwrap();
        floor.update(&mut scene, 0.0);

        let world = scene.world_matrix(floor.node()).unwrap();
        let bounds = scene.mesh(floor.node()).unwrap().geometry.bounds().transformed(&world);
        assert!(bounds.max.z.abs() < 1e-4);
        assert!((bounds.min.z + 20.0).abs() < 1e-4);
        assert!((bounds.max.y - bounds.min.y).abs() < 1e-4);
    }
}
