//! # Rendering Seam
//!
//! The renderer is an external collaborator. The frame loop hands it the
//! scene and the camera once per frame, after every system has updated.

use saberlink_core::{NodeId, SceneGraph};
use saberlink_shared::constants::{POINTER_LOOK_SENSITIVITY, RIG_HEIGHT};
use saberlink_shared::{Quaternion, Vec3};

/// Counters reported by the renderer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderInfo {
    /// Frames rendered.
    pub frame: u64,
    /// Live geometries.
    pub geometries: usize,
    /// Live materials.
    pub materials: usize,
    /// Draw calls issued by the last frame.
    pub calls: usize,
}

/// Draws the scene.
pub trait Renderer {
    /// Renders one frame.
    fn render(&mut self, scene: &SceneGraph, camera: &Camera);

    /// Resizes the output surface.
    fn set_size(&mut self, width: u32, height: u32);

    /// Counters as of the last frame.
    fn info(&self) -> RenderInfo;
}

/// Renderer that draws nothing and only counts.
#[derive(Clone, Debug, Default)]
pub struct HeadlessRenderer {
    info: RenderInfo,
    size: (u32, u32),
}

impl HeadlessRenderer {
    /// Creates a renderer with a zero-sized surface.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current surface size.
    #[must_use]
    pub const fn size(&self) -> (u32, u32) {
        self.size
    }
}

impl Renderer for HeadlessRenderer {
    fn render(&mut self, scene: &SceneGraph, _camera: &Camera) {
        let stats = scene.stats();
        self.info = RenderInfo {
            frame: self.info.frame + 1,
            geometries: stats.geometries,
            materials: stats.materials,
            calls: stats.visible_meshes,
        };
    }

    fn set_size(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }

    fn info(&self) -> RenderInfo {
        self.info
    }
}

/// Perspective camera backed by a scene node.
#[derive(Clone, Debug)]
pub struct Camera {
    node: NodeId,
    /// Euler angles (pitch, yaw, roll).
    euler: Vec3,
    /// Vertical field of view in degrees.
    pub fov: f32,
    /// Width over height.
    pub aspect: f32,
    /// Near plane.
    pub near: f32,
    /// Far plane.
    pub far: f32,
}

impl Camera {
    /// Spawns the camera node at standing height under the scene root.
    pub fn spawn(scene: &mut SceneGraph, aspect: f32) -> Self {
        let node = scene.spawn("camera");
        let root = scene.root();
        if let Err(err) = scene.attach(root, node) {
            tracing::warn!(%err, "camera could not be attached");
        }
        if let Some(transform) = scene.transform_mut(node) {
            transform.position = Vec3::new(0.0, RIG_HEIGHT, 0.0);
        }
        Self {
            node,
            euler: Vec3::ZERO,
            fov: 45.0,
            aspect,
            near: 0.1,
            far: 1000.0,
        }
    }

    /// Camera node.
    #[must_use]
    pub const fn node(&self) -> NodeId {
        self.node
    }

    /// Euler angles applied to the node.
    #[must_use]
    pub const fn euler(&self) -> Vec3 {
        self.euler
    }

    /// Rotates by pointer movement in pixels.
    pub fn look(&mut self, scene: &mut SceneGraph, dx: f32, dy: f32) {
        self.euler.y -= dx / POINTER_LOOK_SENSITIVITY;
        self.euler.x -= dy / POINTER_LOOK_SENSITIVITY;
        if let Some(transform) = scene.transform_mut(self.node) {
            transform.rotation = Quaternion::from_euler_xyz(self.euler.x, self.euler.y, self.euler.z);
        }
    }

    /// Sets the camera height within its parent.
    pub fn set_height(&self, scene: &mut SceneGraph, height: f32) {
        if let Some(transform) = scene.transform_mut(self.node) {
            transform.position.y = height;
        }
    }

    /// Updates the aspect ratio from a surface size. Zero sizes are ignored.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use saberlink_core::{Geometry, Material, Mesh};

    #[test]
    fn test_headless_counts_visible_meshes() {
        let mut scene = SceneGraph::new();
        let camera = Camera::spawn(&mut scene, 1.0);
        let cube = scene.spawn_mesh("cube", Mesh::new(Geometry::cuboid(Vec3::ONE), Material::new(0)));
        let root = scene.root();
        scene.attach(root, cube).unwrap();

        let mut renderer = HeadlessRenderer::new();
        renderer.render(&scene, &camera);
        assert_eq!(renderer.info().frame, 1);
        assert_eq!(renderer.info().calls, 1);

        scene.set_visible(cube, false).unwrap();
        renderer.render(&scene, &camera);
        assert_eq!(renderer.info().calls, 0);
        assert_eq!(renderer.info().geometries, 1);
    }

    #[test]
    fn test_pointer_look_and_viewport() {
        let mut scene = SceneGraph::new();
        let mut camera = Camera::spawn(&mut scene, 1.0);
        camera.look(&mut scene, 500.0, -250.0);
        assert_eq!(camera.euler(), Vec3::new(0.5, -1.0, 0.0));

        camera.set_viewport(1920, 1080);
        assert!((camera.aspect - 16.0 / 9.0).abs() < 1e-6);
        camera.set_viewport(0, 1080);
        assert!((camera.aspect - 16.0 / 9.0).abs() < 1e-6);
        assert_eq!(scene.transform(camera.node()).map(|t| t.position.y), Some(RIG_HEIGHT));
    }
}
