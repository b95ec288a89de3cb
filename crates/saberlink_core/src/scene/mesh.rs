//! Renderable resources attached to scene nodes.

use saberlink_shared::{Aabb, Vec3};

/// Geometry primitive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shape {
    /// Axis-aligned box with full extents.
    Cuboid(Vec3),
    /// Flat rectangle in the local XY plane.
    Plane {
        /// Extent along X.
        width: f32,
        /// Extent along Y.
        height: f32,
    },
}

/// GPU geometry handle. Bounds are in the node's local space.
#[derive(Clone, Debug, PartialEq)]
pub struct Geometry {
    shape: Shape,
    bounds: Aabb,
    released: bool,
}

impl Geometry {
    /// Creates geometry for a shape.
    #[must_use]
    pub fn new(shape: Shape) -> Self {
        let bounds = match shape {
            Shape::Cuboid(size) => Aabb::from_size(size),
            Shape::Plane { width, height } => Aabb::from_size(Vec3::new(width, height, 0.0)),
        };
        Self {
            shape,
            bounds,
            released: false,
        }
    }

    /// Box geometry.
    #[must_use]
    pub fn cuboid(size: Vec3) -> Self {
        Self::new(Shape::Cuboid(size))
    }

    /// Plane geometry.
    #[must_use]
    pub fn plane(width: f32, height: f32) -> Self {
        Self::new(Shape::Plane { width, height })
    }

    /// Primitive this geometry was built from.
    #[must_use]
    pub const fn shape(&self) -> Shape {
        self.shape
    }

    /// Local bounding box.
    #[must_use]
    pub const fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Whether the GPU resource has been freed.
    #[must_use]
    pub const fn is_released(&self) -> bool {
        self.released
    }

    pub(crate) fn release(&mut self) -> bool {
        !std::mem::replace(&mut self.released, true)
    }
}

/// Flat-color material.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Material {
    color: u32,
    released: bool,
}

impl Material {
    /// Creates a material with a `0xRRGGBB` color.
    #[must_use]
    pub const fn new(color: u32) -> Self {
        Self {
            color,
            released: false,
        }
    }

    /// `0xRRGGBB` color.
    #[must_use]
    pub const fn color(&self) -> u32 {
        self.color
    }

    /// Changes the color.
    pub fn set_color(&mut self, color: u32) {
        self.color = color;
    }

    /// Whether the GPU resource has been freed.
    #[must_use]
    pub const fn is_released(&self) -> bool {
        self.released
    }

    pub(crate) fn release(&mut self) -> bool {
        !std::mem::replace(&mut self.released, true)
    }
}

/// Geometry plus one or more materials.
#[derive(Clone, Debug, PartialEq)]
pub struct Mesh {
    /// Geometry
    pub geometry: Geometry,
    /// Materials, one per geometry group
    pub materials: Vec<Material>,
}

impl Mesh {
    /// Mesh with a single material.
    #[must_use]
    pub fn new(geometry: Geometry, material: Material) -> Self {
        Self {
            geometry,
            materials: vec![material],
        }
    }

    /// Whether geometry and every material have been freed.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.geometry.is_released() && self.materials.iter().all(Material::is_released)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_bounds_are_flat() {
        let g = Geometry::plane(2.0, 20.0);
        assert_eq!(g.bounds().min, Vec3::new(-1.0, -10.0, 0.0));
        assert_eq!(g.bounds().max, Vec3::new(1.0, 10.0, 0.0));
    }

    #[test]
    fn test_release_reports_first_time_only() {
        let mut m = Material::new(0xff0000);
        assert!(m.release());
        assert!(!m.release());
        assert!(m.is_released());
    }
}
