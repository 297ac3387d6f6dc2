use glam::Vec3;
use super::BoundingVolume;

/// Bounding sphere
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sphere {
    /// Center in world space
    pub center: Vec3,
    /// Radius (>= 0)
    pub radius: f32,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }
}

impl BoundingVolume for Sphere {
    fn center(&self) -> Vec3 {
        self.center
    }

    fn dimension_on_axis(&self, _axis: Vec3) -> f32 {
        self.radius * 2.0
    }
}
