/// Plane: one half-space boundary of a frustum.

use glam::{Vec3, Vec4};

/// A plane `dot(normal, p) + distance = 0`.
///
/// Points with a positive signed distance are on the inside (visible)
/// half-space. Frustum planes keep `normal` at unit length.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Plane {
    normal: Vec3,
    distance: f32,
}

impl Plane {
    /// Create a plane from a normal and a signed distance.
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self { normal, distance }
    }

    /// Create a plane from raw `(a, b, c, d)` coefficients, normalized so
    /// that `(a, b, c)` has unit length.
    ///
    /// The normal must not be zero-length: a degenerate projection is a
    /// caller precondition violation.
    pub fn from_coefficients(coefficients: Vec4) -> Self {
        let mut plane = Self::default();
        plane.set_coefficients(coefficients);
        plane
    }

    /// Unit normal pointing into the visible half-space.
    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    /// Signed plane offset.
    pub fn distance(&self) -> f32 {
        self.distance
    }

    /// Overwrite normal and distance in place.
    pub fn set(&mut self, normal: Vec3, distance: f32) {
        self.normal = normal;
        self.distance = distance;
    }

    /// Overwrite this plane from raw coefficients, normalizing in place.
    pub fn set_coefficients(&mut self, coefficients: Vec4) {
        let normal = coefficients.truncate();
        let length = normal.length();
        debug_assert!(length > 0.0, "degenerate plane normal: {:?}", coefficients);
        self.normal = normal / length;
        self.distance = coefficients.w / length;
    }

    /// Signed distance of `point` to this plane (positive = inside).
    #[inline]
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }
}
