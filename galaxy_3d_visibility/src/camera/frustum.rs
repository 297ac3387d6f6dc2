/// Frustum: six clipping planes for visibility culling.
///
/// Each plane keeps a unit normal pointing into the visible volume, so a
/// point is inside the frustum when its signed distance to every plane is
/// strictly positive.
///
/// The planes are mutated in place every frame by `update_frustum()`;
/// the array itself is never reallocated.

use glam::{Mat4, Vec3, Vec4};
use crate::primitives::{AABB, Plane, Sphere};

/// Result of a 3-way frustum/AABB classification.
///
/// Used by `PartitionOctree` for hierarchical culling:
/// - `Outside` → skip the entire subtree
/// - `Inside` → every point of the box is visible
/// - `Partial` → test individual objects and recurse into children
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrustumTest {
    /// AABB is entirely outside the frustum
    Outside,
    /// AABB is entirely inside the frustum
    Inside,
    /// AABB partially overlaps the frustum
    Partial,
}

/// Frustum plane indices
pub const PLANE_RIGHT: usize = 0;
pub const PLANE_LEFT: usize = 1;
pub const PLANE_BOTTOM: usize = 2;
pub const PLANE_TOP: usize = 3;
pub const PLANE_FAR: usize = 4;
pub const PLANE_NEAR: usize = 5;

/// Six frustum planes for culling.
///
/// Works with both perspective and orthographic projections.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    /// Frustum planes: right, left, bottom, top, far, near
    planes: [Plane; 6],
}

impl Frustum {
    /// Frustum of the identity transform: the clip-space cube `[-1, 1]³`.
    pub fn new() -> Self {
        Self::from_view_projection(&Mat4::IDENTITY)
    }

    /// Extract frustum planes from a view-projection matrix.
    pub fn from_view_projection(view_projection: &Mat4) -> Self {
        let mut frustum = Self { planes: [Plane::default(); 6] };
        frustum.update_from_view_projection(view_projection);
        frustum
    }

    /// Build a frustum from six explicit planes (indexed by the `PLANE_*` constants).
    pub fn from_planes(planes: [Plane; 6]) -> Self {
        Self { planes }
    }

    /// Frustum whose six planes bound an axis-aligned box.
    ///
    /// Equivalent to an orthographic view of the box; handy for region
    /// queries and for checking query results against plain box overlap.
    pub fn from_aabb(aabb: &AABB) -> Self {
        let mut planes = [Plane::default(); 6];
        planes[PLANE_RIGHT] = Plane::new(Vec3::NEG_X, aabb.max.x);
        planes[PLANE_LEFT] = Plane::new(Vec3::X, -aabb.min.x);
        planes[PLANE_BOTTOM] = Plane::new(Vec3::Y, -aabb.min.y);
        planes[PLANE_TOP] = Plane::new(Vec3::NEG_Y, aabb.max.y);
        planes[PLANE_FAR] = Plane::new(Vec3::NEG_Z, aabb.max.z);
        planes[PLANE_NEAR] = Plane::new(Vec3::Z, -aabb.min.z);
        Self { planes }
    }

    /// Recompute the planes from the current projection and view matrices.
    ///
    /// Called once per frame by `Camera::update`.
    pub fn update_frustum(&mut self, projection: &Mat4, view: &Mat4) {
        self.update_from_view_projection(&(*projection * *view));
    }

    /// Recompute the planes in place from a combined view-projection matrix.
    ///
    /// Uses the Gribb & Hartmann method on the rows of the matrix. The
    /// projection must not be degenerate: a zero-length plane normal is a
    /// precondition violation.
    pub fn update_from_view_projection(&mut self, view_projection: &Mat4) {
        let row0 = view_projection.row(0);
        let row1 = view_projection.row(1);
        let row2 = view_projection.row(2);
        let row3 = view_projection.row(3);

        let coefficients: [Vec4; 6] = [
            row3 - row0, // right
            row3 + row0, // left
            row3 + row1, // bottom
            row3 - row1, // top
            row3 - row2, // far
            row3 + row2, // near
        ];

        for (plane, coefficients) in self.planes.iter_mut().zip(coefficients) {
            plane.set_coefficients(coefficients);
        }
    }

    /// All six planes, indexed by the `PLANE_*` constants.
    pub fn planes(&self) -> &[Plane; 6] {
        &self.planes
    }

    /// One plane by `PLANE_*` index.
    ///
    /// # Panics
    ///
    /// Panics if `index >= 6`.
    pub fn plane(&self, index: usize) -> &Plane {
        &self.planes[index]
    }

    /// A point is visible iff it is strictly inside every plane.
    ///
    /// A point lying exactly on a plane is not visible.
    pub fn is_point_visible(&self, point: Vec3) -> bool {
        self.planes.iter().all(|plane| plane.signed_distance(point) > 0.0)
    }

    /// A sphere is rejected as soon as it is fully outside one plane.
    pub fn is_sphere_visible(&self, sphere: &Sphere) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.signed_distance(sphere.center) > -sphere.radius)
    }

    /// Conservative AABB test.
    ///
    /// The box is invisible only if, for some plane, all 8 corners are on
    /// the outside (`<= 0`). Checking the corner furthest along the plane
    /// normal (the "positive vertex") is enough to decide that.
    /// May return false positives near frustum edges, never false negatives.
    pub fn is_aabb_visible(&self, aabb: &AABB) -> bool {
        self.planes.iter().all(|plane| {
            let p_vertex = positive_vertex(plane.normal(), aabb);
            plane.signed_distance(p_vertex) > 0.0
        })
    }

    /// Classify an AABB against the frustum (3-way test).
    ///
    /// Uses the same outside rule as `is_aabb_visible`, so `Outside` here
    /// means `is_aabb_visible` returns false. `Inside` requires the corner
    /// least along each normal (the "negative vertex") to be strictly inside
    /// every plane.
    pub fn classify_aabb(&self, aabb: &AABB) -> FrustumTest {
        let mut all_inside = true;

        for plane in &self.planes {
            let normal = plane.normal();

            if plane.signed_distance(positive_vertex(normal, aabb)) <= 0.0 {
                return FrustumTest::Outside;
            }

            let n_vertex = Vec3::select(normal.cmpge(Vec3::ZERO), aabb.min, aabb.max);
            if plane.signed_distance(n_vertex) <= 0.0 {
                all_inside = false;
            }
        }

        if all_inside { FrustumTest::Inside } else { FrustumTest::Partial }
    }
}

impl Default for Frustum {
    fn default() -> Self {
        Self::new()
    }
}

/// Corner of `aabb` furthest along `normal`
#[inline]
fn positive_vertex(normal: Vec3, aabb: &AABB) -> Vec3 {
    Vec3::select(normal.cmpge(Vec3::ZERO), aabb.max, aabb.min)
}

#[cfg(test)]
#[path = "frustum_tests.rs"]
mod tests;
