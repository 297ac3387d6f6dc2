//! Geometric primitives used by the camera and the partitions.
//!
//! All primitives are small `Copy` values. They are stored inline
//! (partition nodes embed their AABB) instead of being pooled.

mod aabb;
mod plane;
mod sphere;

pub use aabb::AABB;
pub use plane::Plane;
pub use sphere::Sphere;

use glam::Vec3;

/// A volume that can be reduced to a center and an extent along an axis.
///
/// Proximity queries (`Partition::objects_near_to`) accept any bounding
/// volume and convert it to an axis-aligned query box.
pub trait BoundingVolume {
    /// World-space center of the volume.
    fn center(&self) -> Vec3;

    /// Extent of the volume projected onto a unit `axis`.
    fn dimension_on_axis(&self, axis: Vec3) -> f32;
}
