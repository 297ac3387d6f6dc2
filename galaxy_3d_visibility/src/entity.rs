//! Entity contract consumed by the partitions and the engine
//!
//! Entities (meshes, particle systems, ...) live outside this crate. The
//! partitions only ever see an id and a world-space bounding box, and they
//! store ids, never the entities themselves.

use std::fmt;
use crate::primitives::AABB;

/// Stable, unique key of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u64);

impl EntityId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn value(self) -> u64 {
        self.0
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An object that can be indexed by a partition
///
/// # Example
///
/// ```
/// use galaxy_3d_visibility::galaxy3d::entity::{Entity, EntityId};
/// use galaxy_3d_visibility::galaxy3d::primitives::AABB;
/// use galaxy_3d_visibility::glam::Vec3;
///
/// struct Crate {
///     id: EntityId,
///     position: Vec3,
/// }
///
/// impl Entity for Crate {
///     fn id(&self) -> EntityId {
///         self.id
///     }
///
///     fn bounding_box_transformed(&self) -> AABB {
///         AABB::from_center_half_extents(self.position, Vec3::splat(0.5))
///     }
/// }
/// ```
pub trait Entity {
    /// Stable unique key
    fn id(&self) -> EntityId;

    /// Current world-space bounding box
    fn bounding_box_transformed(&self) -> AABB;

    /// Disabled entities are kept out of the partition by the engine
    fn is_enabled(&self) -> bool {
        true
    }
}
