/// Spatial partitions for visibility and proximity queries.
///
/// A Partition indexes entities by their world-space AABB. The engine
/// keeps it in sync with the entity registry (add / update / remove) and
/// asks it once per frame for the entities inside the camera frustum.
///
/// Query results are written to a buffer owned by the partition, which
/// is cleared and refilled on every call: the returned slice is only valid
/// until the next query.

use glam::Vec3;
use crate::camera::Frustum;
use crate::entity::{Entity, EntityId};
use crate::error::Result;
use crate::primitives::BoundingVolume;

/// Trait for spatial indexing of entities.
///
/// Single writer: callers serialize all mutations and queries on one
/// partition. Separate partitions share nothing.
pub trait Partition: Send + Sync {
    /// Drop every indexed entity and all pooled storage.
    fn reset(&mut self);

    /// Index an entity by its current world AABB.
    ///
    /// Adding an entity that is already indexed re-indexes it.
    fn add(&mut self, entity: &dyn Entity) -> Result<()>;

    /// Re-index an entity after its bounding box changed.
    fn update(&mut self, entity: &dyn Entity) -> Result<()>;

    /// Remove an entity from the index.
    ///
    /// Removing an entity that is not indexed leaves the index untouched and
    /// returns `Error::EntityNotIndexed`.
    fn remove(&mut self, entity: &dyn Entity) -> Result<()>;

    /// Whether an entity is currently indexed.
    fn contains(&self, id: EntityId) -> bool;

    /// Number of indexed entities.
    fn entity_count(&self) -> usize;

    /// Entities whose AABB is visible in `frustum`, each exactly once.
    fn visible_entities(&mut self, frustum: &Frustum) -> &[EntityId];

    /// Entities indexed near a bounding volume, each exactly once.
    fn objects_near_to(&mut self, volume: &dyn BoundingVolume) -> &[EntityId];

    /// Entities indexed near a point, each exactly once.
    fn objects_near_to_point(&mut self, point: Vec3) -> &[EntityId];
}
