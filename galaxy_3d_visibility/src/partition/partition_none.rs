/// PartitionNone: a flat list of every indexed entity.
///
/// Every query returns all indexed entities in insertion order. Useful for
/// small scenes and as a reference when debugging `PartitionOctree`.

use glam::Vec3;
use rustc_hash::FxHashSet;
use crate::camera::Frustum;
use crate::entity::{Entity, EntityId};
use crate::error::{Error, Result};
use crate::primitives::BoundingVolume;
use super::partition::Partition;

#[derive(Default)]
pub struct PartitionNone {
    entities: Vec<EntityId>,
    indexed: FxHashSet<EntityId>,
}

impl PartitionNone {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Partition for PartitionNone {
    fn reset(&mut self) {
        self.entities = Vec::new();
        self.indexed = FxHashSet::default();
    }

    fn add(&mut self, entity: &dyn Entity) -> Result<()> {
        let id = entity.id();
        if self.indexed.insert(id) {
            self.entities.push(id);
        }
        Ok(())
    }

    fn update(&mut self, entity: &dyn Entity) -> Result<()> {
        self.add(entity)
    }

    fn remove(&mut self, entity: &dyn Entity) -> Result<()> {
        let id = entity.id();
        if !self.indexed.remove(&id) {
            crate::engine_warn!("galaxy3d::PartitionNone", "'{}' not registered", id);
            return Err(Error::EntityNotIndexed(id));
        }
        if let Some(position) = self.entities.iter().position(|&entity| entity == id) {
            self.entities.remove(position);
        }
        Ok(())
    }

    fn contains(&self, id: EntityId) -> bool {
        self.indexed.contains(&id)
    }

    fn entity_count(&self) -> usize {
        self.entities.len()
    }

    fn visible_entities(&mut self, _frustum: &Frustum) -> &[EntityId] {
        &self.entities
    }

    fn objects_near_to(&mut self, _volume: &dyn BoundingVolume) -> &[EntityId] {
        &self.entities
    }

    fn objects_near_to_point(&mut self, _point: Vec3) -> &[EntityId] {
        &self.entities
    }
}
