/// Galaxy3D Engine - Visibility orchestration and logging facade
///
/// An `Engine` owns the camera, the spatial partition and the registry of
/// entities, and keeps the partition in sync with the registry. Each engine
/// instance is independent: two engines share no index, pool or camera.
///
/// The logging facade (`set_logger`, `log`, ...) is global and shared by
/// every instance.

use std::sync::{OnceLock, RwLock};
use std::time::SystemTime;
use glam::Vec3;
use rustc_hash::FxHashMap;
use crate::camera::Camera;
use crate::entity::{Entity, EntityId};
use crate::error::{Error, Result};
use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
use crate::partition::{Partition, PartitionConfig, PartitionNone, PartitionOctree, PartitionType};
use crate::primitives::BoundingVolume;

// ===== INTERNAL STATE =====

/// Global logger (initialized with DefaultLogger)
static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();

// ===== CONFIGURATION =====

/// Engine creation parameters
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Which partition indexes the entities
    pub partition_type: PartitionType,
    /// Octree parameters (ignored by `PartitionType::None`)
    pub partition: PartitionConfig,
    /// Camera near clip distance
    pub z_near: f32,
    /// Camera far clip distance
    pub z_far: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            partition_type: PartitionType::Octree,
            partition: PartitionConfig::default(),
            z_near: 10.0,
            z_far: 4000.0,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        Camera::with_clip_planes(self.z_near, self.z_far)?;
        if self.partition_type == PartitionType::Octree {
            self.partition.validate()?;
        }
        Ok(())
    }
}

// ===== PUBLIC API =====

/// Visibility engine
///
/// # Example
///
/// ```
/// use galaxy_3d_visibility::galaxy3d::{Engine, EngineConfig};
/// use galaxy_3d_visibility::galaxy3d::entity::{Entity, EntityId};
/// use galaxy_3d_visibility::galaxy3d::primitives::AABB;
/// use galaxy_3d_visibility::glam::Vec3;
///
/// struct Rock(EntityId);
///
/// impl Entity for Rock {
///     fn id(&self) -> EntityId { self.0 }
///     fn bounding_box_transformed(&self) -> AABB {
///         AABB::new(Vec3::new(-1.0, 49.0, -1.0), Vec3::new(1.0, 51.0, 1.0))
///     }
/// }
///
/// let mut engine = Engine::new(EngineConfig::default())?;
/// engine.add_entity(Box::new(Rock(EntityId::new(1))))?;
///
/// let visible = engine.compute_visible_entities(800, 600);
/// assert_eq!(visible, &[EntityId::new(1)]);
/// # Ok::<(), galaxy_3d_visibility::galaxy3d::Error>(())
/// ```
pub struct Engine {
    config: EngineConfig,
    camera: Camera,
    partition: Box<dyn Partition>,
    entities: FxHashMap<EntityId, Box<dyn Entity>>,
    /// Result of the last `compute_visible_entities`, used for picking
    last_visible: Vec<EntityId>,
}

impl Engine {
    /// Create an engine with an empty registry.
    ///
    /// # Errors
    ///
    /// `Error::InvalidConfiguration` if the clip planes or the partition
    /// parameters are invalid.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let camera = Camera::with_clip_planes(config.z_near, config.z_far)?;
        let partition: Box<dyn Partition> = match config.partition_type {
            PartitionType::Octree => Box::new(PartitionOctree::with_config(config.partition.clone())?),
            PartitionType::None => Box::new(PartitionNone::new()),
        };

        crate::engine_info!(
            "galaxy3d::Engine",
            "Engine created ({:?} partition, clip planes {} / {})",
            config.partition_type,
            config.z_near,
            config.z_far
        );

        Ok(Self {
            config,
            camera,
            partition,
            entities: FxHashMap::default(),
            last_visible: Vec::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ===== CAMERA / PARTITION ACCESS =====

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn partition(&self) -> &dyn Partition {
        self.partition.as_ref()
    }

    /// Swap the partition and index every enabled entity into the new one.
    ///
    /// Entities are re-indexed in id order. Indexing continues past a
    /// failure; the first error is returned.
    pub fn set_partition(&mut self, mut partition: Box<dyn Partition>) -> Result<()> {
        partition.reset();

        let mut ids: Vec<EntityId> = self.entities.keys().copied().collect();
        ids.sort();

        let mut first_error = None;
        for id in ids {
            let Some(entity) = self.entities.get(&id) else {
                continue;
            };
            if !entity.is_enabled() {
                continue;
            }
            if let Err(error) = partition.add(entity.as_ref()) {
                first_error.get_or_insert(error);
            }
        }

        self.partition = partition;
        self.last_visible.clear();
        crate::engine_debug!(
            "galaxy3d::Engine",
            "Partition replaced, {} entities indexed",
            self.partition.entity_count()
        );

        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Drop every entity and reset the partition.
    pub fn reset(&mut self) {
        self.entities.clear();
        self.partition.reset();
        self.last_visible.clear();
    }

    // ===== ENTITY REGISTRY =====

    /// Register an entity, replacing any entity with the same id.
    ///
    /// The entity is indexed only if it is enabled. It stays registered even
    /// when indexing fails, so a later `update_entity` can retry.
    pub fn add_entity(&mut self, entity: Box<dyn Entity>) -> Result<()> {
        let id = entity.id();
        if let Some(previous) = self.entities.remove(&id) {
            if self.partition.contains(id) {
                self.partition.remove(previous.as_ref())?;
            }
        }

        let result = if entity.is_enabled() {
            self.partition.add(entity.as_ref())
        } else {
            Ok(())
        };
        self.entities.insert(id, entity);
        result
    }

    /// Re-read an entity after it moved or was enabled / disabled.
    ///
    /// # Errors
    ///
    /// `Error::EntityNotIndexed` if no entity with this id is registered.
    pub fn update_entity(&mut self, id: EntityId) -> Result<()> {
        let Some(entity) = self.entities.get(&id) else {
            crate::engine_warn!("galaxy3d::Engine", "Update of unknown entity '{}'", id);
            return Err(Error::EntityNotIndexed(id));
        };

        if entity.is_enabled() {
            self.partition.update(entity.as_ref())
        } else if self.partition.contains(id) {
            self.partition.remove(entity.as_ref())
        } else {
            Ok(())
        }
    }

    /// Unregister an entity and return it.
    pub fn remove_entity(&mut self, id: EntityId) -> Option<Box<dyn Entity>> {
        let entity = self.entities.remove(&id)?;
        if self.partition.contains(id) {
            // The entity is unregistered even if the partition refuses it
            if let Err(error) = self.partition.remove(entity.as_ref()) {
                crate::engine_debug!(
                    "galaxy3d::Engine",
                    "'{}' unregistered, partition reported: {}",
                    id,
                    error
                );
            }
        }
        self.last_visible.retain(|&visible| visible != id);
        Some(entity)
    }

    pub fn entity(&self, id: EntityId) -> Option<&dyn Entity> {
        self.entities.get(&id).map(|entity| entity.as_ref())
    }

    /// Mutable access; call `update_entity` after changing the bounding box.
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Box<dyn Entity>> {
        self.entities.get_mut(&id)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    // ===== QUERIES =====

    /// Update the camera for a viewport and collect the visible entities.
    pub fn compute_visible_entities(&mut self, width: u32, height: u32) -> &[EntityId] {
        self.camera.update(width, height);

        let visible = self.partition.visible_entities(self.camera.frustum());
        self.last_visible.clear();
        self.last_visible.extend_from_slice(visible);

        crate::engine_trace!(
            "galaxy3d::Engine",
            "{} of {} entities visible",
            self.last_visible.len(),
            self.entities.len()
        );
        &self.last_visible
    }

    /// Entities visible after the last `compute_visible_entities`
    pub fn last_visible_entities(&self) -> &[EntityId] {
        &self.last_visible
    }

    pub fn objects_near_to(&mut self, volume: &dyn BoundingVolume) -> &[EntityId] {
        self.partition.objects_near_to(volume)
    }

    pub fn objects_near_to_point(&mut self, point: Vec3) -> &[EntityId] {
        self.partition.objects_near_to_point(point)
    }

    /// Pick the visible entity at a world position.
    ///
    /// Among the entities of the last visible set whose box contains `point`,
    /// returns the one with the smallest box diagonal.
    pub fn entity_by_world_position(&self, point: Vec3) -> Option<EntityId> {
        let mut best: Option<(EntityId, f32)> = None;
        for &id in &self.last_visible {
            let Some(entity) = self.entities.get(&id) else {
                continue;
            };
            if !entity.is_enabled() {
                continue;
            }
            let aabb = entity.bounding_box_transformed();
            if !aabb.contains_point(&point) {
                continue;
            }
            let diagonal = aabb.dimensions().length();
            if best.map_or(true, |(_, smallest)| diagonal < smallest) {
                best = Some((id, diagonal));
            }
        }
        best.map(|(id, _)| id)
    }

    // ===== LOGGING API =====

    /// Set a custom logger
    ///
    /// Replace the default logger with a custom implementation (file logger, test capture, etc.)
    ///
    /// # Example
    ///
    /// ```no_run
    /// use galaxy_3d_visibility::galaxy3d::{Engine, log::{Logger, LogEntry}};
    ///
    /// struct FileLogger;
    /// impl Logger for FileLogger {
    ///     fn log(&self, entry: &LogEntry) {
    ///         // Write to file...
    ///     }
    /// }
    ///
    /// Engine::set_logger(FileLogger);
    /// ```
    pub fn set_logger<L: Logger + 'static>(logger: L) {
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger::default())));
        if let Ok(mut lock) = logger_lock.write() {
            *lock = Box::new(logger);
        }
    }

    /// Reset logger to default (DefaultLogger)
    pub fn reset_logger() {
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger::default())));
        if let Ok(mut lock) = logger_lock.write() {
            *lock = Box::new(DefaultLogger::default());
        }
    }

    /// Internal logging method (for simple logs without file:line)
    ///
    /// Used by macros like engine_info!, engine_warn!, etc.
    pub fn log(severity: LogSeverity, source: &str, message: String) {
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger::default())));
        if let Ok(lock) = logger_lock.read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: None,
                line: None,
            });
        }
    }

    /// Internal logging method with file:line information (for ERROR logs)
    ///
    /// Used by the engine_error! and engine_err! macros.
    pub fn log_detailed(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger::default())));
        if let Ok(lock) = logger_lock.read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: Some(file),
                line: Some(line),
            });
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
