//! Unit tests for the Engine
//!
//! Tests configuration, entity registry / partition synchronization,
//! visibility and picking queries, and the logging API.
//!
//! IMPORTANT: LOGGER is a global OnceLock shared across all tests.
//! Tests that swap the logger are marked with #[serial].

use std::cell::Cell;
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use glam::Vec3;
use serial_test::serial;
use crate::galaxy3d::{Engine, EngineConfig, Error};
use crate::galaxy3d::log::{Logger, LogEntry, LogSeverity};
use crate::entity::{Entity, EntityId};
use crate::camera::Frustum;
use crate::partition::{Partition, PartitionConfig, PartitionNone, PartitionOctree, PartitionType};
use crate::primitives::{AABB, BoundingVolume, Sphere};

// ============================================================================
// TEST HELPERS
// ============================================================================

/// Entity whose box and enabled flag can be changed after registration
#[derive(Clone)]
struct TestEntity {
    id: EntityId,
    aabb: Rc<Cell<AABB>>,
    enabled: Rc<Cell<bool>>,
}

impl TestEntity {
    fn new(id: u64, min: Vec3, max: Vec3) -> Self {
        Self {
            id: EntityId::new(id),
            aabb: Rc::new(Cell::new(AABB::new(min, max))),
            enabled: Rc::new(Cell::new(true)),
        }
    }

    /// Box of half size `half` centered on `center`
    fn around(id: u64, center: Vec3, half: f32) -> Self {
        Self::new(id, center - Vec3::splat(half), center + Vec3::splat(half))
    }

    fn move_to(&self, center: Vec3) {
        let half = self.aabb.get().dimensions() * 0.5;
        self.aabb.set(AABB::from_center_half_extents(center, half));
    }
}

impl Entity for TestEntity {
    fn id(&self) -> EntityId {
        self.id
    }

    fn bounding_box_transformed(&self) -> AABB {
        self.aabb.get()
    }

    fn is_enabled(&self) -> bool {
        self.enabled.get()
    }
}

/// Center of the default camera's view (look_at)
const TARGET: Vec3 = Vec3::new(0.0, 50.0, 0.0);

fn create_engine() -> Engine {
    Engine::new(EngineConfig::default()).unwrap()
}

fn sorted(ids: &[EntityId]) -> Vec<EntityId> {
    let mut ids = ids.to_vec();
    ids.sort();
    ids
}

/// Test logger that captures log entries of the creating thread
struct TestLogger {
    thread: ThreadId,
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl TestLogger {
    fn install() -> Arc<Mutex<Vec<LogEntry>>> {
        let entries = Arc::new(Mutex::new(Vec::new()));
        Engine::set_logger(TestLogger { thread: thread::current().id(), entries: entries.clone() });
        entries
    }
}

impl Logger for TestLogger {
    fn log(&self, entry: &LogEntry) {
        if thread::current().id() == self.thread {
            self.entries.lock().unwrap().push(entry.clone());
        }
    }
}

/// Flat partition whose `remove` always fails
struct StickyPartition(PartitionNone);

impl Partition for StickyPartition {
    fn reset(&mut self) {
        self.0.reset();
    }

    fn add(&mut self, entity: &dyn Entity) -> crate::error::Result<()> {
        self.0.add(entity)
    }

    fn update(&mut self, entity: &dyn Entity) -> crate::error::Result<()> {
        self.0.update(entity)
    }

    fn remove(&mut self, _entity: &dyn Entity) -> crate::error::Result<()> {
        Err(Error::NodeNotEmpty("sticky".to_string()))
    }

    fn contains(&self, id: EntityId) -> bool {
        self.0.contains(id)
    }

    fn entity_count(&self) -> usize {
        self.0.entity_count()
    }

    fn visible_entities(&mut self, frustum: &Frustum) -> &[EntityId] {
        self.0.visible_entities(frustum)
    }

    fn objects_near_to(&mut self, volume: &dyn BoundingVolume) -> &[EntityId] {
        self.0.objects_near_to(volume)
    }

    fn objects_near_to_point(&mut self, point: Vec3) -> &[EntityId] {
        self.0.objects_near_to_point(point)
    }
}

// ============================================================================
// CONFIGURATION TESTS
// ============================================================================

#[test]
fn test_engine_default_config() {
    let engine = create_engine();
    assert_eq!(engine.entity_count(), 0);
    assert_eq!(engine.camera().z_near(), 10.0);
    assert_eq!(engine.camera().z_far(), 4000.0);
    assert_eq!(engine.config().partition_type, PartitionType::Octree);
}

#[test]
fn test_engine_rejects_invalid_config() {
    let bad_clip = EngineConfig { z_near: 0.0, ..Default::default() };
    assert!(matches!(Engine::new(bad_clip), Err(Error::InvalidConfiguration(_))));

    let bad_partition = EngineConfig {
        partition: PartitionConfig { min_partition_size: 3.0, ..Default::default() },
        ..Default::default()
    };
    assert!(matches!(Engine::new(bad_partition), Err(Error::InvalidConfiguration(_))));

    // Octree parameters are not used by the flat partition
    let flat = EngineConfig {
        partition_type: PartitionType::None,
        partition: PartitionConfig { min_partition_size: 3.0, ..Default::default() },
        ..Default::default()
    };
    assert!(Engine::new(flat).is_ok());
}

// ============================================================================
// ENTITY REGISTRY TESTS
// ============================================================================

#[test]
fn test_add_entity_indexes_enabled_entity() {
    let mut engine = create_engine();
    engine.add_entity(Box::new(TestEntity::around(1, TARGET, 1.0))).unwrap();

    assert_eq!(engine.entity_count(), 1);
    assert!(engine.partition().contains(EntityId::new(1)));
    assert!(engine.entity(EntityId::new(1)).is_some());
}

#[test]
fn test_disabled_entity_is_registered_not_indexed() {
    let mut engine = create_engine();
    let entity = TestEntity::around(1, TARGET, 1.0);
    entity.enabled.set(false);
    engine.add_entity(Box::new(entity.clone())).unwrap();

    assert_eq!(engine.entity_count(), 1);
    assert!(!engine.partition().contains(entity.id));
    assert!(engine.compute_visible_entities(800, 600).is_empty());

    // Enabling takes effect on the next update
    entity.enabled.set(true);
    engine.update_entity(entity.id).unwrap();
    assert_eq!(engine.compute_visible_entities(800, 600), &[entity.id]);

    entity.enabled.set(false);
    engine.update_entity(entity.id).unwrap();
    assert!(!engine.partition().contains(entity.id));
}

#[test]
fn test_add_entity_replaces_same_id() {
    let mut engine = create_engine();
    engine.add_entity(Box::new(TestEntity::around(1, Vec3::new(0.0, 50.0, 2000.0), 1.0))).unwrap();
    engine.add_entity(Box::new(TestEntity::around(1, TARGET, 1.0))).unwrap();

    assert_eq!(engine.entity_count(), 1);
    assert_eq!(engine.partition().entity_count(), 1);
    assert_eq!(engine.compute_visible_entities(800, 600), &[EntityId::new(1)]);
}

#[test]
fn test_update_entity_follows_movement() {
    let mut engine = create_engine();
    let entity = TestEntity::around(1, TARGET, 1.0);
    engine.add_entity(Box::new(entity.clone())).unwrap();
    assert_eq!(engine.compute_visible_entities(800, 600), &[entity.id]);

    // Behind the camera
    entity.move_to(Vec3::new(0.0, 50.0, 600.0));
    engine.update_entity(entity.id).unwrap();
    assert!(engine.compute_visible_entities(800, 600).is_empty());

    entity.move_to(Vec3::new(20.0, 40.0, -100.0));
    engine.update_entity(entity.id).unwrap();
    assert_eq!(engine.compute_visible_entities(800, 600), &[entity.id]);
}

#[test]
fn test_update_unknown_entity() {
    let mut engine = create_engine();
    assert_eq!(
        engine.update_entity(EntityId::new(42)),
        Err(Error::EntityNotIndexed(EntityId::new(42)))
    );
}

#[test]
fn test_remove_entity() {
    let mut engine = create_engine();
    engine.add_entity(Box::new(TestEntity::around(1, TARGET, 1.0))).unwrap();
    engine.add_entity(Box::new(TestEntity::around(2, TARGET, 2.0))).unwrap();
    engine.compute_visible_entities(800, 600);

    let removed = engine.remove_entity(EntityId::new(1));
    assert_eq!(removed.map(|entity| entity.id()), Some(EntityId::new(1)));
    assert!(!engine.partition().contains(EntityId::new(1)));
    assert_eq!(engine.last_visible_entities(), &[EntityId::new(2)]);
    assert_eq!(engine.compute_visible_entities(800, 600), &[EntityId::new(2)]);

    assert!(engine.remove_entity(EntityId::new(1)).is_none());
}

#[test]
#[serial]
fn test_remove_entity_when_partition_refuses() {
    let mut engine = create_engine();
    engine.add_entity(Box::new(TestEntity::around(1, TARGET, 1.0))).unwrap();
    engine.set_partition(Box::new(StickyPartition(PartitionNone::new()))).unwrap();

    let entries = TestLogger::install();
    let removed = engine.remove_entity(EntityId::new(1));
    let entries = entries.lock().unwrap().clone();
    Engine::reset_logger();

    assert_eq!(removed.map(|entity| entity.id()), Some(EntityId::new(1)));
    assert_eq!(engine.entity_count(), 0);

    let reports: Vec<&LogEntry> = entries
        .iter()
        .filter(|entry| entry.source == "galaxy3d::Engine" && entry.severity == LogSeverity::Debug)
        .collect();
    assert_eq!(reports.len(), 1);
    assert!(reports[0].message.contains("'1'"));
    assert!(reports[0].message.contains("sticky"));
}

#[test]
fn test_reset_drops_entities() {
    let mut engine = create_engine();
    for id in 0..10 {
        engine.add_entity(Box::new(TestEntity::around(id, TARGET + Vec3::X * id as f32, 0.5))).unwrap();
    }
    engine.reset();

    assert_eq!(engine.entity_count(), 0);
    assert_eq!(engine.partition().entity_count(), 0);
    assert!(engine.compute_visible_entities(800, 600).is_empty());
}

// ============================================================================
// PARTITION TESTS
// ============================================================================

#[test]
fn test_visible_entities_with_octree() {
    let mut engine = create_engine();
    engine.add_entity(Box::new(TestEntity::around(1, TARGET, 1.0))).unwrap();
    engine.add_entity(Box::new(TestEntity::around(2, Vec3::new(-30.0, 60.0, -250.0), 3.0))).unwrap();
    engine.add_entity(Box::new(TestEntity::around(3, Vec3::new(0.0, 50.0, 800.0), 1.0))).unwrap(); // behind
    engine.add_entity(Box::new(TestEntity::around(4, Vec3::new(2000.0, 50.0, 0.0), 1.0))).unwrap(); // far left

    let visible = sorted(engine.compute_visible_entities(800, 600));
    assert_eq!(visible, vec![EntityId::new(1), EntityId::new(2)]);
}

#[test]
fn test_flat_partition_returns_everything() {
    let config = EngineConfig { partition_type: PartitionType::None, ..Default::default() };
    let mut engine = Engine::new(config).unwrap();
    engine.add_entity(Box::new(TestEntity::around(1, TARGET, 1.0))).unwrap();
    engine.add_entity(Box::new(TestEntity::around(2, Vec3::new(0.0, 50.0, 800.0), 1.0))).unwrap();

    assert_eq!(engine.compute_visible_entities(800, 600).len(), 2);
}

#[test]
fn test_set_partition_reindexes_enabled_entities() {
    let mut engine = create_engine();
    engine.add_entity(Box::new(TestEntity::around(1, TARGET, 1.0))).unwrap();
    let hidden = TestEntity::around(2, TARGET, 1.0);
    hidden.enabled.set(false);
    engine.add_entity(Box::new(hidden)).unwrap();

    engine.set_partition(Box::new(PartitionNone::new())).unwrap();
    assert_eq!(engine.partition().entity_count(), 1);
    assert!(engine.partition().contains(EntityId::new(1)));

    engine.set_partition(Box::new(PartitionOctree::new())).unwrap();
    assert_eq!(engine.compute_visible_entities(800, 600), &[EntityId::new(1)]);
}

#[test]
fn test_objects_near() {
    let mut engine = create_engine();
    engine.add_entity(Box::new(TestEntity::around(1, Vec3::new(1.5, 1.5, 1.5), 0.5))).unwrap();
    engine.add_entity(Box::new(TestEntity::around(2, Vec3::new(40.0, 1.5, 1.5), 0.5))).unwrap();

    assert_eq!(engine.objects_near_to_point(Vec3::splat(2.0)), &[EntityId::new(1)]);
    assert_eq!(engine.objects_near_to(&Sphere::new(Vec3::new(40.0, 1.0, 1.0), 1.0)), &[EntityId::new(2)]);
    assert!(engine.objects_near_to_point(Vec3::splat(-500.0)).is_empty());
}

// ============================================================================
// PICKING TESTS
// ============================================================================

#[test]
fn test_entity_by_world_position_prefers_smallest_box() {
    let mut engine = create_engine();
    engine.add_entity(Box::new(TestEntity::around(1, TARGET, 10.0))).unwrap();
    engine.add_entity(Box::new(TestEntity::around(2, TARGET, 2.0))).unwrap();

    // Nothing computed yet
    assert_eq!(engine.entity_by_world_position(TARGET), None);

    engine.compute_visible_entities(800, 600);
    assert_eq!(engine.entity_by_world_position(TARGET), Some(EntityId::new(2)));
    assert_eq!(engine.entity_by_world_position(TARGET + Vec3::splat(5.0)), Some(EntityId::new(1)));
    assert_eq!(engine.entity_by_world_position(TARGET + Vec3::splat(50.0)), None);
}

#[test]
fn test_entity_by_world_position_ignores_invisible() {
    let mut engine = create_engine();
    let behind = Vec3::new(0.0, 50.0, 800.0);
    engine.add_entity(Box::new(TestEntity::around(1, behind, 1.0))).unwrap();
    engine.compute_visible_entities(800, 600);

    assert_eq!(engine.entity_by_world_position(behind), None);
}

// ============================================================================
// LOGGING API TESTS
// ============================================================================

#[test]
#[serial]
fn test_set_logger_captures_entries() {
    let entries = TestLogger::install();

    Engine::log(LogSeverity::Info, "galaxy3d::Test", "hello".to_string());
    Engine::log_detailed(LogSeverity::Error, "galaxy3d::Test", "boom".to_string(), "engine.rs", 42);

    let entries = entries.lock().unwrap().clone();
    Engine::reset_logger();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].severity, LogSeverity::Info);
    assert_eq!(entries[0].message, "hello");
    assert_eq!(entries[0].file, None);
    assert_eq!(entries[1].file, Some("engine.rs"));
    assert_eq!(entries[1].line, Some(42));
}

#[test]
#[serial]
fn test_reset_logger_detaches_custom_logger() {
    let entries = TestLogger::install();
    Engine::reset_logger();

    Engine::log(LogSeverity::Info, "galaxy3d::Test", "not captured".to_string());
    assert!(entries.lock().unwrap().is_empty());
}

#[test]
#[serial]
fn test_update_unknown_entity_is_logged() {
    let mut engine = create_engine();
    let entries = TestLogger::install();

    let _ = engine.update_entity(EntityId::new(7));

    let entries = entries.lock().unwrap().clone();
    Engine::reset_logger();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].severity, LogSeverity::Warn);
    assert_eq!(entries[0].source, "galaxy3d::Engine");
}
