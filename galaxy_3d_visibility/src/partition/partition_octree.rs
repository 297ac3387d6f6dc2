/// PartitionOctree: dynamic multi-level grid index for visibility culling.
///
/// The world is cut into a coarse grid of top-level cells of edge
/// `max_partition_size`, keyed by integer grid coordinates. A top-level
/// cell is materialized the first time an entity's box reaches it, and its
/// whole subtree is built at once, halving the cell size at each level down
/// to `min_partition_size`. Only leaves hold entities.
///
/// An entity is stored in every leaf its (slightly expanded) box overlaps,
/// and the reverse membership map records those leaves so removal never
/// scans the tree. When a removal empties a whole top-level subtree, the
/// subtree is released back to the pools and dropped from the grid, which
/// keeps the index bounded to the occupied part of the world.
///
/// Nodes live in a `SlotMap` arena: parent and child links are keys, and
/// freed slots are reused by later subtrees. Child and entity lists come
/// from per-instance pools.

use std::fmt;
use glam::Vec3;
use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::{new_key_type, SlotMap};
use crate::camera::{Frustum, FrustumTest};
use crate::entity::{Entity, EntityId};
use crate::error::{Error, Result};
use crate::primitives::{AABB, BoundingVolume};
use crate::utils::Pool;
use super::partition::Partition;
use super::partition_config::PartitionConfig;

new_key_type! {
    /// Key of a node in the partition arena
    struct NodeKey;
}

/// Integer coordinates of a top-level cell
type CellCoord = (i32, i32, i32);

/// Child nodes of an internal node, or entities of a leaf
enum NodeContent {
    Internal(Vec<NodeKey>),
    Leaf(Vec<EntityId>),
}

/// A single grid cell
struct PartitionNode {
    /// Edge length
    size: f32,
    /// Grid coordinates at this node's size
    coord: CellCoord,
    /// `None` for top-level cells
    parent: Option<NodeKey>,
    /// `[coord * size, coord * size + size]` on each axis
    bounds: AABB,
    content: NodeContent,
}

/// Leaves an entity is stored in, plus the world box it was indexed with
struct Membership {
    leaves: Vec<NodeKey>,
    aabb: AABB,
}

/// Reusable output buffer of one query kind
#[derive(Default)]
struct QueryResults {
    entities: Vec<EntityId>,
    seen: FxHashSet<EntityId>,
    lookups: usize,
}

impl QueryResults {
    fn begin(&mut self) {
        self.entities.clear();
        self.seen.clear();
        self.lookups = 0;
    }

    fn insert(&mut self, id: EntityId) {
        if self.seen.insert(id) {
            self.entities.push(id);
        }
    }
}

/// Pool occupancy of a `PartitionOctree`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    pub nodes_in_use: usize,
    pub nodes_free: usize,
    pub sub_node_lists_in_use: usize,
    pub sub_node_lists_free: usize,
    pub entity_lists_in_use: usize,
    pub entity_lists_free: usize,
    pub membership_lists_in_use: usize,
    pub membership_lists_free: usize,
}

/// Octree grid partition.
///
/// # Example
///
/// ```
/// use galaxy_3d_visibility::galaxy3d::camera::Frustum;
/// use galaxy_3d_visibility::galaxy3d::entity::{Entity, EntityId};
/// use galaxy_3d_visibility::galaxy3d::partition::{Partition, PartitionOctree};
/// use galaxy_3d_visibility::galaxy3d::primitives::AABB;
/// use galaxy_3d_visibility::glam::Vec3;
///
/// struct Box1(EntityId);
///
/// impl Entity for Box1 {
///     fn id(&self) -> EntityId { self.0 }
///     fn bounding_box_transformed(&self) -> AABB {
///         AABB::new(Vec3::splat(-1.0), Vec3::splat(1.0))
///     }
/// }
///
/// let mut octree = PartitionOctree::new();
/// octree.add(&Box1(EntityId::new(1)))?;
///
/// let frustum = Frustum::from_aabb(&AABB::new(Vec3::splat(-5.0), Vec3::splat(5.0)));
/// assert_eq!(octree.visible_entities(&frustum), &[EntityId::new(1)]);
/// # Ok::<(), galaxy_3d_visibility::galaxy3d::Error>(())
/// ```
pub struct PartitionOctree {
    config: PartitionConfig,
    /// Node arena (slot reuse = node pool)
    nodes: SlotMap<NodeKey, PartitionNode>,
    /// Highest number of simultaneously live nodes, i.e. arena slots
    node_slots: usize,
    /// Top-level cells by grid coordinate
    top_level: FxHashMap<CellCoord, NodeKey>,
    /// Top-level cells in creation order (deterministic traversal)
    top_level_order: Vec<NodeKey>,
    memberships: FxHashMap<EntityId, Membership>,
    sub_node_lists: Pool<Vec<NodeKey>>,
    entity_lists: Pool<Vec<EntityId>>,
    membership_lists: Pool<Vec<NodeKey>>,
    visible: QueryResults,
    near: QueryResults,
    last_lookups: usize,
    anomalies: usize,
}

impl PartitionOctree {
    /// Create an empty octree with the default configuration
    /// (leaves 4, top-level cells 16, margin 0.2).
    pub fn new() -> Self {
        Self::from_valid_config(PartitionConfig::default())
    }

    /// Create an empty octree after validating `config`.
    pub fn with_config(config: PartitionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: PartitionConfig) -> Self {
        Self {
            config,
            nodes: SlotMap::with_key(),
            node_slots: 0,
            top_level: FxHashMap::default(),
            top_level_order: Vec::new(),
            memberships: FxHashMap::default(),
            sub_node_lists: Pool::new(),
            entity_lists: Pool::new(),
            membership_lists: Pool::new(),
            visible: QueryResults::default(),
            near: QueryResults::default(),
            last_lookups: 0,
            anomalies: 0,
        }
    }

    // ===== INTROSPECTION =====

    pub fn config(&self) -> &PartitionConfig {
        &self.config
    }

    /// Number of live top-level cells
    pub fn top_level_partition_count(&self) -> usize {
        self.top_level.len()
    }

    /// Number of live nodes, all levels included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of leaves an entity is currently stored in (0 if not indexed)
    pub fn leaf_count_of(&self, id: EntityId) -> usize {
        self.memberships.get(&id).map_or(0, |membership| membership.leaves.len())
    }

    /// Node and entity tests performed by the last query
    pub fn last_lookups(&self) -> usize {
        self.last_lookups
    }

    /// Consistency anomalies reported so far (remove of unindexed entities,
    /// release of non-empty nodes)
    pub fn anomaly_count(&self) -> usize {
        self.anomalies
    }

    pub fn pool_stats(&self) -> PoolStats {
        PoolStats {
            nodes_in_use: self.nodes.len(),
            nodes_free: self.node_slots - self.nodes.len(),
            sub_node_lists_in_use: self.sub_node_lists.in_use(),
            sub_node_lists_free: self.sub_node_lists.free_count(),
            entity_lists_in_use: self.entity_lists.in_use(),
            entity_lists_free: self.entity_lists.free_count(),
            membership_lists_in_use: self.membership_lists.in_use(),
            membership_lists_free: self.membership_lists.free_count(),
        }
    }

    // ===== GEOMETRY =====

    /// Axis-aligned box `center ± (extent + margin) / 2` around a volume.
    fn expanded_box(&self, volume: &dyn BoundingVolume) -> AABB {
        let margin = self.config.near_margin;
        let half_extension = Vec3::new(
            volume.dimension_on_axis(Vec3::X) + margin,
            volume.dimension_on_axis(Vec3::Y) + margin,
            volume.dimension_on_axis(Vec3::Z) + margin,
        ) * 0.5;
        AABB::from_center_half_extents(volume.center(), half_extension)
    }

    /// Lowest and highest usable top-level cell coordinate.
    ///
    /// Leaf coordinates are `coord << levels` and must fit in an `i32`.
    fn cell_limits(&self) -> (i32, i32) {
        let levels = self.config.subdivision_levels();
        (i32::MIN >> levels, i32::MAX >> levels)
    }

    /// Top-level cell index of a coordinate, unbounded
    fn cell_index(&self, value: f32) -> f64 {
        f64::from((value / self.config.max_partition_size).floor())
    }

    /// Inclusive range of top-level cells touched by a box, `None` when
    /// part of it lies outside the addressable grid.
    fn top_level_range(&self, aabb: &AABB) -> Option<(CellCoord, CellCoord)> {
        let (low, high) = self.cell_limits();
        let cell = |value: f32| {
            let index = self.cell_index(value);
            (index >= f64::from(low) && index <= f64::from(high)).then_some(index as i32)
        };
        Some((
            (cell(aabb.min.x)?, cell(aabb.min.y)?, cell(aabb.min.z)?),
            (cell(aabb.max.x)?, cell(aabb.max.y)?, cell(aabb.max.z)?),
        ))
    }

    /// Range of top-level cells touched by a box, clamped to the grid
    fn clamped_top_level_range(&self, aabb: &AABB) -> (CellCoord, CellCoord) {
        let (low, high) = self.cell_limits();
        let cell = |value: f32| self.cell_index(value).clamp(f64::from(low), f64::from(high)) as i32;
        (
            (cell(aabb.min.x), cell(aabb.min.y), cell(aabb.min.z)),
            (cell(aabb.max.x), cell(aabb.max.y), cell(aabb.max.z)),
        )
    }

    /// Number of cells in a range, `None` on overflow
    fn range_volume(min: CellCoord, max: CellCoord) -> Option<u64> {
        let extent = |low: i32, high: i32| u64::try_from(i64::from(high) - i64::from(low) + 1).ok();
        extent(min.0, max.0)?
            .checked_mul(extent(min.1, max.1)?)?
            .checked_mul(extent(min.2, max.2)?)
    }

    /// Top-level cells in a range, in y / x / z order
    fn cells_in_range(min: CellCoord, max: CellCoord) -> impl Iterator<Item = CellCoord> {
        (min.1..=max.1).flat_map(move |y| {
            (min.0..=max.0).flat_map(move |x| (min.2..=max.2).map(move |z| (x, y, z)))
        })
    }

    // ===== TREE CONSTRUCTION =====

    /// Create a node and, eagerly, its whole subtree down to leaf size.
    fn create_partition(
        &mut self,
        parent: Option<NodeKey>,
        coord: CellCoord,
        size: f32,
        levels: u32,
    ) -> NodeKey {
        let min = Vec3::new(coord.0 as f32, coord.1 as f32, coord.2 as f32) * size;
        let content = if levels > 0 {
            NodeContent::Internal(self.sub_node_lists.allocate())
        } else {
            NodeContent::Leaf(self.entity_lists.allocate())
        };

        let key = self.nodes.insert(PartitionNode {
            size,
            coord,
            parent,
            bounds: AABB::new(min, min + Vec3::splat(size)),
            content,
        });
        self.node_slots = self.node_slots.max(self.nodes.len());

        if levels > 0 {
            let half = size / 2.0;
            for dy in 0..2 {
                for dx in 0..2 {
                    for dz in 0..2 {
                        let child_coord = (coord.0 * 2 + dx, coord.1 * 2 + dy, coord.2 * 2 + dz);
                        let child = self.create_partition(Some(key), child_coord, half, levels - 1);
                        if let Some(PartitionNode { content: NodeContent::Internal(children), .. }) =
                            self.nodes.get_mut(key)
                        {
                            children.push(child);
                        }
                    }
                }
            }
        }

        key
    }

    /// Warn and build the error for an entity the budget cannot hold
    fn capacity_exceeded(&self, id: EntityId, required: &str, limit: usize) -> Error {
        crate::engine_warn!(
            "galaxy3d::PartitionOctree",
            "'{}' needs {} top level partitions, budget is {} ({} in use), not indexed",
            id,
            required,
            limit,
            self.top_level.len()
        );
        Error::CapacityExceeded(format!(
            "entity {} needs {} top level partitions, {} of {} in use",
            id,
            required,
            self.top_level.len(),
            limit
        ))
    }

    /// Materialize missing top-level cells of a range, honoring the budget.
    ///
    /// Nothing is created when the budget would be exceeded. A range larger
    /// than the budget is refused before any cell is enumerated.
    fn ensure_top_level(&mut self, id: EntityId, min: CellCoord, max: CellCoord) -> Result<()> {
        if let Some(limit) = self.config.max_top_level_partitions {
            // Live cells plus missing ones cover at least the whole range
            match Self::range_volume(min, max) {
                Some(volume) if volume <= limit as u64 => {}
                Some(volume) => return Err(self.capacity_exceeded(id, &volume.to_string(), limit)),
                None => return Err(self.capacity_exceeded(id, "more than 2^64", limit)),
            }
        }

        let missing: Vec<CellCoord> = Self::cells_in_range(min, max)
            .filter(|coord| !self.top_level.contains_key(coord))
            .collect();

        if let Some(limit) = self.config.max_top_level_partitions {
            if self.top_level.len() + missing.len() > limit {
                let required = format!("{} new", missing.len());
                return Err(self.capacity_exceeded(id, &required, limit));
            }
        }

        let levels = self.config.subdivision_levels();
        let size = self.config.max_partition_size;
        for coord in missing {
            let key = self.create_partition(None, coord, size, levels);
            self.top_level.insert(coord, key);
            self.top_level_order.push(key);
            crate::engine_trace!(
                "galaxy3d::PartitionOctree",
                "Created top level partition {}/{}/{}",
                coord.0,
                coord.1,
                coord.2
            );
        }

        Ok(())
    }

    /// Append `id` to every leaf under `key` overlapping `aabb`.
    fn add_to_partition_tree(&mut self, key: NodeKey, id: EntityId, aabb: &AABB, leaves: &mut Vec<NodeKey>) {
        let Some(node) = self.nodes.get_mut(key) else {
            return;
        };
        if !node.bounds.intersects(aabb) {
            return;
        }

        let child_count = match &mut node.content {
            NodeContent::Leaf(entities) => {
                entities.push(id);
                leaves.push(key);
                return;
            }
            NodeContent::Internal(children) => children.len(),
        };

        for index in 0..child_count {
            let child = match self.nodes.get(key).map(|node| &node.content) {
                Some(NodeContent::Internal(children)) => children[index],
                _ => return,
            };
            self.add_to_partition_tree(child, id, aabb, leaves);
        }
    }

    // ===== TREE DESTRUCTION =====

    /// Top-level cell a node belongs to
    fn top_level_root(&self, mut key: NodeKey) -> NodeKey {
        while let Some(parent) = self.nodes.get(key).and_then(|node| node.parent) {
            key = parent;
        }
        key
    }

    /// A leaf is empty iff its list is; an internal node iff all children are.
    fn is_partition_node_empty(&self, key: NodeKey) -> bool {
        match self.nodes.get(key).map(|node| &node.content) {
            Some(NodeContent::Leaf(entities)) => entities.is_empty(),
            Some(NodeContent::Internal(children)) => {
                children.iter().all(|&child| self.is_partition_node_empty(child))
            }
            None => true,
        }
    }

    /// Release a whole top-level subtree and drop it from the grid.
    ///
    /// Refuses (and releases nothing) if any leaf still holds entities.
    /// `remove_entity` only calls this for a root it found empty, so the
    /// refusal never fires from it; the check holds for direct callers.
    fn remove_top_level_partition(&mut self, key: NodeKey) -> Result<()> {
        let Some(coord) = self.nodes.get(key).map(|node| node.coord) else {
            return Ok(());
        };

        if !self.is_partition_node_empty(key) {
            self.anomalies += 1;
            crate::engine_error!(
                "galaxy3d::PartitionOctree",
                "Partition {}/{}/{} has entities attached",
                coord.0,
                coord.1,
                coord.2
            );
            return Err(Error::NodeNotEmpty(format!(
                "top level partition {}/{}/{}",
                coord.0, coord.1, coord.2
            )));
        }

        self.release_partition_node(key);
        self.top_level.remove(&coord);
        if let Some(position) = self.top_level_order.iter().position(|&root| root == key) {
            self.top_level_order.remove(position);
        }
        crate::engine_trace!(
            "galaxy3d::PartitionOctree",
            "Released top level partition {}/{}/{}",
            coord.0,
            coord.1,
            coord.2
        );
        Ok(())
    }

    /// Return a node, its subtree and their lists to the pools.
    fn release_partition_node(&mut self, key: NodeKey) {
        let Some(node) = self.nodes.remove(key) else {
            return;
        };
        match node.content {
            NodeContent::Leaf(entities) => self.entity_lists.release(entities),
            NodeContent::Internal(children) => {
                for &child in &children {
                    self.release_partition_node(child);
                }
                self.sub_node_lists.release(children);
            }
        }
    }

    // ===== ENTITY OPERATIONS =====

    fn add_entity(&mut self, entity: &dyn Entity) -> Result<()> {
        let id = entity.id();
        if self.memberships.contains_key(&id) {
            self.remove_entity(id)?;
        }

        let aabb = entity.bounding_box_transformed();
        if !aabb.is_valid() {
            crate::engine_warn!(
                "galaxy3d::PartitionOctree",
                "'{}' has a degenerate bounding box {:?}, not indexed",
                id,
                aabb
            );
            return Ok(());
        }

        let insertion_box = self.expanded_box(&aabb);
        let Some((min, max)) = self.top_level_range(&insertion_box) else {
            crate::engine_warn!(
                "galaxy3d::PartitionOctree",
                "'{}' bounding box {:?} lies outside the partition grid, not indexed",
                id,
                aabb
            );
            return Ok(());
        };
        self.ensure_top_level(id, min, max)?;

        let mut leaves = self.membership_lists.allocate();
        for coord in Self::cells_in_range(min, max) {
            if let Some(&root) = self.top_level.get(&coord) {
                self.add_to_partition_tree(root, id, &insertion_box, &mut leaves);
            }
        }
        self.memberships.insert(id, Membership { leaves, aabb });
        Ok(())
    }

    fn remove_entity(&mut self, id: EntityId) -> Result<()> {
        let Some(membership) = self.memberships.remove(&id) else {
            self.anomalies += 1;
            crate::engine_warn!("galaxy3d::PartitionOctree", "'{}' not registered", id);
            return Err(Error::EntityNotIndexed(id));
        };

        let mut leaves = membership.leaves;
        let mut release_error = None;
        while let Some(leaf) = leaves.pop() {
            let emptied = match self.nodes.get_mut(leaf).map(|node| &mut node.content) {
                Some(NodeContent::Leaf(entities)) => {
                    if let Some(position) = entities.iter().position(|&entity| entity == id) {
                        entities.remove(position);
                    }
                    entities.is_empty()
                }
                _ => false,
            };

            if emptied {
                let root = self.top_level_root(leaf);
                // Other leaves of the subtree may still hold entities
                if self.is_partition_node_empty(root) {
                    if let Err(error) = self.remove_top_level_partition(root) {
                        release_error.get_or_insert(error);
                    }
                }
            }
        }
        self.membership_lists.release(leaves);

        match release_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    // ===== QUERIES =====

    fn collect_visible(
        nodes: &SlotMap<NodeKey, PartitionNode>,
        memberships: &FxHashMap<EntityId, Membership>,
        key: NodeKey,
        frustum: &Frustum,
        parent_inside: bool,
        results: &mut QueryResults,
    ) {
        let Some(node) = nodes.get(key) else {
            return;
        };

        let classification = if parent_inside {
            FrustumTest::Inside
        } else {
            results.lookups += 1;
            frustum.classify_aabb(&node.bounds)
        };
        if classification == FrustumTest::Outside {
            return;
        }
        let inside = classification == FrustumTest::Inside;

        match &node.content {
            NodeContent::Internal(children) => {
                for &child in children {
                    Self::collect_visible(nodes, memberships, child, frustum, inside, results);
                }
            }
            NodeContent::Leaf(entities) => {
                for &id in entities {
                    if results.seen.contains(&id) {
                        continue;
                    }
                    let Some(membership) = memberships.get(&id) else {
                        continue;
                    };
                    results.lookups += 1;
                    // Touching a cell that is inside the frustum means part of the box is visible
                    let visible = (inside && membership.aabb.intersects(&node.bounds))
                        || frustum.is_aabb_visible(&membership.aabb);
                    if visible {
                        results.insert(id);
                    }
                }
            }
        }
    }

    fn collect_near(
        nodes: &SlotMap<NodeKey, PartitionNode>,
        key: NodeKey,
        query: &AABB,
        results: &mut QueryResults,
    ) {
        let Some(node) = nodes.get(key) else {
            return;
        };
        results.lookups += 1;
        if !node.bounds.intersects(query) {
            return;
        }

        match &node.content {
            NodeContent::Internal(children) => {
                for &child in children {
                    Self::collect_near(nodes, child, query, results);
                }
            }
            NodeContent::Leaf(entities) => {
                for &id in entities {
                    results.insert(id);
                }
            }
        }
    }

    fn query_near(&mut self, query: AABB) -> &[EntityId] {
        self.near.begin();

        let (min, max) = self.clamped_top_level_range(&query);
        let scan_range = Self::range_volume(min, max)
            .is_some_and(|volume| volume <= self.top_level_order.len() as u64);
        if scan_range {
            for coord in Self::cells_in_range(min, max) {
                if let Some(&root) = self.top_level.get(&coord) {
                    Self::collect_near(&self.nodes, root, &query, &mut self.near);
                }
            }
        } else {
            // Query spans more cells than exist: walk the live ones instead
            for &root in &self.top_level_order {
                Self::collect_near(&self.nodes, root, &query, &mut self.near);
            }
        }
        self.last_lookups = self.near.lookups;
        &self.near.entities
    }

    fn fmt_node(&self, f: &mut fmt::Formatter<'_>, key: NodeKey, depth: usize) -> fmt::Result {
        let Some(node) = self.nodes.get(key) else {
            return Ok(());
        };
        if self.is_partition_node_empty(key) {
            return Ok(());
        }

        let indent = "  ".repeat(depth);
        let (x, y, z) = node.coord;
        match &node.content {
            NodeContent::Internal(children) => {
                writeln!(f, "{}{}/{}/{} size {}", indent, x, y, z, node.size)?;
                for &child in children {
                    self.fmt_node(f, child, depth + 1)?;
                }
            }
            NodeContent::Leaf(entities) => {
                let ids: Vec<String> = entities.iter().map(|id| id.to_string()).collect();
                writeln!(f, "{}{}/{}/{} size {}: [{}]", indent, x, y, z, node.size, ids.join(", "))?;
            }
        }
        Ok(())
    }
}

impl Default for PartitionOctree {
    fn default() -> Self {
        Self::new()
    }
}

// ===== PARTITION TRAIT =====

impl Partition for PartitionOctree {
    fn reset(&mut self) {
        *self = Self::from_valid_config(self.config.clone());
    }

    fn add(&mut self, entity: &dyn Entity) -> Result<()> {
        self.add_entity(entity)
    }

    fn update(&mut self, entity: &dyn Entity) -> Result<()> {
        // Full re-insertion: add removes the previous membership first
        self.add_entity(entity)
    }

    fn remove(&mut self, entity: &dyn Entity) -> Result<()> {
        self.remove_entity(entity.id())
    }

    fn contains(&self, id: EntityId) -> bool {
        self.memberships.contains_key(&id)
    }

    fn entity_count(&self) -> usize {
        self.memberships.len()
    }

    fn visible_entities(&mut self, frustum: &Frustum) -> &[EntityId] {
        self.visible.begin();

        for &root in &self.top_level_order {
            Self::collect_visible(&self.nodes, &self.memberships, root, frustum, false, &mut self.visible);
        }
        self.last_lookups = self.visible.lookups;
        &self.visible.entities
    }

    fn objects_near_to(&mut self, volume: &dyn BoundingVolume) -> &[EntityId] {
        let query = self.expanded_box(volume);
        self.query_near(query)
    }

    fn objects_near_to_point(&mut self, point: Vec3) -> &[EntityId] {
        let half_margin = Vec3::splat(self.config.near_margin * 0.5);
        self.query_near(AABB::from_center_half_extents(point, half_margin))
    }
}

impl fmt::Display for PartitionOctree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "PartitionOctree: {} top level partitions, {} nodes, {} entities",
            self.top_level.len(),
            self.nodes.len(),
            self.memberships.len()
        )?;
        for &root in &self.top_level_order {
            self.fmt_node(f, root, 1)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "partition_octree_tests.rs"]
mod tests;
