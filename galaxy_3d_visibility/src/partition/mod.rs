//! Spatial partitions: the entity index behind visibility and proximity queries.

mod partition;
mod partition_config;
mod partition_none;
mod partition_octree;

pub use partition::Partition;
pub use partition_config::{PartitionConfig, PartitionType};
pub use partition_none::PartitionNone;
pub use partition_octree::{PartitionOctree, PoolStats};
