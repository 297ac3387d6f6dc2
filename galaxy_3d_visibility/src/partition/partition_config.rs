use crate::error::{Error, Result};

/// Deepest subdivision accepted between the top-level and the leaf size.
///
/// Subtrees are built eagerly, so a top-level cell costs
/// `(8^(levels + 1) - 1) / 7` nodes.
const MAX_SUBDIVISION_LEVELS: u32 = 5;

/// Which partition the engine creates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PartitionType {
    /// Multi-level octree grid (`PartitionOctree`)
    #[default]
    Octree,
    /// No spatial structure (`PartitionNone`)
    None,
}

/// Octree partition parameters
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionConfig {
    /// Edge length of leaf cells
    pub min_partition_size: f32,
    /// Edge length of top-level cells, `min_partition_size * 2^k`
    pub max_partition_size: f32,
    /// Added to the extent of inserted and queried volumes on each axis
    pub near_margin: f32,
    /// Upper bound on live top-level cells (`None` = unbounded)
    pub max_top_level_partitions: Option<usize>,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            min_partition_size: 4.0,
            max_partition_size: 16.0,
            near_margin: 0.2,
            max_top_level_partitions: None,
        }
    }
}

impl PartitionConfig {
    /// Check sizes, margin and budget.
    pub fn validate(&self) -> Result<()> {
        let min = self.min_partition_size;
        let max = self.max_partition_size;

        if !min.is_finite() || !max.is_finite() || min <= 0.0 {
            return Err(crate::engine_err!(
                Error::InvalidConfiguration,
                "galaxy3d::PartitionConfig",
                "Partition sizes must be finite and > 0 (min {}, max {})",
                min,
                max
            ));
        }

        let ratio = max / min;
        let levels = ratio.log2();
        if ratio < 1.0 || (levels - levels.round()).abs() > 1e-4 {
            return Err(crate::engine_err!(
                Error::InvalidConfiguration,
                "galaxy3d::PartitionConfig",
                "max_partition_size {} must be min_partition_size {} times a power of two",
                max,
                min
            ));
        }
        if levels.round() as u32 > MAX_SUBDIVISION_LEVELS {
            return Err(crate::engine_err!(
                Error::InvalidConfiguration,
                "galaxy3d::PartitionConfig",
                "{} subdivision levels requested, at most {} supported",
                levels.round(),
                MAX_SUBDIVISION_LEVELS
            ));
        }

        if !self.near_margin.is_finite() || self.near_margin < 0.0 {
            return Err(crate::engine_err!(
                Error::InvalidConfiguration,
                "galaxy3d::PartitionConfig",
                "near_margin must be finite and >= 0 (got {})",
                self.near_margin
            ));
        }

        if self.max_top_level_partitions == Some(0) {
            return Err(crate::engine_err!(
                Error::InvalidConfiguration,
                "galaxy3d::PartitionConfig",
                "max_top_level_partitions must be > 0"
            ));
        }

        Ok(())
    }

    /// Number of halvings from a top-level cell down to a leaf.
    pub fn subdivision_levels(&self) -> u32 {
        (self.max_partition_size / self.min_partition_size).log2().round().max(0.0) as u32
    }

    /// Nodes in one eagerly built top-level subtree.
    pub fn nodes_per_top_level_partition(&self) -> usize {
        (0..=self.subdivision_levels()).map(|level| 8usize.pow(level)).sum()
    }

    /// Leaves in one top-level subtree.
    pub fn leaves_per_top_level_partition(&self) -> usize {
        8usize.pow(self.subdivision_levels())
    }
}
