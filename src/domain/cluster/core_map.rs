use fixedbitset::FixedBitSet;

use crate::domain::cluster::cluster_nodes::ClusterNodes;
use crate::domain::utils::bit_fmt;

/// Occupancy of every core in the cluster, addressed through
/// [`ClusterNodes::core_offset`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterCoreMap {
    pub(crate) cores: FixedBitSet,
}

impl ClusterCoreMap {
    /// An empty map sized for `cluster`.
    pub fn new(cluster: &ClusterNodes) -> Self {
        Self { cores: FixedBitSet::with_capacity(cluster.total_cores()) }
    }

    pub fn len(&self) -> usize {
        self.cores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cores.len() == 0
    }

    pub fn count_busy(&self) -> usize {
        self.cores.count_ones(..)
    }

    pub fn is_busy(&self, offset: usize) -> bool {
        self.cores.contains(offset)
    }

    pub fn bitmap(&self) -> &FixedBitSet {
        &self.cores
    }
}

impl std::fmt::Display for ClusterCoreMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{} busy [{}]", self.count_busy(), self.len(), bit_fmt::format(&self.cores))
    }
}
