use std::ops::Range;

use crate::domain::cluster::cluster_nodes::ClusterNodes;
use crate::domain::cluster::core_map::ClusterCoreMap;
use crate::domain::job_resources::job_resources::JobResources;
use crate::error::{Error, Result};

impl JobResources {
    /// Pairs each allocated node's bit range in `core_bitmap` with the
    /// offset of that node's first core in a cluster-wide core map.
    fn cluster_slices(&self, cluster: &ClusterNodes, map: &ClusterCoreMap) -> Result<Vec<(Range<usize>, usize)>> {
        if map.len() != cluster.total_cores() {
            return Err(Error::size_mismatch("cluster core map", cluster.total_cores(), map.len()));
        }
        if self.node_bitmap.len() != cluster.len() {
            return Err(Error::size_mismatch("node bitmap", cluster.len(), self.node_bitmap.len()));
        }

        self.node_bitmap
            .ones()
            .zip(self.layout.node_bit_ranges())
            .map(|(cluster_index, range)| {
                let cluster_cores = cluster.topology(cluster_index)?.cores();
                if cluster_cores != range.len() {
                    return Err(Error::size_mismatch("node core count", cluster_cores, range.len()));
                }
                Ok((range, cluster.core_offset(cluster_index)?))
            })
            .collect()
    }

    /// True if none of the granted cores is already busy in `map`.
    pub fn fits_into(&self, cluster: &ClusterNodes, map: &ClusterCoreMap) -> Result<bool> {
        for (range, base) in self.cluster_slices(cluster, map)? {
            let start = range.start;
            if range.filter(|&bit| self.core_bitmap.contains(bit)).any(|bit| map.cores.contains(base + bit - start)) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Marks the granted cores busy in `map`. Fails without touching `map`
    /// if any of them is already busy.
    pub fn add_to(&self, cluster: &ClusterNodes, map: &mut ClusterCoreMap) -> Result<()> {
        if !self.fits_into(cluster, map)? {
            log::warn!("Allocation '{}' overlaps cores that are already busy.", self.nodes);
            return Err(Error::AllocationConflict(format!("Allocation '{}' overlaps busy cores", self.nodes)));
        }

        for (range, base) in self.cluster_slices(cluster, map)? {
            let start = range.start;
            for bit in range.filter(|&bit| self.core_bitmap.contains(bit)) {
                map.cores.insert(base + bit - start);
            }
        }
        Ok(())
    }

    /// Clears the granted cores in `map`.
    pub fn remove_from(&self, cluster: &ClusterNodes, map: &mut ClusterCoreMap) -> Result<()> {
        for (range, base) in self.cluster_slices(cluster, map)? {
            let start = range.start;
            for bit in range.filter(|&bit| self.core_bitmap.contains(bit)) {
                map.cores.set(base + bit - start, false);
            }
        }
        Ok(())
    }
}
