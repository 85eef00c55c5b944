use fixedbitset::FixedBitSet;

use crate::domain::cluster::cluster_nodes::ClusterNodes;
use crate::domain::job_resources::cpu_array::CpuArray;
use crate::domain::job_resources::job_resources::JobResources;
use crate::error::{Error, Result};

impl JobResources {
    /// Removes the nodes set in `released` (a cluster-wide node bitmap) from
    /// the allocation and rebuilds every derived field for the rest.
    ///
    /// Step usage on the released nodes is dropped without checking; callers
    /// must drain steps first.
    pub fn release_nodes(&mut self, cluster: &ClusterNodes, released: &FixedBitSet) -> Result<()> {
        if released.len() != self.node_bitmap.len() {
            return Err(Error::size_mismatch("released node bitmap", self.node_bitmap.len(), released.len()));
        }

        if !released.is_subset(&self.node_bitmap) {
            let strays = released
                .difference(&self.node_bitmap)
                .map(|index| cluster.name(index).map(str::to_string).unwrap_or_else(|_| format!("#{}", index)))
                .collect::<Vec<_>>();
            log::warn!("Refusing to release nodes {:?}, they are not part of allocation '{}'.", strays, self.nodes);
            return Err(Error::InvalidArgument(format!("Nodes {:?} are not part of allocation '{}'", strays, self.nodes)));
        }

        if released.count_ones(..) == 0 {
            return Ok(());
        }

        let keep: Vec<bool> = self.node_bitmap.ones().map(|index| !released.contains(index)).collect();
        let layout = self.layout.retain(|node| keep[node]);

        let mut core_bitmap = FixedBitSet::with_capacity(layout.total_bits());
        let mut core_bitmap_used = FixedBitSet::with_capacity(layout.total_bits());
        let mut next_bit = 0usize;

        for (node, old_range) in self.layout.node_bit_ranges().enumerate() {
            if !keep[node] {
                continue;
            }
            for old_bit in old_range.clone() {
                let new_bit = next_bit + (old_bit - old_range.start);
                core_bitmap.set(new_bit, self.core_bitmap.contains(old_bit));
                core_bitmap_used.set(new_bit, self.core_bitmap_used.contains(old_bit));
            }
            next_bit += old_range.len();
        }

        let mut node_bitmap = self.node_bitmap.clone();
        node_bitmap.difference_with(released);

        let nodes = cluster.hostlist_from_bitmap(&node_bitmap)?;
        let cpus = retain_by(&self.cpus, &keep);
        let ncpus = cpus.iter().map(|&c| c as u32).sum();

        let shrunk = JobResources {
            core_bitmap,
            core_bitmap_used,
            cpu_array: CpuArray::compact(&cpus),
            cpus_used: retain_by(&self.cpus_used, &keep),
            cpus,
            memory_allocated: retain_by(&self.memory_allocated, &keep),
            memory_used: retain_by(&self.memory_used, &keep),
            nhosts: layout.nhosts() as u32,
            layout,
            node_bitmap,
            node_req: self.node_req,
            nodes,
            ncpus,
            whole_node: self.whole_node,
        };

        log::info!(
            "Allocation '{}' shrunk to '{}' ({} -> {} node(s), {} -> {} cpu(s)).",
            self.nodes,
            shrunk.nodes,
            self.nhosts,
            shrunk.nhosts,
            self.ncpus,
            shrunk.ncpus
        );

        *self = shrunk;
        Ok(())
    }

    /// Same as [`JobResources::release_nodes`] with nodes given as a hostlist expression.
    pub fn release_node_names(&mut self, cluster: &ClusterNodes, expression: &str) -> Result<()> {
        let released = cluster.node_bitmap_from_names(expression)?;
        self.release_nodes(cluster, &released)
    }
}

fn retain_by<T: Copy>(values: &[T], keep: &[bool]) -> Vec<T> {
    values.iter().zip(keep).filter(|(_, keep)| **keep).map(|(value, _)| *value).collect()
}
