use std::collections::BTreeSet;

use crate::domain::job_resources::job_resources::{JobResources, count_cpus};
use crate::domain::job_resources::layout::CoreCoord;
use crate::error::{Error, Result};

impl JobResources {
    /// Marks the cores at `core_offsets` as used (`allocated = true`) or
    /// free (`allocated = false`) by a step and recomputes `cpus_used` of
    /// the touched nodes.
    ///
    /// Marking a core that is not granted, or is already in use, is an
    /// allocation conflict, as is freeing a core that is not in use. On any
    /// error nothing is changed.
    pub fn mark_step_cores(&mut self, core_offsets: &[usize], allocated: bool) -> Result<()> {
        let mut used = self.core_bitmap_used.clone();
        let mut touched_nodes = BTreeSet::new();

        for &offset in core_offsets {
            if offset >= self.core_bitmap.len() {
                return Err(Error::out_of_range("core bit", offset, self.core_bitmap.len()));
            }

            if allocated {
                if !self.core_bitmap.contains(offset) {
                    log::warn!("Step requested core bit {} which is not granted to '{}'.", offset, self.nodes);
                    return Err(Error::AllocationConflict(format!("Core bit {} is not granted to the allocation", offset)));
                }
                if used.put(offset) {
                    log::warn!("Step requested core bit {} of '{}' which is already in use.", offset, self.nodes);
                    return Err(Error::AllocationConflict(format!("Core bit {} is already in use", offset)));
                }
            } else {
                if !used.contains(offset) {
                    log::warn!("Step released core bit {} of '{}' which is not in use.", offset, self.nodes);
                    return Err(Error::AllocationConflict(format!("Core bit {} is not in use", offset)));
                }
                used.set(offset, false);
            }

            touched_nodes.insert(self.layout.core_coord(offset)?.node);
        }

        let mut cpus_used = self.cpus_used.clone();
        for &node in &touched_nodes {
            cpus_used[node] = count_cpus(&used, self.layout.node_bit_range(node)?)?;
        }

        self.core_bitmap_used = used;
        self.cpus_used = cpus_used;

        log::debug!(
            "{} {} core(s) on {} node(s) of '{}'.",
            if allocated { "Marked" } else { "Released" },
            core_offsets.len(),
            touched_nodes.len(),
            self.nodes
        );
        Ok(())
    }

    /// [`JobResources::mark_step_cores`] addressed by `(node, socket, core)`.
    pub fn mark_step_coords(&mut self, coords: &[CoreCoord], allocated: bool) -> Result<()> {
        let offsets = coords.iter().map(|&coord| self.layout.coord_offset(coord)).collect::<Result<Vec<_>>>()?;
        self.mark_step_cores(&offsets, allocated)
    }

    /// Adds (`allocated = true`) or returns `mb` of memory used by a step on `node`.
    pub fn mark_step_memory(&mut self, node: usize, mb: u64, allocated: bool) -> Result<()> {
        self.check_node_index(node)?;

        let used = self.memory_used[node];
        let limit = self.memory_allocated[node];

        let updated = if allocated {
            used.checked_add(mb).filter(|&total| total <= limit).ok_or_else(|| {
                Error::AllocationConflict(format!("Node {} has {} of {} MB in use, cannot add {} MB", node, used, limit, mb))
            })?
        } else {
            used.checked_sub(mb)
                .ok_or_else(|| Error::AllocationConflict(format!("Node {} has only {} MB in use, cannot return {} MB", node, used, mb)))?
        };

        self.memory_used[node] = updated;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cluster::cluster_nodes::{ClusterNodes, NodeTopology};
    use crate::domain::job_resources::allocation_request::AllocationRequest;
    use fixedbitset::FixedBitSet;

    fn half_granted() -> JobResources {
        // 2 nodes, 1 socket x 4 cores; only cores 0-1 of each node granted.
        let cluster = ClusterNodes::uniform("node", 2, NodeTopology::new(1, 4), 0).unwrap();
        let node_bitmap = cluster.node_bitmap_from_names("node[0-1]").unwrap();
        let mut core_bitmap = FixedBitSet::with_capacity(8);
        core_bitmap.insert_range(0..2);
        core_bitmap.insert_range(4..6);
        let request = AllocationRequest { node_bitmap, core_bitmap, memory_allocated: vec![1000, 1000], node_req: Default::default(), whole_node: false };
        JobResources::build(&cluster, request).unwrap()
    }

    #[test]
    fn test_mark_and_release() {
        let mut job_resources = half_granted();

        job_resources.mark_step_cores(&[0, 4, 5], true).unwrap();
        assert_eq!(job_resources.cpus_used(), &[1, 2]);

        job_resources.mark_step_cores(&[5], false).unwrap();
        assert_eq!(job_resources.cpus_used(), &[1, 1]);
        assert_eq!(job_resources.core_bitmap_used().ones().collect::<Vec<_>>(), vec![0, 4]);
    }

    #[test]
    fn test_conflicts_leave_state_unchanged() {
        let mut job_resources = half_granted();
        job_resources.mark_step_cores(&[0], true).unwrap();
        let before = job_resources.clone();

        assert!(matches!(job_resources.mark_step_cores(&[1, 2], true), Err(Error::AllocationConflict(_))));
        assert!(matches!(job_resources.mark_step_cores(&[1, 0], true), Err(Error::AllocationConflict(_))));
        assert!(matches!(job_resources.mark_step_cores(&[1, 1], true), Err(Error::AllocationConflict(_))));
        assert!(matches!(job_resources.mark_step_cores(&[4], false), Err(Error::AllocationConflict(_))));
        assert!(matches!(job_resources.mark_step_cores(&[8], true), Err(Error::OutOfRange { .. })));

        assert_eq!(job_resources, before);
    }

    #[test]
    fn test_mark_by_coords() {
        let mut job_resources = half_granted();

        job_resources.mark_step_coords(&[CoreCoord::new(1, 0, 1)], true).unwrap();

        assert!(job_resources.core_bitmap_used().contains(5));
        assert!(matches!(job_resources.mark_step_coords(&[CoreCoord::new(2, 0, 0)], true), Err(Error::OutOfRange { what: "node", .. })));
    }

    #[test]
    fn test_memory_accounting_bounds() {
        let mut job_resources = half_granted();

        job_resources.mark_step_memory(0, 600, true).unwrap();
        assert!(matches!(job_resources.mark_step_memory(0, 500, true), Err(Error::AllocationConflict(_))));
        job_resources.mark_step_memory(0, 400, true).unwrap();
        assert_eq!(job_resources.memory_used(), &[1000, 0]);

        assert!(matches!(job_resources.mark_step_memory(1, 1, false), Err(Error::AllocationConflict(_))));
        assert!(matches!(job_resources.mark_step_memory(2, 1, true), Err(Error::OutOfRange { .. })));

        job_resources.mark_step_memory(0, 1000, false).unwrap();
        assert_eq!(job_resources.memory_used(), &[0, 0]);
    }
}
