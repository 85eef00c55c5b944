use crate::domain::job_resources::job_resources::JobResources;
use crate::domain::job_resources::layout::CoreCoord;
use crate::error::Result;

impl JobResources {
    /// Granted cores of `node`, in socket-major order.
    pub fn cores_on_node(&self, node: usize) -> Result<Vec<CoreCoord>> {
        let range = self.layout.node_bit_range(node)?;
        range.filter(|&bit| self.core_bitmap.contains(bit)).map(|bit| self.layout.core_coord(bit)).collect()
    }

    pub fn is_core_allocated(&self, node: usize, socket: u16, core: u16) -> Result<bool> {
        Ok(self.core_bitmap.contains(self.layout.core_offset(node, socket, core)?))
    }

    pub fn is_core_in_use(&self, node: usize, socket: u16, core: u16) -> Result<bool> {
        Ok(self.core_bitmap_used.contains(self.layout.core_offset(node, socket, core)?))
    }

    /// Every granted core of the allocation, in bitmap order.
    pub fn allocated_cores(&self) -> impl Iterator<Item = Result<CoreCoord>> + '_ {
        self.core_bitmap.ones().map(|bit| self.layout.core_coord(bit))
    }

    /// Cores that are granted but not used by any step.
    pub fn idle_cores(&self) -> impl Iterator<Item = Result<CoreCoord>> + '_ {
        self.core_bitmap.difference(&self.core_bitmap_used).map(|bit| self.layout.core_coord(bit))
    }

    /// Position of a cluster node within this allocation, if it is part of it.
    pub fn node_position(&self, cluster_index: usize) -> Option<usize> {
        if !self.node_bitmap.contains(cluster_index) {
            return None;
        }
        Some(self.node_bitmap.count_ones(..cluster_index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cluster::cluster_nodes::{ClusterNodes, NodeTopology};
    use crate::domain::job_resources::allocation_request::AllocationRequest;
    use crate::error::Error;

    fn allocation() -> JobResources {
        let cluster = ClusterNodes::uniform("node", 4, NodeTopology::new(2, 2), 0).unwrap();
        let node_bitmap = cluster.node_bitmap_from_names("node[1,3]").unwrap();
        let request = AllocationRequest::whole_nodes(&cluster, node_bitmap, 0).unwrap();
        JobResources::build(&cluster, request).unwrap()
    }

    #[test]
    fn test_cores_on_node() {
        let job_resources = allocation();
        let cores = job_resources.cores_on_node(1).unwrap();

        assert_eq!(cores.len(), 4);
        assert_eq!(cores[0], CoreCoord::new(1, 0, 0));
        assert_eq!(cores[3], CoreCoord::new(1, 1, 1));
        assert!(matches!(job_resources.cores_on_node(2), Err(Error::OutOfRange { .. })));
    }

    #[test]
    fn test_core_state_queries() {
        let mut job_resources = allocation();
        job_resources.mark_step_coords(&[CoreCoord::new(0, 1, 0)], true).unwrap();

        assert!(job_resources.is_core_allocated(0, 1, 0).unwrap());
        assert!(job_resources.is_core_in_use(0, 1, 0).unwrap());
        assert!(!job_resources.is_core_in_use(0, 0, 0).unwrap());
        assert_eq!(job_resources.idle_cores().count(), 7);
        assert!(job_resources.is_core_allocated(0, 2, 0).is_err());
    }

    #[test]
    fn test_node_position() {
        let job_resources = allocation();

        assert_eq!(job_resources.node_position(1), Some(0));
        assert_eq!(job_resources.node_position(3), Some(1));
        assert_eq!(job_resources.node_position(2), None);
    }
}
