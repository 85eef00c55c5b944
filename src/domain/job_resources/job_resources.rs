use std::ops::Range;

use fixedbitset::FixedBitSet;

use crate::domain::cluster::cluster_nodes::ClusterNodes;
use crate::domain::cluster::node_req::NodeReq;
use crate::domain::job_resources::allocation_request::{AllocationRequest, selected_topologies};
use crate::domain::job_resources::cpu_array::CpuArray;
use crate::domain::job_resources::layout::SocketCoreLayout;
use crate::error::{Error, Result};

/// Exactly which resources are allocated to a job or a job step.
///
/// * `node_bitmap` - nodes of the allocation, over the cluster namespace.
///   Node order for every per-node array below is ascending bit order.
/// * `nodes` - hostlist expression of `node_bitmap`.
/// * `layout` - `sockets_per_node`, `cores_per_socket` and
///   `sock_core_rep_count`, fixing how `core_bitmap` is interpreted.
/// * `core_bitmap` - cores granted, for the allocated nodes only.
/// * `core_bitmap_used` - cores consumed by running steps, a subset of
///   `core_bitmap`.
/// * `cpus` / `cpus_used` - CPUs per node granted / consumed by steps.
/// * `memory_allocated` / `memory_used` - MB per node reserved / consumed.
/// * `cpu_array` - run-length form of `cpus`, recomputed whenever `cpus`
///   changes.
/// * `ncpus` - sum of `cpus`.
///
/// Every mutating operation either succeeds completely or leaves the
/// descriptor untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobResources {
    pub(crate) core_bitmap: FixedBitSet,
    pub(crate) core_bitmap_used: FixedBitSet,
    pub(crate) cpu_array: CpuArray,
    pub(crate) cpus: Vec<u16>,
    pub(crate) cpus_used: Vec<u16>,
    pub(crate) layout: SocketCoreLayout,
    pub(crate) memory_allocated: Vec<u64>,
    pub(crate) memory_used: Vec<u64>,
    pub(crate) nhosts: u32,
    pub(crate) node_bitmap: FixedBitSet,
    pub(crate) node_req: NodeReq,
    pub(crate) nodes: String,
    pub(crate) ncpus: u32,
    pub(crate) whole_node: bool,
}

impl JobResources {
    /// Builds a descriptor from a finalized placement decision.
    ///
    /// Topology of every selected node comes from `cluster`. `cpus[i]` is the
    /// number of granted cores on node `i`; no step uses anything yet.
    pub fn build(cluster: &ClusterNodes, request: AllocationRequest) -> Result<Self> {
        let AllocationRequest { node_bitmap, core_bitmap, memory_allocated, node_req, whole_node } = request;

        let topologies = selected_topologies(cluster, &node_bitmap)?;
        let layout = SocketCoreLayout::from_topologies(topologies.iter().copied());
        let nhosts = topologies.len();

        if core_bitmap.len() != layout.total_bits() {
            log::error!("Core selection has {} bits, but the topology of {} node(s) needs {}.", core_bitmap.len(), nhosts, layout.total_bits());
            return Err(Error::size_mismatch("core selection", layout.total_bits(), core_bitmap.len()));
        }
        if memory_allocated.len() != nhosts {
            return Err(Error::size_mismatch("memory_allocated", nhosts, memory_allocated.len()));
        }

        let cpus = layout.node_bit_ranges().map(|range| count_cpus(&core_bitmap, range)).collect::<Result<Vec<u16>>>()?;
        let ncpus = cpus.iter().map(|&c| c as u32).sum();
        let nodes = cluster.hostlist_from_bitmap(&node_bitmap)?;

        let job_resources = Self {
            core_bitmap_used: FixedBitSet::with_capacity(core_bitmap.len()),
            core_bitmap,
            cpu_array: CpuArray::compact(&cpus),
            cpus_used: vec![0; nhosts],
            cpus,
            layout,
            memory_used: vec![0; nhosts],
            memory_allocated,
            nhosts: nhosts as u32,
            node_bitmap,
            node_req,
            nodes,
            ncpus,
            whole_node,
        };

        log::debug!(
            "Built job resources for '{}': {} node(s), {} cpu(s), {} topology run(s).",
            job_resources.nodes,
            job_resources.nhosts,
            job_resources.ncpus,
            job_resources.layout.run_count()
        );

        Ok(job_resources)
    }

    pub fn core_bitmap(&self) -> &FixedBitSet {
        &self.core_bitmap
    }

    pub fn core_bitmap_used(&self) -> &FixedBitSet {
        &self.core_bitmap_used
    }

    pub fn cpu_array_cnt(&self) -> u32 {
        self.cpu_array.cnt()
    }

    pub fn cpu_array_value(&self) -> &[u16] {
        self.cpu_array.values()
    }

    pub fn cpu_array_reps(&self) -> &[u32] {
        self.cpu_array.reps()
    }

    pub fn cpu_array(&self) -> &CpuArray {
        &self.cpu_array
    }

    pub fn cpus(&self) -> &[u16] {
        &self.cpus
    }

    pub fn cpus_used(&self) -> &[u16] {
        &self.cpus_used
    }

    pub fn layout(&self) -> &SocketCoreLayout {
        &self.layout
    }

    pub fn sockets_per_node(&self) -> &[u16] {
        self.layout.sockets_per_node()
    }

    pub fn cores_per_socket(&self) -> &[u16] {
        self.layout.cores_per_socket()
    }

    pub fn sock_core_rep_count(&self) -> &[u32] {
        self.layout.sock_core_rep_count()
    }

    pub fn memory_allocated(&self) -> &[u64] {
        &self.memory_allocated
    }

    pub fn memory_used(&self) -> &[u64] {
        &self.memory_used
    }

    pub fn nhosts(&self) -> u32 {
        self.nhosts
    }

    pub fn node_bitmap(&self) -> &FixedBitSet {
        &self.node_bitmap
    }

    pub fn node_req(&self) -> NodeReq {
        self.node_req
    }

    pub fn nodes(&self) -> &str {
        &self.nodes
    }

    pub fn ncpus(&self) -> u32 {
        self.ncpus
    }

    pub fn whole_node(&self) -> bool {
        self.whole_node
    }

    pub(crate) fn check_node_index(&self, node: usize) -> Result<()> {
        if node >= self.nhosts as usize {
            return Err(Error::out_of_range("node", node, self.nhosts as usize));
        }
        Ok(())
    }
}

/// Popcount of `range` in `bitmap` as a per-node CPU count.
pub(crate) fn count_cpus(bitmap: &FixedBitSet, range: Range<usize>) -> Result<u16> {
    let count = bitmap.count_ones(range);
    u16::try_from(count).map_err(|_| Error::InvalidArgument(format!("{} cpus on a single node exceed the supported maximum", count)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cluster::cluster_nodes::NodeTopology;

    fn scenario_a() -> (ClusterNodes, JobResources) {
        let cluster = ClusterNodes::uniform("node", 2, NodeTopology::new(2, 4), 8192).unwrap();
        let bitmap = cluster.node_bitmap_from_names("node[0-1]").unwrap();
        let request = AllocationRequest::whole_nodes(&cluster, bitmap, 1024).unwrap();
        let job_resources = JobResources::build(&cluster, request).unwrap();
        (cluster, job_resources)
    }

    #[test]
    fn test_build_all_cores_granted() {
        let (_, job_resources) = scenario_a();

        assert_eq!(job_resources.core_bitmap().len(), 16);
        assert_eq!(job_resources.core_bitmap().count_ones(..), 16);
        assert_eq!(job_resources.cpus(), &[8, 8]);
        assert_eq!(job_resources.cpu_array_value(), &[8]);
        assert_eq!(job_resources.cpu_array_reps(), &[2]);
        assert_eq!(job_resources.ncpus(), 16);
        assert_eq!(job_resources.nodes(), "node[0-1]");
        assert_eq!(job_resources.core_bitmap_used().count_ones(..), 0);
        assert_eq!(job_resources.memory_used(), &[0, 0]);
    }

    #[test]
    fn test_build_rejects_size_mismatch() {
        let cluster = ClusterNodes::uniform("node", 2, NodeTopology::new(2, 4), 8192).unwrap();
        let bitmap = cluster.node_bitmap_from_names("node0").unwrap();

        let request = AllocationRequest {
            node_bitmap: bitmap.clone(),
            core_bitmap: FixedBitSet::with_capacity(7),
            memory_allocated: vec![0],
            node_req: NodeReq::AVAILABLE,
            whole_node: false,
        };
        assert!(matches!(JobResources::build(&cluster, request), Err(Error::SizeMismatch { what: "core selection", expected: 8, actual: 7 })));

        let request = AllocationRequest {
            node_bitmap: bitmap,
            core_bitmap: FixedBitSet::with_capacity(8),
            memory_allocated: vec![],
            node_req: NodeReq::AVAILABLE,
            whole_node: false,
        };
        assert!(matches!(JobResources::build(&cluster, request), Err(Error::SizeMismatch { what: "memory_allocated", .. })));
    }

    #[test]
    fn test_build_partial_selection_counts_cpus_per_node() {
        let cluster = ClusterNodes::uniform("node", 3, NodeTopology::new(1, 4), 0).unwrap();
        let node_bitmap = cluster.node_bitmap_from_names("node[0,2]").unwrap();
        let mut core_bitmap = FixedBitSet::with_capacity(8);
        core_bitmap.insert_range(0..3);
        core_bitmap.insert(7);

        let request = AllocationRequest { node_bitmap, core_bitmap, memory_allocated: vec![10, 20], node_req: NodeReq(7), whole_node: false };
        let job_resources = JobResources::build(&cluster, request).unwrap();

        assert_eq!(job_resources.cpus(), &[3, 1]);
        assert_eq!(job_resources.ncpus(), 4);
        assert_eq!(job_resources.nodes(), "node[0,2]");
        assert_eq!(job_resources.node_req(), NodeReq(7));
    }
}
