use std::fmt;

use fixedbitset::FixedBitSet;
use serde::Serialize;

use crate::domain::cluster::cluster_nodes::ClusterNodes;
use crate::domain::job_resources::job_resources::JobResources;
use crate::domain::utils::bit_fmt;
use crate::error::Result;

/// What one node contributes to an allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeAllocation {
    pub name: String,
    pub cpus: u16,
    pub cpus_used: u16,
    pub memory_allocated: u64,
    pub memory_used: u64,

    /// Granted node-local core indices (socket-major), e.g. `0-3,8`.
    pub cpu_ids: String,
}

impl JobResources {
    /// Per-node view of the allocation, in node order.
    pub fn node_allocations(&self, cluster: &ClusterNodes) -> Result<Vec<NodeAllocation>> {
        let names = cluster.names_from_bitmap(&self.node_bitmap)?;

        names
            .into_iter()
            .zip(self.layout.node_bit_ranges())
            .enumerate()
            .map(|(node, (name, range))| {
                let mut local = FixedBitSet::with_capacity(range.len());
                let start = range.start;
                for bit in range.filter(|&bit| self.core_bitmap.contains(bit)) {
                    local.insert(bit - start);
                }

                Ok(NodeAllocation {
                    name: name.to_string(),
                    cpus: self.cpus[node],
                    cpus_used: self.cpus_used[node],
                    memory_allocated: self.memory_allocated[node],
                    memory_used: self.memory_used[node],
                    cpu_ids: bit_fmt::format(&local),
                })
            })
            .collect()
    }
}

impl fmt::Display for JobResources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Nodes={} NumNodes={} NumCPUs={} NodeReq={} WholeNode={}", self.nodes, self.nhosts, self.ncpus, self.node_req, self.whole_node)?;

        let topology = self
            .layout
            .sockets_per_node()
            .iter()
            .zip(self.layout.cores_per_socket())
            .zip(self.layout.sock_core_rep_count())
            .map(|((sockets, cores), reps)| format!("{}x({}s:{}c)", reps, sockets, cores))
            .collect::<Vec<_>>()
            .join(",");
        writeln!(f, "  Topology={}", topology)?;

        let cpu_array = self
            .cpu_array
            .values()
            .iter()
            .zip(self.cpu_array.reps())
            .map(|(value, reps)| if *reps == 1 { value.to_string() } else { format!("{}(x{})", value, reps) })
            .collect::<Vec<_>>()
            .join(",");
        writeln!(f, "  CPUs/Node={}", cpu_array)?;

        writeln!(f, "  CoreBitmap={} ({} bits)", bit_fmt::format(&self.core_bitmap), self.core_bitmap.len())?;
        write!(f, "  CoreBitmapUsed={}", bit_fmt::format(&self.core_bitmap_used))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cluster::cluster_nodes::NodeTopology;
    use crate::domain::job_resources::allocation_request::AllocationRequest;

    #[test]
    fn test_node_allocations_and_summary() {
        let cluster = ClusterNodes::uniform("cn", 3, NodeTopology::new(2, 2), 0).unwrap();
        let node_bitmap = cluster.node_bitmap_from_names("cn[0-1]").unwrap();
        let mut core_bitmap = FixedBitSet::with_capacity(8);
        core_bitmap.insert_range(1..4);
        core_bitmap.insert(6);
        let request = AllocationRequest { node_bitmap, core_bitmap, memory_allocated: vec![64, 32], node_req: Default::default(), whole_node: false };
        let mut job_resources = JobResources::build(&cluster, request).unwrap();
        job_resources.mark_step_cores(&[6], true).unwrap();

        let nodes = job_resources.node_allocations(&cluster).unwrap();

        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].name, "cn0");
        assert_eq!(nodes[0].cpu_ids, "1-3");
        assert_eq!(nodes[1].cpu_ids, "2");
        assert_eq!(nodes[1].cpus_used, 1);
        assert_eq!(nodes[1].memory_allocated, 32);

        let summary = job_resources.to_string();
        assert!(summary.starts_with("Nodes=cn[0-1] NumNodes=2 NumCPUs=4"));
        assert!(summary.contains("Topology=2x(2s:2c)"));
        assert!(summary.contains("CPUs/Node=3,1"));
        assert!(summary.contains("CoreBitmapUsed=6"));
    }
}
