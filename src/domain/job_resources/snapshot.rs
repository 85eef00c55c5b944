use crate::api::job_resources_dto::JobResourcesDto;
use crate::domain::cluster::cluster_nodes::ClusterNodes;
use crate::domain::cluster::node_req::NodeReq;
use crate::domain::job_resources::cpu_array::CpuArray;
use crate::domain::job_resources::job_resources::JobResources;
use crate::domain::job_resources::layout::SocketCoreLayout;
use crate::domain::utils::bit_fmt;
use crate::error::Result;

impl JobResources {
    pub fn to_dto(&self) -> JobResourcesDto {
        JobResourcesDto {
            nodes: self.nodes.clone(),
            nhosts: self.nhosts,
            ncpus: self.ncpus,
            node_req: self.node_req.bits(),
            whole_node: self.whole_node,
            node_bitmap: bit_fmt::format(&self.node_bitmap),
            core_bitmap: bit_fmt::format(&self.core_bitmap),
            core_bitmap_used: bit_fmt::format(&self.core_bitmap_used),
            sockets_per_node: self.layout.sockets_per_node().to_vec(),
            cores_per_socket: self.layout.cores_per_socket().to_vec(),
            sock_core_rep_count: self.layout.sock_core_rep_count().to_vec(),
            cpus: self.cpus.clone(),
            cpus_used: self.cpus_used.clone(),
            memory_allocated: self.memory_allocated.clone(),
            memory_used: self.memory_used.clone(),
            cpu_array_cnt: self.cpu_array.cnt(),
            cpu_array_value: self.cpu_array.values().to_vec(),
            cpu_array_reps: self.cpu_array.reps().to_vec(),
        }
    }

    /// Restores a descriptor from a snapshot.
    ///
    /// The run-length CPU form is recomputed from `cpus`, and the result must
    /// pass [`JobResources::validate_against`] or `InconsistentState` is returned.
    pub fn from_dto(cluster: &ClusterNodes, dto: JobResourcesDto) -> Result<Self> {
        let layout = SocketCoreLayout::from_runs(&dto.sockets_per_node, &dto.cores_per_socket, &dto.sock_core_rep_count)?;
        let total_bits = layout.total_bits();

        let job_resources = Self {
            node_bitmap: bit_fmt::parse(&dto.node_bitmap, cluster.len())?,
            core_bitmap: bit_fmt::parse(&dto.core_bitmap, total_bits)?,
            core_bitmap_used: bit_fmt::parse(&dto.core_bitmap_used, total_bits)?,
            cpu_array: CpuArray::compact(&dto.cpus),
            cpus: dto.cpus,
            cpus_used: dto.cpus_used,
            layout,
            memory_allocated: dto.memory_allocated,
            memory_used: dto.memory_used,
            nhosts: dto.nhosts,
            node_req: NodeReq(dto.node_req),
            nodes: dto.nodes,
            ncpus: dto.ncpus,
            whole_node: dto.whole_node,
        };

        if let Err(e) = job_resources.ensure_valid_against(cluster) {
            log::error!("Rejected job resources snapshot for '{}': {}", job_resources.nodes, e);
            return Err(e);
        }

        Ok(job_resources)
    }
}
