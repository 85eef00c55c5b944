use std::collections::HashMap;

use fixedbitset::FixedBitSet;

use crate::api::allocation_dto::{AllocationRequestDto, CoreSelectionDto};
use crate::domain::cluster::cluster_nodes::{ClusterNodes, NodeTopology};
use crate::domain::cluster::node_req::NodeReq;
use crate::domain::utils::{bit_fmt, hostlist};
use crate::error::{Error, Result};

/// Output of the placement logic, the input of [`JobResources::build`].
///
/// `core_bitmap` holds the granted cores of the selected nodes only,
/// concatenated in node order with each node's cluster topology.
///
/// [`JobResources::build`]: crate::domain::job_resources::job_resources::JobResources::build
#[derive(Debug, Clone)]
pub struct AllocationRequest {
    pub node_bitmap: FixedBitSet,
    pub core_bitmap: FixedBitSet,
    pub memory_allocated: Vec<u64>,
    pub node_req: NodeReq,
    pub whole_node: bool,
}

impl AllocationRequest {
    /// Grants every core of the nodes in `node_bitmap`.
    pub fn whole_nodes(cluster: &ClusterNodes, node_bitmap: FixedBitSet, memory_per_node: u64) -> Result<Self> {
        let topologies = selected_topologies(cluster, &node_bitmap)?;
        let total: usize = topologies.iter().map(NodeTopology::cores).sum();

        let mut core_bitmap = FixedBitSet::with_capacity(total);
        core_bitmap.insert_range(..);

        Ok(Self {
            memory_allocated: vec![memory_per_node; topologies.len()],
            node_bitmap,
            core_bitmap,
            node_req: NodeReq::RESERVED,
            whole_node: true,
        })
    }

    pub fn from_dto(cluster: &ClusterNodes, dto: AllocationRequestDto) -> Result<Self> {
        let node_bitmap = cluster.node_bitmap_from_names(&dto.nodes)?;
        let topologies = selected_topologies(cluster, &node_bitmap)?;

        // cluster index -> (position in allocation, first bit of that node)
        let mut positions: HashMap<usize, (usize, usize)> = HashMap::with_capacity(topologies.len());
        let mut next_bit = 0usize;
        for (position, (cluster_index, topology)) in node_bitmap.ones().zip(&topologies).enumerate() {
            positions.insert(cluster_index, (position, next_bit));
            next_bit += topology.cores();
        }

        let locate = |name: &str| -> Result<(usize, usize)> {
            let cluster_index = cluster.index_of(name)?;
            positions
                .get(&cluster_index)
                .copied()
                .ok_or_else(|| Error::InvalidArgument(format!("Node '{}' is not part of the allocation '{}'", name, dto.nodes)))
        };

        let mut core_bitmap = FixedBitSet::with_capacity(next_bit);
        for entry in &dto.cores {
            for name in hostlist::expand(&entry.nodes)? {
                let (position, first_bit) = locate(&name)?;
                let topology = topologies[position];

                match &entry.selection {
                    CoreSelectionDto::All => core_bitmap.insert_range(first_bit..first_bit + topology.cores()),
                    CoreSelectionDto::Cores(ranges) => {
                        for core in bit_fmt::parse(ranges, topology.cores())?.ones() {
                            core_bitmap.insert(first_bit + core);
                        }
                    }
                    CoreSelectionDto::Coords(coords) => {
                        for &(socket, core) in coords {
                            if socket >= topology.sockets {
                                return Err(Error::out_of_range("socket", socket as usize, topology.sockets as usize));
                            }
                            if core >= topology.cores_per_socket {
                                return Err(Error::out_of_range("core", core as usize, topology.cores_per_socket as usize));
                            }
                            core_bitmap.insert(first_bit + socket as usize * topology.cores_per_socket as usize + core as usize);
                        }
                    }
                }
            }
        }

        let mut memory_allocated = vec![dto.memory_per_node; topologies.len()];
        for entry in &dto.memory_overrides {
            for name in hostlist::expand(&entry.nodes)? {
                let (position, _) = locate(&name)?;
                memory_allocated[position] = entry.memory;
            }
        }

        Ok(Self { node_bitmap, core_bitmap, memory_allocated, node_req: NodeReq(dto.node_req), whole_node: dto.whole_node })
    }
}

pub(crate) fn selected_topologies(cluster: &ClusterNodes, node_bitmap: &FixedBitSet) -> Result<Vec<NodeTopology>> {
    if node_bitmap.len() != cluster.len() {
        return Err(Error::size_mismatch("node bitmap", cluster.len(), node_bitmap.len()));
    }
    node_bitmap.ones().map(|index| cluster.topology(index)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::allocation_dto::{NodeCoresDto, NodeMemoryDto};

    fn cluster() -> ClusterNodes {
        ClusterNodes::uniform("node", 4, NodeTopology::new(2, 2), 4096).unwrap()
    }

    fn dto(cores: Vec<NodeCoresDto>) -> AllocationRequestDto {
        AllocationRequestDto {
            nodes: "node[1-2]".to_string(),
            cores,
            memory_per_node: 1000,
            memory_overrides: vec![NodeMemoryDto { nodes: "node2".to_string(), memory: 2000 }],
            node_req: 0,
            whole_node: false,
        }
    }

    #[test]
    fn test_from_dto_places_bits_per_node() {
        let request = AllocationRequest::from_dto(
            &cluster(),
            dto(vec![
                NodeCoresDto { nodes: "node1".to_string(), selection: CoreSelectionDto::Cores("0,3".to_string()) },
                NodeCoresDto { nodes: "node2".to_string(), selection: CoreSelectionDto::Coords(vec![(1, 0)]) },
            ]),
        )
        .unwrap();

        assert_eq!(request.node_bitmap.ones().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(request.core_bitmap.len(), 8);
        assert_eq!(request.core_bitmap.ones().collect::<Vec<_>>(), vec![0, 3, 6]);
        assert_eq!(request.memory_allocated, vec![1000, 2000]);
    }

    #[test]
    fn test_from_dto_rejects_nodes_outside_allocation() {
        let result = AllocationRequest::from_dto(
            &cluster(),
            dto(vec![NodeCoresDto { nodes: "node3".to_string(), selection: CoreSelectionDto::All }]),
        );

        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_from_dto_rejects_bad_coords() {
        let result = AllocationRequest::from_dto(
            &cluster(),
            dto(vec![NodeCoresDto { nodes: "node1".to_string(), selection: CoreSelectionDto::Coords(vec![(2, 0)]) }]),
        );

        assert!(matches!(result, Err(Error::OutOfRange { what: "socket", .. })));
    }

    #[test]
    fn test_whole_nodes_sets_every_core() {
        let cluster = cluster();
        let bitmap = cluster.node_bitmap_from_names("node[0,3]").unwrap();
        let request = AllocationRequest::whole_nodes(&cluster, bitmap, 512).unwrap();

        assert_eq!(request.core_bitmap.count_ones(..), 8);
        assert_eq!(request.memory_allocated, vec![512, 512]);
        assert!(request.whole_node);
    }
}
