use std::collections::HashMap;

use fixedbitset::FixedBitSet;

use crate::api::cluster_dto::ClusterDto;
use crate::domain::utils::hostlist;
use crate::error::{Error, Result};

/// Socket and core counts of a single node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeTopology {
    pub sockets: u16,
    pub cores_per_socket: u16,
}

impl NodeTopology {
    pub fn new(sockets: u16, cores_per_socket: u16) -> Self {
        Self { sockets, cores_per_socket }
    }

    /// Number of core bits the node occupies in a core bitmap.
    pub fn cores(&self) -> usize {
        self.sockets as usize * self.cores_per_socket as usize
    }
}

#[derive(Debug, Clone)]
pub struct ClusterNode {
    pub name: String,
    pub topology: NodeTopology,

    /// Total memory in MB.
    pub real_memory: u64,
}

/// The cluster-wide node namespace.
///
/// Node bitmaps of allocation descriptors are indexed by the position of a
/// node in this registry. Callers pass it explicitly to every operation that
/// needs to translate between node indices and names.
#[derive(Debug, Clone, Default)]
pub struct ClusterNodes {
    nodes: Vec<ClusterNode>,
    name_index: HashMap<String, usize>,

    /// `core_offsets[i]` is the number of cores on all nodes before node `i`.
    /// Has one trailing entry holding the cluster total.
    core_offsets: Vec<usize>,
}

impl ClusterNodes {
    pub fn new(nodes: Vec<ClusterNode>) -> Result<Self> {
        let mut name_index = HashMap::with_capacity(nodes.len());
        let mut core_offsets = Vec::with_capacity(nodes.len() + 1);
        let mut total = 0usize;

        for (index, node) in nodes.iter().enumerate() {
            if name_index.insert(node.name.clone(), index).is_some() {
                return Err(Error::InvalidArgument(format!("Duplicate node name '{}' in cluster", node.name)));
            }
            core_offsets.push(total);
            total += node.topology.cores();
        }
        core_offsets.push(total);

        log::debug!("Cluster registry built with {} nodes and {} cores.", nodes.len(), total);

        Ok(Self { nodes, name_index, core_offsets })
    }

    pub fn from_dto(dto: ClusterDto) -> Result<Self> {
        let nodes = dto
            .nodes
            .into_iter()
            .map(|node| ClusterNode {
                name: node.name,
                topology: NodeTopology::new(node.sockets, node.cores_per_socket),
                real_memory: node.real_memory,
            })
            .collect();

        Self::new(nodes)
    }

    /// A synthetic cluster of `count` identical nodes named `{prefix}{i}`.
    pub fn uniform(prefix: &str, count: usize, topology: NodeTopology, real_memory: u64) -> Result<Self> {
        let nodes = (0..count).map(|i| ClusterNode { name: format!("{}{}", prefix, i), topology, real_memory }).collect();
        Self::new(nodes)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, index: usize) -> Result<&ClusterNode> {
        self.nodes.get(index).ok_or_else(|| Error::out_of_range("cluster node", index, self.nodes.len()))
    }

    pub fn name(&self, index: usize) -> Result<&str> {
        Ok(self.node(index)?.name.as_str())
    }

    pub fn topology(&self, index: usize) -> Result<NodeTopology> {
        Ok(self.node(index)?.topology)
    }

    pub fn index_of(&self, name: &str) -> Result<usize> {
        self.name_index.get(name).copied().ok_or_else(|| Error::InvalidArgument(format!("Unknown node '{}'", name)))
    }

    /// Position of the first core of node `index` in a cluster-wide core bitmap.
    pub fn core_offset(&self, index: usize) -> Result<usize> {
        if index >= self.nodes.len() {
            return Err(Error::out_of_range("cluster node", index, self.nodes.len()));
        }
        Ok(self.core_offsets[index])
    }

    pub fn total_cores(&self) -> usize {
        self.core_offsets.last().copied().unwrap_or(0)
    }

    /// Resolves a hostlist expression into a node bitmap over this cluster.
    pub fn node_bitmap_from_names(&self, expression: &str) -> Result<FixedBitSet> {
        let mut bitmap = FixedBitSet::with_capacity(self.nodes.len());
        for name in hostlist::expand(expression)? {
            bitmap.insert(self.index_of(&name)?);
        }
        Ok(bitmap)
    }

    /// Names of the nodes set in `bitmap`, in ascending bit order.
    pub fn names_from_bitmap(&self, bitmap: &FixedBitSet) -> Result<Vec<&str>> {
        if bitmap.len() != self.nodes.len() {
            return Err(Error::size_mismatch("node bitmap", self.nodes.len(), bitmap.len()));
        }
        bitmap.ones().map(|index| self.name(index)).collect()
    }

    /// Compressed hostlist expression for the nodes set in `bitmap`.
    pub fn hostlist_from_bitmap(&self, bitmap: &FixedBitSet) -> Result<String> {
        Ok(hostlist::compress(&self.names_from_bitmap(bitmap)?))
    }
}
