use std::ops::Range;

use crate::domain::cluster::cluster_nodes::NodeTopology;
use crate::error::{Error, Result};

/// Address of a single core inside a descriptor. `node` is the position of the
/// node within the allocation (not within the cluster).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CoreCoord {
    pub node: usize,
    pub socket: u16,
    pub core: u16,
}

impl CoreCoord {
    pub fn new(node: usize, socket: u16, core: u16) -> Self {
        Self { node, socket, core }
    }
}

/// Where a node sits inside the run table.
#[derive(Debug, Clone, Copy)]
struct RunPosition {
    run: usize,
    first_node: usize,
    first_bit: usize,
}

/// Run-length table describing how a core bitmap is laid out.
///
/// Consecutive nodes with the same (sockets, cores per socket) pair share one
/// entry; `sock_core_rep_count[r]` says how many nodes run `r` covers. Bits are
/// ordered node-major, then socket, then core:
///
/// ```text
/// |     Node_0      |     Node_1      |
/// | Sock_0 | Sock_1 | Sock_0 | Sock_1 |
/// | C0  C1 | C0  C1 | C0  C1 | C0  C1 |
/// | 0   1  | 2   3  | 4   5  | 6   7  |
/// ```
///
/// Lookups walk the runs, so their cost grows with the number of distinct
/// topology runs rather than with the node count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SocketCoreLayout {
    sockets_per_node: Vec<u16>,
    cores_per_socket: Vec<u16>,
    sock_core_rep_count: Vec<u32>,
}

impl SocketCoreLayout {
    /// Builds the run table from per-node topologies given in node order.
    pub fn from_topologies<I>(topologies: I) -> Self
    where
        I: IntoIterator<Item = NodeTopology>,
    {
        let mut layout = Self::default();

        for topology in topologies {
            let same_as_last = layout.sockets_per_node.last() == Some(&topology.sockets)
                && layout.cores_per_socket.last() == Some(&topology.cores_per_socket);

            if same_as_last {
                if let Some(reps) = layout.sock_core_rep_count.last_mut() {
                    *reps += 1;
                }
            } else {
                layout.sockets_per_node.push(topology.sockets);
                layout.cores_per_socket.push(topology.cores_per_socket);
                layout.sock_core_rep_count.push(1);
            }
        }

        layout
    }

    /// Builds the run table from raw arrays, e.g. when restoring a snapshot.
    ///
    /// Adjacent runs with equal topology are merged so that the result is the
    /// same as [`SocketCoreLayout::from_topologies`] would produce.
    pub fn from_runs(sockets_per_node: &[u16], cores_per_socket: &[u16], sock_core_rep_count: &[u32]) -> Result<Self> {
        if cores_per_socket.len() != sockets_per_node.len() {
            return Err(Error::size_mismatch("cores_per_socket", sockets_per_node.len(), cores_per_socket.len()));
        }
        if sock_core_rep_count.len() != sockets_per_node.len() {
            return Err(Error::size_mismatch("sock_core_rep_count", sockets_per_node.len(), sock_core_rep_count.len()));
        }
        if let Some(run) = sock_core_rep_count.iter().position(|&reps| reps == 0) {
            return Err(Error::InvalidArgument(format!("Topology run {} has a repetition count of zero", run)));
        }

        let topologies = sockets_per_node
            .iter()
            .zip(cores_per_socket)
            .zip(sock_core_rep_count)
            .flat_map(|((&sockets, &cores), &reps)| std::iter::repeat_n(NodeTopology::new(sockets, cores), reps as usize));

        Ok(Self::from_topologies(topologies))
    }

    pub fn sockets_per_node(&self) -> &[u16] {
        &self.sockets_per_node
    }

    pub fn cores_per_socket(&self) -> &[u16] {
        &self.cores_per_socket
    }

    pub fn sock_core_rep_count(&self) -> &[u32] {
        &self.sock_core_rep_count
    }

    pub fn run_count(&self) -> usize {
        self.sock_core_rep_count.len()
    }

    /// Number of nodes covered by the table.
    pub fn nhosts(&self) -> usize {
        self.sock_core_rep_count.iter().map(|&reps| reps as usize).sum()
    }

    /// Length a core bitmap must have to be interpreted through this table.
    pub fn total_bits(&self) -> usize {
        (0..self.run_count()).map(|run| self.bits_per_node(run) * self.sock_core_rep_count[run] as usize).sum()
    }

    fn bits_per_node(&self, run: usize) -> usize {
        self.sockets_per_node[run] as usize * self.cores_per_socket[run] as usize
    }

    fn run_topology(&self, run: usize) -> NodeTopology {
        NodeTopology::new(self.sockets_per_node[run], self.cores_per_socket[run])
    }

    fn locate_node(&self, node: usize) -> Result<RunPosition> {
        let mut first_node = 0usize;
        let mut first_bit = 0usize;

        for run in 0..self.run_count() {
            let reps = self.sock_core_rep_count[run] as usize;
            if node < first_node + reps {
                return Ok(RunPosition { run, first_node, first_bit });
            }
            first_node += reps;
            first_bit += reps * self.bits_per_node(run);
        }

        Err(Error::out_of_range("node", node, first_node))
    }

    pub fn node_topology(&self, node: usize) -> Result<NodeTopology> {
        let position = self.locate_node(node)?;
        Ok(self.run_topology(position.run))
    }

    /// Bits of the core bitmap that belong to `node`.
    pub fn node_bit_range(&self, node: usize) -> Result<Range<usize>> {
        let position = self.locate_node(node)?;
        let per_node = self.bits_per_node(position.run);
        let start = position.first_bit + (node - position.first_node) * per_node;

        Ok(start..start + per_node)
    }

    /// Bit offset of `(node, socket, core)` in the core bitmap.
    pub fn core_offset(&self, node: usize, socket: u16, core: u16) -> Result<usize> {
        let position = self.locate_node(node)?;
        let topology = self.run_topology(position.run);

        if socket >= topology.sockets {
            return Err(Error::out_of_range("socket", socket as usize, topology.sockets as usize));
        }
        if core >= topology.cores_per_socket {
            return Err(Error::out_of_range("core", core as usize, topology.cores_per_socket as usize));
        }

        let node_start = position.first_bit + (node - position.first_node) * topology.cores();
        Ok(node_start + socket as usize * topology.cores_per_socket as usize + core as usize)
    }

    pub fn coord_offset(&self, coord: CoreCoord) -> Result<usize> {
        self.core_offset(coord.node, coord.socket, coord.core)
    }

    /// Inverse of [`SocketCoreLayout::core_offset`].
    pub fn core_coord(&self, offset: usize) -> Result<CoreCoord> {
        let mut first_node = 0usize;
        let mut first_bit = 0usize;

        for run in 0..self.run_count() {
            let reps = self.sock_core_rep_count[run] as usize;
            let per_node = self.bits_per_node(run);
            let run_bits = reps * per_node;

            if offset < first_bit + run_bits {
                let local = offset - first_bit;
                let within_node = local % per_node;
                let cores = self.cores_per_socket[run] as usize;

                return Ok(CoreCoord {
                    node: first_node + local / per_node,
                    socket: (within_node / cores) as u16,
                    core: (within_node % cores) as u16,
                });
            }

            first_node += reps;
            first_bit += run_bits;
        }

        Err(Error::out_of_range("core bit", offset, first_bit))
    }

    /// Per-node topologies in node order.
    pub fn topologies(&self) -> impl Iterator<Item = NodeTopology> + '_ {
        (0..self.run_count()).flat_map(move |run| std::iter::repeat_n(self.run_topology(run), self.sock_core_rep_count[run] as usize))
    }

    /// Bit range of every node, in node order.
    pub fn node_bit_ranges(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        self.topologies().scan(0usize, |next, topology| {
            let start = *next;
            *next += topology.cores();
            Some(start..*next)
        })
    }

    /// A new table covering only the nodes for which `keep` returns true.
    /// Runs that become adjacent are merged.
    pub fn retain<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(usize) -> bool,
    {
        Self::from_topologies(self.topologies().enumerate().filter(|(node, _)| keep(*node)).map(|(_, topology)| topology))
    }
}
