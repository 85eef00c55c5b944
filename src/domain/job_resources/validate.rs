use thiserror::Error;

use crate::domain::cluster::cluster_nodes::{ClusterNodes, NodeTopology};
use crate::domain::job_resources::cpu_array::CpuArray;
use crate::domain::job_resources::job_resources::JobResources;
use crate::domain::utils::{bit_fmt, hostlist};
use crate::error::{Error, Result};

/// A broken descriptor invariant, as reported by [`JobResources::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("nhosts is {nhosts} but node_bitmap has {popcount} node(s)")]
    NodeCount { nhosts: u32, popcount: usize },

    #[error("sock_core_rep_count sums to {sum}, expected nhosts = {nhosts}")]
    RepCountSum { sum: usize, nhosts: u32 },

    #[error("{bitmap} has {actual} bits, the topology requires {expected}")]
    BitmapLength { bitmap: &'static str, expected: usize, actual: usize },

    #[error("{array} has {len} entries, expected nhosts = {nhosts}")]
    ArrayLength { array: &'static str, len: usize, nhosts: u32 },

    #[error("core_bitmap_used has bits {bits} that are not set in core_bitmap")]
    UsedNotGranted { bits: String },

    #[error("cpus_used[{node}] = {used} exceeds cpus[{node}] = {cpus}")]
    CpusUsedExceeded { node: usize, used: u16, cpus: u16 },

    #[error("memory_used[{node}] = {used} exceeds memory_allocated[{node}] = {allocated}")]
    MemoryUsedExceeded { node: usize, used: u64, allocated: u64 },

    #[error("cpus[{node}] = {cpus} but the node has {granted} granted core(s)")]
    CpusNotGranted { node: usize, cpus: u16, granted: usize },

    #[error("cpus_used[{node}] = {cpus_used} but {in_use} core(s) are marked in use")]
    CpusUsedNotMarked { node: usize, cpus_used: u16, in_use: usize },

    #[error("ncpus is {ncpus} but cpus sum to {sum}")]
    CpuTotal { ncpus: u32, sum: u64 },

    #[error("cpu_array does not expand to cpus")]
    CpuArrayDrift,

    #[error("node_bitmap has {actual} bits, the cluster has {expected} node(s)")]
    NodeBitmapSize { expected: usize, actual: usize },

    #[error("node {node} ({name}) is described as {actual:?}, the cluster registry says {expected:?}")]
    TopologyMismatch { node: usize, name: String, expected: NodeTopology, actual: NodeTopology },

    #[error("nodes is '{actual}' but node_bitmap names '{expected}'")]
    NodeNames { expected: String, actual: String },
}

impl JobResources {
    /// Checks every internal invariant. An empty list means the descriptor is valid.
    pub fn validate(&self) -> Vec<Violation> {
        let mut violations = Vec::new();
        let nhosts = self.nhosts;
        let hosts = nhosts as usize;

        let popcount = self.node_bitmap.count_ones(..);
        if popcount != hosts {
            violations.push(Violation::NodeCount { nhosts, popcount });
        }

        let sum = self.layout.nhosts();
        if sum != hosts {
            violations.push(Violation::RepCountSum { sum, nhosts });
        }

        let arrays: [(&'static str, usize); 4] = [
            ("cpus", self.cpus.len()),
            ("cpus_used", self.cpus_used.len()),
            ("memory_allocated", self.memory_allocated.len()),
            ("memory_used", self.memory_used.len()),
        ];
        for (array, len) in arrays {
            if len != hosts {
                violations.push(Violation::ArrayLength { array, len, nhosts });
            }
        }

        let expected_bits = self.layout.total_bits();
        let mut bitmaps_fit = true;
        for (bitmap, actual) in [("core_bitmap", self.core_bitmap.len()), ("core_bitmap_used", self.core_bitmap_used.len())] {
            if actual != expected_bits {
                violations.push(Violation::BitmapLength { bitmap, expected: expected_bits, actual });
                bitmaps_fit = false;
            }
        }

        if !self.core_bitmap_used.is_subset(&self.core_bitmap) {
            let mut stray = self.core_bitmap_used.clone();
            stray.difference_with(&self.core_bitmap);
            violations.push(Violation::UsedNotGranted { bits: bit_fmt::format(&stray) });
        }

        for (node, (&used, &cpus)) in self.cpus_used.iter().zip(&self.cpus).enumerate() {
            if used > cpus {
                violations.push(Violation::CpusUsedExceeded { node, used, cpus });
            }
        }

        for (node, (&used, &allocated)) in self.memory_used.iter().zip(&self.memory_allocated).enumerate() {
            if used > allocated {
                violations.push(Violation::MemoryUsedExceeded { node, used, allocated });
            }
        }

        if bitmaps_fit {
            for (node, range) in self.layout.node_bit_ranges().enumerate() {
                let granted = self.core_bitmap.count_ones(range.clone());
                if let Some(&cpus) = self.cpus.get(node) {
                    if cpus as usize != granted {
                        violations.push(Violation::CpusNotGranted { node, cpus, granted });
                    }
                }

                let in_use = self.core_bitmap_used.count_ones(range);
                if let Some(&cpus_used) = self.cpus_used.get(node) {
                    if cpus_used as usize != in_use {
                        violations.push(Violation::CpusUsedNotMarked { node, cpus_used, in_use });
                    }
                }
            }
        }

        let sum: u64 = self.cpus.iter().map(|&c| c as u64).sum();
        if sum != self.ncpus as u64 {
            violations.push(Violation::CpuTotal { ncpus: self.ncpus, sum });
        }

        if self.cpu_array != CpuArray::compact(&self.cpus) {
            violations.push(Violation::CpuArrayDrift);
        }

        if !violations.is_empty() {
            log::debug!("Validation of '{}' found {} violation(s).", self.nodes, violations.len());
        }

        violations
    }

    /// [`JobResources::validate`] plus the checks that need the cluster
    /// registry: bitmap size, per-node topology and the `nodes` string.
    pub fn validate_against(&self, cluster: &ClusterNodes) -> Vec<Violation> {
        let mut violations = self.validate();

        if self.node_bitmap.len() != cluster.len() {
            violations.push(Violation::NodeBitmapSize { expected: cluster.len(), actual: self.node_bitmap.len() });
            return violations;
        }

        for (node, (cluster_index, actual)) in self.node_bitmap.ones().zip(self.layout.topologies()).enumerate() {
            if let Ok(registered) = cluster.node(cluster_index) {
                if registered.topology != actual {
                    violations.push(Violation::TopologyMismatch { node, name: registered.name.clone(), expected: registered.topology, actual });
                }
            }
        }

        if let Ok(names) = cluster.names_from_bitmap(&self.node_bitmap) {
            let expected = hostlist::compress(&names);
            if expected != self.nodes {
                violations.push(Violation::NodeNames { expected, actual: self.nodes.clone() });
            }
        }

        violations
    }

    pub fn ensure_valid(&self) -> Result<()> {
        into_result(self.validate())
    }

    pub fn ensure_valid_against(&self, cluster: &ClusterNodes) -> Result<()> {
        into_result(self.validate_against(cluster))
    }
}

fn into_result(violations: Vec<Violation>) -> Result<()> {
    if violations.is_empty() {
        Ok(())
    } else {
        Err(Error::InconsistentState(violations))
    }
}
