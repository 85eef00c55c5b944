use serde::{Deserialize, Serialize};

/// Allocation-policy tag of a descriptor.
///
/// Treated as an opaque value: the bits are stored and returned exactly as
/// given, the named constants exist only for readability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeReq(pub u32);

impl NodeReq {
    /// Node may be shared with other jobs.
    pub const AVAILABLE: NodeReq = NodeReq(0);

    /// Node is in use by a partition that does not share nodes.
    pub const ONE_ROW: NodeReq = NodeReq(64000);

    /// Node is reserved exclusively for this job.
    pub const RESERVED: NodeReq = NodeReq(64001);

    pub fn bits(self) -> u32 {
        self.0
    }
}

impl From<u32> for NodeReq {
    fn from(bits: u32) -> Self {
        NodeReq(bits)
    }
}

impl std::fmt::Display for NodeReq {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            NodeReq::AVAILABLE => write!(f, "AVAILABLE"),
            NodeReq::RESERVED => write!(f, "RESERVED"),
            NodeReq::ONE_ROW => write!(f, "ONE_ROW"),
            NodeReq(other) => write!(f, "{}", other),
        }
    }
}
