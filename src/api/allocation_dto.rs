use serde::{Deserialize, Serialize};

/// A finalized placement decision as handed over by the fit logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationRequestDto {
    /// Hostlist expression of the selected nodes, e.g. `node[0-3]`.
    pub nodes: String,

    /// Per selected node, which cores are granted. Missing nodes get no cores.
    #[serde(default)]
    pub cores: Vec<NodeCoresDto>,

    /// Memory in MB reserved on every selected node unless overridden below.
    #[serde(default)]
    pub memory_per_node: u64,

    #[serde(default)]
    pub memory_overrides: Vec<NodeMemoryDto>,

    #[serde(default)]
    pub node_req: u32,

    #[serde(default)]
    pub whole_node: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeCoresDto {
    /// Hostlist expression; every node it names receives the same selection.
    pub nodes: String,
    pub selection: CoreSelectionDto,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CoreSelectionDto {
    /// Every core of the node.
    All,

    /// Node-local core indices in socket-major order, as a bit range list (`0-3,8`).
    Cores(String),

    /// Explicit `(socket, core)` pairs.
    Coords(Vec<(u16, u16)>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMemoryDto {
    pub nodes: String,
    pub memory: u64,
}
