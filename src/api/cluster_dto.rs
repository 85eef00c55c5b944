use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterDto {
    pub name: String,
    pub nodes: Vec<ClusterNodeDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterNodeDto {
    pub name: String,
    pub sockets: u16,
    pub cores_per_socket: u16,

    /// Total memory of the node in MB.
    #[serde(default)]
    pub real_memory: u64,
}
