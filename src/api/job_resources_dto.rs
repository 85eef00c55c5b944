use serde::{Deserialize, Serialize};

/// Flat snapshot of an allocation descriptor.
///
/// Bitmaps are bit range lists (`0-7,12`). The `cpu_array_*` fields are
/// written for readers but ignored when a snapshot is restored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResourcesDto {
    pub nodes: String,
    pub nhosts: u32,
    pub ncpus: u32,
    pub node_req: u32,
    pub whole_node: bool,

    pub node_bitmap: String,
    pub core_bitmap: String,
    pub core_bitmap_used: String,

    pub sockets_per_node: Vec<u16>,
    pub cores_per_socket: Vec<u16>,
    pub sock_core_rep_count: Vec<u32>,

    pub cpus: Vec<u16>,
    pub cpus_used: Vec<u16>,
    pub memory_allocated: Vec<u64>,
    pub memory_used: Vec<u64>,

    #[serde(default)]
    pub cpu_array_cnt: u32,
    #[serde(default)]
    pub cpu_array_value: Vec<u16>,
    #[serde(default)]
    pub cpu_array_reps: Vec<u32>,
}
