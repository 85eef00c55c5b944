pub mod cluster_nodes;
pub mod core_map;
pub mod node_req;
