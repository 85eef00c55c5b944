use std::path::Path;

use crate::api::allocation_dto::AllocationRequestDto;
use crate::api::cluster_dto::ClusterDto;
use crate::domain::cluster::cluster_nodes::ClusterNodes;
use crate::domain::job_resources::allocation_request::AllocationRequest;
use crate::domain::job_resources::job_resources::JobResources;
use crate::error::Result;
use crate::loader::parser::parse_json_file;

pub mod api;
pub mod domain;
pub mod error;
pub mod loader;
pub mod logger;

/// Reads the cluster registry from a JSON file.
pub fn load_cluster(cluster_path: impl AsRef<Path>) -> Result<ClusterNodes> {
    let cluster_dto: ClusterDto = parse_json_file(cluster_path.as_ref())?;
    log::info!("Cluster '{}' parsed with {} node(s).", cluster_dto.name, cluster_dto.nodes.len());

    ClusterNodes::from_dto(cluster_dto)
}

/// Reads a placement decision from a JSON file and builds its descriptor.
pub fn load_job_resources(cluster: &ClusterNodes, allocation_path: impl AsRef<Path>) -> Result<JobResources> {
    let request_dto: AllocationRequestDto = parse_json_file(allocation_path.as_ref())?;
    log::info!("Allocation request for '{}' parsed.", request_dto.nodes);

    let request = AllocationRequest::from_dto(cluster, request_dto)?;
    let job_resources = JobResources::build(cluster, request)?;
    job_resources.ensure_valid_against(cluster)?;

    log::info!("Job resources built for '{}' with {} cpu(s).", job_resources.nodes(), job_resources.ncpus());
    Ok(job_resources)
}
