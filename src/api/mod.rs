pub mod allocation_dto;
pub mod cluster_dto;
pub mod job_resources_dto;
