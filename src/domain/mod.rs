pub mod cluster;
pub mod job_resources;
pub mod utils;
