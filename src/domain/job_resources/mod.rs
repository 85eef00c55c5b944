pub mod allocation_request;
pub mod cpu_array;
pub mod feasibility;
pub mod job_resources;
pub mod layout;
pub mod query;
pub mod report;
pub mod shrink;
pub mod snapshot;
pub mod step_usage;
pub mod validate;
