use thiserror::Error;

use crate::domain::job_resources::validate::Violation;

#[derive(Debug, Error)]
pub enum Error {
    #[error("File not found or could not be read: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse JSON input: {0}")]
    DeserializationError(#[from] serde_json::Error),

    #[error("{what} index {index} is out of range (bound: {bound})")]
    OutOfRange { what: &'static str, index: usize, bound: usize },

    #[error("Size mismatch for {what}: expected {expected}, got {actual}")]
    SizeMismatch { what: &'static str, expected: usize, actual: usize },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Allocation conflict: {0}")]
    AllocationConflict(String),

    #[error("Descriptor is in an inconsistent state ({} violation(s)): {}", .0.len(), format_violations(.0))]
    InconsistentState(Vec<Violation>),
}

fn format_violations(violations: &[Violation]) -> String {
    violations.iter().map(|v| v.to_string()).collect::<Vec<_>>().join("; ")
}

impl Error {
    pub(crate) fn out_of_range(what: &'static str, index: usize, bound: usize) -> Self {
        Error::OutOfRange { what, index, bound }
    }

    pub(crate) fn size_mismatch(what: &'static str, expected: usize, actual: usize) -> Self {
        Error::SizeMismatch { what, expected, actual }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
