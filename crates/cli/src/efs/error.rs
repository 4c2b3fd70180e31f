//! Error types for EFS commands.

use cloudkit_core::ServiceError;
use thiserror::Error;

/// Result type alias for efs module.
pub type Result<T> = std::result::Result<T, EfsError>;

#[derive(Error, Debug)]
pub enum EfsError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("File system '{name}' not found")]
    FileSystemNotFound { name: String },

    #[error("None of the instances is in a zone with a mount target for '{file_system_id}'")]
    NoMountTarget { file_system_id: String },

    #[error("Command {command_id} failed on: {}", instances.join(", "))]
    CommandFailed {
        command_id: String,
        instances: Vec<String>,
    },
}
