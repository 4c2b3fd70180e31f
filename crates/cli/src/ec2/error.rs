//! Error types for EC2 commands.

use cloudkit_core::ServiceError;
use thiserror::Error;

/// Result type alias for ec2 module.
pub type Result<T> = std::result::Result<T, Ec2Error>;

#[derive(Error, Debug)]
pub enum Ec2Error {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("Instance '{instance_id}' not found")]
    InstanceNotFound { instance_id: String },

    #[error("Instance '{instance_id}' was not reported as {action}")]
    NotChanged {
        instance_id: String,
        action: &'static str,
    },

    #[error("Operation cancelled by user")]
    UserCancelled,

    #[error("Prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
