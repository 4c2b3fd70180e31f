//! Error types for S3 commands.

use cloudkit_core::ServiceError;
use thiserror::Error;

/// Result type alias for s3 module.
pub type Result<T> = std::result::Result<T, S3Error>;

/// Errors that can occur during S3 commands.
#[derive(Error, Debug)]
pub enum S3Error {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("Bucket '{bucket}' not found")]
    BucketNotFound { bucket: String },

    #[error("Object '{key}' not found in bucket '{bucket}'")]
    ObjectNotFound { bucket: String, key: String },

    #[error("Versioning could not be enabled on '{bucket}'")]
    VersioningDisabled { bucket: String },

    #[error("Operation cancelled by user")]
    UserCancelled,

    #[error("Prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
