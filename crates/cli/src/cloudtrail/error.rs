//! Error types for CloudTrail commands.

use cloudkit_core::ServiceError;
use thiserror::Error;

/// Result type alias for cloudtrail module.
pub type Result<T> = std::result::Result<T, CloudtrailError>;

#[derive(Error, Debug)]
pub enum CloudtrailError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("No bucket name contains '{fragment}'")]
    LogBucketNotFound { fragment: String },

    #[error("No log of at least {min_size} bytes for region '{region}' in '{bucket}'")]
    NoLogs {
        bucket: String,
        region: String,
        min_size: i64,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
