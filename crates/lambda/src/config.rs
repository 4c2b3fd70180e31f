//! Function settings read from the environment.

use std::env;

use thiserror::Error;

/// Bucket the document pipeline reads from and writes to.
pub const BUCKET_NAME: &str = "BUCKET_NAME";
/// Topic notifications are published to.
pub const SNS_TOPIC_ARN: &str = "SNS_TOPIC_ARN";
/// Fragment identifying the CloudTrail log bucket.
pub const CLOUD_TRAIL_BUCKET: &str = "CLOUD_TRAIL_BUCKET";
/// Value the `authorization` header must carry.
pub const AUTHORIZER_SECRET: &str = "AUTHORIZER_SECRET";
/// Table machine readings are written to.
pub const STREAMS_TABLE: &str = "STREAMS_TABLE";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable {0} must be set")]
    Missing(&'static str),
}

/// Value of a variable, treating an empty value as unset.
pub fn optional_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}

/// Value of a variable that has to be set.
pub fn required_env(name: &'static str) -> Result<String, ConfigError> {
    optional_env(name).ok_or(ConfigError::Missing(name))
}

/// Value of a variable, or `default` when unset.
pub fn env_or(name: &str, default: &str) -> String {
    optional_env(name).unwrap_or_else(|| default.to_string())
}
