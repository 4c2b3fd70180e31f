//! Error types for DynamoDB commands.

use cloudkit_core::ServiceError;
use thiserror::Error;

/// Result type alias for dynamodb module.
pub type Result<T> = std::result::Result<T, DynamodbError>;

/// Errors that can occur during DynamoDB commands.
#[derive(Error, Debug)]
pub enum DynamodbError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("Table '{table_name}' not found")]
    TableNotFound { table_name: String },

    #[error("Table '{table_name}' has no stream")]
    NoStream { table_name: String },

    #[error("Table '{table_name}' has a different key schema, destroy it first")]
    KeyMismatch { table_name: String },

    #[error("Movie '{title}' ({year}) not found")]
    MovieNotFound { year: i32, title: String },

    #[error("Machine '{machine}' not found")]
    MachineNotFound { machine: String },

    #[error("Operation cancelled by user")]
    UserCancelled,

    #[error("Prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
