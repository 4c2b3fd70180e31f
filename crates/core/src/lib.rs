//! Functional core for the cloudkit AWS examples.
//!
//! Everything in this crate is free of AWS SDK calls: naming rules, lookups,
//! plans, classification and document conversion live here, together with the
//! traits the SDK adapters implement and in-memory fakes used by tests.

pub mod apigw;
pub mod cloudtrail;
pub mod document;
pub mod dynamo;
pub mod ec2;
pub mod efs;
pub mod error;
pub mod notify;
pub mod s3;
pub mod ssm;

pub use error::{Result, ServiceError};
