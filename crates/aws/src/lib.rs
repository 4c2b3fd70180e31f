//! AWS SDK adapters for cloudkit.
//!
//! Each module wraps one service client and implements the traits from
//! `cloudkit_core` on top of it. Errors are mapped to `ServiceError`.

pub mod config;
pub mod dynamodb;
pub mod ec2;
pub mod efs;
pub mod error;
pub mod s3;
pub mod sns;
pub mod ssm;

pub use aws_config::SdkConfig;
pub use config::AwsConfig;
pub use dynamodb::{DynamoMachines, DynamoMovies, StreamReader, StreamStart};
pub use ec2::Ec2Instances;
pub use efs::EfsFileSystems;
pub use s3::S3ObjectStore;
pub use sns::SnsNotifier;
pub use ssm::{CommandOutcome, RunCommand};
