//! DynamoDB and DynamoDB Streams adapters.

pub mod conversions;
pub mod deploy;
mod machines;
mod movies;
pub mod streams;

pub use aws_sdk_dynamodb::Client;
pub use machines::DynamoMachines;
pub use movies::DynamoMovies;
pub use streams::{StreamReader, StreamStart};

/// Creates a DynamoDB client from the shared SDK configuration.
pub fn client(sdk: &aws_config::SdkConfig) -> Client {
    Client::new(sdk)
}
