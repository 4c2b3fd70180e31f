//! Converts uploaded images to PDF and redacts uploaded PDFs.

use aws_lambda_events::s3::S3Event;
use cloudkit_aws::s3::client;
use cloudkit_aws::{AwsConfig, S3ObjectStore};
use cloudkit_lambda::config::{optional_env, BUCKET_NAME};
use cloudkit_lambda::convert::handle_upload;
use cloudkit_lambda::{init_tracing, SUCCESS};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};

async fn handler(
    event: LambdaEvent<S3Event>,
    store: &S3ObjectStore,
    bucket: Option<&str>,
) -> Result<&'static str, Error> {
    tracing::info!(records = event.payload.records.len(), "processing uploads");
    let outcomes = handle_upload(store, bucket, &event.payload).await?;
    tracing::debug!(?outcomes, "uploads processed");
    Ok(SUCCESS)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let sdk = AwsConfig::from_env().load().await;
    let store = S3ObjectStore::new(client(&sdk, false));
    let bucket = optional_env(BUCKET_NAME);

    run(service_fn(|event: LambdaEvent<S3Event>| {
        handler(event, &store, bucket.as_deref())
    }))
    .await
}
