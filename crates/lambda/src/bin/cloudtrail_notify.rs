//! Publishes a summary of new CloudTrail log objects.

use aws_lambda_events::s3::S3Event;
use cloudkit_aws::{AwsConfig, SnsNotifier};
use cloudkit_core::cloudtrail::CLOUD_TRAIL_LOGS;
use cloudkit_lambda::cloudtrail::notify_uploads;
use cloudkit_lambda::config::{env_or, required_env, CLOUD_TRAIL_BUCKET, SNS_TOPIC_ARN};
use cloudkit_lambda::init_tracing;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};

struct Settings {
    topic_arn: String,
    log_bucket: String,
}

async fn handler(
    event: LambdaEvent<S3Event>,
    notifier: &SnsNotifier,
    settings: &Settings,
) -> Result<&'static str, Error> {
    Ok(notify_uploads(
        notifier,
        &settings.topic_arn,
        &settings.log_bucket,
        &event.payload,
    )
    .await)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let settings = Settings {
        topic_arn: required_env(SNS_TOPIC_ARN)?,
        log_bucket: env_or(CLOUD_TRAIL_BUCKET, CLOUD_TRAIL_LOGS),
    };
    let sdk = AwsConfig::from_env().load().await;
    let notifier = SnsNotifier::from_sdk(&sdk);

    run(service_fn(|event: LambdaEvent<S3Event>| {
        handler(event, &notifier, &settings)
    }))
    .await
}
