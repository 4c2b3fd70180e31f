//! Starts instances again when EventBridge reports them stopping.

use cloudkit_aws::{AwsConfig, Ec2Instances, SnsNotifier};
use cloudkit_lambda::config::{required_env, SNS_TOPIC_ARN};
use cloudkit_lambda::restart::{restart_instance, StateChangeEvent};
use cloudkit_lambda::{init_tracing, SUCCESS};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};

async fn handler(
    event: LambdaEvent<StateChangeEvent>,
    instances: &Ec2Instances,
    notifier: &SnsNotifier,
    topic_arn: &str,
) -> Result<&'static str, Error> {
    let outcome = restart_instance(instances, notifier, topic_arn, &event.payload.detail).await;
    tracing::debug!(?outcome, "state change handled");
    Ok(SUCCESS)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let topic_arn = required_env(SNS_TOPIC_ARN)?;
    let sdk = AwsConfig::from_env().load().await;
    let instances = Ec2Instances::from_sdk(&sdk);
    let notifier = SnsNotifier::from_sdk(&sdk);

    run(service_fn(|event: LambdaEvent<StateChangeEvent>| {
        handler(event, &instances, &notifier, &topic_arn)
    }))
    .await
}
