//! Records a machine temperature reported through API Gateway.

use aws_lambda_events::apigw::ApiGatewayV2httpRequest;
use cloudkit_aws::dynamodb::client;
use cloudkit_aws::{AwsConfig, DynamoMachines};
use cloudkit_core::dynamo::{generate_machine_id, STREAMS_TABLE};
use cloudkit_lambda::config::{env_or, STREAMS_TABLE as STREAMS_TABLE_VAR};
use cloudkit_lambda::init_tracing;
use cloudkit_lambda::temperature::{record_temperature, TemperatureReport, REPORT_RESPONSE};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};

async fn handler(
    event: LambdaEvent<ApiGatewayV2httpRequest>,
    machines: &DynamoMachines,
) -> Result<&'static str, Error> {
    let Some(report) = TemperatureReport::from_request(&event.payload) else {
        tracing::warn!("machineName, machineType and temperature are required");
        return Ok(REPORT_RESPONSE);
    };

    let new_id = generate_machine_id(&mut rand::rng());
    let saved = record_temperature(machines, &report, new_id).await;
    tracing::debug!(saved, machine = %report.machine_name, "report handled");
    Ok(REPORT_RESPONSE)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let sdk = AwsConfig::from_env().load().await;
    let machines = DynamoMachines::new(client(&sdk), env_or(STREAMS_TABLE_VAR, STREAMS_TABLE));

    run(service_fn(|event: LambdaEvent<ApiGatewayV2httpRequest>| {
        handler(event, &machines)
    }))
    .await
}
