//! Logs the temperature state of machines changed in the streams table.

use aws_lambda_events::dynamodb::Event;
use cloudkit_lambda::temperature::monitor;
use cloudkit_lambda::{init_tracing, SUCCESS};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};

async fn handler(event: LambdaEvent<Event>) -> Result<&'static str, Error> {
    let states = monitor(&event.payload);
    tracing::debug!(
        records = event.payload.records.len(),
        reported = states.len(),
        "stream batch handled"
    );
    Ok(SUCCESS)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();
    run(service_fn(handler)).await
}
