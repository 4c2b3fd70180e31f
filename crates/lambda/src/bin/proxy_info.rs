//! Echoes API Gateway request metadata back to the caller.

use aws_lambda_events::apigw::{ApiGatewayProxyRequest, ApiGatewayProxyResponse};
use cloudkit_lambda::apigw::proxy_response;
use cloudkit_lambda::init_tracing;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};

async fn handler(
    event: LambdaEvent<ApiGatewayProxyRequest>,
) -> Result<ApiGatewayProxyResponse, Error> {
    tracing::debug!(request_id = %event.context.request_id, "echoing request");
    Ok(proxy_response(&event.payload)?)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();
    run(service_fn(handler)).await
}
