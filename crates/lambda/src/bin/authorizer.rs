//! HTTP API authorizer comparing the `authorization` header with a secret.

use aws_lambda_events::apigw::ApiGatewayV2CustomAuthorizerV2Request;
use cloudkit_lambda::apigw::{authorize_request, AuthorizerResponse};
use cloudkit_lambda::config::{optional_env, AUTHORIZER_SECRET};
use cloudkit_lambda::init_tracing;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};

async fn handler(
    event: LambdaEvent<ApiGatewayV2CustomAuthorizerV2Request>,
    secret: &str,
) -> Result<AuthorizerResponse, Error> {
    let response = authorize_request(&event.payload, secret);
    tracing::info!(authorized = response.is_authorized, "authorizer decision");
    Ok(response)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let secret = optional_env(AUTHORIZER_SECRET).unwrap_or_default();
    if secret.is_empty() {
        tracing::warn!("{} is not set, every request will be denied", AUTHORIZER_SECRET);
    }

    run(service_fn(
        |event: LambdaEvent<ApiGatewayV2CustomAuthorizerV2Request>| handler(event, &secret),
    ))
    .await
}
