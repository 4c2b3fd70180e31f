//! API Gateway functions: the request echo and the HTTP API authorizer.

use aws_lambda_events::apigw::{
    ApiGatewayProxyRequest, ApiGatewayProxyResponse, ApiGatewayV2CustomAuthorizerSimpleResponse,
    ApiGatewayV2CustomAuthorizerV2Request,
};
use aws_lambda_events::encodings::Body;
use aws_lambda_events::http::header::{AUTHORIZATION, CONTENT_TYPE};
use aws_lambda_events::http::{HeaderMap, HeaderValue};
use cloudkit_core::apigw::{authorize, AuthorizerContext, ProxyInfo};
use cloudkit_core::Result;

pub type AuthorizerResponse = ApiGatewayV2CustomAuthorizerSimpleResponse<AuthorizerContext>;

/// Request time, caller address and API id of a REST API request.
pub fn proxy_info(request: &ApiGatewayProxyRequest) -> ProxyInfo {
    let context = &request.request_context;
    ProxyInfo {
        request_time: context.request_time.clone(),
        request_source_ip: context.identity.source_ip.clone(),
        api_id: context.apiid.clone(),
    }
}

/// A 200 response whose JSON body echoes the request metadata.
pub fn proxy_response(request: &ApiGatewayProxyRequest) -> Result<ApiGatewayProxyResponse> {
    let body = proxy_info(request).body()?;

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    Ok(ApiGatewayProxyResponse {
        status_code: 200,
        headers,
        multi_value_headers: HeaderMap::new(),
        body: Some(Body::Text(body)),
        is_base64_encoded: false,
    })
}

/// Simple-response decision for an HTTP API request.
pub fn authorize_request(
    request: &ApiGatewayV2CustomAuthorizerV2Request,
    secret: &str,
) -> AuthorizerResponse {
    let header = request
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    ApiGatewayV2CustomAuthorizerSimpleResponse {
        is_authorized: authorize(header, secret),
        context: AuthorizerContext::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn rest_request() -> ApiGatewayProxyRequest {
        serde_json::from_value(json!({
            "resource": "/info",
            "path": "/info",
            "httpMethod": "GET",
            "headers": { "Accept": "application/json" },
            "multiValueHeaders": { "Accept": ["application/json"] },
            "queryStringParameters": null,
            "multiValueQueryStringParameters": null,
            "pathParameters": null,
            "stageVariables": null,
            "requestContext": {
                "accountId": "123456789012",
                "resourceId": "us4z18",
                "stage": "test",
                "requestId": "41b45ea3-70b5-11e6-b7bd-69b5aaebc7d9",
                "identity": {
                    "cognitoIdentityPoolId": "",
                    "accountId": "",
                    "cognitoIdentityId": "",
                    "caller": "",
                    "apiKey": "",
                    "accessKey": "",
                    "sourceIp": "203.0.113.7",
                    "cognitoAuthenticationType": "",
                    "cognitoAuthenticationProvider": "",
                    "userArn": "",
                    "userAgent": "curl/8.0",
                    "user": ""
                },
                "resourcePath": "/info",
                "httpMethod": "GET",
                "apiId": "abc123",
                "requestTime": "09/Apr/2023:12:34:56 +0000",
                "requestTimeEpoch": 1681043696000i64,
                "path": "/test/info",
                "protocol": "HTTP/1.1"
            },
            "body": null,
            "isBase64Encoded": false
        }))
        .unwrap()
    }

    fn authorizer_request(authorization: Option<&str>) -> ApiGatewayV2CustomAuthorizerV2Request {
        let mut headers = json!({ "host": "abcdef123.execute-api.us-east-1.amazonaws.com" });
        if let Some(authorization) = authorization {
            headers["authorization"] = json!(authorization);
        }
        serde_json::from_value(json!({
            "version": "2.0",
            "type": "REQUEST",
            "routeArn": "arn:aws:execute-api:us-east-1:123456789012:abcdef123/test/GET/request",
            "identitySource": [],
            "routeKey": "GET /request",
            "rawPath": "/request",
            "rawQueryString": "",
            "cookies": [],
            "headers": headers,
            "queryStringParameters": {},
            "requestContext": {
                "accountId": "123456789012",
                "apiId": "abcdef123",
                "domainName": "abcdef123.execute-api.us-east-1.amazonaws.com",
                "domainPrefix": "abcdef123",
                "http": {
                    "method": "GET",
                    "path": "/request",
                    "protocol": "HTTP/1.1",
                    "sourceIp": "203.0.113.7",
                    "userAgent": "curl/8.0"
                },
                "requestId": "id",
                "routeKey": "GET /request",
                "stage": "$default",
                "time": "12/Mar/2020:19:03:58 +0000",
                "timeEpoch": 1583348638390i64
            },
            "pathParameters": {},
            "stageVariables": {}
        }))
        .unwrap()
    }

    #[test]
    fn test_proxy_response() {
        let response = proxy_response(&rest_request()).unwrap();
        assert_eq!(response.status_code, 200);
        assert_eq!(
            response.headers.get(CONTENT_TYPE).unwrap(),
            "application/json"
        );

        let Some(Body::Text(body)) = response.body else {
            panic!("expected a text body");
        };
        let body: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(
            body,
            json!({
                "requestTime": "09/Apr/2023:12:34:56 +0000",
                "requestSourceIp": "203.0.113.7",
                "apiId": "abc123"
            })
        );
    }

    #[test]
    fn test_proxy_response_without_context() {
        let response = proxy_response(&ApiGatewayProxyRequest::default()).unwrap();
        assert_eq!(response.body, Some(Body::Text("{}".to_string())));
    }

    #[test]
    fn test_authorize_request() {
        assert!(authorize_request(&authorizer_request(Some("s3cret")), "s3cret").is_authorized);
        assert!(!authorize_request(&authorizer_request(Some("s3cret")), "other").is_authorized);
        assert!(!authorize_request(&authorizer_request(None), "s3cret").is_authorized);
        assert!(!authorize_request(&authorizer_request(Some("")), "").is_authorized);
    }

    #[test]
    fn test_authorizer_response_shape() {
        let response = authorize_request(&authorizer_request(None), "s3cret");
        assert_eq!(
            serde_json::to_value(response).unwrap(),
            json!({"isAuthorized": false, "context": {"extraContent": "value"}})
        );
    }
}
