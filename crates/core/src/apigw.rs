//! API Gateway rules: the request echo body and header authorization.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Context value the authorizer attaches to every decision.
pub const EXTRA_CONTENT: &str = "value";

/// Request metadata echoed back by the proxy handler.
///
/// Missing fields are left out of the body, so a request without any
/// context echoes `{}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_source_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_id: Option<String>,
}

impl ProxyInfo {
    /// JSON body returned to the caller.
    pub fn body(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Context returned with a simple authorizer response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizerContext {
    pub extra_content: String,
}

impl AuthorizerContext {
    pub fn new() -> Self {
        Self {
            extra_content: EXTRA_CONTENT.to_string(),
        }
    }
}

/// True when the `authorization` header equals `secret`.
///
/// An empty secret authorizes nobody.
pub fn authorize(authorization: Option<&str>, secret: &str) -> bool {
    !secret.is_empty() && authorization == Some(secret)
}
