//! Client configuration shared by every service adapter.

use std::env;
use std::time::Duration;

use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};

/// Region used when `AWS_REGION` is not set.
pub const DEFAULT_REGION: &str = "us-west-2";

/// AWS client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwsConfig {
    /// Custom endpoint URL (LocalStack, DynamoDB Local).
    pub endpoint_url: Option<String>,
    /// AWS region.
    pub region: String,
    /// Attempts per request, including the first one.
    pub max_attempts: u32,
    /// Connection timeout.
    pub connect_timeout: Duration,
}

impl AwsConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `AWS_ENDPOINT_URL` - Custom endpoint (default: none)
    /// - `AWS_REGION` - Region (default: "us-west-2")
    /// - `CLOUDKIT_MAX_ATTEMPTS` - Attempts per request (default: 3)
    /// - `CLOUDKIT_CONNECT_TIMEOUT_MS` - Connection timeout (default: 120)
    pub fn from_env() -> Self {
        Self {
            endpoint_url: env::var("AWS_ENDPOINT_URL").ok(),
            region: env::var("AWS_REGION").unwrap_or_else(|_| DEFAULT_REGION.to_string()),
            max_attempts: env::var("CLOUDKIT_MAX_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
            connect_timeout: Duration::from_millis(
                env::var("CLOUDKIT_CONNECT_TIMEOUT_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(120),
            ),
        }
    }

    /// Overrides the region.
    pub fn with_region(mut self, region: &str) -> Self {
        self.region = region.to_string();
        self
    }

    /// Returns a display string for the target environment.
    pub fn target_display(&self) -> String {
        match &self.endpoint_url {
            Some(url) => format!("Local endpoint ({})", url),
            None => format!("AWS (region: {})", self.region),
        }
    }

    /// Loads the shared SDK configuration used to build service clients.
    pub async fn load(&self) -> SdkConfig {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(self.region.clone()))
            .retry_config(RetryConfig::standard().with_max_attempts(self.max_attempts.max(1)))
            .timeout_config(
                TimeoutConfig::builder()
                    .connect_timeout(self.connect_timeout)
                    .build(),
            );

        if let Some(endpoint) = &self.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }

        loader.load().await
    }
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
