//! SNS adapter.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_sns::Client;

use cloudkit_core::notify::Notifier;
use cloudkit_core::Result;

use crate::error::map_sdk_error;

/// Publishes notifications through SNS.
#[derive(Debug, Clone)]
pub struct SnsNotifier {
    client: Client,
}

impl SnsNotifier {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_sdk(sdk: &SdkConfig) -> Self {
        Self::new(Client::new(sdk))
    }
}

#[async_trait]
impl Notifier for SnsNotifier {
    async fn publish(&self, topic_arn: &str, message: &str) -> Result<Option<String>> {
        let output = self
            .client
            .publish()
            .topic_arn(topic_arn)
            .message(message)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "Publish"))?;

        let message_id = output.message_id().map(str::to_string);
        tracing::debug!(topic_arn, ?message_id, "published notification");
        Ok(message_id)
    }
}
