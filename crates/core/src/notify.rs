//! Topic notifications.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{Result, ServiceError};

/// Publishes messages to a notification topic.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Publishes `message` and returns the message id, when the service gives one.
    async fn publish(&self, topic_arn: &str, message: &str) -> Result<Option<String>>;
}

/// A message captured by [`InMemoryNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub topic_arn: String,
    pub message: String,
}

/// Notifier recording messages in memory, for tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotifier {
    messages: Arc<RwLock<Vec<PublishedMessage>>>,
    failing: bool,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose every publish fails.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub async fn messages(&self) -> Vec<PublishedMessage> {
        self.messages.read().await.clone()
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn publish(&self, topic_arn: &str, message: &str) -> Result<Option<String>> {
        if self.failing {
            return Err(ServiceError::RequestFailed(format!(
                "publish to {} rejected",
                topic_arn
            )));
        }
        let mut messages = self.messages.write().await;
        messages.push(PublishedMessage {
            topic_arn: topic_arn.to_string(),
            message: message.to_string(),
        });
        Ok(Some(format!("msg-{}", messages.len())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_messages() {
        let notifier = InMemoryNotifier::new();
        let id = notifier.publish("arn:aws:sns:topic", "hello").await.unwrap();
        assert_eq!(id.as_deref(), Some("msg-1"));
        assert_eq!(
            notifier.messages().await,
            vec![PublishedMessage {
                topic_arn: "arn:aws:sns:topic".to_string(),
                message: "hello".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_failing_notifier() {
        let notifier = InMemoryNotifier::failing();
        assert!(notifier.publish("arn", "hello").await.is_err());
        assert!(notifier.messages().await.is_empty());
    }
}
