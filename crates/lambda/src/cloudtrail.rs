//! Notification for new objects in the CloudTrail log bucket.

use aws_lambda_events::s3::S3Event;
use cloudkit_core::cloudtrail::{upload_notification, UploadRecord};
use cloudkit_core::notify::Notifier;

/// Returned when a notification was published.
pub const PUBLISHED: &str = "SUCCESS";
/// Returned when nothing was published.
pub const NOT_PUBLISHED: &str = "OK";

/// Reduces the event records to what the notification needs.
pub fn upload_records(event: &S3Event) -> Vec<UploadRecord> {
    event
        .records
        .iter()
        .map(|record| UploadRecord {
            bucket: record.s3.bucket.name.clone().unwrap_or_default(),
            key: record.s3.object.key.clone().unwrap_or_default(),
            event_name: record.event_name.clone().unwrap_or_default(),
            event_time: record.event_time.to_rfc3339(),
        })
        .collect()
}

/// Publishes a summary when the event touches the log bucket.
///
/// A failed publish is logged and reported as not published.
pub async fn notify_uploads<N: Notifier + ?Sized>(
    notifier: &N,
    topic_arn: &str,
    log_bucket: &str,
    event: &S3Event,
) -> &'static str {
    let records = upload_records(event);
    let Some(message) = upload_notification(&records, log_bucket) else {
        tracing::debug!(records = records.len(), "no upload into the log bucket");
        return NOT_PUBLISHED;
    };

    match notifier.publish(topic_arn, &message).await {
        Ok(message_id) => {
            tracing::info!(message_id = ?message_id, topic = %topic_arn, "published upload notification");
            PUBLISHED
        }
        Err(e) => {
            tracing::error!(error = %e, topic = %topic_arn, "failed to publish upload notification");
            NOT_PUBLISHED
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::tests::s3_event;
    use cloudkit_core::cloudtrail::CLOUD_TRAIL_LOGS;
    use cloudkit_core::notify::InMemoryNotifier;

    const TOPIC: &str = "arn:aws:sns:us-east-1:123456789012:uploads";

    #[test]
    fn test_upload_records() {
        let records = upload_records(&s3_event("aws-cloudtrail-logs-1234", "AWSLogs/log.json.gz"));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].bucket, "aws-cloudtrail-logs-1234");
        assert_eq!(records[0].event_name, "ObjectCreated:Put");
        assert!(records[0].event_time.starts_with("2023-03-01T10:00:00"));
    }

    #[tokio::test]
    async fn test_publishes_for_log_bucket() {
        let notifier = InMemoryNotifier::new();
        let event = s3_event("aws-cloudtrail-logs-1234", "AWSLogs/log.json.gz");

        let result = notify_uploads(&notifier, TOPIC, CLOUD_TRAIL_LOGS, &event).await;

        assert_eq!(result, PUBLISHED);
        let messages = notifier.messages().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].topic_arn, TOPIC);
        assert!(messages[0]
            .message
            .contains("S3 Object Key: AWSLogs/log.json.gz"));
    }

    #[tokio::test]
    async fn test_other_bucket_is_ignored() {
        let notifier = InMemoryNotifier::new();
        let event = s3_event("photos", "cat.jpg");

        assert_eq!(
            notify_uploads(&notifier, TOPIC, CLOUD_TRAIL_LOGS, &event).await,
            NOT_PUBLISHED
        );
        assert!(notifier.messages().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_publish() {
        let notifier = InMemoryNotifier::failing();
        let event = s3_event("aws-cloudtrail-logs-1234", "AWSLogs/log.json.gz");

        assert_eq!(
            notify_uploads(&notifier, TOPIC, CLOUD_TRAIL_LOGS, &event).await,
            NOT_PUBLISHED
        );
    }
}
