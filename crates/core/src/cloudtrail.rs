//! CloudTrail log decoding and upload notifications.

use std::fmt::Write as _;
use std::io::Read;

use flate2::read::GzDecoder;
use serde::Deserialize;

use crate::error::{Result, ServiceError};

/// Fragment present in the name of the bucket CloudTrail creates for its logs.
pub const CLOUD_TRAIL_LOGS: &str = "aws-cloudtrail-logs";

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// A CloudTrail log file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CloudTrailLog {
    #[serde(rename = "Records", default)]
    pub records: Vec<CloudTrailRecord>,
}

/// The fields of a CloudTrail record the tools display.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudTrailRecord {
    pub event_time: Option<String>,
    pub event_source: Option<String>,
    pub event_name: Option<String>,
    pub aws_region: Option<String>,
    #[serde(rename = "sourceIPAddress")]
    pub source_ip_address: Option<String>,
}

/// Decodes a log object body into JSON.
///
/// CloudTrail stores logs gzip compressed; plain JSON bodies are accepted too.
pub fn decode_log(body: &[u8]) -> Result<serde_json::Value> {
    if body.starts_with(&GZIP_MAGIC) {
        let mut text = String::new();
        GzDecoder::new(body)
            .read_to_string(&mut text)
            .map_err(|e| ServiceError::InvalidData(format!("gzip: {}", e)))?;
        Ok(serde_json::from_str(&text)?)
    } else {
        Ok(serde_json::from_slice(body)?)
    }
}

/// Reads the typed records out of a decoded log.
pub fn parse_log(value: &serde_json::Value) -> Result<CloudTrailLog> {
    Ok(CloudTrailLog::deserialize(value)?)
}

/// One object-created notification, reduced to what the message needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRecord {
    pub bucket: String,
    pub key: String,
    pub event_name: String,
    pub event_time: String,
}

/// Builds the notification text for uploads into the log bucket.
///
/// Returns `None` when no record comes from a bucket whose name contains
/// `log_bucket`. The count line covers every record of the event; the detail
/// lines only the matching ones.
pub fn upload_notification(records: &[UploadRecord], log_bucket: &str) -> Option<String> {
    if !records
        .iter()
        .any(|record| record.bucket.contains(log_bucket))
    {
        return None;
    }

    let mut message = format!("Notification Records Count: {}\n", records.len());
    for record in records
        .iter()
        .filter(|record| record.bucket.contains(log_bucket))
    {
        let _ = writeln!(message, "Event Name: {}", record.event_name);
        let _ = writeln!(message, "Event time: {}", record.event_time);
        let _ = writeln!(message, "S3 Object Key: {}", record.key);
    }
    Some(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    const LOG: &str = r#"{"Records":[{"eventVersion":"1.08","eventTime":"2023-03-01T10:00:00Z","eventSource":"s3.amazonaws.com","eventName":"PutObject","awsRegion":"us-west-2","sourceIPAddress":"10.0.0.1"}]}"#;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn upload(bucket: &str, key: &str) -> UploadRecord {
        UploadRecord {
            bucket: bucket.to_string(),
            key: key.to_string(),
            event_name: "ObjectCreated:Put".to_string(),
            event_time: "2023-03-01T10:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_decode_gzip_log() {
        let value = decode_log(&gzip(LOG.as_bytes())).unwrap();
        let log = parse_log(&value).unwrap();
        assert_eq!(log.records.len(), 1);
        assert_eq!(log.records[0].event_name.as_deref(), Some("PutObject"));
        assert_eq!(log.records[0].source_ip_address.as_deref(), Some("10.0.0.1"));
    }

    #[test]
    fn test_decode_plain_json() {
        let value = decode_log(LOG.as_bytes()).unwrap();
        assert_eq!(value["Records"][0]["awsRegion"], "us-west-2");
    }

    #[test]
    fn test_decode_invalid_body() {
        assert!(matches!(
            decode_log(b"not json"),
            Err(ServiceError::Serialization(_))
        ));
    }

    #[test]
    fn test_upload_notification_for_log_bucket() {
        let records = vec![
            upload("aws-cloudtrail-logs-111", "AWSLogs/a.json.gz"),
            upload("media", "cat.png"),
        ];
        let message = upload_notification(&records, "aws-cloudtrail-logs").unwrap();
        assert_eq!(
            message,
            "Notification Records Count: 2\n\
             Event Name: ObjectCreated:Put\n\
             Event time: 2023-03-01T10:00:00Z\n\
             S3 Object Key: AWSLogs/a.json.gz\n"
        );
    }

    #[test]
    fn test_upload_notification_ignores_other_buckets() {
        let records = vec![upload("media", "cat.png")];
        assert_eq!(upload_notification(&records, "aws-cloudtrail-logs"), None);
        assert_eq!(upload_notification(&[], "aws-cloudtrail-logs"), None);
    }
}
