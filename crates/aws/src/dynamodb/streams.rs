//! DynamoDB Streams reader.

use std::collections::HashMap;

use aws_config::SdkConfig;
use aws_sdk_dynamodbstreams::types::{AttributeValue, Record, ShardIteratorType};
use aws_sdk_dynamodbstreams::Client;

use cloudkit_core::dynamo::{ChangeRecord, StreamAttribute, StreamChange, StreamImage};
use cloudkit_core::{Result, ServiceError};

use crate::error::map_sdk_error;

/// Where to start reading a shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStart {
    /// Oldest record still retained.
    TrimHorizon,
    /// Only records written after the iterator is created.
    Latest,
}

impl From<StreamStart> for ShardIteratorType {
    fn from(start: StreamStart) -> Self {
        match start {
            StreamStart::TrimHorizon => ShardIteratorType::TrimHorizon,
            StreamStart::Latest => ShardIteratorType::Latest,
        }
    }
}

fn to_attribute(value: &AttributeValue) -> StreamAttribute {
    match value {
        AttributeValue::S(s) => StreamAttribute::S(s.clone()),
        AttributeValue::N(n) => StreamAttribute::N(n.clone()),
        AttributeValue::B(b) => StreamAttribute::B(format!("{} bytes", b.as_ref().len())),
        AttributeValue::Bool(b) => StreamAttribute::Bool(*b),
        AttributeValue::Ss(values) => StreamAttribute::StringSet(values.clone()),
        AttributeValue::Ns(values) => StreamAttribute::NumberSet(values.clone()),
        AttributeValue::Bs(values) => StreamAttribute::BinarySet(
            values
                .iter()
                .map(|b| format!("{} bytes", b.as_ref().len()))
                .collect(),
        ),
        AttributeValue::L(items) => StreamAttribute::L(items.iter().map(to_attribute).collect()),
        AttributeValue::M(map) => StreamAttribute::M(to_image(Some(map))),
        _ => StreamAttribute::Null,
    }
}

fn to_image(image: Option<&HashMap<String, AttributeValue>>) -> StreamImage {
    image
        .map(|image| {
            image
                .iter()
                .map(|(k, v)| (k.clone(), to_attribute(v)))
                .collect()
        })
        .unwrap_or_default()
}

/// Converts a shard record for printing.
pub fn to_change_record(record: &Record) -> ChangeRecord {
    let change = record.dynamodb();
    ChangeRecord {
        event_id: record.event_id().map(str::to_string),
        event_name: record.event_name().map(|name| name.as_str().to_string()),
        change: StreamChange {
            keys: to_image(change.and_then(|c| c.keys())),
            new_image: to_image(change.and_then(|c| c.new_image())),
            old_image: to_image(change.and_then(|c| c.old_image())),
        },
    }
}

pub struct StreamReader {
    client: Client,
}

impl StreamReader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_sdk(sdk: &SdkConfig) -> Self {
        Self::new(Client::new(sdk))
    }

    /// Reads up to `limit` records from the first shard of the stream.
    pub async fn read_first_shard(
        &self,
        stream_arn: &str,
        start: StreamStart,
        limit: i32,
    ) -> Result<Vec<ChangeRecord>> {
        let description = self
            .client
            .describe_stream()
            .stream_arn(stream_arn)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "DescribeStream"))?;

        let shard_id = description
            .stream_description()
            .and_then(|stream| stream.shards().first())
            .and_then(|shard| shard.shard_id())
            .ok_or_else(|| ServiceError::NotFound {
                entity_type: "Shard",
                id: stream_arn.to_string(),
            })?;
        tracing::debug!(stream_arn, shard_id, "reading shard");

        let iterator = self
            .client
            .get_shard_iterator()
            .stream_arn(stream_arn)
            .shard_id(shard_id)
            .shard_iterator_type(start.into())
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "GetShardIterator"))?;

        let Some(shard_iterator) = iterator.shard_iterator() else {
            return Ok(Vec::new());
        };

        let records = self
            .client
            .get_records()
            .shard_iterator(shard_iterator)
            .limit(limit)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "GetRecords"))?;

        Ok(records.records().iter().map(to_change_record).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_dynamodbstreams::types::{OperationType, StreamRecord};
    use cloudkit_core::dynamo::format_image;

    #[test]
    fn test_to_change_record() {
        let record = Record::builder()
            .event_id("evt-1")
            .event_name(OperationType::Modify)
            .dynamodb(
                StreamRecord::builder()
                    .keys("machineId", AttributeValue::N("42".to_string()))
                    .new_image("machineId", AttributeValue::N("42".to_string()))
                    .new_image("temperature", AttributeValue::S("85".to_string()))
                    .build(),
            )
            .build();

        let converted = to_change_record(&record);
        assert_eq!(converted.event_name.as_deref(), Some("MODIFY"));
        assert_eq!(
            format_image(&converted.change.new_image),
            "{machineId=42, temperature=85}"
        );
        assert!(converted.change.old_image.is_empty());
    }

    #[test]
    fn test_record_without_change() {
        let converted = to_change_record(&Record::builder().build());
        assert!(converted.change.keys.is_empty());
        assert!(converted.event_id.is_none());
    }
}
