//! Machine temperature functions: the stream monitor and the reporting
//! endpoint behind API Gateway.

use aws_lambda_events::apigw::ApiGatewayV2httpRequest;
use aws_lambda_events::dynamodb::{Event, EventRecord};
use cloudkit_core::dynamo::{
    temperature_state, upsert_reading, MachineRepository, TemperatureState,
};
use serde::Deserialize;

/// Body returned by the reporting endpoint, whatever happened.
pub const REPORT_RESPONSE: &str = "success\n";

/// A reading as stored, either as text or as a number.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Reading {
    Text(String),
    Number(f64),
}

/// The attributes of a machine item the monitor looks at.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MachineImage {
    machine_id: Option<i64>,
    temperature: Option<Reading>,
}

fn machine_image(record: &EventRecord) -> Result<MachineImage, serde_dynamo::Error> {
    serde_dynamo::from_item(record.change.new_image.clone())
}

/// Logs the temperature state of every changed machine.
///
/// Returns the machine label and state of each record that reported one.
/// Records without a readable temperature are skipped.
pub fn monitor(event: &Event) -> Vec<(String, TemperatureState)> {
    let mut states = Vec::new();
    for record in &event.records {
        let image = match machine_image(record) {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!(event_id = ?record.event_id, error = %e, "unreadable image");
                continue;
            }
        };

        let machine = image
            .machine_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let temperature = match image.temperature {
            Some(Reading::Text(text)) => text,
            Some(Reading::Number(value)) => value.to_string(),
            None => continue,
        };

        match temperature_state(&temperature) {
            Ok(Some(state)) => {
                tracing::info!("{} state: {}", machine, state);
                states.push((machine, state));
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(machine = %machine, error = %e, "skipping record"),
        }
    }
    states
}

/// A temperature reported through the query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemperatureReport {
    pub machine_name: String,
    pub machine_type: String,
    pub temperature: String,
}

impl TemperatureReport {
    /// Reads `machineName`, `machineType` and `temperature` from an HTTP API
    /// request. All three have to be present.
    pub fn from_request(request: &ApiGatewayV2httpRequest) -> Option<Self> {
        let params = &request.query_string_parameters;
        let param = |name: &str| params.first(name).map(str::to_string);
        Some(Self {
            machine_name: param("machineName")?,
            machine_type: param("machineType")?,
            temperature: param("temperature")?,
        })
    }
}

/// Stores a reported temperature on the machine's item.
///
/// An unknown machine is created with `new_id`. A failed lookup counts as an
/// unknown machine; a failed save is logged and reported as `false`.
pub async fn record_temperature<R: MachineRepository + ?Sized>(
    repo: &R,
    report: &TemperatureReport,
    new_id: i64,
) -> bool {
    let existing = match repo.find_by_name(&report.machine_name).await {
        Ok(existing) => existing,
        Err(e) => {
            tracing::warn!(machine = %report.machine_name, error = %e, "lookup failed");
            None
        }
    };

    let reading = upsert_reading(
        existing,
        &report.machine_name,
        &report.machine_type,
        &report.temperature,
        new_id,
    );

    match repo.save_reading(&reading).await {
        Ok(()) => {
            tracing::info!(
                machine_id = reading.machine_id,
                temperature = %report.temperature,
                "recorded temperature"
            );
            true
        }
        Err(e) => {
            tracing::error!(machine_id = reading.machine_id, error = %e, "failed to save reading");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudkit_core::dynamo::{InMemoryDynamo, MachineReading};
    use serde_json::{json, Value};

    fn stream_event(records: Value) -> Event {
        serde_json::from_value(json!({ "Records": records })).unwrap()
    }

    fn change(machine_id: &str, temperature: Value) -> Value {
        json!({
            "eventID": machine_id,
            "eventName": "MODIFY",
            "eventVersion": "1.1",
            "eventSource": "aws:dynamodb",
            "awsRegion": "us-east-1",
            "eventSourceARN": "arn:aws:dynamodb:us-east-1:123456789012:table/streams-table/stream/2023-03-01T00:00:00.000",
            "dynamodb": {
                "ApproximateCreationDateTime": 1677628800,
                "Keys": {
                    "machineId": { "N": machine_id },
                    "machineType": { "S": "press" }
                },
                "NewImage": {
                    "machineId": { "N": machine_id },
                    "machineType": { "S": "press" },
                    "temperature": temperature
                },
                "SequenceNumber": format!("{}00", machine_id),
                "SizeBytes": 59,
                "StreamViewType": "NEW_AND_OLD_IMAGES"
            }
        })
    }

    fn http_request(query: Value) -> ApiGatewayV2httpRequest {
        serde_json::from_value(json!({
            "version": "2.0",
            "routeKey": "GET /temperature",
            "rawPath": "/temperature",
            "rawQueryString": "",
            "headers": { "host": "abcdef123.execute-api.us-east-1.amazonaws.com" },
            "queryStringParameters": query,
            "requestContext": {
                "accountId": "123456789012",
                "apiId": "abcdef123",
                "domainName": "abcdef123.execute-api.us-east-1.amazonaws.com",
                "domainPrefix": "abcdef123",
                "http": {
                    "method": "GET",
                    "path": "/temperature",
                    "protocol": "HTTP/1.1",
                    "sourceIp": "203.0.113.7",
                    "userAgent": "curl/8.0"
                },
                "requestId": "id",
                "routeKey": "GET /temperature",
                "stage": "$default",
                "time": "01/Mar/2023:10:00:00 +0000",
                "timeEpoch": 1677664800000i64
            },
            "isBase64Encoded": false
        }))
        .unwrap()
    }

    #[test]
    fn test_monitor_states() {
        let event = stream_event(json!([
            change("1", json!({ "S": "95" })),
            change("2", json!({ "N": "40.5" })),
            change("3", json!({ "S": "80" })),
            change("4", json!({ "S": "hot" })),
        ]));

        assert_eq!(
            monitor(&event),
            vec![
                ("1".to_string(), TemperatureState::Overheated),
                ("2".to_string(), TemperatureState::Normal),
            ]
        );
    }

    #[test]
    fn test_monitor_skips_removed_items() {
        let mut removed = change("5", json!({ "S": "99" }));
        removed["eventName"] = json!("REMOVE");
        removed["dynamodb"]
            .as_object_mut()
            .unwrap()
            .remove("NewImage");

        assert!(monitor(&stream_event(json!([removed]))).is_empty());
    }

    #[test]
    fn test_report_from_request() {
        let request = http_request(json!({
            "machineName": "press-1",
            "machineType": "press",
            "temperature": "72"
        }));
        assert_eq!(
            TemperatureReport::from_request(&request),
            Some(TemperatureReport {
                machine_name: "press-1".to_string(),
                machine_type: "press".to_string(),
                temperature: "72".to_string(),
            })
        );

        let partial = http_request(json!({ "machineName": "press-1" }));
        assert_eq!(TemperatureReport::from_request(&partial), None);
        assert_eq!(TemperatureReport::from_request(&http_request(json!({}))), None);
    }

    #[tokio::test]
    async fn test_record_new_machine() {
        let repo = InMemoryDynamo::new();
        let report = TemperatureReport {
            machine_name: "press-1".to_string(),
            machine_type: "press".to_string(),
            temperature: "72".to_string(),
        };

        assert!(record_temperature(&repo, &report, 123456780).await);

        let saved = repo.get_reading(123456780, "press").await.unwrap().unwrap();
        assert_eq!(saved.machine_name.as_deref(), Some("press-1"));
        assert_eq!(saved.temperature.as_deref(), Some("72"));
    }

    #[tokio::test]
    async fn test_record_known_machine_keeps_identity() {
        let repo = InMemoryDynamo::new();
        repo.save_reading(&MachineReading {
            machine_id: 42,
            machine_type: "lathe".to_string(),
            machine_name: Some("lathe-7".to_string()),
            temperature: Some("60".to_string()),
        })
        .await
        .unwrap();
        let report = TemperatureReport {
            machine_name: "lathe-7".to_string(),
            machine_type: "ignored".to_string(),
            temperature: "91".to_string(),
        };

        assert!(record_temperature(&repo, &report, 999).await);

        assert_eq!(repo.reading_count().await, 1);
        let saved = repo.get_reading(42, "lathe").await.unwrap().unwrap();
        assert_eq!(saved.temperature.as_deref(), Some("91"));
    }
}
