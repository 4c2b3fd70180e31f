//! DynamoDB attribute conversion functions.
//!
//! Pure functions for converting between DynamoDB AttributeValue maps and domain types.

use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use cloudkit_core::dynamo::{MachineReading, Movie, MovieSeed};
use cloudkit_core::{Result, ServiceError};

pub type Item = HashMap<String, AttributeValue>;

// ============================================================================
// Movie conversions
// ============================================================================

/// Key of a movie item.
pub fn movie_key(year: i32, title: &str) -> Item {
    let mut key = HashMap::new();
    key.insert("year".to_string(), AttributeValue::N(year.to_string()));
    key.insert("title".to_string(), AttributeValue::S(title.to_string()));
    key
}

/// Convert a Movie to DynamoDB item.
pub fn movie_to_item(movie: &Movie) -> Item {
    let mut item = movie_key(movie.year, &movie.title);
    if let Some(actors) = &movie.actors {
        item.insert(
            "actors".to_string(),
            AttributeValue::L(actors.iter().cloned().map(AttributeValue::S).collect()),
        );
    }
    item
}

/// Convert a seed entry to DynamoDB item. The `info` document becomes a map.
pub fn seed_to_item(seed: &MovieSeed) -> Item {
    let mut item = movie_key(seed.year, &seed.title);
    if !seed.info.is_null() {
        item.insert("info".to_string(), json_to_attribute(&seed.info));
    }
    item
}

/// Convert a DynamoDB item to Movie.
pub fn item_to_movie(item: &Item) -> Result<Movie> {
    Ok(Movie {
        year: get_number(item, "year")?,
        title: get_string(item, "title")?,
        actors: get_string_list(item, "actors"),
    })
}

// ============================================================================
// Machine reading conversions
// ============================================================================

pub fn reading_key(machine_id: i64, machine_type: &str) -> Item {
    let mut key = HashMap::new();
    key.insert(
        "machineId".to_string(),
        AttributeValue::N(machine_id.to_string()),
    );
    key.insert(
        "machineType".to_string(),
        AttributeValue::S(machine_type.to_string()),
    );
    key
}

/// Convert a MachineReading to DynamoDB item.
pub fn reading_to_item(reading: &MachineReading) -> Item {
    let mut item = reading_key(reading.machine_id, &reading.machine_type);
    if let Some(name) = &reading.machine_name {
        item.insert("machineName".to_string(), AttributeValue::S(name.clone()));
    }
    if let Some(temperature) = &reading.temperature {
        item.insert(
            "temperature".to_string(),
            AttributeValue::S(temperature.clone()),
        );
    }
    item
}

/// Convert a DynamoDB item to MachineReading.
pub fn item_to_reading(item: &Item) -> Result<MachineReading> {
    Ok(MachineReading {
        machine_id: get_number(item, "machineId")?,
        machine_type: get_string(item, "machineType")?,
        machine_name: get_optional_string(item, "machineName"),
        temperature: get_optional_string(item, "temperature"),
    })
}

// ============================================================================
// Generic conversions
// ============================================================================

/// Converts a JSON document to the equivalent attribute value.
pub fn json_to_attribute(value: &serde_json::Value) -> AttributeValue {
    use serde_json::Value;

    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Array(items) => AttributeValue::L(items.iter().map(json_to_attribute).collect()),
        Value::Object(map) => AttributeValue::M(
            map.iter()
                .map(|(k, v)| (k.clone(), json_to_attribute(v)))
                .collect(),
        ),
    }
}

// ============================================================================
// Helper functions
// ============================================================================

fn get_string(item: &Item, key: &str) -> Result<String> {
    item.get(key)
        .and_then(|v| v.as_s().ok())
        .map(|s| s.to_string())
        .ok_or_else(|| ServiceError::InvalidData(format!("Missing or invalid field: {}", key)))
}

fn get_optional_string(item: &Item, key: &str) -> Option<String> {
    item.get(key)
        .and_then(|v| v.as_s().ok())
        .map(|s| s.to_string())
}

fn get_number<T: std::str::FromStr>(item: &Item, key: &str) -> Result<T> {
    let raw = item
        .get(key)
        .and_then(|v| v.as_n().ok())
        .ok_or_else(|| ServiceError::InvalidData(format!("Missing or invalid field: {}", key)))?;
    raw.parse()
        .map_err(|_| ServiceError::InvalidData(format!("Invalid number {}: {}", key, raw)))
}

/// Accepts both a list of strings and a string set.
fn get_string_list(item: &Item, key: &str) -> Option<Vec<String>> {
    match item.get(key)? {
        AttributeValue::L(values) => Some(
            values
                .iter()
                .filter_map(|v| v.as_s().ok().cloned())
                .collect(),
        ),
        AttributeValue::Ss(values) => Some(values.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_movie_roundtrip_with_actors() {
        let movie = Movie::new(2013, "Rush").with_actors(vec![
            "Daniel Bruhl".to_string(),
            "Chris Hemsworth".to_string(),
        ]);

        let item = movie_to_item(&movie);
        assert_eq!(item.get("year"), Some(&AttributeValue::N("2013".to_string())));
        assert_eq!(item_to_movie(&item).unwrap(), movie);
    }

    #[test]
    fn test_item_to_movie_reads_string_sets() {
        let mut item = movie_key(1999, "The Matrix");
        item.insert(
            "actors".to_string(),
            AttributeValue::Ss(vec!["Keanu Reeves".to_string()]),
        );

        let movie = item_to_movie(&item).unwrap();
        assert_eq!(movie.actors, Some(vec!["Keanu Reeves".to_string()]));
    }

    #[test]
    fn test_item_to_movie_missing_title() {
        let mut item = movie_key(1999, "x");
        item.remove("title");

        let err = item_to_movie(&item).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidData(msg) if msg.contains("title")));
    }

    #[test]
    fn test_seed_info_becomes_map() {
        let seed = MovieSeed {
            year: 2013,
            title: "Rush".to_string(),
            info: json!({"rating": 8.3, "genres": ["Action", "Drama"], "plot": null}),
        };

        let item = seed_to_item(&seed);
        let info = item.get("info").unwrap().as_m().unwrap();
        assert_eq!(info.get("rating"), Some(&AttributeValue::N("8.3".to_string())));
        assert_eq!(
            info.get("genres"),
            Some(&AttributeValue::L(vec![
                AttributeValue::S("Action".to_string()),
                AttributeValue::S("Drama".to_string()),
            ]))
        );
        assert_eq!(info.get("plot"), Some(&AttributeValue::Null(true)));
    }

    #[test]
    fn test_reading_roundtrip() {
        let reading = MachineReading {
            machine_id: 123456780,
            machine_type: "press".to_string(),
            machine_name: Some("press-1".to_string()),
            temperature: Some("81".to_string()),
        };

        let item = reading_to_item(&reading);
        assert_eq!(
            item.get("machineId"),
            Some(&AttributeValue::N("123456780".to_string()))
        );
        assert_eq!(item_to_reading(&item).unwrap(), reading);
    }

    #[test]
    fn test_item_to_reading_bad_id() {
        let mut item = reading_key(1, "press");
        item.insert("machineId".to_string(), AttributeValue::N("abc".to_string()));
        assert!(item_to_reading(&item).is_err());
    }
}
