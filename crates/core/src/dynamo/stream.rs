//! DynamoDB Streams records as read from a shard, and the temperature rule
//! applied to changed machines.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Result, ServiceError};

use super::machine::TemperatureState;

/// Item image keyed by attribute name, in key order.
pub type StreamImage = BTreeMap<String, StreamAttribute>;

/// A DynamoDB attribute value, reduced to what is printed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamAttribute {
    S(String),
    N(String),
    /// Binary values are kept as a size description.
    B(String),
    Bool(bool),
    Null,
    StringSet(Vec<String>),
    NumberSet(Vec<String>),
    BinarySet(Vec<String>),
    L(Vec<StreamAttribute>),
    M(StreamImage),
}

impl fmt::Display for StreamAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamAttribute::S(v) | StreamAttribute::N(v) | StreamAttribute::B(v) => f.write_str(v),
            StreamAttribute::Bool(v) => write!(f, "{}", v),
            StreamAttribute::Null => f.write_str("null"),
            StreamAttribute::StringSet(v)
            | StreamAttribute::NumberSet(v)
            | StreamAttribute::BinarySet(v) => write!(f, "[{}]", v.join(", ")),
            StreamAttribute::L(items) => {
                let items: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", items.join(", "))
            }
            StreamAttribute::M(map) => f.write_str(&format_image(map)),
        }
    }
}

/// Renders an image as `{key=value, ...}` in key order.
pub fn format_image(image: &StreamImage) -> String {
    let fields: Vec<String> = image
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect();
    format!("{{{}}}", fields.join(", "))
}

/// One change read from a stream shard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeRecord {
    pub event_id: Option<String>,
    /// `INSERT`, `MODIFY` or `REMOVE`.
    pub event_name: Option<String>,
    pub change: StreamChange,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamChange {
    pub keys: StreamImage,
    pub new_image: StreamImage,
    pub old_image: StreamImage,
}

/// Temperature state for a reading taken from a changed item.
///
/// Readings exactly at the threshold report nothing. A reading that is not
/// a number is invalid.
pub fn temperature_state(temperature: &str) -> Result<Option<TemperatureState>> {
    let value: f64 = temperature.trim().parse().map_err(|_| {
        ServiceError::InvalidData(format!("temperature is not a number: {}", temperature))
    })?;
    Ok(TemperatureState::classify(value))
}
