//! Filters over bucket listings.

use serde::Serialize;

/// Smallest CloudTrail log object worth opening, in bytes.
pub const MIN_LOG_SIZE: i64 = 1024;

/// Key and size of a listed object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectSummary {
    pub key: String,
    pub size: i64,
}

impl ObjectSummary {
    pub fn new(key: impl Into<String>, size: i64) -> Self {
        Self {
            key: key.into(),
            size,
        }
    }
}

/// Finds a listed object by exact key.
pub fn find_object<'a>(objects: &'a [ObjectSummary], key: &str) -> Option<&'a ObjectSummary> {
    objects.iter().find(|object| object.key == key)
}

/// Log objects whose key mentions `region` and whose size is at least `min_size`.
pub fn regional_logs<'a>(
    objects: &'a [ObjectSummary],
    region: &str,
    min_size: i64,
) -> Vec<&'a ObjectSummary> {
    objects
        .iter()
        .filter(|object| object.key.contains(region) && object.size >= min_size)
        .collect()
}
