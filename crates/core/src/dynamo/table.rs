//! Table configuration types (Functional Core - pure data).

use crate::error::{Result, ServiceError};

use super::machine::{MACHINE_NAME_INDEX, STREAMS_TABLE, TEMPERATURE_INDEX};
use super::movie::{MOVIES_TABLE, TITLE_INDEX};

/// Table schema configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConfig {
    pub table_name: String,
    pub partition_key: KeyAttribute,
    pub sort_key: Option<KeyAttribute>,
    pub gsis: Vec<GsiConfig>,
    pub billing_mode: BillingMode,
    pub stream_view: Option<StreamView>,
}

/// A key attribute definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAttribute {
    pub name: String,
    pub attribute_type: AttributeType,
}

impl KeyAttribute {
    pub fn string(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attribute_type: AttributeType::String,
        }
    }

    pub fn number(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attribute_type: AttributeType::Number,
        }
    }
}

/// DynamoDB scalar attribute types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeType {
    String,
    Number,
}

impl AttributeType {
    /// Short type code, as written in DynamoDB attribute definitions.
    pub fn code(&self) -> &'static str {
        match self {
            AttributeType::String => "S",
            AttributeType::Number => "N",
        }
    }
}

/// Global Secondary Index configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GsiConfig {
    pub name: String,
    pub partition_key: KeyAttribute,
    pub sort_key: Option<KeyAttribute>,
    pub projection: ProjectionType,
    /// Required when the table uses provisioned billing.
    pub throughput: Option<Throughput>,
}

/// GSI projection type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectionType {
    All,
    KeysOnly,
    Include(Vec<String>),
}

/// Provisioned read and write capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throughput {
    pub read: i64,
    pub write: i64,
}

/// Billing mode for the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingMode {
    PayPerRequest,
    Provisioned(Throughput),
}

/// What a table stream records for each change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamView {
    KeysOnly,
    NewImage,
    OldImage,
    NewAndOldImages,
}

impl StreamView {
    /// The `StreamViewType` value DynamoDB uses for this view.
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamView::KeysOnly => "KEYS_ONLY",
            StreamView::NewImage => "NEW_IMAGE",
            StreamView::OldImage => "OLD_IMAGE",
            StreamView::NewAndOldImages => "NEW_AND_OLD_IMAGES",
        }
    }
}

impl TableConfig {
    /// Sets the table name.
    pub fn with_table_name(mut self, name: &str) -> Self {
        self.table_name = name.to_string();
        self
    }

    /// Returns the GSI with the given name.
    pub fn gsi(&self, name: &str) -> Option<&GsiConfig> {
        self.gsis.iter().find(|gsi| gsi.name == name)
    }
}

/// The Movies table: `year` (N) hash key, `title` (S) range key.
pub fn movies_table_config() -> TableConfig {
    TableConfig {
        table_name: MOVIES_TABLE.to_string(),
        partition_key: KeyAttribute::number("year"),
        sort_key: Some(KeyAttribute::string("title")),
        gsis: vec![GsiConfig {
            name: TITLE_INDEX.to_string(),
            partition_key: KeyAttribute::string("title"),
            sort_key: None,
            projection: ProjectionType::All,
            throughput: None,
        }],
        billing_mode: BillingMode::PayPerRequest,
        stream_view: Some(StreamView::NewAndOldImages),
    }
}

/// The machine readings table: `machineId` (N) hash key, `machineType` (S) range key.
///
/// The stream carries new and old images for the temperature monitor.
pub fn streams_table_config() -> TableConfig {
    let throughput = Throughput { read: 1, write: 1 };
    TableConfig {
        table_name: STREAMS_TABLE.to_string(),
        partition_key: KeyAttribute::number("machineId"),
        sort_key: Some(KeyAttribute::string("machineType")),
        gsis: vec![
            GsiConfig {
                name: MACHINE_NAME_INDEX.to_string(),
                partition_key: KeyAttribute::string("machineName"),
                sort_key: None,
                projection: ProjectionType::All,
                throughput: Some(throughput),
            },
            temperature_gsi(KeyAttribute::string("temperature"), None),
        ],
        billing_mode: BillingMode::Provisioned(throughput),
        stream_view: Some(StreamView::NewAndOldImages),
    }
}

/// Builds the temperature index from explicit key attribute names.
///
/// The hash key is mandatory; the range key is optional.
pub fn temperature_index(hash_key: Option<&str>, range_key: Option<&str>) -> Result<GsiConfig> {
    let hash_key = hash_key.filter(|key| !key.is_empty()).ok_or_else(|| {
        ServiceError::InvalidData(
            "GSI hash key must have an explicit value and can not be empty".to_string(),
        )
    })?;

    Ok(temperature_gsi(
        key_for(hash_key),
        range_key.filter(|key| !key.is_empty()).map(key_for),
    ))
}

fn temperature_gsi(partition_key: KeyAttribute, sort_key: Option<KeyAttribute>) -> GsiConfig {
    GsiConfig {
        name: TEMPERATURE_INDEX.to_string(),
        partition_key,
        sort_key,
        projection: ProjectionType::Include(vec![
            "machineId".to_string(),
            "machineType".to_string(),
        ]),
        throughput: Some(Throughput { read: 1, write: 1 }),
    }
}

/// Attribute types of the streams table columns.
fn key_for(name: &str) -> KeyAttribute {
    match name {
        "machineId" => KeyAttribute::number(name),
        _ => KeyAttribute::string(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movies_table_keys() {
        let config = movies_table_config();
        assert_eq!(config.table_name, "Movies");
        assert_eq!(config.partition_key, KeyAttribute::number("year"));
        assert_eq!(config.sort_key, Some(KeyAttribute::string("title")));
        assert!(config.gsi("title-index").is_some());
    }

    #[test]
    fn test_streams_table_indexes() {
        let config = streams_table_config();
        assert_eq!(config.table_name, "streams-table");
        assert_eq!(config.partition_key, KeyAttribute::number("machineId"));

        let temperature = config.gsi("temperature-index").unwrap();
        assert_eq!(
            temperature.projection,
            ProjectionType::Include(vec!["machineId".to_string(), "machineType".to_string()])
        );
        assert_eq!(temperature.throughput, Some(Throughput { read: 1, write: 1 }));
        assert!(config.gsi("machine-name-index").is_some());
    }

    #[test]
    fn test_temperature_index_requires_hash_key() {
        assert!(matches!(
            temperature_index(None, None),
            Err(ServiceError::InvalidData(_))
        ));
        assert!(temperature_index(Some(""), Some("machineType")).is_err());
    }

    #[test]
    fn test_temperature_index_with_range_key() {
        let gsi = temperature_index(Some("temperature"), Some("machineId")).unwrap();
        assert_eq!(gsi.partition_key, KeyAttribute::string("temperature"));
        assert_eq!(gsi.sort_key, Some(KeyAttribute::number("machineId")));
    }

    #[test]
    fn test_with_table_name() {
        let config = movies_table_config().with_table_name("Movies-test");
        assert_eq!(config.table_name, "Movies-test");
    }
}
