//! DynamoDB repository for machine temperature readings.

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;

use cloudkit_core::dynamo::{
    MachineReading, MachineRepository, MACHINE_NAME_INDEX, TEMPERATURE_INDEX,
};
use cloudkit_core::Result;

use super::conversions::{item_to_reading, reading_key, reading_to_item};
use crate::error::{map_get_item_error, map_put_item_error, map_query_error};

pub struct DynamoMachines {
    client: Client,
    table_name: String,
}

impl DynamoMachines {
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }
}

#[async_trait]
impl MachineRepository for DynamoMachines {
    async fn get_reading(
        &self,
        machine_id: i64,
        machine_type: &str,
    ) -> Result<Option<MachineReading>> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .set_key(Some(reading_key(machine_id, machine_type)))
            .send()
            .await
            .map_err(|e| {
                map_get_item_error(e, "MachineReading", format!("{} {}", machine_id, machine_type))
            })?;

        match result.item {
            Some(item) => Ok(Some(item_to_reading(&item)?)),
            None => Ok(None),
        }
    }

    async fn find_by_name(&self, machine_name: &str) -> Result<Option<MachineReading>> {
        let result = self
            .client
            .query()
            .table_name(&self.table_name)
            .index_name(MACHINE_NAME_INDEX)
            .key_condition_expression("machineName = :name")
            .expression_attribute_values(":name", AttributeValue::S(machine_name.to_string()))
            .limit(1)
            .send()
            .await
            .map_err(map_query_error)?;

        result.items().first().map(item_to_reading).transpose()
    }

    async fn query_by_temperature(
        &self,
        temperature: &str,
        limit: i32,
    ) -> Result<Vec<MachineReading>> {
        let result = self
            .client
            .query()
            .table_name(&self.table_name)
            .index_name(TEMPERATURE_INDEX)
            .key_condition_expression("temperature = :temperature")
            .expression_attribute_values(
                ":temperature",
                AttributeValue::S(temperature.to_string()),
            )
            .limit(limit)
            .send()
            .await
            .map_err(map_query_error)?;

        result.items().iter().map(item_to_reading).collect()
    }

    async fn save_reading(&self, reading: &MachineReading) -> Result<()> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(reading_to_item(reading)))
            .send()
            .await
            .map_err(|e| map_put_item_error(e, "MachineReading", reading.machine_id.to_string()))?;

        Ok(())
    }
}
