//! Table deployment operations (Imperative Shell).

use std::time::Duration;

use aws_sdk_dynamodb::types::{
    AttributeDefinition, BillingMode as SdkBillingMode, CreateGlobalSecondaryIndexAction,
    GlobalSecondaryIndex, GlobalSecondaryIndexUpdate, IndexStatus, KeySchemaElement, KeyType,
    Projection, ProjectionType as SdkProjectionType, ProvisionedThroughput, ScalarAttributeType,
    StreamSpecification, StreamViewType, TableDescription, TableStatus as SdkTableStatus,
};
use aws_sdk_dynamodb::Client;

use cloudkit_core::dynamo::{
    AttributeType, BillingMode, DeployPlan, DestroyPlan, GsiConfig, IndexState, KeyAttribute,
    ProjectionType, ResourceStatus, StreamView, TableChange, TableConfig, TableState, Throughput,
};
use cloudkit_core::{Result, ServiceError};

use crate::error::{is_table_missing, map_build_error, map_sdk_error};

const ACTIVATION_ATTEMPTS: u32 = 60;
const ACTIVATION_DELAY: Duration = Duration::from_secs(2);

/// Fetches current table state, returns None if table doesn't exist.
pub async fn get_table_state(client: &Client, table_name: &str) -> Result<Option<TableState>> {
    let response = match client.describe_table().table_name(table_name).send().await {
        Ok(response) => response,
        Err(err) if is_table_missing(&err) => return Ok(None),
        Err(err) => return Err(map_sdk_error(err, "DescribeTable")),
    };

    let table = response.table().ok_or_else(|| {
        ServiceError::RequestFailed(format!("DescribeTable returned no table for {}", table_name))
    })?;
    Ok(Some(table_state(table)))
}

fn table_state(table: &TableDescription) -> TableState {
    let status = match table.table_status() {
        Some(SdkTableStatus::Creating) => ResourceStatus::Creating,
        Some(SdkTableStatus::Updating) => ResourceStatus::Updating,
        Some(SdkTableStatus::Deleting) => ResourceStatus::Deleting,
        _ => ResourceStatus::Active,
    };

    let mut keys: Vec<&KeySchemaElement> = table.key_schema().iter().collect();
    keys.sort_by_key(|key| *key.key_type() != KeyType::Hash);

    let indexes = table
        .global_secondary_indexes()
        .iter()
        .map(|gsi| IndexState {
            name: gsi.index_name().unwrap_or_default().to_string(),
            status: match gsi.index_status() {
                Some(IndexStatus::Creating) => ResourceStatus::Creating,
                Some(IndexStatus::Updating) => ResourceStatus::Updating,
                Some(IndexStatus::Deleting) => ResourceStatus::Deleting,
                _ => ResourceStatus::Active,
            },
        })
        .collect();

    let stream = table
        .stream_specification()
        .filter(|spec| spec.stream_enabled())
        .map(|spec| match spec.stream_view_type() {
            Some(StreamViewType::NewImage) => StreamView::NewImage,
            Some(StreamViewType::OldImage) => StreamView::OldImage,
            Some(StreamViewType::NewAndOldImages) => StreamView::NewAndOldImages,
            _ => StreamView::KeysOnly,
        });

    TableState {
        status,
        key_names: keys
            .into_iter()
            .map(|key| key.attribute_name().to_string())
            .collect(),
        indexes,
        stream,
    }
}

/// ARN of the table's current stream, if it has one.
pub async fn latest_stream_arn(client: &Client, table_name: &str) -> Result<Option<String>> {
    let response = client
        .describe_table()
        .table_name(table_name)
        .send()
        .await
        .map_err(|e| map_sdk_error(e, "DescribeTable"))?;

    Ok(response
        .table()
        .and_then(|table| table.latest_stream_arn())
        .map(str::to_string))
}

/// Execute a deploy plan.
///
/// A plan with mismatched keys is refused.
pub async fn execute_deploy_plan(client: &Client, plan: &DeployPlan) -> Result<()> {
    match plan {
        DeployPlan::Create(config) => {
            create_table(client, config).await?;
            wait_for_table_active(client, &config.table_name).await?;
        }
        DeployPlan::Update {
            table_name,
            changes,
        } => {
            for change in changes {
                match change {
                    TableChange::AddIndex(gsi) => add_gsi(client, table_name, gsi).await?,
                    TableChange::EnableStream(view) => {
                        enable_stream(client, table_name, *view).await?
                    }
                }
                wait_for_table_active(client, table_name).await?;
            }
        }
        DeployPlan::UpToDate { .. } => {}
        DeployPlan::KeyMismatch {
            table_name,
            expected,
            found,
        } => {
            return Err(ServiceError::InvalidState(format!(
                "table {} is keyed on [{}] instead of [{}]",
                table_name,
                found.join(", "),
                expected.join(", ")
            )))
        }
    }
    Ok(())
}

/// Execute a destroy plan.
pub async fn execute_destroy_plan(client: &Client, plan: &DestroyPlan) -> Result<()> {
    if let DestroyPlan::Delete { table_name } = plan {
        client
            .delete_table()
            .table_name(table_name)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "DeleteTable"))?;
        tracing::info!(table_name, "deleted table");
    }
    Ok(())
}

/// Adds a single index to an existing table and waits for it to become active.
pub async fn create_index(client: &Client, table_name: &str, gsi: &GsiConfig) -> Result<()> {
    add_gsi(client, table_name, gsi).await?;
    wait_for_table_active(client, table_name).await
}

async fn create_table(client: &Client, config: &TableConfig) -> Result<()> {
    let mut attribute_definitions = Vec::new();
    push_definition(&mut attribute_definitions, &config.partition_key)?;
    if let Some(sk) = &config.sort_key {
        push_definition(&mut attribute_definitions, sk)?;
    }
    for gsi in &config.gsis {
        push_definition(&mut attribute_definitions, &gsi.partition_key)?;
        if let Some(sk) = &gsi.sort_key {
            push_definition(&mut attribute_definitions, sk)?;
        }
    }

    let mut request = client
        .create_table()
        .table_name(&config.table_name)
        .set_key_schema(Some(key_schema(&config.partition_key, config.sort_key.as_ref())?))
        .set_attribute_definitions(Some(attribute_definitions));

    request = match config.billing_mode {
        BillingMode::PayPerRequest => request.billing_mode(SdkBillingMode::PayPerRequest),
        BillingMode::Provisioned(throughput) => request
            .billing_mode(SdkBillingMode::Provisioned)
            .provisioned_throughput(provisioned(throughput)?),
    };

    if let Some(view) = config.stream_view {
        request = request.stream_specification(stream_specification(view)?);
    }

    for gsi in &config.gsis {
        request = request.global_secondary_indexes(
            GlobalSecondaryIndex::builder()
                .index_name(&gsi.name)
                .set_key_schema(Some(key_schema(&gsi.partition_key, gsi.sort_key.as_ref())?))
                .projection(projection(&gsi.projection))
                .set_provisioned_throughput(gsi.throughput.map(provisioned).transpose()?)
                .build()
                .map_err(map_build_error)?,
        );
    }

    request
        .send()
        .await
        .map_err(|e| map_sdk_error(e, "CreateTable"))?;
    tracing::info!(table_name = %config.table_name, "created table");
    Ok(())
}

async fn add_gsi(client: &Client, table_name: &str, gsi: &GsiConfig) -> Result<()> {
    let mut attribute_definitions = Vec::new();
    push_definition(&mut attribute_definitions, &gsi.partition_key)?;
    if let Some(sk) = &gsi.sort_key {
        push_definition(&mut attribute_definitions, sk)?;
    }

    let action = CreateGlobalSecondaryIndexAction::builder()
        .index_name(&gsi.name)
        .set_key_schema(Some(key_schema(&gsi.partition_key, gsi.sort_key.as_ref())?))
        .projection(projection(&gsi.projection))
        .set_provisioned_throughput(gsi.throughput.map(provisioned).transpose()?)
        .build()
        .map_err(map_build_error)?;

    client
        .update_table()
        .table_name(table_name)
        .set_attribute_definitions(Some(attribute_definitions))
        .global_secondary_index_updates(GlobalSecondaryIndexUpdate::builder().create(action).build())
        .send()
        .await
        .map_err(|e| map_sdk_error(e, "UpdateTable"))?;
    tracing::info!(table_name, index = %gsi.name, "requested index creation");
    Ok(())
}

async fn enable_stream(client: &Client, table_name: &str, view: StreamView) -> Result<()> {
    client
        .update_table()
        .table_name(table_name)
        .stream_specification(stream_specification(view)?)
        .send()
        .await
        .map_err(|e| map_sdk_error(e, "UpdateTable"))?;
    tracing::info!(table_name, view = view.as_str(), "enabled stream");
    Ok(())
}

async fn wait_for_table_active(client: &Client, table_name: &str) -> Result<()> {
    for attempt in 1..=ACTIVATION_ATTEMPTS {
        if let Some(state) = get_table_state(client, table_name).await? {
            if state.is_ready() {
                return Ok(());
            }
        }
        tracing::debug!(table_name, attempt, "table not active yet");
        tokio::time::sleep(ACTIVATION_DELAY).await;
    }

    Err(ServiceError::InvalidState(format!(
        "table {} did not become active in time",
        table_name
    )))
}

fn key_schema(
    partition_key: &KeyAttribute,
    sort_key: Option<&KeyAttribute>,
) -> Result<Vec<KeySchemaElement>> {
    let mut schema = vec![KeySchemaElement::builder()
        .attribute_name(&partition_key.name)
        .key_type(KeyType::Hash)
        .build()
        .map_err(map_build_error)?];

    if let Some(sk) = sort_key {
        schema.push(
            KeySchemaElement::builder()
                .attribute_name(&sk.name)
                .key_type(KeyType::Range)
                .build()
                .map_err(map_build_error)?,
        );
    }
    Ok(schema)
}

/// Adds an attribute definition unless one with the same name exists.
fn push_definition(definitions: &mut Vec<AttributeDefinition>, key: &KeyAttribute) -> Result<()> {
    if definitions
        .iter()
        .any(|a| a.attribute_name() == key.name.as_str())
    {
        return Ok(());
    }
    definitions.push(
        AttributeDefinition::builder()
            .attribute_name(&key.name)
            .attribute_type(to_scalar_type(key.attribute_type))
            .build()
            .map_err(map_build_error)?,
    );
    Ok(())
}

fn projection(projection: &ProjectionType) -> Projection {
    match projection {
        ProjectionType::All => Projection::builder()
            .projection_type(SdkProjectionType::All)
            .build(),
        ProjectionType::KeysOnly => Projection::builder()
            .projection_type(SdkProjectionType::KeysOnly)
            .build(),
        ProjectionType::Include(attributes) => Projection::builder()
            .projection_type(SdkProjectionType::Include)
            .set_non_key_attributes(Some(attributes.clone()))
            .build(),
    }
}

fn provisioned(throughput: Throughput) -> Result<ProvisionedThroughput> {
    ProvisionedThroughput::builder()
        .read_capacity_units(throughput.read)
        .write_capacity_units(throughput.write)
        .build()
        .map_err(map_build_error)
}

fn stream_specification(view: StreamView) -> Result<StreamSpecification> {
    let view_type = match view {
        StreamView::KeysOnly => StreamViewType::KeysOnly,
        StreamView::NewImage => StreamViewType::NewImage,
        StreamView::OldImage => StreamViewType::OldImage,
        StreamView::NewAndOldImages => StreamViewType::NewAndOldImages,
    };
    StreamSpecification::builder()
        .stream_enabled(true)
        .stream_view_type(view_type)
        .build()
        .map_err(map_build_error)
}

fn to_scalar_type(attr_type: AttributeType) -> ScalarAttributeType {
    match attr_type {
        AttributeType::String => ScalarAttributeType::S,
        AttributeType::Number => ScalarAttributeType::N,
    }
}
