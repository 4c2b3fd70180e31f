//! EC2 adapter.

use std::collections::BTreeMap;

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_ec2::primitives::DateTimeFormat;
use aws_sdk_ec2::types::{Instance, InstanceStateChange, InstanceType};
use aws_sdk_ec2::Client;

use cloudkit_core::ec2::{InstanceControl, InstanceFleet, InstanceState, InstanceSummary};
use cloudkit_core::{Result, ServiceError};

use crate::error::map_sdk_error;

/// Converts an SDK instance description.
pub fn to_summary(instance: &Instance) -> Option<InstanceSummary> {
    let instance_id = instance.instance_id()?;
    let state = instance
        .state()
        .and_then(|state| state.code())
        .map(InstanceState::from_code)
        .unwrap_or(InstanceState::Unknown);

    Some(InstanceSummary {
        instance_type: instance.instance_type().map(|t| t.as_str().to_string()),
        image_id: instance.image_id().map(str::to_string),
        private_ip: instance.private_ip_address().map(str::to_string),
        availability_zone: instance
            .placement()
            .and_then(|placement| placement.availability_zone())
            .map(str::to_string),
        architecture: instance.architecture().map(|a| a.as_str().to_string()),
        launch_time: instance
            .launch_time()
            .and_then(|time| time.fmt(DateTimeFormat::DateTime).ok()),
        root_device_type: instance.root_device_type().map(|d| d.as_str().to_string()),
        ..InstanceSummary::new(instance_id, state)
    })
}

fn changed_ids(changes: &[InstanceStateChange]) -> Vec<String> {
    changes
        .iter()
        .filter_map(|change| change.instance_id().map(str::to_string))
        .collect()
}

/// EC2-backed instance control.
#[derive(Debug, Clone)]
pub struct Ec2Instances {
    client: Client,
}

impl Ec2Instances {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_sdk(sdk: &SdkConfig) -> Self {
        Self::new(Client::new(sdk))
    }

    /// Describes the given instances.
    pub async fn describe_instances(&self, instance_ids: &[String]) -> Result<Vec<InstanceSummary>> {
        let output = self
            .client
            .describe_instances()
            .set_instance_ids(Some(instance_ids.to_vec()))
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "DescribeInstances"))?;

        Ok(output
            .reservations()
            .iter()
            .flat_map(|reservation| reservation.instances())
            .filter_map(to_summary)
            .collect())
    }

    /// Instance id to availability zone, for the given instances.
    pub async fn availability_zones(
        &self,
        instance_ids: &[String],
    ) -> Result<BTreeMap<String, String>> {
        let instances = self.describe_instances(instance_ids).await?;
        Ok(instances
            .into_iter()
            .filter_map(|instance| {
                instance
                    .availability_zone
                    .map(|zone| (instance.instance_id, zone))
            })
            .collect())
    }
}

#[async_trait]
impl InstanceControl for Ec2Instances {
    async fn start_instance(&self, instance_id: &str) -> Result<Vec<String>> {
        let output = self
            .client
            .start_instances()
            .instance_ids(instance_id)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "StartInstances"))?;
        Ok(changed_ids(output.starting_instances()))
    }
}

#[async_trait]
impl InstanceFleet for Ec2Instances {
    async fn run_instance(
        &self,
        image_id: &str,
        instance_type: &str,
        key_name: Option<&str>,
    ) -> Result<InstanceSummary> {
        let output = self
            .client
            .run_instances()
            .image_id(image_id)
            .instance_type(InstanceType::from(instance_type))
            .min_count(1)
            .max_count(1)
            .set_key_name(key_name.map(str::to_string))
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "RunInstances"))?;

        let summary = output
            .instances()
            .first()
            .and_then(to_summary)
            .ok_or_else(|| ServiceError::RequestFailed("no instance was launched".to_string()))?;
        tracing::info!(instance_id = %summary.instance_id, image_id, "launched instance");
        Ok(summary)
    }

    async fn stop_instance(&self, instance_id: &str) -> Result<Vec<String>> {
        let output = self
            .client
            .stop_instances()
            .instance_ids(instance_id)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "StopInstances"))?;
        Ok(changed_ids(output.stopping_instances()))
    }

    async fn terminate_instance(&self, instance_id: &str) -> Result<Vec<String>> {
        let output = self
            .client
            .terminate_instances()
            .instance_ids(instance_id)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "TerminateInstances"))?;
        Ok(changed_ids(output.terminating_instances()))
    }

    async fn describe_instance(&self, instance_id: &str) -> Result<Option<InstanceSummary>> {
        let instances = self.describe_instances(&[instance_id.to_string()]).await?;
        Ok(instances
            .into_iter()
            .find(|instance| instance.instance_id == instance_id))
    }
}
