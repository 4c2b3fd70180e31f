//! EFS adapter.

use aws_config::SdkConfig;
use aws_sdk_efs::types::{FileSystemDescription, MountTargetDescription};
use aws_sdk_efs::Client;

use cloudkit_core::efs::{FileSystemSummary, MountTarget};
use cloudkit_core::Result;

use crate::error::map_sdk_error;

pub fn to_file_system(description: &FileSystemDescription) -> FileSystemSummary {
    FileSystemSummary {
        name: description.name().map(str::to_string),
        arn: description.file_system_arn().map(str::to_string),
        file_system_id: description.file_system_id().to_string(),
        mount_target_count: description.number_of_mount_targets(),
    }
}

/// Mount targets without an address or zone cannot be used and are skipped.
pub fn to_mount_target(description: &MountTargetDescription) -> Option<MountTarget> {
    Some(MountTarget {
        availability_zone: description.availability_zone_name()?.to_string(),
        ip_address: description.ip_address()?.to_string(),
    })
}

/// EFS file system queries.
#[derive(Debug, Clone)]
pub struct EfsFileSystems {
    client: Client,
}

impl EfsFileSystems {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_sdk(sdk: &SdkConfig) -> Self {
        Self::new(Client::new(sdk))
    }

    pub async fn list_file_systems(&self) -> Result<Vec<FileSystemSummary>> {
        let mut file_systems = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let output = self
                .client
                .describe_file_systems()
                .set_marker(marker.take())
                .send()
                .await
                .map_err(|e| map_sdk_error(e, "DescribeFileSystems"))?;

            file_systems.extend(output.file_systems().iter().map(to_file_system));
            match output.next_marker() {
                Some(next) => marker = Some(next.to_string()),
                None => break,
            }
        }
        Ok(file_systems)
    }

    pub async fn mount_targets(&self, file_system_id: &str) -> Result<Vec<MountTarget>> {
        let output = self
            .client
            .describe_mount_targets()
            .file_system_id(file_system_id)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "DescribeMountTargets"))?;

        Ok(output
            .mount_targets()
            .iter()
            .filter_map(to_mount_target)
            .collect())
    }
}
