//! S3 adapter: object access for the document pipeline plus the bucket
//! administration calls used by the command line examples.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    BucketLocationConstraint, BucketVersioningStatus, CompletedMultipartUpload, CompletedPart,
    CreateBucketConfiguration, Destination, ReplicationConfiguration, ReplicationRule,
    ReplicationRuleStatus, VersioningConfiguration,
};
use aws_sdk_s3::Client;

use cloudkit_core::s3::{
    ObjectStore, ObjectSummary, ObjectTag, PartPlan, ReplicationConfig, ReplicationRuleSpec,
};
use cloudkit_core::{Result, ServiceError};

use crate::error::{map_build_error, map_get_object_error, map_sdk_error};

/// Builds an S3 client, optionally using transfer acceleration endpoints.
pub fn client(sdk: &SdkConfig, accelerate: bool) -> Client {
    let config = aws_sdk_s3::config::Builder::from(sdk)
        .accelerate(accelerate)
        .force_path_style(sdk.endpoint_url().is_some())
        .build();
    Client::from_conf(config)
}

/// Encodes tags as the URL query string S3 expects in `x-amz-tagging`.
pub fn tagging_header(tags: &[ObjectTag]) -> String {
    tags.iter()
        .map(|tag| {
            format!(
                "{}={}",
                urlencoding::encode(&tag.key),
                urlencoding::encode(&tag.value)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// S3-backed object store.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Names of every bucket owned by the caller.
    pub async fn list_buckets(&self) -> Result<Vec<String>> {
        let output = self
            .client
            .list_buckets()
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "ListBuckets"))?;

        Ok(output
            .buckets()
            .iter()
            .filter_map(|bucket| bucket.name().map(str::to_string))
            .collect())
    }

    pub async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|service| service.is_not_found()) =>
            {
                Ok(false)
            }
            Err(err) => Err(map_sdk_error(err, "HeadBucket")),
        }
    }

    /// Creates a bucket in `region`.
    pub async fn create_bucket(&self, bucket: &str, region: &str) -> Result<()> {
        let mut request = self.client.create_bucket().bucket(bucket);
        // us-east-1 rejects an explicit location constraint
        if region != "us-east-1" {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(region))
                    .build(),
            );
        }

        request.send().await.map_err(|e| map_sdk_error(e, "CreateBucket"))?;
        tracing::info!(bucket, region, "created bucket");
        Ok(())
    }

    /// The bucket policy document, when the bucket has one.
    pub async fn get_bucket_policy(&self, bucket: &str) -> Result<Option<String>> {
        match self.client.get_bucket_policy().bucket(bucket).send().await {
            Ok(output) => Ok(output.policy().map(str::to_string)),
            Err(err) if err.code() == Some("NoSuchBucketPolicy") => Ok(None),
            Err(err) => Err(map_sdk_error(err, "GetBucketPolicy")),
        }
    }

    pub async fn put_bucket_policy(&self, bucket: &str, policy: &str) -> Result<()> {
        self.client
            .put_bucket_policy()
            .bucket(bucket)
            .policy(policy)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "PutBucketPolicy"))?;
        Ok(())
    }

    pub async fn enable_versioning(&self, bucket: &str) -> Result<()> {
        self.client
            .put_bucket_versioning()
            .bucket(bucket)
            .versioning_configuration(
                VersioningConfiguration::builder()
                    .status(BucketVersioningStatus::Enabled)
                    .build(),
            )
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "PutBucketVersioning"))?;
        Ok(())
    }

    pub async fn versioning_enabled(&self, bucket: &str) -> Result<bool> {
        let output = self
            .client
            .get_bucket_versioning()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "GetBucketVersioning"))?;
        Ok(output.status() == Some(&BucketVersioningStatus::Enabled))
    }

    /// The bucket's replication configuration, as returned by S3.
    pub async fn get_replication(&self, bucket: &str) -> Result<ReplicationConfiguration> {
        let output = self
            .client
            .get_bucket_replication()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "GetBucketReplication"))?;

        output
            .replication_configuration()
            .cloned()
            .ok_or_else(|| ServiceError::NotFound {
                entity_type: "ReplicationConfiguration",
                id: bucket.to_string(),
            })
    }

    pub async fn put_replication(
        &self,
        bucket: &str,
        configuration: ReplicationConfiguration,
    ) -> Result<()> {
        self.client
            .put_bucket_replication()
            .bucket(bucket)
            .replication_configuration(configuration)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "PutBucketReplication"))?;
        Ok(())
    }

    /// Uploads the planned parts in order and completes the upload.
    ///
    /// The upload is aborted when any part fails. Returns the object's ETag.
    pub async fn multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        plan: &PartPlan,
    ) -> Result<Option<String>> {
        let created = self
            .client
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "CreateMultipartUpload"))?;
        let upload_id = created
            .upload_id()
            .ok_or_else(|| ServiceError::RequestFailed("no upload id returned".to_string()))?
            .to_string();

        match self.upload_parts(bucket, key, &upload_id, plan).await {
            Ok(parts) => {
                let output = self
                    .client
                    .complete_multipart_upload()
                    .bucket(bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .multipart_upload(
                        CompletedMultipartUpload::builder()
                            .set_parts(Some(parts))
                            .build(),
                    )
                    .send()
                    .await
                    .map_err(|e| map_sdk_error(e, "CompleteMultipartUpload"))?;
                Ok(output.e_tag().map(str::to_string))
            }
            Err(err) => {
                tracing::warn!(bucket, key, error = %err, "aborting multipart upload");
                if let Err(abort) = self
                    .client
                    .abort_multipart_upload()
                    .bucket(bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .send()
                    .await
                {
                    tracing::warn!(error = %map_sdk_error(abort, "AbortMultipartUpload"), "abort failed");
                }
                Err(err)
            }
        }
    }

    async fn upload_parts(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        plan: &PartPlan,
    ) -> Result<Vec<CompletedPart>> {
        let mut completed = Vec::with_capacity(plan.parts().len());
        for part in plan.parts() {
            let body = ByteStream::from_path(&part.path).await.map_err(|e| {
                ServiceError::InvalidData(format!("reading {}: {}", part.path.display(), e))
            })?;

            let output = self
                .client
                .upload_part()
                .bucket(bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(part.number)
                .body(body)
                .send()
                .await
                .map_err(|e| map_sdk_error(e, "UploadPart"))?;

            tracing::debug!(part = part.number, size = part.size, "uploaded part");
            completed.push(
                CompletedPart::builder()
                    .part_number(part.number)
                    .set_e_tag(output.e_tag().map(str::to_string))
                    .build(),
            );
        }
        Ok(completed)
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn list_objects(&self, bucket: &str) -> Result<Vec<ObjectSummary>> {
        let mut objects = Vec::new();
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| map_sdk_error(e, "ListObjectsV2"))?;
            objects.extend(page.contents().iter().filter_map(|object| {
                object
                    .key()
                    .map(|key| ObjectSummary::new(key, object.size().unwrap_or_default()))
            }));
        }
        Ok(objects)
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| map_get_object_error(e, bucket, key))?;

        let body = output.body.collect().await.map_err(|e| {
            ServiceError::ConnectionFailed(format!("reading {}/{}: {}", bucket, key, e))
        })?;
        Ok(body.into_bytes().to_vec())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        tags: &[ObjectTag],
    ) -> Result<()> {
        let mut request = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body));
        if !tags.is_empty() {
            request = request.tagging(tagging_header(tags));
        }

        request.send().await.map_err(|e| map_sdk_error(e, "PutObject"))?;
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "DeleteObject"))?;
        Ok(())
    }

    async fn get_object_tags(&self, bucket: &str, key: &str) -> Result<Vec<ObjectTag>> {
        let output = self
            .client
            .get_object_tagging()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "GetObjectTagging"))?;

        Ok(output
            .tag_set()
            .iter()
            .map(|tag| ObjectTag::new(tag.key(), tag.value()))
            .collect())
    }
}

/// Reads the parts of an S3 replication configuration the examples reason about.
#[allow(deprecated)]
pub fn replication_model(configuration: &ReplicationConfiguration) -> ReplicationConfig {
    ReplicationConfig {
        role_arn: configuration.role().to_string(),
        rules: configuration
            .rules()
            .iter()
            .map(|rule| ReplicationRuleSpec {
                id: rule.id().unwrap_or_default().to_string(),
                enabled: rule.status() == &ReplicationRuleStatus::Enabled,
                priority: rule.priority(),
                prefix: rule.prefix().map(str::to_string),
                destination_bucket_arn: rule
                    .destination()
                    .map(|d| d.bucket().to_string())
                    .unwrap_or_default(),
                storage_class: rule
                    .destination()
                    .and_then(|d| d.storage_class())
                    .map(|class| class.as_str().to_string()),
                delete_marker_replication: rule
                    .delete_marker_replication()
                    .and_then(|d| d.status())
                    .is_some_and(|status| status.as_str() == "Enabled"),
            })
            .collect(),
    }
}

/// Applies a retargeted model to the configuration it was read from.
///
/// Destinations and the role come from `model`; filters, selection criteria
/// and every other rule setting are carried over from `original`.
#[allow(deprecated)]
pub fn apply_replication_model(
    original: &ReplicationConfiguration,
    model: &ReplicationConfig,
) -> Result<ReplicationConfiguration> {
    let rules = original
        .rules()
        .iter()
        .zip(&model.rules)
        .map(|(rule, spec)| rebuild_rule(rule, spec))
        .collect::<Result<Vec<_>>>()?;

    ReplicationConfiguration::builder()
        .role(&model.role_arn)
        .set_rules(Some(rules))
        .build()
        .map_err(map_build_error)
}

#[allow(deprecated)]
fn rebuild_rule(rule: &ReplicationRule, spec: &ReplicationRuleSpec) -> Result<ReplicationRule> {
    let current = rule.destination();
    let destination = Destination::builder()
        .bucket(&spec.destination_bucket_arn)
        .set_account(current.and_then(|d| d.account()).map(str::to_string))
        .set_storage_class(current.and_then(|d| d.storage_class()).cloned())
        .set_access_control_translation(
            current.and_then(|d| d.access_control_translation()).cloned(),
        )
        .set_encryption_configuration(current.and_then(|d| d.encryption_configuration()).cloned())
        .set_replication_time(current.and_then(|d| d.replication_time()).cloned())
        .set_metrics(current.and_then(|d| d.metrics()).cloned())
        .build()
        .map_err(map_build_error)?;

    ReplicationRule::builder()
        .set_id(rule.id().map(str::to_string))
        .set_priority(rule.priority())
        .set_prefix(rule.prefix().map(str::to_string))
        .set_filter(rule.filter().cloned())
        .status(rule.status().clone())
        .set_source_selection_criteria(rule.source_selection_criteria().cloned())
        .set_existing_object_replication(rule.existing_object_replication().cloned())
        .destination(destination)
        .set_delete_marker_replication(rule.delete_marker_replication().cloned())
        .build()
        .map_err(map_build_error)
}
