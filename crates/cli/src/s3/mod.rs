//! S3 bucket and object commands.

mod error;

pub use error::{Result, S3Error};

use std::path::PathBuf;

use cloudkit_aws::s3::{apply_replication_model, client, replication_model};
use cloudkit_aws::S3ObjectStore;
use cloudkit_core::s3::{
    backup_bucket_name, bucket_arn, find_bucket, find_object, retarget_rule, role_arn,
    ObjectStore, PartPlan,
};

use crate::prelude::*;

/// S3 commands.
#[derive(Debug, clap::Parser)]
pub struct S3Command {
    #[command(subcommand)]
    pub action: S3Action,
}

/// Available S3 actions.
#[derive(Debug, clap::Subcommand)]
pub enum S3Action {
    /// Print the content of an object.
    ReadObject(ReadObjectCommand),

    /// Create the `<bucket>-backup` bucket and copy the bucket policy to it.
    BackupBucket(BackupBucketCommand),

    /// Point a replication rule of the source bucket at a backup bucket.
    Replicate(ReplicateCommand),

    /// Upload local files as the ordered parts of one object.
    MultipartUpload(MultipartUploadCommand),
}

#[derive(Debug, clap::Parser)]
pub struct ReadObjectCommand {
    /// Bucket holding the object.
    #[arg(long)]
    pub bucket: String,

    /// Key of the object to print.
    #[arg(long)]
    pub key: String,
}

#[derive(Debug, clap::Parser)]
pub struct BackupBucketCommand {
    /// Bucket to back up.
    #[arg(long)]
    pub bucket: String,

    /// Skip confirmation prompts.
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, clap::Parser)]
#[command(long_about = "Point a replication rule at a backup bucket.

The backup bucket is `<copy-bucket>-backup`. It is created when missing, gets
the copy bucket's policy when it has none, and has versioning enabled. The rule
is only retargeted while the backup bucket is still empty; a bucket that already
holds objects is assumed to be replicated.")]
pub struct ReplicateCommand {
    /// Bucket whose replication configuration is updated.
    #[arg(long)]
    pub source_bucket: String,

    /// Bucket the backup is made for.
    #[arg(long)]
    pub copy_bucket: String,

    /// Id of the replication rule to retarget.
    #[arg(long)]
    pub rule_id: String,

    /// Account owning the replication role.
    #[arg(long)]
    pub account_id: String,

    /// Name of the IAM role S3 assumes to replicate.
    #[arg(long)]
    pub role_name: String,

    /// Skip confirmation prompts.
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, clap::Parser)]
pub struct MultipartUploadCommand {
    /// Destination bucket.
    #[arg(long)]
    pub bucket: String,

    /// Destination key.
    #[arg(long)]
    pub key: String,

    /// Part files, in upload order.
    #[arg(required = true, value_name = "PART")]
    pub parts: Vec<PathBuf>,

    /// Use S3 Transfer Acceleration.
    #[arg(long)]
    pub accelerate: bool,
}

/// Main entry point for s3 command.
pub async fn run(command: S3Command, global: crate::Global) -> Result<()> {
    match command.action {
        S3Action::ReadObject(cmd) => run_read_object(cmd, &global).await,
        S3Action::BackupBucket(cmd) => run_backup_bucket(cmd, &global).await,
        S3Action::Replicate(cmd) => run_replicate(cmd, &global).await,
        S3Action::MultipartUpload(cmd) => run_multipart_upload(cmd, &global).await,
    }
}

async fn store(global: &crate::Global, accelerate: bool) -> S3ObjectStore {
    let sdk = global.aws_config().load().await;
    S3ObjectStore::new(client(&sdk, accelerate))
}

async fn require_bucket(store: &S3ObjectStore, bucket: &str) -> Result<()> {
    let buckets = store.list_buckets().await?;
    find_bucket(&buckets, bucket).ok_or_else(|| S3Error::BucketNotFound {
        bucket: bucket.to_string(),
    })?;
    Ok(())
}

async fn run_read_object(cmd: ReadObjectCommand, global: &crate::Global) -> Result<()> {
    let store = store(global, false).await;
    require_bucket(&store, &cmd.bucket).await?;
    if !global.is_silent() {
        aprintln!("{} {}", p_g("Found bucket:"), cmd.bucket);
    }

    let objects = store.list_objects(&cmd.bucket).await?;
    let object = find_object(&objects, &cmd.key).ok_or_else(|| S3Error::ObjectNotFound {
        bucket: cmd.bucket.clone(),
        key: cmd.key.clone(),
    })?;
    tracing::debug!(key = %object.key, size = object.size, "reading object");

    let body = store.get_object(&cmd.bucket, &object.key).await?;
    aprintln!("{}", String::from_utf8_lossy(&body));
    Ok(())
}

/// Makes sure `<bucket>-backup` exists and carries the bucket's policy.
///
/// Returns the backup bucket name.
async fn ensure_backup(
    store: &S3ObjectStore,
    bucket: &str,
    region: &str,
    force: bool,
    global: &crate::Global,
) -> Result<String> {
    let backup = backup_bucket_name(bucket);

    if store.bucket_exists(&backup).await? {
        if !global.is_silent() {
            aprintln!("{} {}", p_y("Backup bucket exists:"), backup);
        }
    } else {
        if !confirm(&format!("Create bucket '{}'?", backup), true, force)? {
            return Err(S3Error::UserCancelled);
        }
        store.create_bucket(&backup, region).await?;
        if !global.is_silent() {
            aprintln!("{} {}", p_g("Created bucket:"), backup);
        }
    }

    if store.get_bucket_policy(&backup).await?.is_none() {
        if let Some(policy) = store.get_bucket_policy(bucket).await? {
            store.put_bucket_policy(&backup, &policy).await?;
            if !global.is_silent() {
                aprintln!("{} {} -> {}", p_b("Copied bucket policy:"), bucket, backup);
            }
        }
    }

    Ok(backup)
}

async fn run_backup_bucket(cmd: BackupBucketCommand, global: &crate::Global) -> Result<()> {
    let aws_config = global.aws_config();
    let store = store(global, false).await;

    require_bucket(&store, &cmd.bucket).await?;
    let backup = ensure_backup(&store, &cmd.bucket, &aws_config.region, cmd.force, global).await?;

    if !global.is_silent() {
        aprintln!("{} {}", p_g("Bucket ready:"), backup);
    }
    Ok(())
}

async fn run_replicate(cmd: ReplicateCommand, global: &crate::Global) -> Result<()> {
    let aws_config = global.aws_config();
    let store = store(global, false).await;

    if !global.is_silent() {
        aprintln!("{} {}", p_b("Target:"), aws_config.target_display());
        aprintln!();
    }

    require_bucket(&store, &cmd.source_bucket).await?;
    require_bucket(&store, &cmd.copy_bucket).await?;
    let backup =
        ensure_backup(&store, &cmd.copy_bucket, &aws_config.region, cmd.force, global).await?;

    store.enable_versioning(&backup).await?;
    if !store.versioning_enabled(&backup).await? {
        return Err(S3Error::VersioningDisabled { bucket: backup });
    }

    if !store.list_objects(&backup).await?.is_empty() {
        if !global.is_silent() {
            aprintln!(
                "{} {}",
                p_y("Objects have already been replicated to:"),
                backup
            );
        }
        return Ok(());
    }

    let current = store.get_replication(&cmd.source_bucket).await?;
    let model = retarget_rule(
        &replication_model(&current),
        &cmd.rule_id,
        &bucket_arn(&backup),
        &role_arn(&cmd.account_id, &cmd.role_name),
    )?;

    if !global.is_silent() {
        aprintln!("{}", p_c("Replication Plan:"));
        aprintln!("  ~ Role: {}", model.role_arn);
        for rule in &model.rules {
            let line = format!("{} -> {}", rule.id, rule.destination_bucket_arn);
            if rule.id == cmd.rule_id {
                aprintln!("  {}", p_y(&format!("~ Rule: {}", line)));
            } else {
                aprintln!("    Rule: {}", line);
            }
        }
        aprintln!();
    }

    if !confirm("Apply this replication configuration?", true, cmd.force)? {
        return Err(S3Error::UserCancelled);
    }

    let configuration = apply_replication_model(&current, &model)?;
    store
        .put_replication(&cmd.source_bucket, configuration)
        .await?;

    if !global.is_silent() {
        aprintln!(
            "{}",
            p_g("Replication config processed with new destination.")
        );
    }
    Ok(())
}

async fn run_multipart_upload(cmd: MultipartUploadCommand, global: &crate::Global) -> Result<()> {
    let mut files = Vec::with_capacity(cmd.parts.len());
    for path in cmd.parts {
        let size = tokio::fs::metadata(&path).await?.len();
        files.push((path, size));
    }
    let plan = PartPlan::new(files)?;

    if !global.is_silent() {
        aprintln!(
            "{} s3://{}/{} ({} parts, {} bytes)",
            p_b("Uploading:"),
            cmd.bucket,
            cmd.key,
            plan.parts().len(),
            plan.total_size()
        );
        for part in plan.parts() {
            aprintln!("  {} {} ({} bytes)", part.number, part.path.display(), part.size);
        }
    }

    let store = store(global, cmd.accelerate).await;
    let e_tag = store.multipart_upload(&cmd.bucket, &cmd.key, &plan).await?;

    if !global.is_silent() {
        aprintln!(
            "{} {}",
            p_g("Upload complete. ETag:"),
            e_tag.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}
