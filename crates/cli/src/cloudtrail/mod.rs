//! CloudTrail log commands.

mod error;

pub use error::{CloudtrailError, Result};

use cloudkit_aws::s3::client;
use cloudkit_aws::S3ObjectStore;
use cloudkit_core::cloudtrail::{decode_log, parse_log, CLOUD_TRAIL_LOGS};
use cloudkit_core::s3::{find_bucket_containing, regional_logs, ObjectStore, ObjectSummary, MIN_LOG_SIZE};

use crate::prelude::*;

/// CloudTrail commands.
#[derive(Debug, clap::Parser)]
pub struct CloudtrailCommand {
    #[command(subcommand)]
    pub action: CloudtrailAction,
}

#[derive(Debug, clap::Subcommand)]
pub enum CloudtrailAction {
    /// List the log objects of one region.
    ListLogs(LogsCommand),

    /// Print the first log object of one region.
    ShowLog(ShowLogCommand),
}

#[derive(Debug, clap::Parser)]
#[command(long_about = "List CloudTrail log objects.

The log bucket is the last bucket whose name contains 'aws-cloudtrail-logs'.
Only keys mentioning the log region and at least 1024 bytes long are listed.")]
pub struct LogsCommand {
    /// Region to filter log keys by (defaults to the client region).
    #[arg(long)]
    pub log_region: Option<String>,

    /// Minimum object size in bytes.
    #[arg(long, default_value_t = MIN_LOG_SIZE)]
    pub min_size: i64,
}

#[derive(Debug, clap::Parser)]
pub struct ShowLogCommand {
    #[command(flatten)]
    pub logs: LogsCommand,

    /// Print one line per record instead of the whole document.
    #[arg(long)]
    pub summary: bool,
}

/// Main entry point for cloudtrail command.
pub async fn run(command: CloudtrailCommand, global: crate::Global) -> Result<()> {
    match command.action {
        CloudtrailAction::ListLogs(cmd) => run_list_logs(cmd, &global).await,
        CloudtrailAction::ShowLog(cmd) => run_show_log(cmd, &global).await,
    }
}

/// Finds the log bucket and its matching objects.
async fn find_logs(
    cmd: &LogsCommand,
    global: &crate::Global,
) -> Result<(S3ObjectStore, String, Vec<ObjectSummary>)> {
    let aws_config = global.aws_config();
    let store = S3ObjectStore::new(client(&aws_config.load().await, false));
    let region = cmd.log_region.clone().unwrap_or(aws_config.region);

    let buckets = store.list_buckets().await?;
    let bucket = find_bucket_containing(&buckets, CLOUD_TRAIL_LOGS)
        .ok_or_else(|| CloudtrailError::LogBucketNotFound {
            fragment: CLOUD_TRAIL_LOGS.to_string(),
        })?
        .to_string();

    if !global.is_silent() {
        aprintln!("{} {}", p_b("Log bucket:"), bucket);
    }

    let objects = store.list_objects(&bucket).await?;
    let logs: Vec<ObjectSummary> = regional_logs(&objects, &region, cmd.min_size)
        .into_iter()
        .cloned()
        .collect();
    tracing::debug!(bucket = %bucket, region = %region, total = objects.len(), matching = logs.len(), "filtered logs");

    if logs.is_empty() {
        return Err(CloudtrailError::NoLogs {
            bucket,
            region,
            min_size: cmd.min_size,
        });
    }

    Ok((store, bucket, logs))
}

async fn run_list_logs(cmd: LogsCommand, global: &crate::Global) -> Result<()> {
    let (_, _, logs) = find_logs(&cmd, global).await?;
    for log in &logs {
        aprintln!("{} = {}", log.key, log.size);
    }
    Ok(())
}

async fn run_show_log(cmd: ShowLogCommand, global: &crate::Global) -> Result<()> {
    let (store, bucket, logs) = find_logs(&cmd.logs, global).await?;
    let Some(first) = logs.first() else {
        return Ok(());
    };

    if !global.is_silent() {
        aprintln!("{} {}", p_b("Log:"), first.key);
        aprintln!();
    }

    let body = store.get_object(&bucket, &first.key).await?;
    let document = decode_log(&body)?;

    if cmd.summary {
        let log = parse_log(&document)?;
        for record in &log.records {
            aprintln!(
                "{}  {}  {}  {}  {}",
                or_dash(record.event_time.as_deref()),
                p_c(or_dash(record.aws_region.as_deref())),
                or_dash(record.event_source.as_deref()),
                p_g(or_dash(record.event_name.as_deref())),
                or_dash(record.source_ip_address.as_deref()),
            );
        }
        if !global.is_silent() {
            aprintln!();
            aprintln!("{} {}", p_b("Records:"), log.records.len());
        }
    } else {
        aprintln!("{}", serde_json::to_string_pretty(&document)?);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Debug, Parser)]
    struct Wrapper {
        #[command(subcommand)]
        action: CloudtrailAction,
    }

    #[test]
    fn test_show_log_flattens_filters() {
        let parsed =
            Wrapper::try_parse_from(["x", "show-log", "--log-region", "us-west-2", "--summary"])
                .unwrap();

        match parsed.action {
            CloudtrailAction::ShowLog(cmd) => {
                assert_eq!(cmd.logs.log_region.as_deref(), Some("us-west-2"));
                assert_eq!(cmd.logs.min_size, MIN_LOG_SIZE);
                assert!(cmd.summary);
            }
            other => panic!("unexpected action: {:?}", other),
        }
    }
}
