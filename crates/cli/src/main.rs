//! Runs the cloudkit AWS examples from the command line.
//!
//! Every subcommand group maps to one AWS service. Client settings come from
//! the environment (`AWS_REGION`, `AWS_ENDPOINT_URL`, `CLOUDKIT_MAX_ATTEMPTS`,
//! `CLOUDKIT_CONNECT_TIMEOUT_MS`) and can be narrowed with `--region`.

use clap::Parser;
use cloudkit_aws::AwsConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cloudtrail;
mod dynamodb;
mod ec2;
mod efs;
mod prelude;
mod s3;

/// AWS service examples
#[derive(Debug, Parser)]
#[command(name = "cloudkit")]
#[command(about = "Run AWS service examples", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: Global,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Silence the command output
    #[clap(long, global = true)]
    pub silent: bool,

    /// Enable verbose output
    #[clap(long, global = true)]
    pub verbose: bool,

    /// Region to use instead of AWS_REGION
    #[clap(long, global = true)]
    pub region: Option<String>,
}

impl Global {
    pub fn is_silent(&self) -> bool {
        self.silent
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Client settings from the environment, with the `--region` override.
    pub fn aws_config(&self) -> AwsConfig {
        let config = AwsConfig::from_env();
        match &self.region {
            Some(region) => config.with_region(region),
            None => config,
        }
    }
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Buckets, objects, replication and multipart uploads
    S3(s3::S3Command),

    /// Read CloudTrail logs stored in S3
    Cloudtrail(cloudtrail::CloudtrailCommand),

    /// Movies and machine readings tables, and their streams
    Dynamodb(dynamodb::DynamodbCommand),

    /// Launch and control EC2 instances
    Ec2(ec2::Ec2Command),

    /// Mount EFS file systems on EC2 instances
    Efs(efs::EfsCommand),
}

fn init_tracing(global: &Global) {
    let default_filter = if global.is_verbose() {
        "cloudkit=debug,cloudkit_aws=debug"
    } else {
        "cloudkit=info,cloudkit_aws=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(&cli.global);

    match cli.command {
        Commands::S3(cmd) => s3::run(cmd, cli.global).await?,
        Commands::Cloudtrail(cmd) => cloudtrail::run(cmd, cli.global).await?,
        Commands::Dynamodb(cmd) => dynamodb::run(cmd, cli.global).await?,
        Commands::Ec2(cmd) => ec2::run(cmd, cli.global).await?,
        Commands::Efs(cmd) => efs::run(cmd, cli.global).await?,
    }

    Ok(())
}
