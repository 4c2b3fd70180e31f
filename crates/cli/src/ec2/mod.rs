//! EC2 instance commands.

mod error;

pub use error::{Ec2Error, Result};

use std::time::Duration;

use cloudkit_aws::Ec2Instances;
use cloudkit_core::ec2::{
    contains_instance, state_of, InstanceFleet, InstanceSummary, CLOSE_COMMAND,
    DEFAULT_INSTANCE_TYPE,
};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::prelude::*;

/// Amazon Linux image the launch examples boot.
pub const DEFAULT_IMAGE_ID: &str = "ami-0ee8244746ec5d6d4";

/// EC2 commands.
#[derive(Debug, clap::Parser)]
pub struct Ec2Command {
    #[command(subcommand)]
    pub action: Ec2Action,
}

#[derive(Debug, clap::Subcommand)]
pub enum Ec2Action {
    /// Launch an instance and stop it when `close` is typed.
    Launch(LaunchCommand),

    /// Launch, describe, stop and terminate an instance.
    Lifecycle(LifecycleCommand),

    /// Start an instance.
    Start(InstanceCommand),

    /// Stop an instance.
    Stop(InstanceCommand),

    /// Terminate an instance.
    Terminate(TerminateCommand),

    /// Print an instance's metadata.
    Describe(InstanceCommand),
}

#[derive(Debug, Clone, clap::Args)]
pub struct LaunchArgs {
    /// Image to boot.
    #[arg(long, default_value = DEFAULT_IMAGE_ID)]
    pub image_id: String,

    #[arg(long, default_value = DEFAULT_INSTANCE_TYPE)]
    pub instance_type: String,

    /// Key pair allowed to log in.
    #[arg(long)]
    pub key_name: Option<String>,
}

#[derive(Debug, clap::Parser)]
pub struct LaunchCommand {
    #[command(flatten)]
    pub launch: LaunchArgs,
}

#[derive(Debug, clap::Parser)]
#[command(long_about = "Walk an instance through its whole lifecycle.

The instance is launched and started, described, left running for the wait
period, stopped, described again and finally terminated unless it already is.")]
pub struct LifecycleCommand {
    #[command(flatten)]
    pub launch: LaunchArgs,

    /// Seconds to keep the instance running before stopping it.
    #[arg(long, default_value = "300")]
    pub wait_secs: u64,

    /// Skip confirmation prompts.
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, clap::Parser)]
pub struct InstanceCommand {
    pub instance_id: String,
}

#[derive(Debug, clap::Parser)]
pub struct TerminateCommand {
    pub instance_id: String,

    /// Skip confirmation prompts.
    #[arg(long)]
    pub force: bool,
}

/// True when a typed line asks to stop the launched instance.
fn is_close(line: &str) -> bool {
    line.trim() == CLOSE_COMMAND
}

/// Main entry point for ec2 command.
pub async fn run(command: Ec2Command, global: crate::Global) -> Result<()> {
    let sdk = global.aws_config().load().await;
    let instances = Ec2Instances::from_sdk(&sdk);

    match command.action {
        Ec2Action::Launch(cmd) => run_launch(cmd, &instances, &global).await,
        Ec2Action::Lifecycle(cmd) => run_lifecycle(cmd, &instances, &global).await,
        Ec2Action::Start(cmd) => {
            start(&instances, &cmd.instance_id, &global).await?;
            Ok(())
        }
        Ec2Action::Stop(cmd) => stop(&instances, &cmd.instance_id, &global).await,
        Ec2Action::Terminate(cmd) => run_terminate(cmd, &instances, &global).await,
        Ec2Action::Describe(cmd) => {
            let summary = describe(&instances, &cmd.instance_id).await?;
            print_summary(&summary);
            Ok(())
        }
    }
}

/// Launches and starts an instance.
///
/// An instance that launched but failed to start is terminated again.
async fn launch<F: InstanceFleet>(
    instances: &F,
    args: &LaunchArgs,
    global: &crate::Global,
) -> Result<InstanceSummary> {
    let summary = instances
        .run_instance(&args.image_id, &args.instance_type, args.key_name.as_deref())
        .await?;

    if !global.is_silent() {
        aprintln!("{} {}", p_g("Launched:"), summary.instance_id);
    }
    if let Err(err) = start(instances, &summary.instance_id, global).await {
        discard(instances, &summary.instance_id).await;
        return Err(err);
    }
    Ok(summary)
}

/// Terminates an instance left behind by a failed launch. The outcome is
/// only logged so the original error reaches the caller.
async fn discard<F: InstanceFleet>(instances: &F, instance_id: &str) {
    match instances.terminate_instance(instance_id).await {
        Ok(terminating) if contains_instance(&terminating, instance_id) => {
            tracing::warn!(instance_id, "terminated instance after failed launch")
        }
        Ok(_) => tracing::warn!(
            instance_id,
            "instance was not reported as terminating after failed launch"
        ),
        Err(err) => tracing::warn!(
            instance_id,
            error = %err,
            "unable to terminate instance after failed launch"
        ),
    }
}

async fn start<F: InstanceFleet>(
    instances: &F,
    instance_id: &str,
    global: &crate::Global,
) -> Result<()> {
    let started = instances.start_instance(instance_id).await?;
    if !contains_instance(&started, instance_id) {
        return Err(Ec2Error::NotChanged {
            instance_id: instance_id.to_string(),
            action: "starting",
        });
    }
    if !global.is_silent() {
        aprintln!("{} {}", p_g("Starting:"), instance_id);
    }
    Ok(())
}

/// Stops a pending or running instance. Any other state is left alone.
async fn stop<F: InstanceFleet>(
    instances: &F,
    instance_id: &str,
    global: &crate::Global,
) -> Result<()> {
    let state = state_of(instances.describe_instance(instance_id).await?.as_ref());
    if !state.is_stoppable() {
        tracing::info!(instance_id, %state, "instance is not stoppable, skipping stop");
        if !global.is_silent() {
            aprintln!("{} {} is {}", p_y("Not stopping:"), instance_id, state);
        }
        return Ok(());
    }

    let stopped = instances.stop_instance(instance_id).await?;
    if !contains_instance(&stopped, instance_id) {
        return Err(Ec2Error::NotChanged {
            instance_id: instance_id.to_string(),
            action: "stopping",
        });
    }
    if !global.is_silent() {
        aprintln!("{} {}", p_y("Stopping:"), instance_id);
    }
    Ok(())
}

async fn describe<F: InstanceFleet>(instances: &F, instance_id: &str) -> Result<InstanceSummary> {
    instances
        .describe_instance(instance_id)
        .await?
        .ok_or_else(|| Ec2Error::InstanceNotFound {
            instance_id: instance_id.to_string(),
        })
}

fn print_summary(summary: &InstanceSummary) {
    aprintln!("{} {}", p_b("Instance:"), summary.instance_id);
    aprintln!("  State:         {}", p_c(summary.state.as_str()));
    aprintln!("  AMI:           {}", or_dash(summary.image_id.as_deref()));
    aprintln!("  Type:          {}", or_dash(summary.instance_type.as_deref()));
    aprintln!("  Private IP:    {}", or_dash(summary.private_ip.as_deref()));
    aprintln!(
        "  Zone:          {}",
        or_dash(summary.availability_zone.as_deref())
    );
    aprintln!("  Architecture:  {}", or_dash(summary.architecture.as_deref()));
    aprintln!("  Launch time:   {}", or_dash(summary.launch_time.as_deref()));
    aprintln!(
        "  Root device:   {}",
        or_dash(summary.root_device_type.as_deref())
    );
}

async fn run_launch<F: InstanceFleet>(
    cmd: LaunchCommand,
    instances: &F,
    global: &crate::Global,
) -> Result<()> {
    let summary = launch(instances, &cmd.launch, global).await?;

    aprintln!(
        "Type '{}' to stop {}",
        p_y(CLOSE_COMMAND),
        summary.instance_id
    );
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if is_close(&line) {
            break;
        }
    }

    stop(instances, &summary.instance_id, global).await
}

async fn run_lifecycle<F: InstanceFleet>(
    cmd: LifecycleCommand,
    instances: &F,
    global: &crate::Global,
) -> Result<()> {
    let launched = launch(instances, &cmd.launch, global).await?;
    let instance_id = launched.instance_id;

    let running = match describe(instances, &instance_id).await {
        Ok(running) => running,
        Err(err) => {
            discard(instances, &instance_id).await;
            return Err(err);
        }
    };
    if !global.is_silent() {
        aprintln!();
        print_summary(&running);
        aprintln!();
        aprintln!(
            "{} {}s",
            p_b("Waiting before stopping:"),
            cmd.wait_secs
        );
    }
    tokio::time::sleep(Duration::from_secs(cmd.wait_secs)).await;

    stop(instances, &instance_id, global).await?;

    let stopped = instances.describe_instance(&instance_id).await?;
    if let Some(summary) = &stopped {
        if !global.is_silent() {
            aprintln!();
            print_summary(summary);
            aprintln!();
        }
    }

    let state = state_of(stopped.as_ref());
    if !state.should_terminate() {
        if !global.is_silent() {
            aprintln!("{} {}", p_y("Already terminated:"), instance_id);
        }
        return Ok(());
    }

    if !confirm(&format!("Terminate {}?", instance_id), true, cmd.force)? {
        return Err(Ec2Error::UserCancelled);
    }
    terminate(instances, &instance_id, global).await
}

async fn terminate<F: InstanceFleet>(
    instances: &F,
    instance_id: &str,
    global: &crate::Global,
) -> Result<()> {
    let terminated = instances.terminate_instance(instance_id).await?;
    if !contains_instance(&terminated, instance_id) {
        return Err(Ec2Error::NotChanged {
            instance_id: instance_id.to_string(),
            action: "terminating",
        });
    }
    if !global.is_silent() {
        aprintln!("{} {}", p_r("Terminating:"), instance_id);
    }
    Ok(())
}

async fn run_terminate<F: InstanceFleet>(
    cmd: TerminateCommand,
    instances: &F,
    global: &crate::Global,
) -> Result<()> {
    let state = state_of(instances.describe_instance(&cmd.instance_id).await?.as_ref());
    if !state.should_terminate() {
        if !global.is_silent() {
            aprintln!("{} {}", p_y("Already terminated:"), cmd.instance_id);
        }
        return Ok(());
    }

    if !confirm(
        &format!("Terminate {} ({})?", cmd.instance_id, state),
        false,
        cmd.force,
    )? {
        return Err(Ec2Error::UserCancelled);
    }
    terminate(instances, &cmd.instance_id, global).await
}
