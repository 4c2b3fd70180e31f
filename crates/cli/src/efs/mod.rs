//! EFS mount command.

mod error;

pub use error::{EfsError, Result};

use std::time::Duration;

use cloudkit_aws::{CommandOutcome, Ec2Instances, EfsFileSystems, RunCommand};
use cloudkit_core::efs::{
    build_mount_plan, find_file_system, mount_commands, mount_target_map, DEFAULT_MOUNT_POINT,
    INSTALL_NFS_COMMAND,
};
use cloudkit_core::ssm::{summarize, InvocationStatus, PollPolicy};

use crate::prelude::*;

/// EFS commands.
#[derive(Debug, clap::Parser)]
pub struct EfsCommand {
    #[command(subcommand)]
    pub action: EfsAction,
}

#[derive(Debug, clap::Subcommand)]
pub enum EfsAction {
    /// Mount a file system on running instances.
    Mount(MountCommand),
}

#[derive(Debug, clap::Parser)]
#[command(long_about = "Mount an EFS file system on EC2 instances.

Each instance mounts the file system through the mount target in its own
availability zone. The NFS client is installed first, then the mount commands
run through SSM Run Command. The instances must be SSM managed instances.

SSM is given a few minutes before its invocations are first checked.")]
pub struct MountCommand {
    /// Value of the file system's Name tag.
    pub file_system_name: String,

    /// Instances to mount the file system on.
    #[arg(required = true)]
    pub instance_ids: Vec<String>,

    /// Directory to mount on.
    #[arg(long, default_value = DEFAULT_MOUNT_POINT)]
    pub mount_point: String,

    /// Seconds to wait before the first status check.
    #[arg(long, default_value = "180")]
    pub initial_delay_secs: u64,

    /// Seconds between status checks.
    #[arg(long, default_value = "15")]
    pub interval_secs: u64,

    /// Status checks before giving up.
    #[arg(long, default_value = "20")]
    pub max_attempts: u32,
}

impl MountCommand {
    fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            initial_delay: Duration::from_secs(self.initial_delay_secs),
            interval: Duration::from_secs(self.interval_secs),
            max_attempts: self.max_attempts,
        }
    }
}

/// Main entry point for efs command.
pub async fn run(command: EfsCommand, global: crate::Global) -> Result<()> {
    match command.action {
        EfsAction::Mount(cmd) => run_mount(cmd, &global).await,
    }
}

async fn run_mount(cmd: MountCommand, global: &crate::Global) -> Result<()> {
    let aws_config = global.aws_config();
    if !global.is_silent() {
        aprintln!("{} {}", p_b("Target:"), aws_config.target_display());
        aprintln!();
    }
    let sdk = aws_config.load().await;
    let file_systems = EfsFileSystems::from_sdk(&sdk);
    let instances = Ec2Instances::from_sdk(&sdk);
    let run_command = RunCommand::from_sdk(&sdk);

    let listed = file_systems.list_file_systems().await?;
    let file_system = find_file_system(&listed, &cmd.file_system_name).ok_or_else(|| {
        EfsError::FileSystemNotFound {
            name: cmd.file_system_name.clone(),
        }
    })?;
    let file_system_id = file_system.file_system_id.clone();

    let targets = mount_target_map(&file_systems.mount_targets(&file_system_id).await?);
    let zones = instances.availability_zones(&cmd.instance_ids).await?;
    let plan = build_mount_plan(&zones, &targets);

    if !global.is_silent() {
        aprintln!("{}", p_c("Mount Plan:"));
        for (ip, ids) in &plan.by_target {
            aprintln!("  {} {} -> {}", p_g("+"), ip, ids.join(", "));
        }
        for id in &plan.unmatched {
            aprintln!("  {}", p_y(&format!("~ {} has no mount target in its zone", id)));
        }
        aprintln!();
    }
    for id in &plan.unmatched {
        tracing::warn!(instance_id = %id, file_system_id = %file_system_id, "no mount target in zone");
    }

    if plan.is_empty() {
        return Err(EfsError::NoMountTarget { file_system_id });
    }

    let policy = cmd.poll_policy();

    if !global.is_silent() {
        aprintln!("{}", p_b("Installing NFS client..."));
    }
    let command_id = run_command
        .send_shell_commands(&plan.instance_ids(), vec![INSTALL_NFS_COMMAND.to_string()])
        .await?;
    let outcome = run_command.wait_for(&command_id, &policy).await?;
    report(&outcome, global)?;

    for (ip, ids) in &plan.by_target {
        if !global.is_silent() {
            aprintln!("{} {} on {}", p_b("Mounting"), ip, ids.join(", "));
        }
        let command_id = run_command
            .send_shell_commands(ids, mount_commands(ip, &cmd.mount_point))
            .await?;
        let outcome = run_command.wait_for(&command_id, &policy).await?;
        report(&outcome, global)?;
    }

    if !global.is_silent() {
        aprintln!(
            "{} {} on {}",
            p_g("Mounted"),
            file_system_id,
            cmd.mount_point
        );
    }
    Ok(())
}

/// Prints every invocation and fails when any of them did not succeed.
fn report(outcome: &CommandOutcome, global: &crate::Global) -> Result<()> {
    if !global.is_silent() {
        for invocation in &outcome.invocations {
            let status = invocation.status.to_string();
            let status = if invocation.status.is_pending() {
                p_y(&status)
            } else if invocation.status == InvocationStatus::Success {
                p_g(&status)
            } else {
                p_r(&status)
            };
            aprintln!("  {} {}", invocation.instance_id, status);
            if let Some(output) = invocation.output.as_deref().filter(|o| !o.trim().is_empty()) {
                for line in output.lines() {
                    aprintln!("    {}", line);
                }
            }
        }
    }

    let summary = summarize(&outcome.invocations);
    if summary.all_succeeded() {
        return Ok(());
    }

    let mut instances = summary.failed;
    instances.extend(summary.pending);
    Err(EfsError::CommandFailed {
        command_id: outcome.command_id.clone(),
        instances,
    })
}
