//! SSM Run Command adapter.

use aws_config::SdkConfig;
use aws_sdk_ssm::types::CommandInvocation;
use aws_sdk_ssm::Client;

use cloudkit_core::ssm::{Invocation, InvocationStatus, PollPolicy, PollStep, RUN_SHELL_DOCUMENT};
use cloudkit_core::{Result, ServiceError};

use crate::error::map_sdk_error;

pub fn to_invocation(invocation: &CommandInvocation) -> Invocation {
    let status = invocation
        .status()
        .map(|status| status.as_str())
        .unwrap_or("Pending");

    Invocation {
        instance_id: invocation.instance_id().unwrap_or_default().to_string(),
        status: status
            .parse()
            .unwrap_or_else(|_| InvocationStatus::Other(status.to_string())),
        output: invocation
            .command_plugins()
            .first()
            .and_then(|plugin| plugin.output())
            .map(str::to_string),
    }
}

/// Result of waiting on a command.
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub command_id: String,
    pub invocations: Vec<Invocation>,
    /// False when the poll policy ran out before every invocation settled.
    pub settled: bool,
}

/// Runs shell commands on managed instances.
#[derive(Debug, Clone)]
pub struct RunCommand {
    client: Client,
}

impl RunCommand {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_sdk(sdk: &SdkConfig) -> Self {
        Self::new(Client::new(sdk))
    }

    /// Sends `commands` to the instances and returns the command id.
    pub async fn send_shell_commands(
        &self,
        instance_ids: &[String],
        commands: Vec<String>,
    ) -> Result<String> {
        let output = self
            .client
            .send_command()
            .set_instance_ids(Some(instance_ids.to_vec()))
            .document_name(RUN_SHELL_DOCUMENT)
            .parameters("commands", commands)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "SendCommand"))?;

        output
            .command()
            .and_then(|command| command.command_id())
            .map(str::to_string)
            .ok_or_else(|| ServiceError::RequestFailed("no command id returned".to_string()))
    }

    /// Invocations of a command, with the output of their first plugin.
    pub async fn list_invocations(&self, command_id: &str) -> Result<Vec<Invocation>> {
        let output = self
            .client
            .list_command_invocations()
            .command_id(command_id)
            .details(true)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "ListCommandInvocations"))?;

        Ok(output
            .command_invocations()
            .iter()
            .map(to_invocation)
            .collect())
    }

    /// Polls a command's invocations until they settle or the policy gives up.
    pub async fn wait_for(&self, command_id: &str, policy: &PollPolicy) -> Result<CommandOutcome> {
        tracing::info!(command_id, delay = ?policy.initial_delay, "waiting for command");
        tokio::time::sleep(policy.initial_delay).await;

        let mut attempt = 1;
        loop {
            let invocations = self.list_invocations(command_id).await?;
            match policy.next_step(&invocations, attempt) {
                PollStep::Done(_) => {
                    return Ok(CommandOutcome {
                        command_id: command_id.to_string(),
                        invocations,
                        settled: true,
                    })
                }
                PollStep::GiveUp(summary) => {
                    tracing::warn!(command_id, pending = ?summary.pending, "command did not settle");
                    return Ok(CommandOutcome {
                        command_id: command_id.to_string(),
                        invocations,
                        settled: false,
                    });
                }
                PollStep::Wait(delay) => {
                    tracing::debug!(command_id, attempt, "invocations still pending");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_ssm::types::{CommandInvocationStatus, CommandPlugin};

    #[test]
    fn test_to_invocation() {
        let invocation = CommandInvocation::builder()
            .instance_id("i-1")
            .status(CommandInvocationStatus::Success)
            .command_plugins(CommandPlugin::builder().output("Complete!").build())
            .build();

        let converted = to_invocation(&invocation);
        assert_eq!(converted.instance_id, "i-1");
        assert_eq!(converted.status, InvocationStatus::Success);
        assert_eq!(converted.output.as_deref(), Some("Complete!"));
    }

    #[test]
    fn test_to_invocation_without_status() {
        let converted = to_invocation(&CommandInvocation::builder().instance_id("i-2").build());
        assert_eq!(converted.status, InvocationStatus::Pending);
        assert!(converted.output.is_none());
    }
}
