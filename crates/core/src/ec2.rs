//! EC2 instance states, lifecycle rules and the restart notification.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{Result, ServiceError};

/// Instance type used by the launch examples.
pub const DEFAULT_INSTANCE_TYPE: &str = "t2.micro";

/// Word the user types to stop a launched instance.
pub const CLOSE_COMMAND: &str = "close";

/// EC2 instance state, decoded from the numeric state code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceState {
    Pending,
    Running,
    ShuttingDown,
    Terminated,
    Stopping,
    Stopped,
    Unknown,
}

impl InstanceState {
    /// Decodes a state code. Only the low byte carries the state.
    pub fn from_code(code: i32) -> Self {
        match code & 0xff {
            0 => InstanceState::Pending,
            16 => InstanceState::Running,
            32 => InstanceState::ShuttingDown,
            48 => InstanceState::Terminated,
            64 => InstanceState::Stopping,
            80 => InstanceState::Stopped,
            _ => InstanceState::Unknown,
        }
    }

    /// Decodes a state name such as `running` or `shutting-down`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "pending" => InstanceState::Pending,
            "running" => InstanceState::Running,
            "shutting-down" => InstanceState::ShuttingDown,
            "terminated" => InstanceState::Terminated,
            "stopping" => InstanceState::Stopping,
            "stopped" => InstanceState::Stopped,
            _ => InstanceState::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceState::Pending => "pending",
            InstanceState::Running => "running",
            InstanceState::ShuttingDown => "shutting-down",
            InstanceState::Terminated => "terminated",
            InstanceState::Stopping => "stopping",
            InstanceState::Stopped => "stopped",
            InstanceState::Unknown => "unknown",
        }
    }

    /// An instance can be stopped while pending or running.
    pub fn is_stoppable(&self) -> bool {
        matches!(self, InstanceState::Pending | InstanceState::Running)
    }

    /// Everything except an already terminated instance gets terminated,
    /// including instances whose state could not be read.
    pub fn should_terminate(&self) -> bool {
        *self != InstanceState::Terminated
    }

    /// States reported by the state-change rule that call for a restart.
    pub fn needs_restart(&self) -> bool {
        matches!(
            self,
            InstanceState::ShuttingDown | InstanceState::Stopping | InstanceState::Stopped
        )
    }
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata printed about a launched instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceSummary {
    pub instance_id: String,
    pub state: InstanceState,
    pub instance_type: Option<String>,
    pub image_id: Option<String>,
    pub private_ip: Option<String>,
    pub availability_zone: Option<String>,
    pub architecture: Option<String>,
    pub launch_time: Option<String>,
    pub root_device_type: Option<String>,
}

impl InstanceSummary {
    pub fn new(instance_id: impl Into<String>, state: InstanceState) -> Self {
        Self {
            instance_id: instance_id.into(),
            state,
            instance_type: None,
            image_id: None,
            private_ip: None,
            availability_zone: None,
            architecture: None,
            launch_time: None,
            root_device_type: None,
        }
    }
}

/// State of a possibly missing instance. A missing instance is unknown.
pub fn state_of(instance: Option<&InstanceSummary>) -> InstanceState {
    instance
        .map(|instance| instance.state)
        .unwrap_or(InstanceState::Unknown)
}

/// True when `instance_id` is among the instances a request reported.
pub fn contains_instance<S: AsRef<str>>(reported: &[S], instance_id: &str) -> bool {
    reported.iter().any(|id| id.as_ref() == instance_id)
}

/// Detail of an `EC2 Instance State-change Notification` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChangeDetail {
    #[serde(rename = "instance-id")]
    pub instance_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl StateChangeDetail {
    /// Events without a state are treated as a restart request.
    pub fn needs_restart(&self) -> bool {
        self.state
            .as_deref()
            .map(|state| InstanceState::from_name(state).needs_restart())
            .unwrap_or(true)
    }
}

/// Message published when an instance is restarted.
pub fn restart_note(instance_id: &str) -> String {
    format!("Instance: '{}' was shutdown...restarting", instance_id)
}

/// Starting instances, as used by the restart handler.
#[async_trait]
pub trait InstanceControl: Send + Sync {
    /// Starts an instance and returns the ids EC2 reports as starting.
    async fn start_instance(&self, instance_id: &str) -> Result<Vec<String>>;
}

/// The whole launch to terminate lifecycle driven by the EC2 commands.
#[async_trait]
pub trait InstanceFleet: InstanceControl {
    /// Launches one instance.
    async fn run_instance(
        &self,
        image_id: &str,
        instance_type: &str,
        key_name: Option<&str>,
    ) -> Result<InstanceSummary>;

    /// Stops an instance and returns the ids reported as stopping.
    async fn stop_instance(&self, instance_id: &str) -> Result<Vec<String>>;

    /// Terminates an instance and returns the ids reported as terminating.
    async fn terminate_instance(&self, instance_id: &str) -> Result<Vec<String>>;

    async fn describe_instance(&self, instance_id: &str) -> Result<Option<InstanceSummary>>;
}

/// Instance fleet kept in memory, for tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInstances {
    states: Arc<RwLock<HashMap<String, InstanceState>>>,
    start_fails: bool,
}

impl InMemoryInstances {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fleet that refuses every start request.
    pub fn failing_start() -> Self {
        Self {
            start_fails: true,
            ..Self::default()
        }
    }

    pub async fn insert(&self, instance_id: &str, state: InstanceState) {
        self.states
            .write()
            .await
            .insert(instance_id.to_string(), state);
    }

    pub async fn state(&self, instance_id: &str) -> Option<InstanceState> {
        self.states.read().await.get(instance_id).copied()
    }
}

fn missing_instance(instance_id: &str) -> ServiceError {
    ServiceError::NotFound {
        entity_type: "Instance",
        id: instance_id.to_string(),
    }
}

#[async_trait]
impl InstanceControl for InMemoryInstances {
    async fn start_instance(&self, instance_id: &str) -> Result<Vec<String>> {
        if self.start_fails {
            return Err(ServiceError::RequestFailed(format!(
                "StartInstances rejected {}",
                instance_id
            )));
        }

        let mut states = self.states.write().await;
        let state = states
            .get_mut(instance_id)
            .ok_or_else(|| missing_instance(instance_id))?;

        match *state {
            InstanceState::Stopped => {
                *state = InstanceState::Pending;
                Ok(vec![instance_id.to_string()])
            }
            InstanceState::Pending | InstanceState::Running => Ok(vec![instance_id.to_string()]),
            other => Err(ServiceError::InvalidState(format!(
                "instance {} is {} and cannot be started",
                instance_id, other
            ))),
        }
    }
}

#[async_trait]
impl InstanceFleet for InMemoryInstances {
    async fn run_instance(
        &self,
        image_id: &str,
        instance_type: &str,
        _key_name: Option<&str>,
    ) -> Result<InstanceSummary> {
        let mut states = self.states.write().await;
        let instance_id = format!("i-{:08x}", states.len() + 1);
        states.insert(instance_id.clone(), InstanceState::Pending);

        Ok(InstanceSummary {
            image_id: Some(image_id.to_string()),
            instance_type: Some(instance_type.to_string()),
            ..InstanceSummary::new(instance_id, InstanceState::Pending)
        })
    }

    async fn stop_instance(&self, instance_id: &str) -> Result<Vec<String>> {
        let mut states = self.states.write().await;
        let state = states
            .get_mut(instance_id)
            .ok_or_else(|| missing_instance(instance_id))?;
        if !state.is_stoppable() {
            return Err(ServiceError::InvalidState(format!(
                "instance {} is {} and cannot be stopped",
                instance_id, state
            )));
        }
        *state = InstanceState::Stopped;
        Ok(vec![instance_id.to_string()])
    }

    async fn terminate_instance(&self, instance_id: &str) -> Result<Vec<String>> {
        let mut states = self.states.write().await;
        let state = states
            .get_mut(instance_id)
            .ok_or_else(|| missing_instance(instance_id))?;
        *state = InstanceState::Terminated;
        Ok(vec![instance_id.to_string()])
    }

    async fn describe_instance(&self, instance_id: &str) -> Result<Option<InstanceSummary>> {
        Ok(self
            .state(instance_id)
            .await
            .map(|state| InstanceSummary::new(instance_id, state)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code() {
        assert_eq!(InstanceState::from_code(0), InstanceState::Pending);
        assert_eq!(InstanceState::from_code(16), InstanceState::Running);
        assert_eq!(InstanceState::from_code(32), InstanceState::ShuttingDown);
        assert_eq!(InstanceState::from_code(48), InstanceState::Terminated);
        assert_eq!(InstanceState::from_code(64), InstanceState::Stopping);
        assert_eq!(InstanceState::from_code(80), InstanceState::Stopped);
        assert_eq!(InstanceState::from_code(1), InstanceState::Unknown);
    }

    #[test]
    fn test_from_code_ignores_high_byte() {
        assert_eq!(InstanceState::from_code(0x0100 | 16), InstanceState::Running);
    }

    #[test]
    fn test_lifecycle_rules() {
        assert!(InstanceState::Running.is_stoppable());
        assert!(!InstanceState::Stopped.is_stoppable());
        assert!(InstanceState::Stopped.should_terminate());
        assert!(InstanceState::Unknown.should_terminate());
        assert!(!InstanceState::Terminated.should_terminate());
        assert_eq!(state_of(None), InstanceState::Unknown);
    }

    #[test]
    fn test_contains_instance() {
        let stopping = vec!["i-1".to_string(), "i-2".to_string()];
        assert!(contains_instance(&stopping, "i-2"));
        assert!(!contains_instance(&stopping, "i-3"));
    }

    #[test]
    fn test_state_change_detail() {
        let detail: StateChangeDetail =
            serde_json::from_str(r#"{"instance-id": "i-0abc", "state": "stopped"}"#).unwrap();
        assert_eq!(detail.instance_id, "i-0abc");
        assert!(detail.needs_restart());

        let running: StateChangeDetail =
            serde_json::from_str(r#"{"instance-id": "i-0abc", "state": "running"}"#).unwrap();
        assert!(!running.needs_restart());

        let no_state: StateChangeDetail =
            serde_json::from_str(r#"{"instance-id": "i-0abc"}"#).unwrap();
        assert!(no_state.needs_restart());
    }

    #[test]
    fn test_restart_note() {
        assert_eq!(
            restart_note("i-0abc"),
            "Instance: 'i-0abc' was shutdown...restarting"
        );
    }

    #[tokio::test]
    async fn test_in_memory_start() {
        let fleet = InMemoryInstances::new();
        fleet.insert("i-1", InstanceState::Stopped).await;
        fleet.insert("i-2", InstanceState::Stopping).await;

        assert_eq!(fleet.start_instance("i-1").await.unwrap(), vec!["i-1"]);
        assert_eq!(fleet.state("i-1").await, Some(InstanceState::Pending));
        assert!(matches!(
            fleet.start_instance("i-2").await,
            Err(ServiceError::InvalidState(_))
        ));
        assert!(matches!(
            fleet.start_instance("i-3").await,
            Err(ServiceError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_in_memory_lifecycle() {
        let fleet = InMemoryInstances::new();
        let launched = fleet.run_instance("ami-1", "t2.micro", None).await.unwrap();
        let id = launched.instance_id;
        assert_eq!(launched.state, InstanceState::Pending);

        assert_eq!(fleet.stop_instance(&id).await.unwrap(), vec![id.clone()]);
        assert!(matches!(
            fleet.stop_instance(&id).await,
            Err(ServiceError::InvalidState(_))
        ));
        fleet.terminate_instance(&id).await.unwrap();

        let described = fleet.describe_instance(&id).await.unwrap().unwrap();
        assert_eq!(described.state, InstanceState::Terminated);
        assert!(fleet.describe_instance("i-missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failing_start() {
        let fleet = InMemoryInstances::failing_start();
        fleet.insert("i-1", InstanceState::Stopped).await;
        assert!(matches!(
            fleet.start_instance("i-1").await,
            Err(ServiceError::RequestFailed(_))
        ));
        assert_eq!(fleet.state("i-1").await, Some(InstanceState::Stopped));
    }
}
