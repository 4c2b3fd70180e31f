//! SSM Run Command invocation tracking.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// SSM document running shell commands on Linux instances.
pub const RUN_SHELL_DOCUMENT: &str = "AWS-RunShellScript";

/// Status of a command on one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationStatus {
    Pending,
    InProgress,
    Delayed,
    Success,
    Cancelling,
    Cancelled,
    TimedOut,
    Failed,
    Other(String),
}

impl FromStr for InvocationStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "Pending" => InvocationStatus::Pending,
            "InProgress" => InvocationStatus::InProgress,
            "Delayed" => InvocationStatus::Delayed,
            "Success" => InvocationStatus::Success,
            "Cancelling" => InvocationStatus::Cancelling,
            "Cancelled" => InvocationStatus::Cancelled,
            "TimedOut" => InvocationStatus::TimedOut,
            "Failed" => InvocationStatus::Failed,
            other => InvocationStatus::Other(other.to_string()),
        })
    }
}

impl InvocationStatus {
    pub fn as_str(&self) -> &str {
        match self {
            InvocationStatus::Pending => "Pending",
            InvocationStatus::InProgress => "InProgress",
            InvocationStatus::Delayed => "Delayed",
            InvocationStatus::Success => "Success",
            InvocationStatus::Cancelling => "Cancelling",
            InvocationStatus::Cancelled => "Cancelled",
            InvocationStatus::TimedOut => "TimedOut",
            InvocationStatus::Failed => "Failed",
            InvocationStatus::Other(status) => status,
        }
    }

    /// True while SSM may still change the status.
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            InvocationStatus::Pending
                | InvocationStatus::InProgress
                | InvocationStatus::Delayed
                | InvocationStatus::Cancelling
        )
    }
}

impl fmt::Display for InvocationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The result of a command on one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub instance_id: String,
    pub status: InvocationStatus,
    /// Output of the first plugin, when details were requested.
    pub output: Option<String>,
}

/// Outcome of a command across all targeted instances.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InvocationSummary {
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
    pub pending: Vec<String>,
}

impl InvocationSummary {
    /// Success requires at least one invocation and every one of them `Success`.
    pub fn all_succeeded(&self) -> bool {
        !self.succeeded.is_empty() && self.failed.is_empty() && self.pending.is_empty()
    }

    pub fn is_settled(&self) -> bool {
        self.pending.is_empty()
    }
}

pub fn summarize(invocations: &[Invocation]) -> InvocationSummary {
    let mut summary = InvocationSummary::default();
    for invocation in invocations {
        let id = invocation.instance_id.clone();
        if invocation.status == InvocationStatus::Success {
            summary.succeeded.push(id);
        } else if invocation.status.is_pending() {
            summary.pending.push(id);
        } else {
            summary.failed.push(id);
        }
    }
    summary
}

/// How long to wait for command invocations to settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub initial_delay: Duration,
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(180),
            interval: Duration::from_secs(15),
            max_attempts: 20,
        }
    }
}

/// What to do after checking invocations for the `attempt`-th time (1-based).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStep {
    Done(InvocationSummary),
    Wait(Duration),
    GiveUp(InvocationSummary),
}

impl PollPolicy {
    pub fn next_step(&self, invocations: &[Invocation], attempt: u32) -> PollStep {
        let summary = summarize(invocations);
        if !invocations.is_empty() && summary.is_settled() {
            PollStep::Done(summary)
        } else if attempt >= self.max_attempts {
            PollStep::GiveUp(summary)
        } else {
            PollStep::Wait(self.interval)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invocation(id: &str, status: &str) -> Invocation {
        Invocation {
            instance_id: id.to_string(),
            status: status.parse().unwrap(),
            output: None,
        }
    }

    #[test]
    fn test_parse_status() {
        assert_eq!(
            "Success".parse::<InvocationStatus>().unwrap(),
            InvocationStatus::Success
        );
        assert_eq!(
            "Weird".parse::<InvocationStatus>().unwrap(),
            InvocationStatus::Other("Weird".to_string())
        );
        assert!(InvocationStatus::InProgress.is_pending());
        assert!(!InvocationStatus::Failed.is_pending());
        assert_eq!(InvocationStatus::TimedOut.to_string(), "TimedOut");
        assert_eq!(InvocationStatus::Other("Weird".to_string()).to_string(), "Weird");
    }

    #[test]
    fn test_summarize_all_success() {
        let summary = summarize(&[invocation("i-1", "Success"), invocation("i-2", "Success")]);
        assert!(summary.all_succeeded());
    }

    #[test]
    fn test_summarize_any_failure() {
        let summary = summarize(&[invocation("i-1", "Success"), invocation("i-2", "Failed")]);
        assert!(!summary.all_succeeded());
        assert_eq!(summary.failed, vec!["i-2".to_string()]);
        assert!(!summarize(&[]).all_succeeded());
    }

    #[test]
    fn test_next_step() {
        let policy = PollPolicy {
            initial_delay: Duration::ZERO,
            interval: Duration::from_secs(5),
            max_attempts: 3,
        };
        let pending = [invocation("i-1", "InProgress")];
        assert_eq!(
            policy.next_step(&pending, 1),
            PollStep::Wait(Duration::from_secs(5))
        );
        assert!(matches!(
            policy.next_step(&pending, 3),
            PollStep::GiveUp(_)
        ));
        assert!(matches!(
            policy.next_step(&[invocation("i-1", "Failed")], 1),
            PollStep::Done(_)
        ));
        assert_eq!(
            policy.next_step(&[], 1),
            PollStep::Wait(Duration::from_secs(5))
        );
    }

    #[test]
    fn test_default_policy_keeps_three_minute_delay() {
        assert_eq!(PollPolicy::default().initial_delay, Duration::from_secs(180));
    }
}
