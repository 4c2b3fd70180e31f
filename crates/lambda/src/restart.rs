//! Restarts instances reported as stopped by EventBridge.

use aws_lambda_events::eventbridge::EventBridgeEvent;
use cloudkit_core::ec2::{contains_instance, restart_note, InstanceControl, StateChangeDetail};
use cloudkit_core::notify::Notifier;

/// What the handler did for one state-change event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestartOutcome {
    /// The instance is starting; `notified` is false when the publish failed.
    Restarted { instance_id: String, notified: bool },
    /// The reported state does not call for a restart.
    Ignored,
    /// EC2 refused to start the instance or did not report it as starting.
    NotStarted { instance_id: String },
}

/// An `EC2 Instance State-change Notification` delivered by EventBridge.
pub type StateChangeEvent = EventBridgeEvent<StateChangeDetail>;

/// Starts the instance named by `detail` and announces it on the topic.
///
/// Start and publish failures are logged rather than returned.
pub async fn restart_instance<C, N>(
    control: &C,
    notifier: &N,
    topic_arn: &str,
    detail: &StateChangeDetail,
) -> RestartOutcome
where
    C: InstanceControl + ?Sized,
    N: Notifier + ?Sized,
{
    let instance_id = detail.instance_id.clone();
    if !detail.needs_restart() {
        tracing::debug!(instance_id = %instance_id, state = ?detail.state, "no restart needed");
        return RestartOutcome::Ignored;
    }

    let starting = match control.start_instance(&instance_id).await {
        Ok(starting) => starting,
        Err(e) => {
            tracing::error!(error = %e, instance_id = %instance_id, "failed to start instance");
            return RestartOutcome::NotStarted { instance_id };
        }
    };
    if !contains_instance(&starting, &instance_id) {
        tracing::warn!(instance_id = %instance_id, "instance not reported as starting");
        return RestartOutcome::NotStarted { instance_id };
    }

    let note = restart_note(&instance_id);
    tracing::info!("{}", note);

    let notified = match notifier.publish(topic_arn, &note).await {
        Ok(_) => true,
        Err(e) => {
            tracing::error!(error = %e, topic = %topic_arn, "failed to publish restart note");
            false
        }
    };

    RestartOutcome::Restarted {
        instance_id,
        notified,
    }
}
