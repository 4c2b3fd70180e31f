//! Replication configuration model and retargeting (Functional Core).

use crate::error::{Result, ServiceError};

/// A bucket replication configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationConfig {
    pub role_arn: String,
    pub rules: Vec<ReplicationRuleSpec>,
}

/// A single replication rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationRuleSpec {
    pub id: String,
    pub enabled: bool,
    pub priority: Option<i32>,
    /// Key prefix filter; `None` replicates the whole bucket.
    pub prefix: Option<String>,
    pub destination_bucket_arn: String,
    pub storage_class: Option<String>,
    pub delete_marker_replication: bool,
}

impl ReplicationConfig {
    pub fn rule(&self, id: &str) -> Option<&ReplicationRuleSpec> {
        self.rules.iter().find(|rule| rule.id == id)
    }
}

/// Points the rule `rule_id` at a new destination bucket and sets the role.
///
/// Every other rule is kept as is.
pub fn retarget_rule(
    config: &ReplicationConfig,
    rule_id: &str,
    destination_arn: &str,
    role_arn: &str,
) -> Result<ReplicationConfig> {
    if config.rule(rule_id).is_none() {
        return Err(ServiceError::NotFound {
            entity_type: "ReplicationRule",
            id: rule_id.to_string(),
        });
    }

    let rules = config
        .rules
        .iter()
        .map(|rule| {
            if rule.id == rule_id {
                ReplicationRuleSpec {
                    destination_bucket_arn: destination_arn.to_string(),
                    ..rule.clone()
                }
            } else {
                rule.clone()
            }
        })
        .collect();

    Ok(ReplicationConfig {
        role_arn: role_arn.to_string(),
        rules,
    })
}
