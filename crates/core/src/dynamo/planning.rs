//! Deciding what `deploy` and `destroy` have to do to a table.
//!
//! A live table is summarized as a [`TableState`] and compared with the
//! wanted [`TableConfig`]. Missing indexes are added and a disabled stream is
//! turned on. Key schemas cannot change in place, so a table whose keys
//! differ is reported instead of touched.

use super::table::{BillingMode, GsiConfig, KeyAttribute, ProjectionType, StreamView, TableConfig};

/// Lifecycle status shared by tables and their indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceStatus {
    Active,
    Creating,
    Updating,
    Deleting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexState {
    pub name: String,
    pub status: ResourceStatus,
}

/// A live table as DescribeTable reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableState {
    pub status: ResourceStatus,
    /// Hash key name, then the range key name when there is one.
    pub key_names: Vec<String>,
    pub indexes: Vec<IndexState>,
    /// View of the enabled stream, `None` while streaming is off.
    pub stream: Option<StreamView>,
}

impl TableState {
    /// True once the table and all of its indexes are active.
    pub fn is_ready(&self) -> bool {
        self.status == ResourceStatus::Active
            && self
                .indexes
                .iter()
                .all(|index| index.status == ResourceStatus::Active)
    }

    fn has_index(&self, name: &str) -> bool {
        self.indexes.iter().any(|index| index.name == name)
    }
}

/// One change applied to an existing table. Changes run in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableChange {
    AddIndex(GsiConfig),
    EnableStream(StreamView),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployPlan {
    Create(TableConfig),
    Update {
        table_name: String,
        changes: Vec<TableChange>,
    },
    UpToDate {
        table_name: String,
    },
    /// The table exists with other keys; it must be destroyed first.
    KeyMismatch {
        table_name: String,
        expected: Vec<String>,
        found: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestroyPlan {
    Delete { table_name: String },
    Absent { table_name: String },
}

fn key_names(config: &TableConfig) -> Vec<String> {
    std::iter::once(&config.partition_key)
        .chain(config.sort_key.as_ref())
        .map(|key| key.name.clone())
        .collect()
}

/// Compares the live table, if any, with the wanted configuration.
///
/// An enabled stream is left alone even when its view differs.
pub fn calculate_deploy_plan(current: Option<&TableState>, desired: &TableConfig) -> DeployPlan {
    let Some(state) = current else {
        return DeployPlan::Create(desired.clone());
    };
    let table_name = desired.table_name.clone();

    let expected = key_names(desired);
    if state.key_names != expected {
        return DeployPlan::KeyMismatch {
            table_name,
            expected,
            found: state.key_names.clone(),
        };
    }

    let mut changes: Vec<TableChange> = desired
        .gsis
        .iter()
        .filter(|gsi| !state.has_index(&gsi.name))
        .cloned()
        .map(TableChange::AddIndex)
        .collect();
    if let (Some(view), None) = (desired.stream_view, state.stream) {
        changes.push(TableChange::EnableStream(view));
    }

    if changes.is_empty() {
        DeployPlan::UpToDate { table_name }
    } else {
        DeployPlan::Update {
            table_name,
            changes,
        }
    }
}

pub fn calculate_destroy_plan(current: Option<&TableState>, table_name: &str) -> DestroyPlan {
    let table_name = table_name.to_string();
    match current {
        Some(_) => DestroyPlan::Delete { table_name },
        None => DestroyPlan::Absent { table_name },
    }
}

fn describe_key(label: &str, key: &KeyAttribute) -> String {
    format!("{}: {} ({})", label, key.name, key.attribute_type.code())
}

/// Keys and projection of an index, one line each.
fn index_details(gsi: &GsiConfig) -> Vec<String> {
    let mut details = vec![describe_key("Partition key", &gsi.partition_key)];
    details.extend(gsi.sort_key.iter().map(|key| describe_key("Sort key", key)));
    details.push(match &gsi.projection {
        ProjectionType::All => "Projection: ALL".to_string(),
        ProjectionType::KeysOnly => "Projection: KEYS_ONLY".to_string(),
        ProjectionType::Include(attributes) => {
            format!("Projection: INCLUDE [{}]", attributes.join(", "))
        }
    });
    details
}

fn indented(prefix: &'static str, lines: Vec<String>) -> impl Iterator<Item = String> {
    lines.into_iter().map(move |line| format!("{}{}", prefix, line))
}

impl TableChange {
    fn lines(&self) -> Vec<String> {
        match self {
            TableChange::AddIndex(gsi) => std::iter::once(format!("  + Add index: {}", gsi.name))
                .chain(indented("    ", index_details(gsi)))
                .collect(),
            TableChange::EnableStream(view) => {
                vec![format!("  + Enable stream: {}", view.as_str())]
            }
        }
    }
}

impl DeployPlan {
    /// Display lines, each prefixed with `+`, `~`, `=` or `!`.
    pub fn lines(&self) -> Vec<String> {
        match self {
            DeployPlan::Create(config) => {
                let mut lines = vec![format!("+ Create table: {}", config.table_name)];
                lines.push(format!("  {}", describe_key("Partition key", &config.partition_key)));
                if let Some(key) = &config.sort_key {
                    lines.push(format!("  {}", describe_key("Sort key", key)));
                }
                for gsi in &config.gsis {
                    lines.push(format!("  + Index: {}", gsi.name));
                    lines.extend(indented("    ", index_details(gsi)));
                }
                lines.push(match config.billing_mode {
                    BillingMode::PayPerRequest => "  Billing: PAY_PER_REQUEST".to_string(),
                    BillingMode::Provisioned(throughput) => format!(
                        "  Billing: PROVISIONED (read {}, write {})",
                        throughput.read, throughput.write
                    ),
                });
                if let Some(view) = config.stream_view {
                    lines.push(format!("  Stream: {}", view.as_str()));
                }
                lines
            }
            DeployPlan::Update {
                table_name,
                changes,
            } => std::iter::once(format!("~ Update table: {}", table_name))
                .chain(changes.iter().flat_map(TableChange::lines))
                .collect(),
            DeployPlan::UpToDate { table_name } => {
                vec![format!("= Table '{}' is up to date", table_name)]
            }
            DeployPlan::KeyMismatch {
                table_name,
                expected,
                found,
            } => vec![format!(
                "! Table '{}' is keyed on [{}], expected [{}]",
                table_name,
                found.join(", "),
                expected.join(", ")
            )],
        }
    }
}

impl DestroyPlan {
    pub fn lines(&self) -> Vec<String> {
        match self {
            DestroyPlan::Delete { table_name } => {
                vec![format!("- Delete table: {} (ALL DATA WILL BE LOST)", table_name)]
            }
            DestroyPlan::Absent { table_name } => {
                vec![format!("= Table '{}' does not exist", table_name)]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamo::table::{movies_table_config, streams_table_config};

    /// An active `year`/`title` table with a NEW_AND_OLD_IMAGES stream.
    fn live_table(indexes: &[&str]) -> TableState {
        TableState {
            status: ResourceStatus::Active,
            key_names: vec!["year".to_string(), "title".to_string()],
            indexes: indexes
                .iter()
                .map(|name| IndexState {
                    name: name.to_string(),
                    status: ResourceStatus::Active,
                })
                .collect(),
            stream: Some(StreamView::NewAndOldImages),
        }
    }

    fn live_streams_table(indexes: &[&str]) -> TableState {
        TableState {
            key_names: vec!["machineId".to_string(), "machineType".to_string()],
            ..live_table(indexes)
        }
    }

    #[test]
    fn test_missing_table_is_created() {
        let config = movies_table_config();
        assert_eq!(
            calculate_deploy_plan(None, &config),
            DeployPlan::Create(config)
        );
    }

    #[test]
    fn test_missing_index_is_added() {
        let config = streams_table_config();
        let state = live_streams_table(&["machine-name-index"]);
        let temperature = config.gsi("temperature-index").cloned().unwrap();

        assert_eq!(
            calculate_deploy_plan(Some(&state), &config),
            DeployPlan::Update {
                table_name: "streams-table".to_string(),
                changes: vec![TableChange::AddIndex(temperature)],
            }
        );
    }

    #[test]
    fn test_disabled_stream_is_enabled() {
        let config = streams_table_config();
        let state = TableState {
            stream: None,
            ..live_streams_table(&["machine-name-index", "temperature-index"])
        };
        assert!(state.is_ready());

        assert_eq!(
            calculate_deploy_plan(Some(&state), &config),
            DeployPlan::Update {
                table_name: "streams-table".to_string(),
                changes: vec![TableChange::EnableStream(StreamView::NewAndOldImages)],
            }
        );
    }

    #[test]
    fn test_indexes_come_before_the_stream() {
        let config = movies_table_config();
        let state = TableState {
            stream: None,
            ..live_table(&[])
        };
        let DeployPlan::Update { changes, .. } = calculate_deploy_plan(Some(&state), &config)
        else {
            panic!("expected an update");
        };
        assert!(matches!(changes[0], TableChange::AddIndex(ref gsi) if gsi.name == "title-index"));
        assert_eq!(changes[1], TableChange::EnableStream(StreamView::NewAndOldImages));
    }

    #[test]
    fn test_enabled_stream_with_other_view_is_kept() {
        let config = movies_table_config();
        let state = TableState {
            stream: Some(StreamView::KeysOnly),
            ..live_table(&["title-index"])
        };
        assert_eq!(
            calculate_deploy_plan(Some(&state), &config),
            DeployPlan::UpToDate {
                table_name: "Movies".to_string()
            }
        );
    }

    #[test]
    fn test_other_keys_are_reported() {
        let config = movies_table_config();
        let state = TableState {
            key_names: vec!["id".to_string()],
            ..live_table(&["title-index"])
        };
        let plan = calculate_deploy_plan(Some(&state), &config);
        assert_eq!(
            plan,
            DeployPlan::KeyMismatch {
                table_name: "Movies".to_string(),
                expected: vec!["year".to_string(), "title".to_string()],
                found: vec!["id".to_string()],
            }
        );
        assert_eq!(
            plan.lines(),
            vec!["! Table 'Movies' is keyed on [id], expected [year, title]"]
        );
    }

    #[test]
    fn test_destroy_plans() {
        let state = live_table(&[]);
        assert_eq!(
            calculate_destroy_plan(Some(&state), "Movies").lines(),
            vec!["- Delete table: Movies (ALL DATA WILL BE LOST)"]
        );
        assert_eq!(
            calculate_destroy_plan(None, "Movies"),
            DestroyPlan::Absent {
                table_name: "Movies".to_string()
            }
        );
    }

    #[test]
    fn test_create_plan_lines() {
        let lines = DeployPlan::Create(streams_table_config()).lines();
        assert_eq!(lines[0], "+ Create table: streams-table");
        assert_eq!(lines[1], "  Partition key: machineId (N)");
        assert_eq!(lines[2], "  Sort key: machineType (S)");
        assert!(lines.contains(&"  + Index: temperature-index".to_string()));
        assert!(lines.contains(&"    Projection: INCLUDE [machineId, machineType]".to_string()));
        assert!(lines.contains(&"  Billing: PROVISIONED (read 1, write 1)".to_string()));
        assert_eq!(lines.last().unwrap(), "  Stream: NEW_AND_OLD_IMAGES");
    }

    #[test]
    fn test_update_plan_lines() {
        let plan = DeployPlan::Update {
            table_name: "Movies".to_string(),
            changes: vec![
                TableChange::AddIndex(movies_table_config().gsis[0].clone()),
                TableChange::EnableStream(StreamView::NewAndOldImages),
            ],
        };
        assert_eq!(
            plan.lines(),
            vec![
                "~ Update table: Movies",
                "  + Add index: title-index",
                "    Partition key: title (S)",
                "    Projection: ALL",
                "  + Enable stream: NEW_AND_OLD_IMAGES",
            ]
        );
    }

    #[test]
    fn test_is_ready() {
        let mut state = live_table(&["title-index"]);
        assert!(state.is_ready());
        state.indexes[0].status = ResourceStatus::Creating;
        assert!(!state.is_ready());
    }
}
