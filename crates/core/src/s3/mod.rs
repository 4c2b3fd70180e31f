//! S3 naming rules, lookups and plans.

pub mod buckets;
pub mod inmemory;
pub mod keys;
pub mod listing;
pub mod multipart;
pub mod replication;
pub mod tags;
pub mod traits;

pub use buckets::{backup_bucket_name, bucket_arn, find_bucket, find_bucket_containing, role_arn};
pub use inmemory::InMemoryObjectStore;
pub use keys::{converted_pdf_key, file_extension, file_stem, redacted_key, DocumentKind};
pub use listing::{find_object, regional_logs, ObjectSummary, MIN_LOG_SIZE};
pub use multipart::{PartPlan, PlannedPart, MIN_PART_SIZE};
pub use replication::{retarget_rule, ReplicationConfig, ReplicationRuleSpec};
pub use tags::{has_redacted_refinement, ObjectTag, Refinement, REFINEMENT_TAG_KEY};
pub use traits::ObjectStore;
