//! EFS mount planning for a set of EC2 instances.

use std::collections::BTreeMap;

/// Installs the NFS client on Amazon Linux.
pub const INSTALL_NFS_COMMAND: &str = "sudo yum -y install nfs-utils";

/// Default directory the file system is mounted on.
pub const DEFAULT_MOUNT_POINT: &str = "/mnt/efs";

/// NFS options recommended for EFS.
const NFS_OPTIONS: &str = "nfsvers=4.1,rsize=1048576,wsize=1048576,hard,timeo=600,retrans=2,noresvport";

/// The identifying fields of an EFS file system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSystemSummary {
    pub name: Option<String>,
    pub arn: Option<String>,
    pub file_system_id: String,
    pub mount_target_count: i32,
}

/// A mount target: one network endpoint per availability zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountTarget {
    pub availability_zone: String,
    pub ip_address: String,
}

/// Finds a file system by its `Name` tag. The last match wins.
pub fn find_file_system<'a>(
    file_systems: &'a [FileSystemSummary],
    name: &str,
) -> Option<&'a FileSystemSummary> {
    file_systems
        .iter()
        .rfind(|fs| fs.name.as_deref() == Some(name))
}

/// Maps availability zone to mount target IP address.
pub fn mount_target_map(targets: &[MountTarget]) -> BTreeMap<String, String> {
    targets
        .iter()
        .map(|target| (target.availability_zone.clone(), target.ip_address.clone()))
        .collect()
}

/// Maps instance id to availability zone.
pub fn instance_zone_map<I, S>(placements: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (S, S)>,
    S: Into<String>,
{
    placements
        .into_iter()
        .map(|(instance, zone)| (instance.into(), zone.into()))
        .collect()
}

/// Which mount target each instance uses.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MountPlan {
    /// Mount target IP address to the instances mounting through it.
    pub by_target: BTreeMap<String, Vec<String>>,
    /// Instances with no mount target in their availability zone.
    pub unmatched: Vec<String>,
}

impl MountPlan {
    /// Instances that will get the file system.
    pub fn instance_ids(&self) -> Vec<String> {
        self.by_target.values().flatten().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.by_target.is_empty()
    }
}

/// Pairs every instance with the mount target of its availability zone.
pub fn build_mount_plan(
    instances: &BTreeMap<String, String>,
    targets: &BTreeMap<String, String>,
) -> MountPlan {
    let mut plan = MountPlan::default();
    for (instance_id, zone) in instances {
        match targets.get(zone) {
            Some(ip) => plan
                .by_target
                .entry(ip.clone())
                .or_default()
                .push(instance_id.clone()),
            None => plan.unmatched.push(instance_id.clone()),
        }
    }
    plan
}

/// Shell commands mounting the file system from `target_ip` on `mount_point`.
pub fn mount_commands(target_ip: &str, mount_point: &str) -> Vec<String> {
    vec![
        format!("sudo mkdir -p {}", mount_point),
        format!(
            "sudo mount -t nfs4 -o {} {}:/ {}",
            NFS_OPTIONS, target_ip, mount_point
        ),
    ]
}
