//! Usage quotas of users and groups.
//!
//! Limits use the server's sentinels: `-1` means the default quota applies
//! and `-2` means unlimited.

use serde::Deserialize;

/// Datastore quota.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
#[allow(missing_docs)]
pub struct DatastoreQuota {
    pub id: i32,
    pub images: i64,
    pub images_used: i64,
    pub size: i64,
    pub size_used: i64,
}

/// Network lease quota.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
#[allow(missing_docs)]
pub struct NetworkQuota {
    pub id: i32,
    pub leases: i64,
    pub leases_used: i64,
}

/// Compute quota.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
#[allow(missing_docs)]
pub struct VmQuota {
    pub cpu: f64,
    pub cpu_used: f64,
    pub memory: i64,
    pub memory_used: i64,
    pub running_cpu: f64,
    pub running_cpu_used: f64,
    pub running_memory: i64,
    pub running_memory_used: i64,
    pub running_vms: i64,
    pub running_vms_used: i64,
    pub system_disk_size: i64,
    pub system_disk_size_used: i64,
    pub vms: i64,
    pub vms_used: i64,
}

/// Running VMs per image quota.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
#[allow(missing_docs)]
pub struct ImageQuota {
    pub id: i32,
    pub rvms: i64,
    pub rvms_used: i64,
}

/// `DATASTORE_QUOTA` block.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct DatastoreQuotas {
    /// One entry per datastore
    #[serde(rename = "DATASTORE", default)]
    pub datastores: Vec<DatastoreQuota>,
}

/// `NETWORK_QUOTA` block.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct NetworkQuotas {
    /// One entry per network
    #[serde(rename = "NETWORK", default)]
    pub networks: Vec<NetworkQuota>,
}

/// `VM_QUOTA` block.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct VmQuotas {
    /// Absent until a limit is set or a VM is created
    #[serde(rename = "VM", default)]
    pub vm: Option<VmQuota>,
}

/// `IMAGE_QUOTA` block.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ImageQuotas {
    /// One entry per image
    #[serde(rename = "IMAGE", default)]
    pub images: Vec<ImageQuota>,
}

/// Quotas of one user or group, `QUOTAS` in pool listings.
///
/// The `DEFAULT_USER_QUOTAS` and `DEFAULT_GROUP_QUOTAS` blocks share this
/// shape without an `ID`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct Quotas {
    /// Owning user or group ID
    pub id: i32,
    /// Datastore usage
    pub datastore_quota: DatastoreQuotas,
    /// Lease usage
    pub network_quota: NetworkQuotas,
    /// Compute usage
    pub vm_quota: VmQuotas,
    /// Image usage
    pub image_quota: ImageQuotas,
}

/// Find the quotas of `id` in a pool listing.
pub(crate) fn quotas_of(quotas: &[Quotas], id: i32) -> Option<&Quotas> {
    quotas.iter().find(|q| q.id == id)
}
