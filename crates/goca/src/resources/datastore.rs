//! Datastores hold images and VM disks.

use crate::resource::{
    xml_object, IdList, Ownable, PermissionsInfo, Pool, Renamable, Resource, ResourceKind,
};
use goca_core::pool::PoolFilter;
use goca_core::template::Template;
use goca_core::{Result, Value};
use serde::Deserialize;

/// Datastore types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatastoreType {
    /// Image datastore
    Image = 0,
    /// System datastore
    System = 1,
    /// File datastore
    File = 2,
    /// Backup datastore
    Backup = 3,
}

impl DatastoreType {
    /// Decode the `TYPE` field.
    #[must_use]
    pub const fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::Image),
            1 => Some(Self::System),
            2 => Some(Self::File),
            3 => Some(Self::Backup),
            _ => None,
        }
    }
}

/// A datastore.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Datastore {
    /// Datastore ID
    pub id: i32,
    /// Owner ID
    pub uid: i32,
    /// Group ID
    pub gid: i32,
    /// Owner name
    pub uname: String,
    /// Group name
    pub gname: String,
    /// Datastore name
    pub name: String,
    /// Permission bits
    #[serde(default)]
    pub permissions: PermissionsInfo,
    /// Datastore driver
    #[serde(default)]
    pub ds_mad: String,
    /// Transfer driver
    #[serde(default)]
    pub tm_mad: String,
    /// Path on the hosts
    #[serde(default)]
    pub base_path: String,
    /// Raw type, see [`DatastoreType`]
    #[serde(rename = "TYPE")]
    pub ds_type: i32,
    /// 0 enabled, 1 disabled
    #[serde(default)]
    pub state: i32,
    /// Clusters the datastore belongs to
    #[serde(default)]
    pub clusters: IdList,
    /// Capacity in MB
    #[serde(default)]
    pub total_mb: i64,
    /// Free space in MB
    #[serde(default)]
    pub free_mb: i64,
    /// Used space in MB
    #[serde(default)]
    pub used_mb: i64,
    /// Images stored here
    #[serde(default)]
    pub images: IdList,
    /// Dynamic attributes
    #[serde(skip)]
    pub template: Template,
}

impl Datastore {
    /// Decoded `TYPE`.
    #[must_use]
    pub const fn kind(&self) -> Option<DatastoreType> {
        DatastoreType::from_i32(self.ds_type)
    }
}

/// `DATASTORE_POOL` document.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct DatastorePool {
    /// Datastores
    #[serde(rename = "DATASTORE", default)]
    pub datastores: Vec<Datastore>,
}

xml_object!(Datastore, DatastorePool, datastores, "DATASTORE");

impl ResourceKind for Datastore {
    const PREFIX: &'static str = "one.datastore";
    const POOL_INFO: &'static str = "one.datastorepool.info";
    type Pool = DatastorePool;

    fn pool_args(_: &PoolFilter) -> Vec<Value> {
        Vec::new()
    }
}

impl Ownable for Datastore {}
impl Renamable for Datastore {}

impl Pool<Datastore> {
    /// Create a datastore in `cluster_id` (-1 for the default cluster).
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn allocate(&self, template: &str, cluster_id: i32) -> Result<i32> {
        self.allocate_with(&[Value::from(template), Value::Int(cluster_id)])
            .await
    }
}

impl Resource<Datastore> {
    /// Enable or disable the datastore.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn enable(&self, enable: bool) -> Result<()> {
        self.call("enable", vec![Value::Bool(enable)]).await.map(drop)
    }
}
