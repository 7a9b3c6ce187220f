//! Security groups.

use crate::resource::{
    xml_object, Filtered, IdList, Ownable, PermissionsInfo, Pool, Renamable, Resource,
    ResourceKind,
};
use goca_core::template::Template;
use goca_core::{Result, Value};
use serde::Deserialize;

/// A security group.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct SecurityGroup {
    /// Group ID
    pub id: i32,
    /// Owner ID
    pub uid: i32,
    /// Group ID of the owner
    pub gid: i32,
    /// Owner name
    pub uname: String,
    /// Owner group name
    pub gname: String,
    /// Security group name
    pub name: String,
    /// Permission bits
    #[serde(default)]
    pub permissions: PermissionsInfo,
    /// VMs with the current rules
    #[serde(default)]
    pub updated_vms: IdList,
    /// VMs waiting for the current rules
    #[serde(default)]
    pub outdated_vms: IdList,
    /// VMs being updated
    #[serde(default)]
    pub updating_vms: IdList,
    /// VMs where the update failed
    #[serde(default)]
    pub error_vms: IdList,
    /// Rules and other attributes
    #[serde(skip)]
    pub template: Template,
}

impl SecurityGroup {
    /// The `RULE` vectors, in order.
    #[must_use]
    pub fn rules(&self) -> Vec<&[(String, String)]> {
        self.template.get_vectors("RULE")
    }
}

/// `SECURITY_GROUP_POOL` document.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SecurityGroupPool {
    /// Security groups
    #[serde(rename = "SECURITY_GROUP", default)]
    pub groups: Vec<SecurityGroup>,
}

xml_object!(SecurityGroup, SecurityGroupPool, groups, "SECURITY_GROUP");

impl ResourceKind for SecurityGroup {
    const PREFIX: &'static str = "one.secgroup";
    const POOL_INFO: &'static str = "one.secgrouppool.info";
    type Pool = SecurityGroupPool;
}

impl Ownable for SecurityGroup {}
impl Renamable for SecurityGroup {}
impl Filtered for SecurityGroup {}

impl Pool<SecurityGroup> {
    /// Create a security group.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn allocate(&self, template: &str) -> Result<i32> {
        self.allocate_with(&[Value::from(template)]).await
    }
}

impl Resource<SecurityGroup> {
    /// Copy the security group under a new name.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn clone_as(&self, name: &str) -> Result<i32> {
        self.call("clone", vec![Value::from(name)])
            .await
            .map(|r| r.body_int())
    }
}
