//! User groups.

use crate::resource::{xml_object, IdList, Pool, Resource, ResourceKind};
use crate::resources::quota::{self, Quotas};
use goca_core::pool::PoolFilter;
use goca_core::template::Template;
use goca_core::{Result, Value};
use serde::Deserialize;

/// A group.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Group {
    /// Group ID
    pub id: i32,
    /// Group name
    pub name: String,
    /// Member users
    #[serde(default)]
    pub users: IdList,
    /// Group administrators
    #[serde(default)]
    pub admins: IdList,
    /// Dynamic attributes
    #[serde(skip)]
    pub template: Template,
}

/// `GROUP_POOL` document, with a `QUOTAS` block after each `GROUP`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct GroupPool {
    /// Groups
    #[serde(rename = "GROUP", default)]
    pub groups: Vec<Group>,
    /// Per-group quotas
    #[serde(rename = "QUOTAS", default)]
    pub quotas: Vec<Quotas>,
    /// Quotas applied where a group's limit is `-1`
    #[serde(rename = "DEFAULT_GROUP_QUOTAS", default)]
    pub default_quotas: Quotas,
}

impl GroupPool {
    /// Quotas of group `id`.
    #[must_use]
    pub fn quotas_of(&self, id: i32) -> Option<&Quotas> {
        quota::quotas_of(&self.quotas, id)
    }
}

xml_object!(Group, GroupPool, groups, "GROUP");

impl ResourceKind for Group {
    const PREFIX: &'static str = "one.group";
    const POOL_INFO: &'static str = "one.grouppool.info";
    type Pool = GroupPool;

    fn pool_args(_: &PoolFilter) -> Vec<Value> {
        Vec::new()
    }
}

impl Pool<Group> {
    /// Create a group and return its ID.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn allocate(&self, name: &str) -> Result<i32> {
        self.allocate_with(&[Value::from(name)]).await
    }
}

impl Resource<Group> {
    /// Make a user administrator of the group.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn add_admin(&self, user_id: i32) -> Result<()> {
        self.call("addadmin", vec![Value::Int(user_id)]).await.map(drop)
    }

    /// Revoke a group administrator.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn del_admin(&self, user_id: i32) -> Result<()> {
        self.call("deladmin", vec![Value::Int(user_id)]).await.map(drop)
    }

    /// Set the group quota from a quota template.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn quota(&self, template: &str) -> Result<()> {
        self.call("quota", vec![Value::from(template)]).await.map(drop)
    }
}
