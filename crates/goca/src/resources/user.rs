//! Users and their credentials.

use crate::resource::{xml_object, IdList, Pool, Resource, ResourceKind};
use crate::resources::quota::{self, Quotas};
use goca_core::pool::PoolFilter;
use goca_core::template::Template;
use goca_core::{Result, Value};
use serde::Deserialize;
use tracing::debug;

/// Default authentication driver.
pub const CORE_AUTH: &str = "core";

/// A user.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct User {
    /// User ID
    pub id: i32,
    /// Primary group ID
    pub gid: i32,
    /// Every group of the user
    #[serde(default)]
    pub groups: IdList,
    /// Primary group name
    pub gname: String,
    /// User name
    pub name: String,
    /// Password hash
    #[serde(default)]
    pub password: String,
    /// Authentication driver
    #[serde(default)]
    pub auth_driver: String,
    /// 1 when enabled
    #[serde(default)]
    pub enabled: i32,
    /// Dynamic attributes
    #[serde(skip)]
    pub template: Template,
}

impl User {
    /// Whether the account is enabled.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled == 1
    }
}

/// `USER_POOL` document.
///
/// The server interleaves a `QUOTAS` block after each `USER`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct UserPool {
    /// Users
    #[serde(rename = "USER", default)]
    pub users: Vec<User>,
    /// Per-user quotas
    #[serde(rename = "QUOTAS", default)]
    pub quotas: Vec<Quotas>,
    /// Quotas applied where a user's limit is `-1`
    #[serde(rename = "DEFAULT_USER_QUOTAS", default)]
    pub default_quotas: Quotas,
}

impl UserPool {
    /// Quotas of user `id`.
    #[must_use]
    pub fn quotas_of(&self, id: i32) -> Option<&Quotas> {
        quota::quotas_of(&self.quotas, id)
    }
}

xml_object!(User, UserPool, users, "USER");

impl ResourceKind for User {
    const PREFIX: &'static str = "one.user";
    const POOL_INFO: &'static str = "one.userpool.info";
    type Pool = UserPool;

    fn pool_args(_: &PoolFilter) -> Vec<Value> {
        Vec::new()
    }
}

impl Pool<User> {
    /// Create a user in `groups`; the first group is the primary one and an
    /// empty list selects the default group.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn allocate(
        &self,
        name: &str,
        password: &str,
        driver: &str,
        groups: &[i32],
    ) -> Result<i32> {
        let groups = groups.iter().copied().map(Value::Int).collect::<Vec<_>>();
        self.allocate_with(&[
            Value::from(name),
            Value::from(password),
            Value::from(driver),
            Value::Array(groups),
        ])
        .await
    }

    /// Create a login token for `user`, valid for `valid_secs` seconds.
    ///
    /// `egid` restricts the token to one group (-1 for every group). A
    /// `valid_secs` of 0 revokes `token`, -1 makes it permanent.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn login(
        &self,
        user: &str,
        token: &str,
        valid_secs: i32,
        egid: i32,
    ) -> Result<String> {
        let response = self
            .controller()
            .call(
                "one.user.login",
                &[
                    Value::from(user),
                    Value::from(token),
                    Value::Int(valid_secs),
                    Value::Int(egid),
                ],
            )
            .await?;
        debug!(user, valid_secs, "login token issued");
        Ok(response.body().to_string())
    }
}

impl Resource<User> {
    /// Change the password.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn passwd(&self, password: &str) -> Result<()> {
        self.call("passwd", vec![Value::from(password)]).await.map(drop)
    }

    /// Change the authentication driver, and the password when not empty.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn chauth(&self, driver: &str, password: &str) -> Result<()> {
        self.call("chauth", vec![Value::from(driver), Value::from(password)])
            .await
            .map(drop)
    }

    /// Set the user quota from a quota template.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn quota(&self, template: &str) -> Result<()> {
        self.call("quota", vec![Value::from(template)]).await.map(drop)
    }

    /// Change the primary group.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn chgrp(&self, gid: i32) -> Result<()> {
        self.call("chgrp", vec![Value::Int(gid)]).await.map(drop)
    }

    /// Add a secondary group.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn add_group(&self, gid: i32) -> Result<()> {
        self.call("addgroup", vec![Value::Int(gid)]).await.map(drop)
    }

    /// Remove a secondary group.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn del_group(&self, gid: i32) -> Result<()> {
        self.call("delgroup", vec![Value::Int(gid)]).await.map(drop)
    }

    /// Enable or disable the account.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn enable(&self, enable: bool) -> Result<()> {
        self.call("enable", vec![Value::Bool(enable)]).await.map(drop)
    }
}
