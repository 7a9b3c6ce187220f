//! Access control rules.
//!
//! A rule grants `rights` over `resource` to `user` in `zone`. All four
//! components travel as hexadecimal bit masks; the server also renders each
//! rule in its human form, e.g. `#0 HOST/* USE #0`.

use crate::controller::Controller;
use crate::resource::FromXml;
use goca_core::{Result, Value};
use serde::Deserialize;
use tracing::debug;

/// One ACL rule.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct AclRule {
    /// Rule ID
    #[serde(rename = "ID")]
    pub id: i32,
    /// User component, hex
    #[serde(rename = "USER")]
    pub user: String,
    /// Resource component, hex
    #[serde(rename = "RESOURCE")]
    pub resource: String,
    /// Rights component, hex
    #[serde(rename = "RIGHTS")]
    pub rights: String,
    /// Zone component, hex
    #[serde(rename = "ZONE", default)]
    pub zone: String,
    /// Server-rendered rule
    #[serde(rename = "STRING", default)]
    pub string: String,
}

/// `ACL_POOL` document.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct AclPool {
    /// Rules
    #[serde(rename = "ACL", default)]
    pub rules: Vec<AclRule>,
}

impl AclPool {
    /// Find a rule by its rendered form.
    #[must_use]
    pub fn find(&self, string: &str) -> Option<&AclRule> {
        self.rules.iter().find(|r| r.string == string)
    }

    /// Find a rule by ID.
    #[must_use]
    pub fn get(&self, id: i32) -> Option<&AclRule> {
        self.rules.iter().find(|r| r.id == id)
    }
}

impl FromXml for AclPool {
    fn from_xml(xml: &str) -> Result<Self> {
        Ok(quick_xml::de::from_str(xml)?)
    }
}

/// ACL calls.
#[derive(Debug, Clone)]
pub struct AclController {
    ctrl: Controller,
}

impl AclController {
    pub(crate) fn new(ctrl: Controller) -> Self {
        Self { ctrl }
    }

    /// Every rule.
    ///
    /// # Errors
    ///
    /// Returns the call's error, or an `Unmarshal` client error.
    pub async fn info(&self) -> Result<AclPool> {
        let response = self.ctrl.call("one.acl.info", &[]).await?;
        AclPool::from_xml(response.body())
    }

    /// Add a rule and return its ID.
    ///
    /// Without `zone` the server applies the rule to the current zone.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn create_rule(
        &self,
        user: &str,
        resource: &str,
        rights: &str,
        zone: Option<&str>,
    ) -> Result<i32> {
        let mut args = vec![Value::from(user), Value::from(resource), Value::from(rights)];
        if let Some(zone) = zone {
            args.push(Value::from(zone));
        }
        let id = self.ctrl.call("one.acl.addrule", &args).await?.body_int();
        debug!(id, user, resource, rights, "ACL rule created");
        Ok(id)
    }

    /// Delete a rule.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn delete_rule(&self, id: i32) -> Result<()> {
        self.ctrl
            .call("one.acl.delrule", &[Value::Int(id)])
            .await
            .map(drop)
    }
}
