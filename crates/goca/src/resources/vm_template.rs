//! VM templates.

use crate::resource::{
    xml_object, Filtered, LockInfo, Lockable, Ownable, PermissionsInfo, Pool, Renamable, Resource,
    ResourceKind,
};
use goca_core::template::Template;
use goca_core::{Result, Value};
use serde::Deserialize;
use tracing::debug;

/// A VM template.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct VmTemplate {
    /// Template ID
    pub id: i32,
    /// Owner ID
    pub uid: i32,
    /// Group ID
    pub gid: i32,
    /// Owner name
    pub uname: String,
    /// Group name
    pub gname: String,
    /// Template name
    pub name: String,
    /// Lock, when set
    pub lock: Option<LockInfo>,
    /// Permission bits
    #[serde(default)]
    pub permissions: PermissionsInfo,
    /// Registration time, epoch seconds
    #[serde(default)]
    pub regtime: i64,
    /// VM definition
    #[serde(skip)]
    pub template: Template,
}

/// `VMTEMPLATE_POOL` document.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct VmTemplatePool {
    /// Templates
    #[serde(rename = "VMTEMPLATE", default)]
    pub templates: Vec<VmTemplate>,
}

xml_object!(VmTemplate, VmTemplatePool, templates, "VMTEMPLATE");

impl ResourceKind for VmTemplate {
    const PREFIX: &'static str = "one.template";
    const POOL_INFO: &'static str = "one.templatepool.info";
    type Pool = VmTemplatePool;

    fn info_args(id: i32, decrypt: bool) -> Vec<Value> {
        // The middle flag asks for the extended template.
        vec![Value::Int(id), Value::Bool(false), Value::Bool(decrypt)]
    }
}

impl Ownable for VmTemplate {}
impl Renamable for VmTemplate {}
impl Lockable for VmTemplate {}
impl Filtered for VmTemplate {}

impl Pool<VmTemplate> {
    /// Register a template.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn allocate(&self, template: &str) -> Result<i32> {
        self.allocate_with(&[Value::from(template)]).await
    }
}

impl Resource<VmTemplate> {
    /// Copy the template; `recursive` also clones its images.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn clone_as(&self, name: &str, recursive: bool) -> Result<i32> {
        self.call("clone", vec![Value::from(name), Value::Bool(recursive)])
            .await
            .map(|r| r.body_int())
    }

    /// Create a VM from the template and return its ID.
    ///
    /// `extra` is merged into the template; `persistent` gives the VM private
    /// persistent copies of its images.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn instantiate(
        &self,
        name: &str,
        hold: bool,
        extra: &str,
        persistent: bool,
    ) -> Result<i32> {
        let vm_id = self
            .call(
                "instantiate",
                vec![
                    Value::from(name),
                    Value::Bool(hold),
                    Value::from(extra),
                    Value::Bool(persistent),
                ],
            )
            .await?
            .body_int();
        debug!(template = self.id(), vm = vm_id, "template instantiated");
        Ok(vm_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::FromXml;
    use crate::testing::expect_call;
    use goca_core::Response;

    #[test]
    fn keeps_repeated_disks() {
        let xml = "<VMTEMPLATE><ID>0</ID><UID>0</UID><GID>0</GID><UNAME>oneadmin</UNAME>\
                   <GNAME>oneadmin</GNAME><NAME>web</NAME><REGTIME>1700000000</REGTIME>\
                   <TEMPLATE><CPU>1</CPU><MEMORY>512</MEMORY>\
                   <DISK><IMAGE_ID>1</IMAGE_ID></DISK><DISK><IMAGE_ID>2</IMAGE_ID></DISK>\
                   </TEMPLATE></VMTEMPLATE>";
        let tpl = VmTemplate::from_xml(xml).unwrap();
        assert_eq!(tpl.name, "web");
        assert_eq!(tpl.template.get_int("MEMORY").unwrap(), 512);
        let disks = tpl.template.get_vectors("DISK");
        assert_eq!(disks.len(), 2);
        assert_eq!(disks[1][0], ("IMAGE_ID".to_string(), "2".to_string()));
    }

    #[tokio::test]
    async fn info_asks_for_plain_template() {
        let ctrl = expect_call(
            "one.template.info",
            vec![Value::Int(3), Value::Bool(false), Value::Bool(true)],
            Ok(Response::text(
                "<VMTEMPLATE><ID>3</ID><UID>0</UID><GID>0</GID><UNAME/><GNAME/>\
                 <NAME>t</NAME><TEMPLATE/></VMTEMPLATE>",
            )),
        );
        let tpl = ctrl.template(3).info(true).await.unwrap();
        assert_eq!(tpl.id, 3);
        assert!(tpl.template.is_empty());
    }

    #[tokio::test]
    async fn instantiate_returns_vm_id() {
        let ctrl = expect_call(
            "one.template.instantiate",
            vec![
                Value::Int(3),
                Value::from("web-1"),
                Value::Bool(false),
                Value::from("MEMORY=1024"),
                Value::Bool(false),
            ],
            Ok(Response::int(42)),
        );
        let vm = ctrl
            .template(3)
            .instantiate("web-1", false, "MEMORY=1024", false)
            .await
            .unwrap();
        assert_eq!(vm, 42);
    }
}
