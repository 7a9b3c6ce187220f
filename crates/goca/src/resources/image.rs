//! Disk images.

use crate::resource::{
    xml_object, Filtered, IdList, LockInfo, Lockable, Ownable, PermissionsInfo, Pool, Renamable,
    Resource, ResourceKind,
};
use goca_core::template::Template;
use goca_core::{Result, Value};
use serde::Deserialize;
use std::fmt;

/// Image states as reported in `STATE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageState {
    /// Being created
    Init = 0,
    /// Ready to use
    Ready = 1,
    /// In use by VMs
    Used = 2,
    /// Cannot be used by new VMs
    Disabled = 3,
    /// A transfer is in progress
    Locked = 4,
    /// Creation or a transfer failed
    Error = 5,
    /// Source of a clone operation
    Clone = 6,
    /// Being deleted
    Delete = 7,
    /// Persistent image in use
    UsedPers = 8,
    /// In use with a transfer in progress
    LockedUsed = 9,
    /// Persistent, in use, with a transfer in progress
    LockedUsedPers = 10,
}

impl ImageState {
    /// Decode a `STATE` value.
    #[must_use]
    pub const fn from_i32(value: i32) -> Option<Self> {
        Some(match value {
            0 => Self::Init,
            1 => Self::Ready,
            2 => Self::Used,
            3 => Self::Disabled,
            4 => Self::Locked,
            5 => Self::Error,
            6 => Self::Clone,
            7 => Self::Delete,
            8 => Self::UsedPers,
            9 => Self::LockedUsed,
            10 => Self::LockedUsedPers,
            _ => return None,
        })
    }
}

/// Image types accepted by `chtype`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageType {
    /// Bootable OS disk
    Os,
    /// Read-only CD-ROM
    Cdrom,
    /// Data disk
    Datablock,
    /// Kernel file
    Kernel,
    /// Ramdisk file
    Ramdisk,
    /// Context file
    Context,
}

impl ImageType {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Os => "OS",
            Self::Cdrom => "CDROM",
            Self::Datablock => "DATABLOCK",
            Self::Kernel => "KERNEL",
            Self::Ramdisk => "RAMDISK",
            Self::Context => "CONTEXT",
        }
    }
}

impl fmt::Display for ImageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An image.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Image {
    /// Image ID
    pub id: i32,
    /// Owner ID
    pub uid: i32,
    /// Group ID
    pub gid: i32,
    /// Owner name
    pub uname: String,
    /// Group name
    pub gname: String,
    /// Image name
    pub name: String,
    /// Lock, when set
    pub lock: Option<LockInfo>,
    /// Permission bits
    #[serde(default)]
    pub permissions: PermissionsInfo,
    /// Raw image type
    #[serde(rename = "TYPE", default)]
    pub image_type: i32,
    /// 1 for persistent images
    #[serde(default)]
    pub persistent: i32,
    /// Registration time, epoch seconds
    #[serde(default)]
    pub regtime: i64,
    /// Location in the datastore
    #[serde(default)]
    pub source: String,
    /// Original path
    #[serde(default)]
    pub path: String,
    /// Disk format
    #[serde(default)]
    pub format: String,
    /// Size in MB
    #[serde(default)]
    pub size: i64,
    /// Raw state, see [`ImageState`]
    pub state: i32,
    /// Number of VMs using the image
    #[serde(default)]
    pub running_vms: i32,
    /// Datastore ID
    #[serde(default)]
    pub datastore_id: i32,
    /// Datastore name
    #[serde(default)]
    pub datastore: String,
    /// VMs using the image
    #[serde(default)]
    pub vms: IdList,
    /// Images cloned from this one
    #[serde(default)]
    pub clones: IdList,
    /// Dynamic attributes
    #[serde(skip)]
    pub template: Template,
}

impl Image {
    /// Decoded `STATE`.
    #[must_use]
    pub const fn image_state(&self) -> Option<ImageState> {
        ImageState::from_i32(self.state)
    }

    /// Whether the image is persistent.
    #[must_use]
    pub const fn is_persistent(&self) -> bool {
        self.persistent == 1
    }
}

/// `IMAGE_POOL` document.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ImagePool {
    /// Images
    #[serde(rename = "IMAGE", default)]
    pub images: Vec<Image>,
}

xml_object!(Image, ImagePool, images, "IMAGE");

impl ResourceKind for Image {
    const PREFIX: &'static str = "one.image";
    const POOL_INFO: &'static str = "one.imagepool.info";
    type Pool = ImagePool;
}

impl Ownable for Image {}
impl Renamable for Image {}
impl Lockable for Image {}
impl Filtered for Image {}

impl Pool<Image> {
    /// Register an image in datastore `ds_id`.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn allocate(
        &self,
        template: &str,
        ds_id: i32,
        check_capacity: bool,
    ) -> Result<i32> {
        // The server takes the negated flag.
        self.allocate_with(&[
            Value::from(template),
            Value::Int(ds_id),
            Value::Bool(!check_capacity),
        ])
        .await
    }
}

impl Resource<Image> {
    /// Clone the image into datastore `ds_id` (-1 keeps the source datastore).
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn clone_as(&self, name: &str, ds_id: i32) -> Result<i32> {
        self.call("clone", vec![Value::from(name), Value::Int(ds_id)])
            .await
            .map(|r| r.body_int())
    }

    /// Enable or disable the image.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn enable(&self, enable: bool) -> Result<()> {
        self.call("enable", vec![Value::Bool(enable)]).await.map(drop)
    }

    /// Make the image persistent or not.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn persistent(&self, persistent: bool) -> Result<()> {
        self.call("persistent", vec![Value::Bool(persistent)])
            .await
            .map(drop)
    }

    /// Change the image type.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn chtype(&self, image_type: ImageType) -> Result<()> {
        self.call("chtype", vec![Value::from(image_type.as_str())])
            .await
            .map(drop)
    }

    /// Grow the image to `size_mb`.
    ///
    /// Only the XML-RPC transport implements this call.
    ///
    /// # Errors
    ///
    /// Returns [`goca_core::Error::UnsupportedOperation`] over gRPC, or the
    /// call's error.
    pub async fn resize(&self, size_mb: u64) -> Result<()> {
        self.call("resize", vec![Value::from(size_mb.to_string())])
            .await
            .map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{FromXml, LockLevel};
    use crate::testing::expect_call;
    use goca_core::pool::{PoolFilter, PoolWho};
    use goca_core::Response;

    #[test]
    fn decodes_image_with_lock() {
        let xml = "<IMAGE><ID>5</ID><UID>2</UID><GID>1</GID><UNAME>alice</UNAME>\
                   <GNAME>users</GNAME><NAME>ubuntu</NAME>\
                   <LOCK><LOCKED>1</LOCKED><OWNER>2</OWNER><TIME>1700000000</TIME></LOCK>\
                   <TYPE>0</TYPE><PERSISTENT>1</PERSISTENT><SIZE>2252</SIZE><STATE>8</STATE>\
                   <RUNNING_VMS>1</RUNNING_VMS><DATASTORE_ID>1</DATASTORE_ID>\
                   <DATASTORE>default</DATASTORE><VMS><ID>12</ID></VMS><CLONES/>\
                   <TEMPLATE><DEV_PREFIX>vd</DEV_PREFIX></TEMPLATE></IMAGE>";
        let image = Image::from_xml(xml).unwrap();
        assert_eq!(image.image_state(), Some(ImageState::UsedPers));
        assert!(image.is_persistent());
        assert_eq!(image.lock.as_ref().map(|l| l.locked), Some(1));
        assert_eq!(image.vms.ids, vec![12]);
        assert_eq!(image.template.get_str("DEV_PREFIX").unwrap(), "vd");
    }

    #[test]
    fn unlocked_image_has_no_lock() {
        let xml = "<IMAGE><ID>1</ID><UID>0</UID><GID>0</GID><UNAME/><GNAME/>\
                   <NAME>a</NAME><STATE>1</STATE></IMAGE>";
        let image = Image::from_xml(xml).unwrap();
        assert!(image.lock.is_none());
        assert_eq!(image.image_state(), Some(ImageState::Ready));
    }

    #[tokio::test]
    async fn filtered_pool_sends_filter() {
        let ctrl = expect_call(
            "one.imagepool.info",
            vec![Value::Int(-3), Value::Int(0), Value::Int(10)],
            Ok(Response::text("<IMAGE_POOL/>")),
        );
        let filter = PoolFilter::who(PoolWho::Mine).with_range(0, 10);
        let pool = ctrl.images().info_filtered(&filter).await.unwrap();
        assert!(pool.images.is_empty());
    }

    #[tokio::test]
    async fn allocate_negates_capacity_check() {
        let ctrl = expect_call(
            "one.image.allocate",
            vec![Value::from("NAME=a"), Value::Int(1), Value::Bool(false)],
            Ok(Response::int(9)),
        );
        assert_eq!(ctrl.images().allocate("NAME=a", 1, true).await.unwrap(), 9);
    }

    #[tokio::test]
    async fn lock_sends_level() {
        let ctrl = expect_call(
            "one.image.lock",
            vec![Value::Int(5), Value::Int(4), Value::Bool(false)],
            Ok(Response::int(5)),
        );
        ctrl.image(5).lock(LockLevel::All).await.unwrap();
    }

    #[tokio::test]
    async fn chtype_sends_name() {
        let ctrl = expect_call(
            "one.image.chtype",
            vec![Value::Int(5), Value::from("DATABLOCK")],
            Ok(Response::int(5)),
        );
        ctrl.image(5).chtype(ImageType::Datablock).await.unwrap();
    }

    #[tokio::test]
    async fn resize_sends_size_as_text() {
        let ctrl = expect_call(
            "one.image.resize",
            vec![Value::Int(5), Value::from("4096")],
            Ok(Response::int(5)),
        );
        ctrl.image(5).resize(4096).await.unwrap();
    }
}
