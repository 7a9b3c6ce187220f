//! Operations shared by every OpenNebula object.
//!
//! Each object type implements [`ResourceKind`], naming its method prefix and
//! its pool document. [`Resource`] and [`Pool`] implement the common calls once;
//! the marker traits [`Ownable`], [`Renamable`] and [`Lockable`] gate the calls
//! that only some types support. Type-specific calls live next to each type.

use crate::controller::Controller;
use goca_core::pool::PoolFilter;
use goca_core::template::Template;
use goca_core::xml::XmlElement;
use goca_core::{CallContext, Error, Result, Value};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;
use std::marker::PhantomData;

/// Decoding of an OpenNebula XML body.
pub trait FromXml: Sized {
    /// Decode `xml`.
    ///
    /// # Errors
    ///
    /// Returns an `Unmarshal` client error when the document does not match.
    fn from_xml(xml: &str) -> Result<Self>;
}

/// An OpenNebula object type.
pub trait ResourceKind: FromXml + Send + Sync + 'static {
    /// Method prefix, e.g. `one.vm`
    const PREFIX: &'static str;

    /// Pool info method, e.g. `one.vmpool.info`
    const POOL_INFO: &'static str;

    /// Decoded pool document.
    type Pool: FromXml;

    /// Arguments of the `info` call.
    fn info_args(id: i32, decrypt: bool) -> Vec<Value> {
        vec![Value::Int(id), Value::Bool(decrypt)]
    }

    /// Arguments of the pool `info` call.
    fn pool_args(filter: &PoolFilter) -> Vec<Value> {
        filter.to_values()
    }
}

/// Types with an owner and permissions (`chmod`, `chown`).
pub trait Ownable: ResourceKind {}

/// Types that can be renamed.
pub trait Renamable: ResourceKind {}

/// Types that can be locked.
pub trait Lockable: ResourceKind {}

/// Pools that accept an ownership filter and ID range.
pub trait Filtered: ResourceKind {}

/// Attributes attached to a decoded object.
pub trait HasTemplate {
    /// Mutable access to the object's `TEMPLATE`.
    fn template_mut(&mut self) -> &mut Template;
}

/// Pool documents listing objects of one type.
pub trait PoolItems {
    /// Element type.
    type Item: HasTemplate;

    /// Tag of one listed object, e.g. `USER`.
    const ITEM_TAG: &'static str;

    /// Mutable access to the listed objects, in document order.
    fn items_mut(&mut self) -> &mut [Self::Item];
}

fn decode_element<T: DeserializeOwned>(xml: &str) -> Result<(T, XmlElement)> {
    let value: T = quick_xml::de::from_str(xml)?;
    let root = XmlElement::parse(xml)?;
    Ok((value, root))
}

/// Decode a single object and its `TEMPLATE`.
///
/// # Errors
///
/// Returns an `Unmarshal` client error when the document does not match `T`.
pub fn decode_object<T>(xml: &str) -> Result<T>
where
    T: DeserializeOwned + HasTemplate,
{
    let (mut object, root) = decode_element::<T>(xml)?;
    if let Some(template) = root.child("TEMPLATE") {
        *object.template_mut() = Template::from_element(template);
    }
    Ok(object)
}

/// Decode a pool document, filling each object's `TEMPLATE`.
///
/// Only [`PoolItems::ITEM_TAG`] children are paired with the decoded items;
/// siblings such as `QUOTAS` are skipped.
///
/// # Errors
///
/// Returns an `Unmarshal` client error when the document does not match `P`.
pub fn decode_pool<P>(xml: &str) -> Result<P>
where
    P: DeserializeOwned + PoolItems,
{
    let (mut pool, root) = decode_element::<P>(xml)?;
    for (item, element) in pool.items_mut().iter_mut().zip(root.children_named(P::ITEM_TAG)) {
        if let Some(template) = element.child("TEMPLATE") {
            *item.template_mut() = Template::from_element(template);
        }
    }
    Ok(pool)
}

/// Implement the XML decoding traits for an object type and its pool.
///
/// The object must have a `template: Template` field; `$items` names the
/// pool's `Vec` of objects and `$tag` their element name.
macro_rules! xml_object {
    ($object:ty, $pool:ty, $items:ident, $tag:literal) => {
        impl $crate::resource::HasTemplate for $object {
            fn template_mut(&mut self) -> &mut ::goca_core::template::Template {
                &mut self.template
            }
        }

        impl $crate::resource::FromXml for $object {
            fn from_xml(xml: &str) -> ::goca_core::Result<Self> {
                $crate::resource::decode_object(xml)
            }
        }

        impl $crate::resource::PoolItems for $pool {
            type Item = $object;

            const ITEM_TAG: &'static str = $tag;

            fn items_mut(&mut self) -> &mut [$object] {
                &mut self.$items
            }
        }

        impl $crate::resource::FromXml for $pool {
            fn from_xml(xml: &str) -> ::goca_core::Result<Self> {
                $crate::resource::decode_pool(xml)
            }
        }
    };
}

pub(crate) use xml_object;

/// How `update` combines the new template with the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateType {
    /// Replace the whole template
    #[default]
    Replace,
    /// Merge the new attributes into the current template
    Merge,
}

impl UpdateType {
    /// Wire value.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        match self {
            Self::Replace => 0,
            Self::Merge => 1,
        }
    }
}

/// Lock levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockLevel {
    /// Forbid use
    Use = 1,
    /// Forbid management
    Manage = 2,
    /// Forbid administration
    Admin = 3,
    /// Forbid every operation
    All = 4,
}

/// Permission bits for `chmod`; `-1` leaves a bit unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permissions {
    /// Owner use
    pub owner_u: i8,
    /// Owner manage
    pub owner_m: i8,
    /// Owner admin
    pub owner_a: i8,
    /// Group use
    pub group_u: i8,
    /// Group manage
    pub group_m: i8,
    /// Group admin
    pub group_a: i8,
    /// Other use
    pub other_u: i8,
    /// Other manage
    pub other_m: i8,
    /// Other admin
    pub other_a: i8,
}

impl Default for Permissions {
    fn default() -> Self {
        Self::unchanged()
    }
}

impl Permissions {
    /// Every bit left unchanged.
    #[must_use]
    pub const fn unchanged() -> Self {
        Self {
            owner_u: -1,
            owner_m: -1,
            owner_a: -1,
            group_u: -1,
            group_m: -1,
            group_a: -1,
            other_u: -1,
            other_m: -1,
            other_a: -1,
        }
    }

    /// Build from a Unix-style octal mode such as `0o640`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for modes above `0o777`.
    pub fn from_octal(mode: u32) -> Result<Self> {
        if mode > 0o777 {
            return Err(Error::InvalidArgument(format!(
                "permission mode {mode:o} is above 777"
            )));
        }
        let bit = |shift: u32| i8::from(mode & (1 << shift) != 0);
        Ok(Self {
            owner_u: bit(8),
            owner_m: bit(7),
            owner_a: bit(6),
            group_u: bit(5),
            group_m: bit(4),
            group_a: bit(3),
            other_u: bit(2),
            other_m: bit(1),
            other_a: bit(0),
        })
    }

    /// The nine bits in call order.
    #[must_use]
    pub const fn bits(&self) -> [i8; 9] {
        [
            self.owner_u,
            self.owner_m,
            self.owner_a,
            self.group_u,
            self.group_m,
            self.group_a,
            self.other_u,
            self.other_m,
            self.other_a,
        ]
    }

    /// Octal mode, when no bit is left unchanged.
    #[must_use]
    pub fn octal(&self) -> Option<u32> {
        self.bits().iter().try_fold(0_u32, |mode, bit| match bit {
            0 => Some(mode << 1),
            1 => Some((mode << 1) | 1),
            _ => None,
        })
    }

    fn to_values(self) -> impl Iterator<Item = Value> {
        self.bits().into_iter().map(|b| Value::Int(i32::from(b)))
    }
}

impl fmt::Display for Permissions {
    /// `ls`-style rendering, `?` for unchanged bits.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (bit, symbol) in self.bits().iter().zip("umaumauma".chars()) {
            let c = match bit {
                1 => symbol,
                0 => '-',
                _ => '?',
            };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

/// `PERMISSIONS` element of an object.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub struct PermissionsInfo {
    pub owner_u: i8,
    pub owner_m: i8,
    pub owner_a: i8,
    pub group_u: i8,
    pub group_m: i8,
    pub group_a: i8,
    pub other_u: i8,
    pub other_m: i8,
    pub other_a: i8,
}

impl From<PermissionsInfo> for Permissions {
    fn from(p: PermissionsInfo) -> Self {
        Self {
            owner_u: p.owner_u,
            owner_m: p.owner_m,
            owner_a: p.owner_a,
            group_u: p.group_u,
            group_m: p.group_m,
            group_a: p.group_a,
            other_u: p.other_u,
            other_m: p.other_m,
            other_a: p.other_a,
        }
    }
}

/// `LOCK` element of an object.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct LockInfo {
    /// Lock level
    pub locked: i32,
    /// User holding the lock
    pub owner: i32,
    /// Epoch seconds
    pub time: i64,
}

/// List of object IDs, e.g. `<HOSTS><ID>0</ID><ID>3</ID></HOSTS>`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct IdList {
    /// The IDs
    #[serde(rename = "ID", default)]
    pub ids: Vec<i32>,
}

/// Handle on one object of type `K`.
pub struct Resource<K> {
    ctrl: Controller,
    id: i32,
    _kind: PhantomData<fn() -> K>,
}

impl<K> Clone for Resource<K> {
    fn clone(&self) -> Self {
        Self {
            ctrl: self.ctrl.clone(),
            id: self.id,
            _kind: PhantomData,
        }
    }
}

impl<K> fmt::Debug for Resource<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("kind", &std::any::type_name::<K>())
            .field("id", &self.id)
            .finish()
    }
}

impl<K: ResourceKind> Resource<K> {
    pub(crate) fn new(ctrl: Controller, id: i32) -> Self {
        Self {
            ctrl,
            id,
            _kind: PhantomData,
        }
    }

    /// Object ID.
    #[must_use]
    pub const fn id(&self) -> i32 {
        self.id
    }

    /// Run subsequent calls with `ctx`.
    #[must_use]
    pub fn with_context(mut self, ctx: CallContext) -> Self {
        self.ctrl = self.ctrl.with_context(ctx);
        self
    }

    pub(crate) fn controller(&self) -> &Controller {
        &self.ctrl
    }

    /// Call `<prefix>.<action>` with the object ID prepended to `args`.
    pub(crate) async fn call(&self, action: &str, args: Vec<Value>) -> Result<goca_core::Response> {
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push(Value::Int(self.id));
        full.extend(args);
        self.ctrl
            .call(&format!("{}.{action}", K::PREFIX), &full)
            .await
    }

    /// Retrieve the object.
    ///
    /// # Errors
    ///
    /// Returns the call's error, or an `Unmarshal` client error.
    pub async fn info(&self, decrypt: bool) -> Result<K> {
        let response = self
            .ctrl
            .call(&format!("{}.info", K::PREFIX), &K::info_args(self.id, decrypt))
            .await?;
        K::from_xml(response.body())
    }

    /// Replace or merge the object's template.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn update(&self, template: &str, mode: UpdateType) -> Result<()> {
        self.call(
            "update",
            vec![Value::from(template), Value::Int(mode.as_i32())],
        )
        .await
        .map(drop)
    }

    /// Delete the object.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn delete(&self) -> Result<()> {
        self.call("delete", Vec::new()).await.map(drop)
    }
}

impl<K: Renamable> Resource<K> {
    /// Rename the object.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn rename(&self, name: &str) -> Result<()> {
        self.call("rename", vec![Value::from(name)]).await.map(drop)
    }
}

impl<K: Ownable> Resource<K> {
    /// Change permission bits.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn chmod(&self, permissions: Permissions) -> Result<()> {
        self.call("chmod", permissions.to_values().collect())
            .await
            .map(drop)
    }

    /// Change owner and group; `-1` leaves either unchanged.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn chown(&self, uid: i32, gid: i32) -> Result<()> {
        self.call("chown", vec![Value::Int(uid), Value::Int(gid)])
            .await
            .map(drop)
    }
}

impl<K: Lockable> Resource<K> {
    /// Lock the object at `level`.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn lock(&self, level: LockLevel) -> Result<()> {
        self.call("lock", vec![Value::Int(level as i32), Value::Bool(false)])
            .await
            .map(drop)
    }

    /// Unlock the object.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn unlock(&self) -> Result<()> {
        self.call("unlock", Vec::new()).await.map(drop)
    }
}

/// Handle on the pool of objects of type `K`.
pub struct Pool<K> {
    ctrl: Controller,
    _kind: PhantomData<fn() -> K>,
}

impl<K> Clone for Pool<K> {
    fn clone(&self) -> Self {
        Self {
            ctrl: self.ctrl.clone(),
            _kind: PhantomData,
        }
    }
}

impl<K> fmt::Debug for Pool<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("kind", &std::any::type_name::<K>())
            .finish()
    }
}

impl<K: ResourceKind> Pool<K> {
    pub(crate) fn new(ctrl: Controller) -> Self {
        Self {
            ctrl,
            _kind: PhantomData,
        }
    }

    /// Run subsequent calls with `ctx`.
    #[must_use]
    pub fn with_context(mut self, ctx: CallContext) -> Self {
        self.ctrl = self.ctrl.with_context(ctx);
        self
    }

    pub(crate) fn controller(&self) -> &Controller {
        &self.ctrl
    }

    /// List every visible object.
    ///
    /// # Errors
    ///
    /// Returns the call's error, or an `Unmarshal` client error.
    pub async fn info(&self) -> Result<K::Pool> {
        self.query(&PoolFilter::all()).await
    }

    async fn query(&self, filter: &PoolFilter) -> Result<K::Pool> {
        let response = self.ctrl.call(K::POOL_INFO, &K::pool_args(filter)).await?;
        K::Pool::from_xml(response.body())
    }

    /// Call `<prefix>.allocate`, returning the new ID.
    pub(crate) async fn allocate_with(&self, args: &[Value]) -> Result<i32> {
        self.ctrl
            .call(&format!("{}.allocate", K::PREFIX), args)
            .await
            .map(|r| r.body_int())
    }
}

impl<K: Filtered> Pool<K> {
    /// List objects matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns the call's error, or an `Unmarshal` client error.
    pub async fn info_filtered(&self, filter: &PoolFilter) -> Result<K::Pool> {
        self.query(filter).await
    }
}
