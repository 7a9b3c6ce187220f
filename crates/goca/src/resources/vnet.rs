//! Virtual networks and their address ranges.

use crate::resource::{
    xml_object, Filtered, IdList, LockInfo, Lockable, Ownable, PermissionsInfo, Pool, Renamable,
    Resource, ResourceKind,
};
use goca_core::template::Template;
use goca_core::{Result, Value};
use serde::Deserialize;

/// An address range, `AR`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AddressRange {
    /// Range ID within the network
    pub ar_id: i32,
    /// `IP4`, `IP6`, `IP4_6` or `ETHER`
    #[serde(rename = "TYPE")]
    pub ar_type: String,
    /// First IPv4 address
    #[serde(default)]
    pub ip: String,
    /// First MAC address
    #[serde(default)]
    pub mac: String,
    /// Number of addresses
    pub size: i32,
    /// Addresses in use
    #[serde(default)]
    pub used_leases: i32,
}

/// `AR_POOL` element.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct AddressRangePool {
    /// Ranges
    #[serde(rename = "AR", default)]
    pub ranges: Vec<AddressRange>,
}

/// A virtual network.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct VirtualNetwork {
    /// Network ID
    pub id: i32,
    /// Owner ID
    pub uid: i32,
    /// Group ID
    pub gid: i32,
    /// Owner name
    pub uname: String,
    /// Group name
    pub gname: String,
    /// Network name
    pub name: String,
    /// Lock, when set
    pub lock: Option<LockInfo>,
    /// Permission bits
    #[serde(default)]
    pub permissions: PermissionsInfo,
    /// Clusters the network belongs to
    #[serde(default)]
    pub clusters: IdList,
    /// Host bridge
    #[serde(default)]
    pub bridge: String,
    /// Parent network of a reservation
    #[serde(default)]
    pub parent_network_id: String,
    /// Network driver
    #[serde(default)]
    pub vn_mad: String,
    /// Physical device
    #[serde(default)]
    pub phydev: String,
    /// VLAN tag
    #[serde(default)]
    pub vlan_id: String,
    /// Leases in use
    #[serde(default)]
    pub used_leases: i32,
    /// Address ranges
    #[serde(default)]
    pub ar_pool: AddressRangePool,
    /// Dynamic attributes
    #[serde(skip)]
    pub template: Template,
}

impl VirtualNetwork {
    /// Total addresses over every range.
    #[must_use]
    pub fn size(&self) -> i64 {
        self.ar_pool.ranges.iter().map(|ar| i64::from(ar.size)).sum()
    }
}

/// `VNET_POOL` document.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct VirtualNetworkPool {
    /// Networks
    #[serde(rename = "VNET", default)]
    pub vnets: Vec<VirtualNetwork>,
}

xml_object!(VirtualNetwork, VirtualNetworkPool, vnets, "VNET");

impl ResourceKind for VirtualNetwork {
    const PREFIX: &'static str = "one.vn";
    const POOL_INFO: &'static str = "one.vnpool.info";
    type Pool = VirtualNetworkPool;
}

impl Ownable for VirtualNetwork {}
impl Renamable for VirtualNetwork {}
impl Lockable for VirtualNetwork {}
impl Filtered for VirtualNetwork {}

impl Pool<VirtualNetwork> {
    /// Create a network in `cluster_id` (-1 for the default cluster).
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn allocate(&self, template: &str, cluster_id: i32) -> Result<i32> {
        self.allocate_with(&[Value::from(template), Value::Int(cluster_id)])
            .await
    }
}

impl Resource<VirtualNetwork> {
    /// Add an address range described by an `AR=[...]` template.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn add_ar(&self, template: &str) -> Result<()> {
        self.call("add_ar", vec![Value::from(template)]).await.map(drop)
    }

    /// Remove an address range.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn rm_ar(&self, ar_id: i32) -> Result<()> {
        self.call("rm_ar", vec![Value::Int(ar_id)]).await.map(drop)
    }

    /// Hold a lease, e.g. `LEASES=[IP=10.0.0.5]`.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn hold(&self, lease: &str) -> Result<()> {
        self.call("hold", vec![Value::from(lease)]).await.map(drop)
    }

    /// Release a held lease.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn release(&self, lease: &str) -> Result<()> {
        self.call("release", vec![Value::from(lease)]).await.map(drop)
    }

    /// Reserve addresses into a new or existing network, returning its ID.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn reserve(&self, template: &str) -> Result<i32> {
        self.call("reserve", vec![Value::from(template)])
            .await
            .map(|r| r.body_int())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::FromXml;
    use crate::testing::expect_call;
    use goca_core::Response;

    #[test]
    fn decodes_address_ranges() {
        let xml = "<VNET><ID>0</ID><UID>0</UID><GID>0</GID><UNAME>oneadmin</UNAME>\
                   <GNAME>oneadmin</GNAME><NAME>private</NAME><CLUSTERS><ID>0</ID></CLUSTERS>\
                   <BRIDGE>br0</BRIDGE><PARENT_NETWORK_ID/><VN_MAD>bridge</VN_MAD>\
                   <USED_LEASES>3</USED_LEASES><AR_POOL>\
                   <AR><AR_ID>0</AR_ID><TYPE>IP4</TYPE><IP>10.0.0.1</IP>\
                   <MAC>02:00:0a:00:00:01</MAC><SIZE>100</SIZE><USED_LEASES>3</USED_LEASES></AR>\
                   <AR><AR_ID>1</AR_ID><TYPE>ETHER</TYPE><SIZE>28</SIZE></AR>\
                   </AR_POOL><TEMPLATE><DNS>10.0.0.254</DNS></TEMPLATE></VNET>";
        let vnet = VirtualNetwork::from_xml(xml).unwrap();
        assert_eq!(vnet.ar_pool.ranges.len(), 2);
        assert_eq!(vnet.ar_pool.ranges[0].ip, "10.0.0.1");
        assert_eq!(vnet.ar_pool.ranges[1].ar_type, "ETHER");
        assert_eq!(vnet.size(), 128);
        assert!(vnet.parent_network_id.is_empty());
        assert_eq!(vnet.template.get_str("DNS").unwrap(), "10.0.0.254");
    }

    #[tokio::test]
    async fn reserve_returns_network_id() {
        let ctrl = expect_call(
            "one.vn.reserve",
            vec![Value::Int(0), Value::from("SIZE=10\nNAME=\"mine\"")],
            Ok(Response::int(17)),
        );
        let id = ctrl.vnet(0).reserve("SIZE=10\nNAME=\"mine\"").await.unwrap();
        assert_eq!(id, 17);
    }

    #[tokio::test]
    async fn rm_ar_sends_range_id() {
        let ctrl = expect_call(
            "one.vn.rm_ar",
            vec![Value::Int(0), Value::Int(1)],
            Ok(Response::int(0)),
        );
        ctrl.vnet(0).rm_ar(1).await.unwrap();
    }
}
