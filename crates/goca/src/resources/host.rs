//! Hypervisor hosts.

use crate::resource::{xml_object, IdList, Pool, Renamable, Resource, ResourceKind};
use goca_core::pool::PoolFilter;
use goca_core::template::Template;
use goca_core::xml::XmlElement;
use goca_core::{Result, Value};
use serde::Deserialize;

/// Host states as reported in `STATE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostState {
    /// Initial state for enabled hosts
    Init = 0,
    /// Monitoring a monitored host
    MonitoringMonitored = 1,
    /// The host has been monitored
    Monitored = 2,
    /// An error occurred while monitoring
    Error = 3,
    /// The host is disabled
    Disabled = 4,
    /// Monitoring a host in error
    MonitoringError = 5,
    /// Monitoring a host in init
    MonitoringInit = 6,
    /// Monitoring a disabled host
    MonitoringDisabled = 7,
    /// The host is offline
    Offline = 8,
}

impl HostState {
    /// Decode a `STATE` value.
    #[must_use]
    pub const fn from_i32(value: i32) -> Option<Self> {
        Some(match value {
            0 => Self::Init,
            1 => Self::MonitoringMonitored,
            2 => Self::Monitored,
            3 => Self::Error,
            4 => Self::Disabled,
            5 => Self::MonitoringError,
            6 => Self::MonitoringInit,
            7 => Self::MonitoringDisabled,
            8 => Self::Offline,
            _ => return None,
        })
    }
}

/// Target of [`Resource::<Host>::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostStatus {
    /// Schedule VMs on the host
    Enabled = 0,
    /// Keep monitoring, schedule nothing
    Disabled = 1,
    /// Stop monitoring
    Offline = 2,
}

/// Capacity and usage, `HOST_SHARE`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
#[allow(missing_docs)]
pub struct HostShare {
    pub mem_usage: i64,
    pub cpu_usage: i64,
    pub total_mem: i64,
    pub total_cpu: i64,
    pub max_mem: i64,
    pub max_cpu: i64,
    pub running_vms: i32,
}

/// A host.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Host {
    /// Host ID
    pub id: i32,
    /// Hostname
    pub name: String,
    /// Raw state, see [`HostState`]
    pub state: i32,
    /// Information driver
    #[serde(default)]
    pub im_mad: String,
    /// Virtualization driver
    #[serde(default)]
    pub vm_mad: String,
    /// Owning cluster ID
    #[serde(default)]
    pub cluster_id: i32,
    /// Owning cluster name
    #[serde(default)]
    pub cluster: String,
    /// Capacity
    #[serde(default)]
    pub host_share: HostShare,
    /// Running VMs
    #[serde(default)]
    pub vms: IdList,
    /// Dynamic attributes
    #[serde(skip)]
    pub template: Template,
}

impl Host {
    /// Decoded `STATE`.
    #[must_use]
    pub const fn host_state(&self) -> Option<HostState> {
        HostState::from_i32(self.state)
    }
}

/// `HOST_POOL` document.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct HostPool {
    /// Hosts
    #[serde(rename = "HOST", default)]
    pub hosts: Vec<Host>,
}

xml_object!(Host, HostPool, hosts, "HOST");

impl ResourceKind for Host {
    const PREFIX: &'static str = "one.host";
    const POOL_INFO: &'static str = "one.hostpool.info";
    type Pool = HostPool;

    fn pool_args(_: &PoolFilter) -> Vec<Value> {
        Vec::new()
    }
}

impl Renamable for Host {}

impl Pool<Host> {
    /// Register a host; `cluster_id` -1 selects the default cluster.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn allocate(
        &self,
        name: &str,
        im_mad: &str,
        vm_mad: &str,
        cluster_id: i32,
    ) -> Result<i32> {
        self.allocate_with(&[
            Value::from(name),
            Value::from(im_mad),
            Value::from(vm_mad),
            Value::Int(cluster_id),
        ])
        .await
    }

    /// Latest monitoring records of every host, as the raw `MONITORING_DATA` tree.
    ///
    /// # Errors
    ///
    /// Returns the call's error, or an `Unmarshal` client error.
    pub async fn monitoring(&self) -> Result<XmlElement> {
        let response = self.controller().call("one.hostpool.monitoring", &[]).await?;
        XmlElement::parse(response.body())
    }
}

impl Resource<Host> {
    /// Enable, disable or offline the host.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn status(&self, status: HostStatus) -> Result<()> {
        self.call("status", vec![Value::Int(status as i32)])
            .await
            .map(drop)
    }

    /// Monitoring records of the host, as the raw `MONITORING_DATA` tree.
    ///
    /// # Errors
    ///
    /// Returns the call's error, or an `Unmarshal` client error.
    pub async fn monitoring(&self) -> Result<XmlElement> {
        let response = self.call("monitoring", Vec::new()).await?;
        XmlElement::parse(response.body())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::FromXml;
    use crate::testing::expect_call;
    use goca_core::Response;

    #[test]
    fn decodes_host_share() {
        let xml = "<HOST><ID>0</ID><NAME>kvm1</NAME><STATE>2</STATE><IM_MAD>kvm</IM_MAD>\
                   <VM_MAD>kvm</VM_MAD><CLUSTER_ID>0</CLUSTER_ID><CLUSTER>default</CLUSTER>\
                   <HOST_SHARE><MEM_USAGE>1048576</MEM_USAGE><CPU_USAGE>100</CPU_USAGE>\
                   <TOTAL_MEM>8388608</TOTAL_MEM><TOTAL_CPU>800</TOTAL_CPU>\
                   <MAX_MEM>8388608</MAX_MEM><MAX_CPU>800</MAX_CPU><RUNNING_VMS>1</RUNNING_VMS>\
                   </HOST_SHARE><VMS><ID>7</ID></VMS>\
                   <TEMPLATE><HOSTNAME>kvm1</HOSTNAME><ARCH>x86_64</ARCH></TEMPLATE></HOST>";
        let host = Host::from_xml(xml).unwrap();
        assert_eq!(host.host_state(), Some(HostState::Monitored));
        assert_eq!(host.host_share.total_cpu, 800);
        assert_eq!(host.host_share.running_vms, 1);
        assert_eq!(host.vms.ids, vec![7]);
        assert_eq!(host.template.get_str("ARCH").unwrap(), "x86_64");
    }

    #[test]
    fn unknown_state_is_none() {
        assert_eq!(HostState::from_i32(42), None);
        assert_eq!(HostState::from_i32(8), Some(HostState::Offline));
    }

    #[tokio::test]
    async fn status_sends_wire_value() {
        let ctrl = expect_call(
            "one.host.status",
            vec![Value::Int(3), Value::Int(2)],
            Ok(Response::int(3)),
        );
        ctrl.host(3).status(HostStatus::Offline).await.unwrap();
    }

    #[tokio::test]
    async fn monitoring_returns_tree() {
        let ctrl = expect_call(
            "one.host.monitoring",
            vec![Value::Int(0)],
            Ok(Response::text(
                "<MONITORING_DATA><MONITORING><TIMESTAMP>1700000000</TIMESTAMP><ID>0</ID>\
                 </MONITORING></MONITORING_DATA>",
            )),
        );
        let data = ctrl.host(0).monitoring().await.unwrap();
        assert_eq!(data.name, "MONITORING_DATA");
        let record = data.child("MONITORING").unwrap();
        assert_eq!(record.child("TIMESTAMP").unwrap().text, "1700000000");
    }
}
