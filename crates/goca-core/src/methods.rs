//! Declarative table of OpenNebula methods.
//!
//! Each entry names an XML-RPC method (`one.<resource>.<action>`), the service
//! family it belongs to and, when available, the gRPC method implementing it.
//! The gRPC backend consults this table once per call: a method without a gRPC
//! binding fails with [`Error::UnsupportedOperation`] before any I/O.

use crate::config::Transport;
use crate::error::{Error, Result};
use std::fmt;

/// gRPC service families exposed by OpenNebula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// Access control lists
    Acl,
    /// Backup jobs
    BackupJob,
    /// Clusters
    Cluster,
    /// Datastores
    Datastore,
    /// Generic documents
    Document,
    /// Groups
    Group,
    /// Hooks
    Hook,
    /// Hosts
    Host,
    /// Images
    Image,
    /// Marketplaces
    Marketplace,
    /// Marketplace appliances
    MarketplaceApp,
    /// Security groups
    SecurityGroup,
    /// System information
    System,
    /// VM templates
    Template,
    /// Users
    User,
    /// Virtual data centers
    Vdc,
    /// Virtual machines
    Vm,
    /// VM groups
    VmGroup,
    /// Virtual networks
    VirtualNetwork,
    /// Virtual network templates
    VnTemplate,
    /// Virtual routers
    VirtualRouter,
    /// Zones
    Zone,
}

impl Family {
    /// Protobuf package and service name.
    #[must_use]
    pub const fn grpc_service(self) -> (&'static str, &'static str) {
        match self {
            Self::Acl => ("one.acl", "AclService"),
            Self::BackupJob => ("one.backupjob", "BackupJobService"),
            Self::Cluster => ("one.cluster", "ClusterService"),
            Self::Datastore => ("one.datastore", "DatastoreService"),
            Self::Document => ("one.document", "DocumentService"),
            Self::Group => ("one.group", "GroupService"),
            Self::Hook => ("one.hook", "HookService"),
            Self::Host => ("one.host", "HostService"),
            Self::Image => ("one.image", "ImageService"),
            Self::Marketplace => ("one.market", "MarketPlaceService"),
            Self::MarketplaceApp => ("one.marketapp", "MarketPlaceAppService"),
            Self::SecurityGroup => ("one.secgroup", "SecurityGroupService"),
            Self::System => ("one.system", "SystemService"),
            Self::Template => ("one.template", "TemplateService"),
            Self::User => ("one.user", "UserService"),
            Self::Vdc => ("one.vdc", "VdcService"),
            Self::Vm => ("one.vm", "VirtualMachineService"),
            Self::VmGroup => ("one.vmgroup", "VMGroupService"),
            Self::VirtualNetwork => ("one.vn", "VirtualNetworkService"),
            Self::VnTemplate => ("one.vntemplate", "VNTemplateService"),
            Self::VirtualRouter => ("one.vrouter", "VirtualRouterService"),
            Self::Zone => ("one.zone", "ZoneService"),
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (package, service) = self.grpc_service();
        write!(f, "{package}.{service}")
    }
}

/// One OpenNebula method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodSpec {
    /// XML-RPC method name
    pub name: &'static str,
    /// Service family
    pub family: Family,
    /// gRPC method name; `None` when the method is XML-RPC only
    pub grpc: Option<&'static str>,
}

impl MethodSpec {
    const fn new(name: &'static str, family: Family, grpc: &'static str) -> Self {
        Self {
            name,
            family,
            grpc: Some(grpc),
        }
    }

    const fn xmlrpc_only(name: &'static str, family: Family) -> Self {
        Self {
            name,
            family,
            grpc: None,
        }
    }

    /// True when the method can be called over `transport`.
    #[must_use]
    pub const fn supports(&self, transport: Transport) -> bool {
        match transport {
            Transport::XmlRpc => true,
            Transport::Grpc => self.grpc.is_some(),
        }
    }

    /// Full gRPC path, e.g. `/one.vm.VirtualMachineService/Info`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedOperation`] for XML-RPC only methods.
    pub fn grpc_path(&self) -> Result<String> {
        let rpc = self.grpc.ok_or_else(|| unsupported(self.name))?;
        let (package, service) = self.family.grpc_service();
        Ok(format!("/{package}.{service}/{rpc}"))
    }
}

fn unsupported(method: &str) -> Error {
    Error::UnsupportedOperation {
        method: method.to_string(),
        transport: Transport::Grpc.to_string(),
    }
}

/// Look up a method by its XML-RPC name.
#[must_use]
pub fn lookup(name: &str) -> Option<&'static MethodSpec> {
    METHODS.iter().find(|m| m.name == name)
}

/// gRPC path for a method name.
///
/// # Errors
///
/// Returns [`Error::UnsupportedOperation`] for unknown or XML-RPC only methods.
pub fn grpc_path(name: &str) -> Result<String> {
    lookup(name).ok_or_else(|| unsupported(name))?.grpc_path()
}

/// Every method known to this crate.
#[must_use]
pub fn all() -> &'static [MethodSpec] {
    METHODS
}

use Family::{
    Acl, Cluster, Datastore, Group, Hook, Host, Image, SecurityGroup, System, Template, User,
    VirtualNetwork, Vm, Zone,
};

const METHODS: &[MethodSpec] = &[
    // ACL
    MethodSpec::new("one.acl.addrule", Acl, "AddRule"),
    MethodSpec::new("one.acl.delrule", Acl, "DelRule"),
    MethodSpec::new("one.acl.info", Acl, "Info"),
    // Cluster
    MethodSpec::new("one.cluster.allocate", Cluster, "Allocate"),
    MethodSpec::new("one.cluster.delete", Cluster, "Delete"),
    MethodSpec::new("one.cluster.update", Cluster, "Update"),
    MethodSpec::new("one.cluster.rename", Cluster, "Rename"),
    MethodSpec::new("one.cluster.info", Cluster, "Info"),
    MethodSpec::new("one.cluster.addhost", Cluster, "AddHost"),
    MethodSpec::new("one.cluster.delhost", Cluster, "DelHost"),
    MethodSpec::new("one.cluster.adddatastore", Cluster, "AddDatastore"),
    MethodSpec::new("one.cluster.deldatastore", Cluster, "DelDatastore"),
    MethodSpec::new("one.cluster.addvnet", Cluster, "AddVNet"),
    MethodSpec::new("one.cluster.delvnet", Cluster, "DelVNet"),
    MethodSpec::new("one.clusterpool.info", Cluster, "PoolInfo"),
    // Datastore
    MethodSpec::new("one.datastore.allocate", Datastore, "Allocate"),
    MethodSpec::new("one.datastore.delete", Datastore, "Delete"),
    MethodSpec::new("one.datastore.update", Datastore, "Update"),
    MethodSpec::new("one.datastore.chmod", Datastore, "Chmod"),
    MethodSpec::new("one.datastore.chown", Datastore, "Chown"),
    MethodSpec::new("one.datastore.rename", Datastore, "Rename"),
    MethodSpec::new("one.datastore.enable", Datastore, "Enable"),
    MethodSpec::new("one.datastore.info", Datastore, "Info"),
    MethodSpec::new("one.datastorepool.info", Datastore, "PoolInfo"),
    // Group
    MethodSpec::new("one.group.allocate", Group, "Allocate"),
    MethodSpec::new("one.group.delete", Group, "Delete"),
    MethodSpec::new("one.group.update", Group, "Update"),
    MethodSpec::new("one.group.info", Group, "Info"),
    MethodSpec::new("one.group.addadmin", Group, "AddAdmin"),
    MethodSpec::new("one.group.deladmin", Group, "DelAdmin"),
    MethodSpec::new("one.group.quota", Group, "Quota"),
    MethodSpec::new("one.grouppool.info", Group, "PoolInfo"),
    // Hook
    MethodSpec::new("one.hook.retry", Hook, "Retry"),
    // Host
    MethodSpec::new("one.host.allocate", Host, "Allocate"),
    MethodSpec::new("one.host.delete", Host, "Delete"),
    MethodSpec::new("one.host.status", Host, "Status"),
    MethodSpec::new("one.host.update", Host, "Update"),
    MethodSpec::new("one.host.rename", Host, "Rename"),
    MethodSpec::new("one.host.info", Host, "Info"),
    MethodSpec::new("one.host.monitoring", Host, "Monitoring"),
    MethodSpec::new("one.hostpool.info", Host, "PoolInfo"),
    MethodSpec::new("one.hostpool.monitoring", Host, "PoolMonitoring"),
    // Image
    MethodSpec::new("one.image.allocate", Image, "Allocate"),
    MethodSpec::new("one.image.clone", Image, "Clone"),
    MethodSpec::new("one.image.delete", Image, "Delete"),
    MethodSpec::new("one.image.enable", Image, "Enable"),
    MethodSpec::new("one.image.persistent", Image, "Persistent"),
    MethodSpec::new("one.image.chtype", Image, "Chtype"),
    MethodSpec::new("one.image.update", Image, "Update"),
    MethodSpec::new("one.image.chmod", Image, "Chmod"),
    MethodSpec::new("one.image.chown", Image, "Chown"),
    MethodSpec::new("one.image.rename", Image, "Rename"),
    MethodSpec::new("one.image.lock", Image, "Lock"),
    MethodSpec::new("one.image.unlock", Image, "Unlock"),
    MethodSpec::new("one.image.info", Image, "Info"),
    MethodSpec::xmlrpc_only("one.image.resize", Image),
    MethodSpec::new("one.imagepool.info", Image, "PoolInfo"),
    // Security group
    MethodSpec::new("one.secgroup.allocate", SecurityGroup, "Allocate"),
    MethodSpec::new("one.secgroup.clone", SecurityGroup, "Clone"),
    MethodSpec::new("one.secgroup.delete", SecurityGroup, "Delete"),
    MethodSpec::new("one.secgroup.update", SecurityGroup, "Update"),
    MethodSpec::new("one.secgroup.chmod", SecurityGroup, "Chmod"),
    MethodSpec::new("one.secgroup.chown", SecurityGroup, "Chown"),
    MethodSpec::new("one.secgroup.rename", SecurityGroup, "Rename"),
    MethodSpec::new("one.secgroup.info", SecurityGroup, "Info"),
    MethodSpec::new("one.secgrouppool.info", SecurityGroup, "PoolInfo"),
    // System
    MethodSpec::new("one.system.version", System, "Version"),
    MethodSpec::new("one.system.config", System, "Config"),
    // Template
    MethodSpec::new("one.template.allocate", Template, "Allocate"),
    MethodSpec::new("one.template.clone", Template, "Clone"),
    MethodSpec::new("one.template.delete", Template, "Delete"),
    MethodSpec::new("one.template.instantiate", Template, "Instantiate"),
    MethodSpec::new("one.template.update", Template, "Update"),
    MethodSpec::new("one.template.chmod", Template, "Chmod"),
    MethodSpec::new("one.template.chown", Template, "Chown"),
    MethodSpec::new("one.template.rename", Template, "Rename"),
    MethodSpec::new("one.template.lock", Template, "Lock"),
    MethodSpec::new("one.template.unlock", Template, "Unlock"),
    MethodSpec::new("one.template.info", Template, "Info"),
    MethodSpec::new("one.templatepool.info", Template, "PoolInfo"),
    // User
    MethodSpec::new("one.user.allocate", User, "Allocate"),
    MethodSpec::new("one.user.delete", User, "Delete"),
    MethodSpec::new("one.user.passwd", User, "Password"),
    MethodSpec::new("one.user.login", User, "Login"),
    MethodSpec::new("one.user.update", User, "Update"),
    MethodSpec::new("one.user.chauth", User, "Chauth"),
    MethodSpec::new("one.user.quota", User, "Quota"),
    MethodSpec::new("one.user.chgrp", User, "Chgrp"),
    MethodSpec::new("one.user.addgroup", User, "AddGroup"),
    MethodSpec::new("one.user.delgroup", User, "DelGroup"),
    MethodSpec::new("one.user.enable", User, "Enable"),
    MethodSpec::new("one.user.info", User, "Info"),
    MethodSpec::new("one.userpool.info", User, "PoolInfo"),
    // Virtual machine
    MethodSpec::new("one.vm.allocate", Vm, "Allocate"),
    MethodSpec::new("one.vm.deploy", Vm, "Deploy"),
    MethodSpec::new("one.vm.action", Vm, "Action"),
    MethodSpec::new("one.vm.migrate", Vm, "Migrate"),
    MethodSpec::new("one.vm.chmod", Vm, "Chmod"),
    MethodSpec::new("one.vm.chown", Vm, "Chown"),
    MethodSpec::new("one.vm.rename", Vm, "Rename"),
    MethodSpec::new("one.vm.update", Vm, "Update"),
    MethodSpec::new("one.vm.resize", Vm, "Resize"),
    MethodSpec::new("one.vm.lock", Vm, "Lock"),
    MethodSpec::new("one.vm.unlock", Vm, "Unlock"),
    MethodSpec::new("one.vm.recover", Vm, "Recover"),
    MethodSpec::new("one.vm.info", Vm, "Info"),
    MethodSpec::new("one.vm.monitoring", Vm, "Monitoring"),
    MethodSpec::new("one.vmpool.info", Vm, "PoolInfo"),
    MethodSpec::new("one.vmpool.infoextended", Vm, "PoolInfoExtended"),
    MethodSpec::new("one.vmpool.monitoring", Vm, "PoolMonitoring"),
    // Virtual network
    MethodSpec::new("one.vn.allocate", VirtualNetwork, "Allocate"),
    MethodSpec::new("one.vn.delete", VirtualNetwork, "Delete"),
    MethodSpec::new("one.vn.add_ar", VirtualNetwork, "AddAR"),
    MethodSpec::new("one.vn.rm_ar", VirtualNetwork, "RmAR"),
    MethodSpec::new("one.vn.hold", VirtualNetwork, "Hold"),
    MethodSpec::new("one.vn.release", VirtualNetwork, "Release"),
    MethodSpec::new("one.vn.reserve", VirtualNetwork, "Reserve"),
    MethodSpec::new("one.vn.update", VirtualNetwork, "Update"),
    MethodSpec::new("one.vn.chmod", VirtualNetwork, "Chmod"),
    MethodSpec::new("one.vn.chown", VirtualNetwork, "Chown"),
    MethodSpec::new("one.vn.rename", VirtualNetwork, "Rename"),
    MethodSpec::new("one.vn.lock", VirtualNetwork, "Lock"),
    MethodSpec::new("one.vn.unlock", VirtualNetwork, "Unlock"),
    MethodSpec::new("one.vn.info", VirtualNetwork, "Info"),
    MethodSpec::new("one.vnpool.info", VirtualNetwork, "PoolInfo"),
    // Zone
    MethodSpec::new("one.zone.allocate", Zone, "Allocate"),
    MethodSpec::new("one.zone.delete", Zone, "Delete"),
    MethodSpec::new("one.zone.update", Zone, "Update"),
    MethodSpec::new("one.zone.rename", Zone, "Rename"),
    MethodSpec::new("one.zone.info", Zone, "Info"),
    MethodSpec::new("one.zone.raftstatus", Zone, "RaftStatus"),
    MethodSpec::new("one.zonepool.info", Zone, "PoolInfo"),
];
