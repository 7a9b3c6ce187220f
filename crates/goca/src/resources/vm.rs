//! Virtual machines.
//!
//! A VM carries two state fields: the coarse [`VmState`] and, while
//! [`VmState::Active`], the fine-grained [`LcmState`] of the life-cycle
//! manager. Both enumerations mirror the server's numbering.

use crate::resource::{
    Filtered, FromXml, LockInfo, Lockable, Ownable, PermissionsInfo, Pool, Renamable, Resource,
    ResourceKind,
};
use chrono::{DateTime, Utc};
use goca_core::pool::{PoolFilter, PoolWho};
use goca_core::template::Template;
use goca_core::xml::XmlElement;
use goca_core::{Result, Value};
use serde::Deserialize;
use std::fmt;
use tracing::debug;

/// Declare a server state enumeration with its wire numbers and names.
macro_rules! state_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident = $value:literal => $label:literal,)+ }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[allow(missing_docs)]
        pub enum $name {
            $($variant = $value,)+
        }

        impl $name {
            /// Decode a wire value.
            #[must_use]
            pub const fn from_i32(value: i32) -> Option<Self> {
                match value {
                    $($value => Some(Self::$variant),)+
                    _ => None,
                }
            }

            /// Server-side name, e.g. `RUNNING`.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

state_enum! {
    /// Coarse VM state, `STATE`.
    VmState {
        Init = 0 => "INIT",
        Pending = 1 => "PENDING",
        Hold = 2 => "HOLD",
        Active = 3 => "ACTIVE",
        Stopped = 4 => "STOPPED",
        Suspended = 5 => "SUSPENDED",
        Done = 6 => "DONE",
        Failed = 7 => "FAILED",
        Poweroff = 8 => "POWEROFF",
        Undeployed = 9 => "UNDEPLOYED",
        Cloning = 10 => "CLONING",
        CloningFailure = 11 => "CLONING_FAILURE",
    }
}

state_enum! {
    /// Life-cycle state of an active VM, `LCM_STATE`.
    LcmState {
        LcmInit = 0 => "LCM_INIT",
        Prolog = 1 => "PROLOG",
        Boot = 2 => "BOOT",
        Running = 3 => "RUNNING",
        Migrate = 4 => "MIGRATE",
        SaveStop = 5 => "SAVE_STOP",
        SaveSuspend = 6 => "SAVE_SUSPEND",
        SaveMigrate = 7 => "SAVE_MIGRATE",
        PrologMigrate = 8 => "PROLOG_MIGRATE",
        PrologResume = 9 => "PROLOG_RESUME",
        EpilogStop = 10 => "EPILOG_STOP",
        Epilog = 11 => "EPILOG",
        Shutdown = 12 => "SHUTDOWN",
        Cancel = 13 => "CANCEL",
        Failure = 14 => "FAILURE",
        CleanupResubmit = 15 => "CLEANUP_RESUBMIT",
        Unknown = 16 => "UNKNOWN",
        Hotplug = 17 => "HOTPLUG",
        ShutdownPoweroff = 18 => "SHUTDOWN_POWEROFF",
        BootUnknown = 19 => "BOOT_UNKNOWN",
        BootPoweroff = 20 => "BOOT_POWEROFF",
        BootSuspended = 21 => "BOOT_SUSPENDED",
        BootStopped = 22 => "BOOT_STOPPED",
        CleanupDelete = 23 => "CLEANUP_DELETE",
        HotplugSnapshot = 24 => "HOTPLUG_SNAPSHOT",
        HotplugNic = 25 => "HOTPLUG_NIC",
        HotplugSaveas = 26 => "HOTPLUG_SAVEAS",
        HotplugSaveasPoweroff = 27 => "HOTPLUG_SAVEAS_POWEROFF",
        HotplugSaveasSuspended = 28 => "HOTPLUG_SAVEAS_SUSPENDED",
        ShutdownUndeploy = 29 => "SHUTDOWN_UNDEPLOY",
        EpilogUndeploy = 30 => "EPILOG_UNDEPLOY",
        PrologUndeploy = 31 => "PROLOG_UNDEPLOY",
        BootUndeploy = 32 => "BOOT_UNDEPLOY",
        HotplugPrologPoweroff = 33 => "HOTPLUG_PROLOG_POWEROFF",
        HotplugEpilogPoweroff = 34 => "HOTPLUG_EPILOG_POWEROFF",
        BootMigrate = 35 => "BOOT_MIGRATE",
        BootFailure = 36 => "BOOT_FAILURE",
        BootMigrateFailure = 37 => "BOOT_MIGRATE_FAILURE",
        PrologMigrateFailure = 38 => "PROLOG_MIGRATE_FAILURE",
        PrologFailure = 39 => "PROLOG_FAILURE",
        EpilogFailure = 40 => "EPILOG_FAILURE",
        EpilogStopFailure = 41 => "EPILOG_STOP_FAILURE",
        EpilogUndeployFailure = 42 => "EPILOG_UNDEPLOY_FAILURE",
        PrologMigratePoweroff = 43 => "PROLOG_MIGRATE_POWEROFF",
        PrologMigratePoweroffFailure = 44 => "PROLOG_MIGRATE_POWEROFF_FAILURE",
        PrologMigrateSuspend = 45 => "PROLOG_MIGRATE_SUSPEND",
        PrologMigrateSuspendFailure = 46 => "PROLOG_MIGRATE_SUSPEND_FAILURE",
        BootUndeployFailure = 47 => "BOOT_UNDEPLOY_FAILURE",
        BootStoppedFailure = 48 => "BOOT_STOPPED_FAILURE",
        PrologResumeFailure = 49 => "PROLOG_RESUME_FAILURE",
        PrologUndeployFailure = 50 => "PROLOG_UNDEPLOY_FAILURE",
        DiskSnapshotPoweroff = 51 => "DISK_SNAPSHOT_POWEROFF",
        DiskSnapshotRevertPoweroff = 52 => "DISK_SNAPSHOT_REVERT_POWEROFF",
        DiskSnapshotDeletePoweroff = 53 => "DISK_SNAPSHOT_DELETE_POWEROFF",
        DiskSnapshotSuspended = 54 => "DISK_SNAPSHOT_SUSPENDED",
        DiskSnapshotRevertSuspended = 55 => "DISK_SNAPSHOT_REVERT_SUSPENDED",
        DiskSnapshotDeleteSuspended = 56 => "DISK_SNAPSHOT_DELETE_SUSPENDED",
        DiskSnapshot = 57 => "DISK_SNAPSHOT",
        DiskSnapshotRevert = 58 => "DISK_SNAPSHOT_REVERT",
        DiskSnapshotDelete = 59 => "DISK_SNAPSHOT_DELETE",
        PrologMigrateUnknown = 60 => "PROLOG_MIGRATE_UNKNOWN",
        PrologMigrateUnknownFailure = 61 => "PROLOG_MIGRATE_UNKNOWN_FAILURE",
        DiskResize = 62 => "DISK_RESIZE",
        DiskResizePoweroff = 63 => "DISK_RESIZE_POWEROFF",
        DiskResizeUndeployed = 64 => "DISK_RESIZE_UNDEPLOYED",
        HotplugNicPoweroff = 65 => "HOTPLUG_NIC_POWEROFF",
        HotplugResize = 66 => "HOTPLUG_RESIZE",
        HotplugSaveasUndeployed = 67 => "HOTPLUG_SAVEAS_UNDEPLOYED",
        HotplugSaveasStopped = 68 => "HOTPLUG_SAVEAS_STOPPED",
        Backup = 69 => "BACKUP",
        BackupPoweroff = 70 => "BACKUP_POWEROFF",
    }
}

/// Actions accepted by `one.vm.action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum VmAction {
    Terminate,
    TerminateHard,
    Undeploy,
    UndeployHard,
    Poweroff,
    PoweroffHard,
    Reboot,
    RebootHard,
    Hold,
    Release,
    Stop,
    Suspend,
    Resume,
    Resched,
    Unresched,
}

impl VmAction {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Terminate => "terminate",
            Self::TerminateHard => "terminate-hard",
            Self::Undeploy => "undeploy",
            Self::UndeployHard => "undeploy-hard",
            Self::Poweroff => "poweroff",
            Self::PoweroffHard => "poweroff-hard",
            Self::Reboot => "reboot",
            Self::RebootHard => "reboot-hard",
            Self::Hold => "hold",
            Self::Release => "release",
            Self::Stop => "stop",
            Self::Suspend => "suspend",
            Self::Resume => "resume",
            Self::Resched => "resched",
            Self::Unresched => "unresched",
        }
    }
}

/// How a VM is moved by a cold migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MigrationType {
    /// Save and restore the memory
    #[default]
    Save = 0,
    /// Power off, then boot on the target
    Poweroff = 1,
    /// Hard power off, then boot on the target
    PoweroffHard = 2,
}

/// Recovery of a VM stuck in a transient state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverOperation {
    /// Act as if the pending operation failed
    Failure = 0,
    /// Act as if the pending operation succeeded
    Success = 1,
    /// Retry the pending operation
    Retry = 2,
    /// Delete the VM
    Delete = 3,
    /// Delete and recreate the VM
    DeleteRecreate = 4,
    /// Remove the VM from the database only
    DeleteDb = 5,
}

/// A virtual machine.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct VirtualMachine {
    /// VM ID
    pub id: i32,
    /// Owner ID
    pub uid: i32,
    /// Group ID
    pub gid: i32,
    /// Owner name
    pub uname: String,
    /// Group name
    pub gname: String,
    /// VM name
    pub name: String,
    /// Permission bits
    #[serde(default)]
    pub permissions: PermissionsInfo,
    /// Last monitoring time, epoch seconds
    #[serde(default)]
    pub last_poll: i64,
    /// Raw state, see [`VmState`]
    pub state: i32,
    /// Raw life-cycle state, see [`LcmState`]
    #[serde(default)]
    pub lcm_state: i32,
    /// Previous raw state
    #[serde(default)]
    pub prev_state: i32,
    /// Previous raw life-cycle state
    #[serde(default)]
    pub prev_lcm_state: i32,
    /// 1 when flagged for rescheduling
    #[serde(default)]
    pub resched: i32,
    /// Start time, epoch seconds
    #[serde(default)]
    pub stime: i64,
    /// End time, epoch seconds, 0 while running
    #[serde(default)]
    pub etime: i64,
    /// Hypervisor identifier
    #[serde(default)]
    pub deploy_id: String,
    /// Lock, when set
    pub lock: Option<LockInfo>,
    /// System template
    #[serde(skip)]
    pub template: Template,
    /// User-editable attributes
    #[serde(skip)]
    pub user_template: Template,
}

impl VirtualMachine {
    /// Decoded `STATE`.
    #[must_use]
    pub const fn vm_state(&self) -> Option<VmState> {
        VmState::from_i32(self.state)
    }

    /// Decoded `LCM_STATE`.
    #[must_use]
    pub const fn lcm(&self) -> Option<LcmState> {
        LcmState::from_i32(self.lcm_state)
    }

    /// Both states, e.g. `ACTIVE/RUNNING`.
    #[must_use]
    pub fn state_name(&self) -> String {
        let state = self.vm_state().map_or("?", VmState::as_str);
        match self.vm_state() {
            Some(VmState::Active) => {
                let lcm = self.lcm().map_or("?", LcmState::as_str);
                format!("{state}/{lcm}")
            }
            _ => state.to_string(),
        }
    }

    /// Start time.
    #[must_use]
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.stime, 0)
    }

    /// End time, `None` while the VM is not done.
    #[must_use]
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        (self.etime > 0)
            .then(|| DateTime::from_timestamp(self.etime, 0))
            .flatten()
    }
}

fn attach_templates(vm: &mut VirtualMachine, element: &XmlElement) {
    if let Some(template) = element.child("TEMPLATE") {
        vm.template = Template::from_element(template);
    }
    if let Some(template) = element.child("USER_TEMPLATE") {
        vm.user_template = Template::from_element(template);
    }
}

impl FromXml for VirtualMachine {
    fn from_xml(xml: &str) -> Result<Self> {
        let mut vm: Self = quick_xml::de::from_str(xml)?;
        attach_templates(&mut vm, &XmlElement::parse(xml)?);
        Ok(vm)
    }
}

/// `VM_POOL` document.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct VirtualMachinePool {
    /// VMs
    #[serde(rename = "VM", default)]
    pub vms: Vec<VirtualMachine>,
}

impl FromXml for VirtualMachinePool {
    fn from_xml(xml: &str) -> Result<Self> {
        let mut pool: Self = quick_xml::de::from_str(xml)?;
        let root = XmlElement::parse(xml)?;
        for (vm, element) in pool.vms.iter_mut().zip(root.children_named("VM")) {
            attach_templates(vm, element);
        }
        Ok(pool)
    }
}

/// Any state but `DONE`.
const ANY_STATE: i32 = -1;

fn state_args(filter: &PoolFilter, state: Option<VmState>) -> Vec<Value> {
    let mut args = filter.to_values();
    args.push(Value::Int(state.map_or(ANY_STATE, |s| s as i32)));
    args
}

impl ResourceKind for VirtualMachine {
    const PREFIX: &'static str = "one.vm";
    const POOL_INFO: &'static str = "one.vmpool.info";
    type Pool = VirtualMachinePool;

    fn pool_args(filter: &PoolFilter) -> Vec<Value> {
        state_args(filter, None)
    }
}

impl Ownable for VirtualMachine {}
impl Renamable for VirtualMachine {}
impl Lockable for VirtualMachine {}
impl Filtered for VirtualMachine {}

impl Pool<VirtualMachine> {
    /// Create a VM from a full template; `hold` keeps it off the scheduler.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn allocate(&self, template: &str, hold: bool) -> Result<i32> {
        self.allocate_with(&[Value::from(template), Value::Bool(hold)])
            .await
    }

    /// List VMs matching `filter` in `state`.
    ///
    /// # Errors
    ///
    /// Returns the call's error, or an `Unmarshal` client error.
    pub async fn info_with_state(
        &self,
        filter: &PoolFilter,
        state: VmState,
    ) -> Result<VirtualMachinePool> {
        let response = self
            .controller()
            .call(VirtualMachine::POOL_INFO, &state_args(filter, Some(state)))
            .await?;
        VirtualMachinePool::from_xml(response.body())
    }

    /// List VMs matching `filter` with their full templates.
    ///
    /// # Errors
    ///
    /// Returns the call's error, or an `Unmarshal` client error.
    pub async fn info_extended(&self, filter: &PoolFilter) -> Result<VirtualMachinePool> {
        let response = self
            .controller()
            .call("one.vmpool.infoextended", &state_args(filter, None))
            .await?;
        VirtualMachinePool::from_xml(response.body())
    }

    /// Monitoring records of the last `seconds` (-1 for the latest only).
    ///
    /// # Errors
    ///
    /// Returns the call's error, or an `Unmarshal` client error.
    pub async fn monitoring(&self, who: PoolWho, seconds: i32) -> Result<XmlElement> {
        let response = self
            .controller()
            .call(
                "one.vmpool.monitoring",
                &[Value::Int(who.as_i32()), Value::Int(seconds)],
            )
            .await?;
        XmlElement::parse(response.body())
    }
}

impl Resource<VirtualMachine> {
    /// Deploy a pending VM on `host_id`.
    ///
    /// `enforce` checks host capacity; `ds_id` selects the system datastore,
    /// -1 for the default.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn deploy(&self, host_id: i32, enforce: bool, ds_id: i32) -> Result<()> {
        self.call(
            "deploy",
            vec![Value::Int(host_id), Value::Bool(enforce), Value::Int(ds_id)],
        )
        .await
        .map(drop)
    }

    /// Run a life-cycle action.
    ///
    /// # Errors
    ///
    /// Returns the call's error, an `Action` rejection when the VM is in the
    /// wrong state.
    pub async fn action(&self, action: VmAction) -> Result<()> {
        // The action name precedes the ID.
        self.controller()
            .call(
                "one.vm.action",
                &[Value::from(action.as_str()), Value::Int(self.id())],
            )
            .await?;
        debug!(vm = self.id(), action = action.as_str(), "VM action requested");
        Ok(())
    }

    /// Move the VM to `host_id`.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn migrate(
        &self,
        host_id: i32,
        live: bool,
        enforce: bool,
        ds_id: i32,
        kind: MigrationType,
    ) -> Result<()> {
        self.call(
            "migrate",
            vec![
                Value::Int(host_id),
                Value::Bool(live),
                Value::Bool(enforce),
                Value::Int(ds_id),
                Value::Int(kind as i32),
            ],
        )
        .await
        .map(drop)
    }

    /// Change capacity (`CPU`, `VCPU`, `MEMORY`) from a template.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn resize(&self, template: &str, enforce: bool) -> Result<()> {
        self.call("resize", vec![Value::from(template), Value::Bool(enforce)])
            .await
            .map(drop)
    }

    /// Recover a VM stuck in a transient state.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn recover(&self, operation: RecoverOperation) -> Result<()> {
        self.call("recover", vec![Value::Int(operation as i32)])
            .await
            .map(drop)
    }

    /// Monitoring records of the VM, as the raw `MONITORING_DATA` tree.
    ///
    /// # Errors
    ///
    /// Returns the call's error, or an `Unmarshal` client error.
    pub async fn monitoring(&self) -> Result<XmlElement> {
        let response = self.call("monitoring", Vec::new()).await?;
        XmlElement::parse(response.body())
    }
}
