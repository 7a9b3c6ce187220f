//! Entry point of the typed API.

use crate::resource::{Pool, Resource};
use crate::resources::acl::AclController;
use crate::resources::cluster::Cluster;
use crate::resources::datastore::Datastore;
use crate::resources::group::Group;
use crate::resources::host::Host;
use crate::resources::image::Image;
use crate::resources::secgroup::SecurityGroup;
use crate::resources::system::SystemController;
use crate::resources::user::User;
use crate::resources::vm::VirtualMachine;
use crate::resources::vm_template::VmTemplate;
use crate::resources::vnet::VirtualNetwork;
use crate::resources::zone::Zone;
use goca_core::{CallContext, OneConfig, Response, Result, RpcCaller, Transport, Value};
use goca_grpc::GrpcClient;
use goca_xmlrpc::XmlRpcClient;
use std::sync::Arc;
use tracing::debug;

/// Typed access to an OpenNebula deployment.
///
/// The controller is transport agnostic: it only sees an [`RpcCaller`].
/// Cloning is cheap and clones share the caller.
#[derive(Clone)]
pub struct Controller {
    caller: Arc<dyn RpcCaller>,
    ctx: CallContext,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("transport", &self.caller.transport())
            .field("endpoint", &self.caller.endpoint())
            .finish_non_exhaustive()
    }
}

impl Controller {
    /// Wrap an existing caller.
    #[must_use]
    pub fn new(caller: Arc<dyn RpcCaller>) -> Self {
        Self {
            caller,
            ctx: CallContext::background(),
        }
    }

    /// Build the transport selected by `config`.
    ///
    /// # Errors
    ///
    /// Returns the backend's construction error. The gRPC backend also
    /// fails with [`goca_core::Error::Config`] outside a Tokio runtime.
    pub fn from_config(config: OneConfig) -> Result<Self> {
        let caller: Arc<dyn RpcCaller> = match config.transport() {
            Transport::XmlRpc => Arc::new(XmlRpcClient::new(config)?),
            Transport::Grpc => Arc::new(GrpcClient::new(config)?),
        };
        debug!(transport = %caller.transport(), endpoint = %caller.endpoint(), "controller ready");
        Ok(Self::new(caller))
    }

    /// Resolve configuration from the process environment and connect.
    ///
    /// # Errors
    ///
    /// Returns [`goca_core::Error::Config`] when no credentials are found.
    pub fn from_env() -> Result<Self> {
        Self::from_config(OneConfig::from_env()?)
    }

    /// Run calls made through this controller with `ctx`.
    #[must_use]
    pub fn with_context(mut self, ctx: CallContext) -> Self {
        self.ctx = ctx;
        self
    }

    /// The underlying caller.
    #[must_use]
    pub fn caller(&self) -> &Arc<dyn RpcCaller> {
        &self.caller
    }

    /// Context applied to calls.
    #[must_use]
    pub fn context(&self) -> &CallContext {
        &self.ctx
    }

    /// Invoke an arbitrary method.
    ///
    /// # Errors
    ///
    /// Returns the caller's error.
    pub async fn call(&self, method: &str, args: &[Value]) -> Result<Response> {
        self.caller.call_with_context(&self.ctx, method, args).await
    }

    /// Retry a hook execution.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn retry_hook(&self, hook_id: i32, execution_id: i32) -> Result<()> {
        self.call(
            "one.hook.retry",
            &[Value::Int(hook_id), Value::Int(execution_id)],
        )
        .await
        .map(drop)
    }

    /// ACL rules.
    #[must_use]
    pub fn acls(&self) -> AclController {
        AclController::new(self.clone())
    }

    /// System information.
    #[must_use]
    pub fn system(&self) -> SystemController {
        SystemController::new(self.clone())
    }

    /// One cluster.
    #[must_use]
    pub fn cluster(&self, id: i32) -> Resource<Cluster> {
        Resource::new(self.clone(), id)
    }

    /// All clusters.
    #[must_use]
    pub fn clusters(&self) -> Pool<Cluster> {
        Pool::new(self.clone())
    }

    /// One datastore.
    #[must_use]
    pub fn datastore(&self, id: i32) -> Resource<Datastore> {
        Resource::new(self.clone(), id)
    }

    /// All datastores.
    #[must_use]
    pub fn datastores(&self) -> Pool<Datastore> {
        Pool::new(self.clone())
    }

    /// One group.
    #[must_use]
    pub fn group(&self, id: i32) -> Resource<Group> {
        Resource::new(self.clone(), id)
    }

    /// All groups.
    #[must_use]
    pub fn groups(&self) -> Pool<Group> {
        Pool::new(self.clone())
    }

    /// One host.
    #[must_use]
    pub fn host(&self, id: i32) -> Resource<Host> {
        Resource::new(self.clone(), id)
    }

    /// All hosts.
    #[must_use]
    pub fn hosts(&self) -> Pool<Host> {
        Pool::new(self.clone())
    }

    /// One image.
    #[must_use]
    pub fn image(&self, id: i32) -> Resource<Image> {
        Resource::new(self.clone(), id)
    }

    /// All images.
    #[must_use]
    pub fn images(&self) -> Pool<Image> {
        Pool::new(self.clone())
    }

    /// One security group.
    #[must_use]
    pub fn security_group(&self, id: i32) -> Resource<SecurityGroup> {
        Resource::new(self.clone(), id)
    }

    /// All security groups.
    #[must_use]
    pub fn security_groups(&self) -> Pool<SecurityGroup> {
        Pool::new(self.clone())
    }

    /// One VM template.
    #[must_use]
    pub fn template(&self, id: i32) -> Resource<VmTemplate> {
        Resource::new(self.clone(), id)
    }

    /// All VM templates.
    #[must_use]
    pub fn templates(&self) -> Pool<VmTemplate> {
        Pool::new(self.clone())
    }

    /// One user.
    #[must_use]
    pub fn user(&self, id: i32) -> Resource<User> {
        Resource::new(self.clone(), id)
    }

    /// All users.
    #[must_use]
    pub fn users(&self) -> Pool<User> {
        Pool::new(self.clone())
    }

    /// One virtual machine.
    #[must_use]
    pub fn vm(&self, id: i32) -> Resource<VirtualMachine> {
        Resource::new(self.clone(), id)
    }

    /// All virtual machines.
    #[must_use]
    pub fn vms(&self) -> Pool<VirtualMachine> {
        Pool::new(self.clone())
    }

    /// One virtual network.
    #[must_use]
    pub fn vnet(&self, id: i32) -> Resource<VirtualNetwork> {
        Resource::new(self.clone(), id)
    }

    /// All virtual networks.
    #[must_use]
    pub fn vnets(&self) -> Pool<VirtualNetwork> {
        Pool::new(self.clone())
    }

    /// One zone.
    #[must_use]
    pub fn zone(&self, id: i32) -> Resource<Zone> {
        Resource::new(self.clone(), id)
    }

    /// All zones.
    #[must_use]
    pub fn zones(&self) -> Pool<Zone> {
        Pool::new(self.clone())
    }
}
