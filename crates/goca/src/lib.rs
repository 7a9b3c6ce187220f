//! # goca
//!
//! Typed controllers for the OpenNebula API.
//!
//! A [`Controller`] wraps one [`RpcCaller`], either the XML-RPC or the gRPC
//! backend, and hands out per-object handles:
//!
//! - [`Resource`] for one object, e.g. [`Controller::vm`]
//! - [`Pool`] for the objects of one type, e.g. [`Controller::vms`]
//! - [`resources::acl::AclController`] and
//!   [`resources::system::SystemController`] for the calls not tied to an object
//!
//! Every call honors the controller's [`CallContext`], so deadlines and
//! cancellation reach the network layer whatever the transport.
//!
//! ## Example
//!
//! ```no_run
//! use goca::{Controller, PoolFilter, PoolWho};
//! use goca::resources::vm::VmAction;
//!
//! # async fn example() -> goca::Result<()> {
//! let ctrl = Controller::from_env()?;
//! let mine = ctrl.vms().info_filtered(&PoolFilter::who(PoolWho::Mine)).await?;
//! for vm in &mine.vms {
//!     println!("{} {} {}", vm.id, vm.name, vm.state_name());
//! }
//! ctrl.vm(42).action(VmAction::Poweroff).await?;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod controller;
pub mod resource;
pub mod resources;

#[cfg(test)]
mod testing;

pub use controller::Controller;
pub use goca_core::pool::{PoolFilter, PoolWho};
pub use goca_core::template::{Pair, PairValue, Template, TemplateMap};
pub use goca_core::{
    CallContext, CancellationToken, ClientErrorKind, Error, ErrorCode, OneConfig, Response,
    Result, RpcCaller, Transport, Value,
};
pub use resource::{LockLevel, Permissions, Pool, Resource, UpdateType};
