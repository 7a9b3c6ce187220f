//! # goca-grpc
//!
//! gRPC transport for the OpenNebula API.
//!
//! Every OpenNebula gRPC method takes a request starting with the session
//! token followed by the operation's arguments, and answers with either an
//! XML document or an object ID. [`GrpcClient`] therefore drives all of them
//! through one pair of messages ([`message::GrpcRequest`],
//! [`message::GrpcReply`]), resolving the service path from
//! [`goca_core::methods`].
//!
//! ## Modules
//!
//! - [`client`] - The [`GrpcClient`] transport
//! - [`message`] - Request and reply messages
//! - [`status`] - gRPC status translation

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod message;
pub mod status;

pub use client::GrpcClient;
pub use goca_core::{Error, Result};
