//! # goca-core
//!
//! Core types and utilities for talking to the OpenNebula API.
//!
//! This crate provides the transport-agnostic pieces shared by the XML-RPC and
//! gRPC backends and by the resource controllers.
//!
//! ## Modules
//!
//! - [`error`] - Error taxonomy and OpenNebula error codes
//! - [`config`] - Connection configuration and credential resolution
//! - [`rpc`] - The [`rpc::RpcCaller`] capability, call values and responses
//! - [`methods`] - Declarative table of OpenNebula methods and their gRPC bindings
//! - [`xml`] - Minimal XML element tree used by the dynamic decoders
//! - [`template`] - Dynamic template decoding (map and ordered-pair modes)
//! - [`pool`] - Pool filter arguments shared by every `*pool.info` call

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod methods;
pub mod pool;
pub mod rpc;
pub mod template;
pub mod xml;

// Re-export commonly used types
pub use config::{ConfigResolver, Environment, OneConfig, Transport};
pub use error::{ClientErrorKind, Error, ErrorCode, Result};
pub use rpc::{CallContext, CancellationToken, Response, RpcCaller, Value};
