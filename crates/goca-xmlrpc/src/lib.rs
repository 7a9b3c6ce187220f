//! # goca-xmlrpc
//!
//! XML-RPC transport for the OpenNebula API.
//!
//! [`XmlRpcClient`] implements [`goca_core::RpcCaller`] by posting
//! `methodCall` documents to the `RPC2` endpoint and decoding OpenNebula's
//! `[success, body, error_code]` responses.
//!
//! ## Example
//!
//! ```no_run
//! use goca_core::{OneConfig, RpcCaller};
//! use goca_xmlrpc::XmlRpcClient;
//!
//! # async fn example() -> goca_core::Result<()> {
//! let client = XmlRpcClient::new(OneConfig::from_env()?)?;
//! let version = client.call("one.system.version", &[]).await?;
//! println!("OpenNebula {}", version.body());
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod codec;

pub use client::{HttpConfig, XmlRpcClient, XmlRpcClientBuilder};
pub use goca_core::{Error, Result};
