//! One module per OpenNebula object type.

pub mod acl;
pub mod cluster;
pub mod datastore;
pub mod group;
pub mod host;
pub mod image;
pub mod quota;
pub mod secgroup;
pub mod system;
pub mod user;
pub mod vm;
pub mod vm_template;
pub mod vnet;
pub mod zone;
