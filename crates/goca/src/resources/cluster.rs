//! Clusters group hosts, datastores and virtual networks.

use crate::resource::{xml_object, IdList, Pool, Renamable, Resource, ResourceKind};
use goca_core::pool::PoolFilter;
use goca_core::template::Template;
use goca_core::{Result, Value};
use serde::Deserialize;

/// A cluster.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Cluster {
    /// Cluster ID
    pub id: i32,
    /// Cluster name
    pub name: String,
    /// Member hosts
    #[serde(default)]
    pub hosts: IdList,
    /// Member datastores
    #[serde(default)]
    pub datastores: IdList,
    /// Member virtual networks
    #[serde(default)]
    pub vnets: IdList,
    /// Dynamic attributes
    #[serde(skip)]
    pub template: Template,
}

/// `CLUSTER_POOL` document.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ClusterPool {
    /// Clusters
    #[serde(rename = "CLUSTER", default)]
    pub clusters: Vec<Cluster>,
}

xml_object!(Cluster, ClusterPool, clusters, "CLUSTER");

impl ResourceKind for Cluster {
    const PREFIX: &'static str = "one.cluster";
    const POOL_INFO: &'static str = "one.clusterpool.info";
    type Pool = ClusterPool;

    fn pool_args(_: &PoolFilter) -> Vec<Value> {
        Vec::new()
    }
}

impl Renamable for Cluster {}

impl Pool<Cluster> {
    /// Create a cluster and return its ID.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn allocate(&self, name: &str) -> Result<i32> {
        self.allocate_with(&[Value::from(name)]).await
    }
}

impl Resource<Cluster> {
    /// Add a host.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn add_host(&self, host_id: i32) -> Result<()> {
        self.call("addhost", vec![Value::Int(host_id)]).await.map(drop)
    }

    /// Remove a host.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn del_host(&self, host_id: i32) -> Result<()> {
        self.call("delhost", vec![Value::Int(host_id)]).await.map(drop)
    }

    /// Add a datastore.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn add_datastore(&self, datastore_id: i32) -> Result<()> {
        self.call("adddatastore", vec![Value::Int(datastore_id)])
            .await
            .map(drop)
    }

    /// Remove a datastore.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn del_datastore(&self, datastore_id: i32) -> Result<()> {
        self.call("deldatastore", vec![Value::Int(datastore_id)])
            .await
            .map(drop)
    }

    /// Add a virtual network.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn add_vnet(&self, vnet_id: i32) -> Result<()> {
        self.call("addvnet", vec![Value::Int(vnet_id)]).await.map(drop)
    }

    /// Remove a virtual network.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn del_vnet(&self, vnet_id: i32) -> Result<()> {
        self.call("delvnet", vec![Value::Int(vnet_id)]).await.map(drop)
    }
}
