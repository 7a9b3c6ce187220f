//! Federation zones.

use crate::resource::{xml_object, Pool, Renamable, Resource, ResourceKind};
use goca_core::pool::PoolFilter;
use goca_core::template::Template;
use goca_core::{Result, Value};
use serde::Deserialize;

/// A front-end server of a zone, `SERVER`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ZoneServer {
    /// Server ID
    pub id: i32,
    /// Server name
    pub name: String,
    /// XML-RPC endpoint of the server
    pub endpoint: String,
}

/// `SERVER_POOL` element.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ZoneServerPool {
    /// Servers
    #[serde(rename = "SERVER", default)]
    pub servers: Vec<ZoneServer>,
}

/// A zone.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Zone {
    /// Zone ID
    pub id: i32,
    /// Zone name
    pub name: String,
    /// Front-end servers
    #[serde(default)]
    pub server_pool: ZoneServerPool,
    /// Dynamic attributes
    #[serde(skip)]
    pub template: Template,
}

/// `ZONE_POOL` document.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ZonePool {
    /// Zones
    #[serde(rename = "ZONE", default)]
    pub zones: Vec<Zone>,
}

xml_object!(Zone, ZonePool, zones, "ZONE");

impl ResourceKind for Zone {
    const PREFIX: &'static str = "one.zone";
    const POOL_INFO: &'static str = "one.zonepool.info";
    type Pool = ZonePool;

    fn pool_args(_: &PoolFilter) -> Vec<Value> {
        Vec::new()
    }
}

impl Renamable for Zone {}

/// Raft state of the server answering, `RAFT`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct RaftStatus {
    /// Server ID, -1 outside a federation
    pub server_id: i32,
    /// 0 solo, 1 candidate, 2 follower, 3 leader
    pub state: i32,
    /// Current term
    pub term: i64,
    /// Server voted for in the current term
    #[serde(default)]
    pub votedfor: i32,
    /// Last committed log index
    #[serde(default)]
    pub commit: i64,
    /// Last log index
    #[serde(default)]
    pub log_index: i64,
    /// Fed log index
    #[serde(default)]
    pub fedlog_index: i64,
}

impl RaftStatus {
    /// Whether the server is the zone leader.
    #[must_use]
    pub const fn is_leader(&self) -> bool {
        self.state == 3
    }
}

impl Pool<Zone> {
    /// Create a zone.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn allocate(&self, template: &str) -> Result<i32> {
        self.allocate_with(&[Value::from(template)]).await
    }

    /// Raft status of the server answering the call.
    ///
    /// # Errors
    ///
    /// Returns the call's error, or an `Unmarshal` client error.
    pub async fn raft_status(&self) -> Result<RaftStatus> {
        let response = self.controller().call("one.zone.raftstatus", &[]).await?;
        Ok(quick_xml::de::from_str(response.body())?)
    }
}

impl Resource<Zone> {
    /// Front-end endpoints of the zone.
    ///
    /// # Errors
    ///
    /// Returns the call's error, or an `Unmarshal` client error.
    pub async fn endpoints(&self) -> Result<Vec<String>> {
        let zone = self.info(false).await?;
        Ok(zone
            .server_pool
            .servers
            .into_iter()
            .map(|s| s.endpoint)
            .collect())
    }
}
