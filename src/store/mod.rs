//! External collaborator contracts
//!
//! The resolver never owns topology or configuration data. It reads them
//! through [`TopologyDirectory`] and [`ConfigurationStore`], which may be
//! backed by memory, a cache, or the cluster manager's REST API.
//!
//! # Example
//!
//! ```ignore
//! use rjmx_locator::store::{memory::ClusterSnapshot, Host};
//!
//! let snapshot = ClusterSnapshot::new()
//!     .with_host("c1", Host::new("h1").with_public_host_name("h1.example.com"))
//!     .with_component("c1", "NAMENODE", "h1")
//!     .with_config("c1", "hdfs-site", "dfs.namenode.http-address", "0.0.0.0:50070");
//! ```

pub mod ambari;
pub mod cache;
pub mod memory;

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigStoreError, TopologyError};

pub use ambari::AmbariClient;
pub use cache::CachedConfigurationStore;
pub use memory::ClusterSnapshot;

/// Cluster host record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    /// Internal host name (the name components register with)
    pub host_name: String,

    /// Public-facing host name; may differ behind NAT or a load balancer
    #[serde(default)]
    pub public_host_name: String,

    /// IP address, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,

    /// Rack location, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rack_info: Option<String>,

    /// Operating system family, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_type: Option<String>,

    /// Host state as reported by the cluster manager (e.g. `HEALTHY`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl Host {
    /// 새 호스트 레코드 (public host name = internal host name)
    pub fn new(host_name: &str) -> Self {
        Self {
            host_name: host_name.to_string(),
            public_host_name: host_name.to_string(),
            ip: None,
            rack_info: None,
            os_type: None,
            state: None,
        }
    }

    pub fn with_public_host_name(mut self, name: &str) -> Self {
        self.public_host_name = name.to_string();
        self
    }

    pub fn with_ip(mut self, ip: &str) -> Self {
        self.ip = Some(ip.to_string());
        self
    }

    pub fn with_rack_info(mut self, rack: &str) -> Self {
        self.rack_info = Some(rack.to_string());
        self
    }

    /// Fill an empty public host name with the internal one
    pub(crate) fn normalized(mut self) -> Self {
        if self.public_host_name.is_empty() {
            self.public_host_name = self.host_name.clone();
        }
        self
    }
}

/// Which hosts run which components, and what those hosts look like
#[async_trait]
pub trait TopologyDirectory: Send + Sync {
    /// Hosts running `component` in `cluster`. Empty when not deployed.
    async fn host_names_for_component(
        &self,
        cluster: &str,
        component: &str,
    ) -> Result<BTreeSet<String>, TopologyError>;

    /// Host record; `TopologyError::HostNotFound` when unknown in `cluster`.
    async fn host(&self, cluster: &str, host: &str) -> Result<Host, TopologyError>;

    /// Public host name of `host`; `TopologyError::HostNotFound` when unknown.
    async fn public_host_name(&self, cluster: &str, host: &str) -> Result<String, TopologyError> {
        Ok(self.host(cluster, host).await?.public_host_name)
    }
}

/// Per-cluster service configuration (`*-site` property sets)
#[async_trait]
pub trait ConfigurationStore: Send + Sync {
    /// Current value of `key` in `config_type` for `cluster`, if set.
    async fn config_value(
        &self,
        cluster: &str,
        config_type: &str,
        key: &str,
    ) -> Result<Option<String>, ConfigStoreError>;
}
