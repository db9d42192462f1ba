//! In-memory topology and configuration snapshot
//!
//! Immutable once built, so it serves concurrent lookups without locking.
//!
//! # Example Snapshot (YAML)
//!
//! ```yaml
//! clusters:
//!   c1:
//!     hosts:
//!       - host_name: h1
//!         public_host_name: h1.example.com
//!     components:
//!       NAMENODE: [h1]
//!     configurations:
//!       hdfs-site:
//!         dfs.namenode.http-address: "0.0.0.0:50070"
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ConfigurationStore, Host, TopologyDirectory};
use crate::config::ConfigError;
use crate::error::{ConfigStoreError, TopologyError};

/// One cluster's hosts, component placement and configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterState {
    #[serde(default, with = "host_list")]
    pub hosts: BTreeMap<String, Host>,

    /// Component name → hosts running it
    #[serde(default)]
    pub components: BTreeMap<String, BTreeSet<String>>,

    /// Configuration type → key → value
    #[serde(default)]
    pub configurations: HashMap<String, HashMap<String, String>>,
}

/// Hosts are written as a list in YAML and kept keyed by host name
mod host_list {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(hosts: &BTreeMap<String, Host>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(hosts.values())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<String, Host>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let hosts = Vec::<Host>::deserialize(deserializer)?;
        Ok(hosts
            .into_iter()
            .map(|h| {
                let h = h.normalized();
                (h.host_name.clone(), h)
            })
            .collect())
    }
}

/// Snapshot of several clusters implementing both store contracts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterSnapshot {
    #[serde(default)]
    pub clusters: HashMap<String, ClusterState>,
}

impl ClusterSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a snapshot from a YAML file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    fn cluster_mut(&mut self, cluster: &str) -> &mut ClusterState {
        self.clusters.entry(cluster.to_string()).or_default()
    }

    pub fn with_host(mut self, cluster: &str, host: Host) -> Self {
        let host = host.normalized();
        self.cluster_mut(cluster)
            .hosts
            .insert(host.host_name.clone(), host);
        self
    }

    /// Place `component` on `host`, registering the host if it is new
    pub fn with_component(mut self, cluster: &str, component: &str, host: &str) -> Self {
        let state = self.cluster_mut(cluster);
        state
            .hosts
            .entry(host.to_string())
            .or_insert_with(|| Host::new(host));
        state
            .components
            .entry(component.to_string())
            .or_default()
            .insert(host.to_string());
        self
    }

    pub fn with_config(mut self, cluster: &str, config_type: &str, key: &str, value: &str) -> Self {
        self.cluster_mut(cluster)
            .configurations
            .entry(config_type.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        self
    }
}

#[async_trait]
impl TopologyDirectory for ClusterSnapshot {
    async fn host_names_for_component(
        &self,
        cluster: &str,
        component: &str,
    ) -> Result<BTreeSet<String>, TopologyError> {
        Ok(self
            .clusters
            .get(cluster)
            .and_then(|c| c.components.get(component))
            .cloned()
            .unwrap_or_default())
    }

    async fn host(&self, cluster: &str, host: &str) -> Result<Host, TopologyError> {
        self.clusters
            .get(cluster)
            .and_then(|c| c.hosts.get(host))
            .cloned()
            .ok_or_else(|| TopologyError::HostNotFound {
                cluster: cluster.to_string(),
                host: host.to_string(),
            })
    }
}

#[async_trait]
impl ConfigurationStore for ClusterSnapshot {
    async fn config_value(
        &self,
        cluster: &str,
        config_type: &str,
        key: &str,
    ) -> Result<Option<String>, ConfigStoreError> {
        Ok(self
            .clusters
            .get(cluster)
            .and_then(|c| c.configurations.get(config_type))
            .and_then(|props| props.get(key))
            .cloned())
    }
}
