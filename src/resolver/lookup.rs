//! Bounded store lookups and address parsing shared by the resolver parts

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{ConfigStoreError, ResolveError, ResolveResult, TopologyError};
use crate::store::{ConfigurationStore, Host, TopologyDirectory};

/// Keys listing the HA nameservices, in lookup order
const NAMESERVICE_KEYS: &[&str] = &["dfs.internal.nameservices", "dfs.nameservices"];

/// `[scheme://][host:]port[/]`, host may be a bracketed IPv6 literal
static ADDRESS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:[A-Za-z][A-Za-z0-9+.\-]*://)?(?:(?P<host>\[[^\]]*\]|[^:/\s\[\]]*):)?(?P<port>\d{1,5})/?$",
    )
    .expect("address regex is valid")
});

/// Port carried by a configuration value such as `50070`, `0.0.0.0:50070`
/// or `https://nn1:50470`. `None` if the value holds no usable port.
pub fn extract_port(value: &str) -> Option<String> {
    let caps = ADDRESS_RE.captures(value.trim())?;
    let port: u16 = caps.name("port")?.as_str().parse().ok()?;
    (port != 0).then(|| port.to_string())
}

/// Host part of an address value, without IPv6 brackets
pub fn extract_host(value: &str) -> Option<String> {
    let caps = ADDRESS_RE.captures(value.trim())?;
    let host = caps
        .name("host")?
        .as_str()
        .trim_start_matches('[')
        .trim_end_matches(']');
    (!host.is_empty()).then(|| host.to_string())
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// Store handles plus the timeout budget of one resolver operation
#[derive(Clone)]
pub(crate) struct Stores {
    topology: Arc<dyn TopologyDirectory>,
    config: Arc<dyn ConfigurationStore>,
    timeout: Option<Duration>,
}

impl Stores {
    pub(crate) fn new(
        topology: Arc<dyn TopologyDirectory>,
        config: Arc<dyn ConfigurationStore>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            topology,
            config,
            timeout,
        }
    }

    pub(crate) fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    /// Start an operation; every lookup made through the returned view
    /// shares one deadline
    pub(crate) fn lookups(&self) -> Lookups<'_> {
        Lookups {
            stores: self,
            deadline: self.timeout.map(|t| Instant::now() + t),
        }
    }
}

/// Store lookups bounded by a single operation deadline
pub(crate) struct Lookups<'a> {
    stores: &'a Stores,
    deadline: Option<Instant>,
}

impl Lookups<'_> {
    fn budget_ms(&self) -> u64 {
        self.stores
            .timeout
            .map(|t| t.as_millis() as u64)
            .unwrap_or_default()
    }

    /// Await `fut`, giving up once the operation deadline has passed
    async fn bounded<T, F>(
        &self,
        fut: F,
        on_timeout: impl FnOnce(u64) -> ResolveError,
    ) -> ResolveResult<T>
    where
        F: Future<Output = T>,
    {
        match self.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, fut)
                .await
                .map_err(|_| on_timeout(self.budget_ms())),
            None => Ok(fut.await),
        }
    }

    fn topology_timeout(cluster: &str) -> impl FnOnce(u64) -> ResolveError + '_ {
        move |ms| ResolveError::from_topology(cluster, TopologyError::Timeout { timeout_ms: Some(ms) })
    }

    pub(crate) async fn host_names_for_component(
        &self,
        cluster: &str,
        component: &str,
    ) -> ResolveResult<BTreeSet<String>> {
        self.bounded(
            self.stores.topology.host_names_for_component(cluster, component),
            Self::topology_timeout(cluster),
        )
        .await?
        .map_err(|e| ResolveError::from_topology(cluster, e))
    }

    pub(crate) async fn host(&self, cluster: &str, host: &str) -> ResolveResult<Host> {
        self.bounded(self.stores.topology.host(cluster, host), Self::topology_timeout(cluster))
            .await?
            .map_err(|e| ResolveError::from_topology(cluster, e))
    }

    pub(crate) async fn public_host_name(&self, cluster: &str, host: &str) -> ResolveResult<String> {
        self.bounded(
            self.stores.topology.public_host_name(cluster, host),
            Self::topology_timeout(cluster),
        )
        .await?
        .map_err(|e| ResolveError::from_topology(cluster, e))
    }

    /// Trimmed configuration value; blank values count as absent
    pub(crate) async fn config_value(
        &self,
        cluster: &str,
        config_type: &str,
        key: &str,
    ) -> ResolveResult<Option<String>> {
        let value = self
            .bounded(self.stores.config.config_value(cluster, config_type, key), |ms| {
                ResolveError::from_config(cluster, ConfigStoreError::Timeout { timeout_ms: Some(ms) })
            })
            .await?
            .map_err(|e| ResolveError::from_config(cluster, e))?;

        Ok(value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty()))
    }

    /// Values of `key` qualified per nameservice (`key.ns`) and per HA
    /// NameNode (`key.ns.nn`). Empty when no nameservice is configured.
    pub(crate) async fn nameservice_values(
        &self,
        cluster: &str,
        config_type: &str,
        key: &str,
    ) -> ResolveResult<Vec<String>> {
        let mut services = None;
        for ns_key in NAMESERVICE_KEYS {
            services = self.config_value(cluster, config_type, ns_key).await?;
            if services.is_some() {
                break;
            }
        }
        let Some(services) = services else {
            return Ok(Vec::new());
        };

        let mut values = Vec::new();
        for ns in split_list(&services) {
            let ids_key = format!("dfs.ha.namenodes.{}", ns);
            match self.config_value(cluster, config_type, &ids_key).await? {
                Some(ids) => {
                    for nn in split_list(&ids) {
                        let scoped = format!("{}.{}.{}", key, ns, nn);
                        if let Some(v) = self.config_value(cluster, config_type, &scoped).await? {
                            values.push(v);
                        }
                    }
                }
                None => {
                    let scoped = format!("{}.{}", key, ns);
                    if let Some(v) = self.config_value(cluster, config_type, &scoped).await? {
                        values.push(v);
                    }
                }
            }
        }

        Ok(values)
    }
}
