//! JMX endpoint resolution
//!
//! [`EndpointResolver`] answers "where is the JMX endpoint of component C in
//! cluster X on host H" by combining the topology directory, the
//! configuration store and the per-component [`RuleTable`].
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use rjmx_locator::resolver::{EndpointQuery, EndpointResolver};
//!
//! let resolver = EndpointResolver::new(topology, config_store);
//! let port = resolver.port("c1", "NAMENODE", "h1", None).await?;
//! let endpoints = resolver.resolve(&EndpointQuery::new("c1", "DATANODE")).await?;
//! ```

mod lookup;
mod port;
mod protocol;
pub mod rules;
mod tag;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use crate::config::{Config, ConfigError};
use crate::error::ResolveResult;
use crate::store::{ConfigurationStore, Host, TopologyDirectory};

use lookup::{Lookups, Stores};
use port::PortResolver;
use protocol::ProtocolSelector;
use tag::TagMapper;

pub use lookup::{extract_host, extract_port};
pub use protocol::JmxProtocol;
pub use rules::{ComponentRule, ProtocolRule, RpcTagRule, RuleError, RuleTable};
pub use tag::DEFAULT_RPC_TAG;

/// Default lookup budget of one resolver operation
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_millis(5000);

/// Default JMX servlet path
pub const DEFAULT_JMX_PATH: &str = "/jmx";

/// One resolution request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointQuery {
    pub cluster_name: String,
    pub component_name: String,
    /// Resolve for this host only; `None` resolves every host running the component
    #[serde(default)]
    pub host_name: Option<String>,
    /// Protocol override; `None` derives it from the cluster security mode
    #[serde(default)]
    pub https_enabled: Option<bool>,
}

impl EndpointQuery {
    pub fn new(cluster_name: &str, component_name: &str) -> Self {
        Self {
            cluster_name: cluster_name.to_string(),
            component_name: component_name.to_string(),
            host_name: None,
            https_enabled: None,
        }
    }

    pub fn with_host(mut self, host_name: &str) -> Self {
        self.host_name = Some(host_name.to_string());
        self
    }

    pub fn with_https(mut self, https_enabled: bool) -> Self {
        self.https_enabled = Some(https_enabled);
        self
    }
}

/// Where to fetch a component instance's JMX data, and how to label it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedEndpoint {
    pub host_name: String,
    pub public_host_name: String,
    pub port: String,
    pub protocol: JmxProtocol,
    pub rpc_tag: String,
    pub jmx_path: String,
}

impl ResolvedEndpoint {
    /// `<protocol>://<public host>:<port><jmx path>`
    pub fn url(&self) -> Result<Url, url::ParseError> {
        let host = if self.public_host_name.contains(':') && !self.public_host_name.starts_with('[') {
            format!("[{}]", self.public_host_name)
        } else {
            self.public_host_name.clone()
        };
        Url::parse(&format!(
            "{}://{}:{}{}",
            self.protocol, host, self.port, self.jmx_path
        ))
    }
}

/// Resolves JMX endpoints; cheap to share, holds no mutable state
#[derive(Clone)]
pub struct EndpointResolver {
    stores: Stores,
    rules: Arc<RuleTable>,
    default_rpc_tag: String,
    jmx_path: String,
}

impl EndpointResolver {
    /// Resolver over the built-in rule table with default settings
    pub fn new(topology: Arc<dyn TopologyDirectory>, config: Arc<dyn ConfigurationStore>) -> Self {
        Self {
            stores: Stores::new(topology, config, Some(DEFAULT_LOOKUP_TIMEOUT)),
            rules: Arc::new(RuleTable::builtin().clone()),
            default_rpc_tag: DEFAULT_RPC_TAG.to_string(),
            jmx_path: DEFAULT_JMX_PATH.to_string(),
        }
    }

    /// Resolver configured from a loaded [`Config`]
    ///
    /// # Errors
    /// Returns an error if the configuration or its component rules are invalid
    pub fn from_config(
        config: &Config,
        topology: Arc<dyn TopologyDirectory>,
        store: Arc<dyn ConfigurationStore>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let rules = config.rule_table()?;

        Ok(Self::new(topology, store)
            .with_rules(rules)
            .with_lookup_timeout(Some(Duration::from_millis(config.resolver.lookup_timeout_ms)))
            .with_default_rpc_tag(&config.resolver.default_rpc_tag)
            .with_jmx_path(&config.resolver.jmx_path))
    }

    pub fn with_rules(mut self, rules: RuleTable) -> Self {
        self.rules = Arc::new(rules);
        self
    }

    /// Time budget shared by all store lookups of one operation; `None`
    /// waits on the stores indefinitely
    pub fn with_lookup_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.stores.set_timeout(timeout);
        self
    }

    pub fn with_default_rpc_tag(mut self, tag: &str) -> Self {
        self.default_rpc_tag = tag.to_string();
        self
    }

    pub fn with_jmx_path(mut self, path: &str) -> Self {
        self.jmx_path = path.to_string();
        self
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    fn protocols<'a>(&'a self, lookups: &'a Lookups<'a>) -> ProtocolSelector<'a> {
        ProtocolSelector::new(lookups, &self.rules)
    }

    fn ports<'a>(&'a self, lookups: &'a Lookups<'a>) -> PortResolver<'a> {
        PortResolver::new(lookups, &self.rules)
    }

    fn tags<'a>(&'a self, lookups: &'a Lookups<'a>) -> TagMapper<'a> {
        TagMapper::new(lookups, &self.rules, &self.default_rpc_tag)
    }

    /// Public host name of `host`
    ///
    /// # Errors
    /// `HostNotFound` if the host is unknown in `cluster`
    #[instrument(skip(self))]
    pub async fn public_host_name(&self, cluster: &str, host: &str) -> ResolveResult<String> {
        self.stores.lookups().public_host_name(cluster, host).await
    }

    /// Hosts running `component`. An empty set means "not running", never an error.
    #[instrument(skip(self))]
    pub async fn host_names(&self, cluster: &str, component: &str) -> ResolveResult<BTreeSet<String>> {
        let hosts = self
            .stores
            .lookups()
            .host_names_for_component(cluster, component)
            .await?;
        if hosts.is_empty() {
            debug!("Component is not deployed on any host");
        }
        Ok(hosts)
    }

    /// Host record of `host`
    ///
    /// # Errors
    /// `HostNotFound` if the host is unknown in `cluster`
    #[instrument(skip(self))]
    pub async fn host(&self, cluster: &str, host: &str) -> ResolveResult<Host> {
        self.stores.lookups().host(cluster, host).await
    }

    /// JMX port of `component` on `host`
    ///
    /// `https_enabled` overrides the protocol; `None` derives it from the
    /// cluster security mode.
    ///
    /// # Errors
    /// `PortResolution` if neither a configured key nor a static default
    /// exists, or a lookup timeout
    #[instrument(skip(self))]
    pub async fn port(
        &self,
        cluster: &str,
        component: &str,
        host: &str,
        https_enabled: Option<bool>,
    ) -> ResolveResult<String> {
        let lookups = self.stores.lookups();
        let protocol = match https_enabled {
            Some(flag) => JmxProtocol::from_https_enabled(flag),
            None => self.protocols(&lookups).protocol(cluster, component).await,
        };
        self.ports(&lookups).port(cluster, component, host, protocol).await
    }

    /// JMX protocol of `component`; defaults to http
    #[instrument(skip(self))]
    pub async fn jmx_protocol(&self, cluster: &str, component: &str) -> JmxProtocol {
        let lookups = self.stores.lookups();
        self.protocols(&lookups).protocol(cluster, component).await
    }

    /// RPC tag of the listener on `port`; defaults to the generic tag
    #[instrument(skip(self))]
    pub async fn jmx_rpc_metric_tag(&self, cluster: &str, component: &str, port: &str) -> String {
        let lookups = self.stores.lookups();
        self.tags(&lookups).rpc_tag(cluster, component, port).await
    }

    /// Full endpoints for a query, one per host, sorted by host name
    ///
    /// Empty when the component is not deployed and no host was named.
    ///
    /// # Errors
    /// `HostNotFound` for an unknown named host, `PortResolution`, or lookup timeouts
    #[instrument(skip(self, query), fields(cluster = %query.cluster_name, component = %query.component_name))]
    pub async fn resolve(&self, query: &EndpointQuery) -> ResolveResult<Vec<ResolvedEndpoint>> {
        let cluster = query.cluster_name.as_str();
        let component = query.component_name.as_str();
        let lookups = self.stores.lookups();

        let hosts: Vec<String> = match &query.host_name {
            Some(host) => vec![host.clone()],
            None => lookups
                .host_names_for_component(cluster, component)
                .await?
                .into_iter()
                .collect(),
        };
        if hosts.is_empty() {
            return Ok(Vec::new());
        }

        let protocol = match query.https_enabled {
            Some(flag) => JmxProtocol::from_https_enabled(flag),
            None => self.protocols(&lookups).protocol(cluster, component).await,
        };

        let mut endpoints = Vec::with_capacity(hosts.len());
        for host_name in hosts {
            let host = lookups.host(cluster, &host_name).await?;
            let port = self
                .ports(&lookups)
                .port(cluster, component, &host_name, protocol)
                .await?;
            let rpc_tag = self.tags(&lookups).rpc_tag(cluster, component, &port).await;

            endpoints.push(ResolvedEndpoint {
                host_name: host.host_name,
                public_host_name: host.public_host_name,
                port,
                protocol,
                rpc_tag,
                jmx_path: self.jmx_path.clone(),
            });
        }

        debug!(count = endpoints.len(), "Resolved JMX endpoints");
        Ok(endpoints)
    }
}
