//! Per-component JMX lookup rules
//!
//! Each component maps to a [`ComponentRule`]: which configuration type holds
//! its settings, the plaintext/encrypted port keys, static default ports, the
//! security-mode key that switches the JMX listener to HTTPS, and the RPC
//! tag table. The built-in table covers the Hadoop stack; configuration files
//! may extend or override it.
//!
//! # Example Configuration (YAML)
//!
//! ```yaml
//! components:
//!   - name: KAFKA_BROKER
//!     config_type: kafka-broker
//!     http_port_key: jmx.port
//!     default_port: "9999"
//! ```

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur while building a rule table
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    /// Component name is empty
    #[error("Component rule at index {index} has an empty name")]
    EmptyName { index: usize },

    /// A configured key is empty
    #[error("Component '{component}' has an empty {field}")]
    EmptyKey { component: String, field: String },

    /// Static default port is not a valid port number
    #[error("Component '{component}' has invalid default port '{port}'")]
    InvalidDefaultPort { component: String, port: String },
}

/// Result type for rule operations
pub type RuleResult<T> = Result<T, RuleError>;

/// Security-mode switch for a component's JMX listener
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolRule {
    /// Configuration type holding the key; defaults to the component's own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_type: Option<String>,

    /// Security-mode key (e.g. `dfs.http.policy`)
    pub key: String,

    /// Values meaning "serve JMX over HTTPS" (case-insensitive)
    #[serde(default = "default_https_values")]
    pub https_values: Vec<String>,
}

/// Maps a port configuration key to the RPC tag reported for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcTagRule {
    pub tag: String,
    pub key: String,
}

/// Lookup rule for one component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentRule {
    /// Component name (e.g. `NAMENODE`); matched case-insensitively
    pub name: String,

    /// Configuration type holding the port keys (e.g. `hdfs-site`)
    pub config_type: String,

    /// Plaintext JMX port key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_port_key: Option<String>,

    /// Encrypted JMX port key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub https_port_key: Option<String>,

    /// Static default port when nothing is configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_port: Option<String>,

    /// Static default port for HTTPS; falls back to `default_port`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_https_port: Option<String>,

    /// HTTPS switch; `None` means the component only serves plaintext JMX
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<ProtocolRule>,

    /// Ordered RPC tag table; first matching port wins
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rpc_tags: Vec<RpcTagRule>,

    /// Port keys may be qualified per HA nameservice and NameNode id
    #[serde(default)]
    pub nameservice_scoped: bool,
}

fn default_https_values() -> Vec<String> {
    vec!["HTTPS_ONLY".to_string()]
}

impl ComponentRule {
    /// New rule with no keys, defaults or tags
    pub fn new(name: &str, config_type: &str) -> Self {
        Self {
            name: name.to_ascii_uppercase(),
            config_type: config_type.to_string(),
            http_port_key: None,
            https_port_key: None,
            default_port: None,
            default_https_port: None,
            protocol: None,
            rpc_tags: Vec::new(),
            nameservice_scoped: false,
        }
    }

    pub fn with_http_port_key(mut self, key: &str) -> Self {
        self.http_port_key = Some(key.to_string());
        self
    }

    pub fn with_https_port_key(mut self, key: &str) -> Self {
        self.https_port_key = Some(key.to_string());
        self
    }

    pub fn with_default_port(mut self, port: &str) -> Self {
        self.default_port = Some(port.to_string());
        self
    }

    pub fn with_default_https_port(mut self, port: &str) -> Self {
        self.default_https_port = Some(port.to_string());
        self
    }

    /// HTTPS switch read from the component's own configuration type
    pub fn with_protocol_key(mut self, key: &str, https_values: &[&str]) -> Self {
        self.protocol = Some(ProtocolRule {
            config_type: None,
            key: key.to_string(),
            https_values: https_values.iter().map(|v| v.to_string()).collect(),
        });
        self
    }

    pub fn with_rpc_tag(mut self, tag: &str, key: &str) -> Self {
        self.rpc_tags.push(RpcTagRule {
            tag: tag.to_string(),
            key: key.to_string(),
        });
        self
    }

    pub fn with_nameservice_scope(mut self) -> Self {
        self.nameservice_scoped = true;
        self
    }

    /// Whether the component can serve JMX over HTTPS at all
    pub fn https_capable(&self) -> bool {
        self.protocol.is_some()
    }

    /// Configuration type holding the security-mode key
    pub fn protocol_config_type(&self) -> Option<&str> {
        self.protocol
            .as_ref()
            .map(|p| p.config_type.as_deref().unwrap_or(&self.config_type))
    }

    fn validate(&self, index: usize) -> RuleResult<()> {
        if self.name.trim().is_empty() {
            return Err(RuleError::EmptyName { index });
        }

        let empty_key = |field: &str| RuleError::EmptyKey {
            component: self.name.clone(),
            field: field.to_string(),
        };

        if self.config_type.trim().is_empty() {
            return Err(empty_key("config_type"));
        }
        if self.http_port_key.as_deref().is_some_and(|k| k.trim().is_empty()) {
            return Err(empty_key("http_port_key"));
        }
        if self.https_port_key.as_deref().is_some_and(|k| k.trim().is_empty()) {
            return Err(empty_key("https_port_key"));
        }
        if let Some(protocol) = &self.protocol {
            if protocol.key.trim().is_empty() {
                return Err(empty_key("protocol key"));
            }
        }
        for tag in &self.rpc_tags {
            if tag.tag.trim().is_empty() || tag.key.trim().is_empty() {
                return Err(empty_key("rpc tag"));
            }
        }

        for port in [&self.default_port, &self.default_https_port]
            .into_iter()
            .flatten()
        {
            if port.parse::<u16>().map(|p| p == 0).unwrap_or(true) {
                return Err(RuleError::InvalidDefaultPort {
                    component: self.name.clone(),
                    port: port.clone(),
                });
            }
        }

        Ok(())
    }
}

/// Component name → rule
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: HashMap<String, ComponentRule>,
}

static BUILTIN: Lazy<RuleTable> = Lazy::new(|| RuleTable {
    rules: builtin_rules()
        .into_iter()
        .map(|r| (r.name.clone(), r))
        .collect(),
});

impl RuleTable {
    /// Empty table; every component is unknown
    pub fn empty() -> Self {
        Self::default()
    }

    /// Built-in Hadoop-stack rules, initialized once per process
    pub fn builtin() -> &'static RuleTable {
        &BUILTIN
    }

    /// Build a table from rules, validating each one
    pub fn from_rules(rules: Vec<ComponentRule>) -> RuleResult<Self> {
        Self::empty().with_overrides(rules)
    }

    /// Built-in rules extended (or replaced per component) by `overrides`
    pub fn builtin_with(overrides: Vec<ComponentRule>) -> RuleResult<Self> {
        Self::builtin().clone().with_overrides(overrides)
    }

    fn with_overrides(mut self, overrides: Vec<ComponentRule>) -> RuleResult<Self> {
        for (index, mut rule) in overrides.into_iter().enumerate() {
            rule.validate(index)?;
            rule.name = rule.name.to_ascii_uppercase();
            if self.rules.contains_key(&rule.name) {
                tracing::debug!(component = %rule.name, "Overriding component rule");
            }
            self.rules.insert(rule.name.clone(), rule);
        }
        Ok(self)
    }

    /// Rule for `component`, if any
    pub fn get(&self, component: &str) -> Option<&ComponentRule> {
        self.rules
            .get(component)
            .or_else(|| self.rules.get(&component.to_ascii_uppercase()))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Component names, sorted
    pub fn components(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.rules.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

fn builtin_rules() -> Vec<ComponentRule> {
    const HTTPS_ONLY: &[&str] = &["HTTPS_ONLY"];

    vec![
        ComponentRule::new("NAMENODE", "hdfs-site")
            .with_http_port_key("dfs.namenode.http-address")
            .with_https_port_key("dfs.namenode.https-address")
            .with_default_port("50070")
            .with_default_https_port("50470")
            .with_protocol_key("dfs.http.policy", HTTPS_ONLY)
            .with_rpc_tag("client", "dfs.namenode.rpc-address")
            .with_rpc_tag("datanode", "dfs.namenode.servicerpc-address")
            .with_rpc_tag("healthcheck", "dfs.namenode.lifeline.rpc-address")
            // web port, for clusters that publish JMX on the plaintext listener only
            .with_rpc_tag("client", "dfs.namenode.http-address")
            .with_nameservice_scope(),
        ComponentRule::new("DATANODE", "hdfs-site")
            .with_http_port_key("dfs.datanode.http.address")
            .with_https_port_key("dfs.datanode.https.address")
            .with_default_port("50075")
            .with_default_https_port("50475")
            .with_protocol_key("dfs.http.policy", HTTPS_ONLY),
        ComponentRule::new("JOURNALNODE", "hdfs-site")
            .with_http_port_key("dfs.journalnode.http-address")
            .with_https_port_key("dfs.journalnode.https-address")
            .with_default_port("8480")
            .with_default_https_port("8481")
            .with_protocol_key("dfs.http.policy", HTTPS_ONLY),
        ComponentRule::new("RESOURCEMANAGER", "yarn-site")
            .with_http_port_key("yarn.resourcemanager.webapp.address")
            .with_https_port_key("yarn.resourcemanager.webapp.https.address")
            .with_default_port("8088")
            .with_default_https_port("8090")
            .with_protocol_key("yarn.http.policy", HTTPS_ONLY),
        ComponentRule::new("NODEMANAGER", "yarn-site")
            .with_http_port_key("yarn.nodemanager.webapp.address")
            .with_https_port_key("yarn.nodemanager.webapp.https.address")
            .with_default_port("8042")
            .with_default_https_port("8044")
            .with_protocol_key("yarn.http.policy", HTTPS_ONLY),
        ComponentRule::new("APP_TIMELINE_SERVER", "yarn-site")
            .with_http_port_key("yarn.timeline-service.webapp.address")
            .with_https_port_key("yarn.timeline-service.webapp.https.address")
            .with_default_port("8188")
            .with_default_https_port("8190")
            .with_protocol_key("yarn.http.policy", HTTPS_ONLY),
        ComponentRule::new("HISTORYSERVER", "mapred-site")
            .with_http_port_key("mapreduce.jobhistory.webapp.address")
            .with_https_port_key("mapreduce.jobhistory.webapp.https.address")
            .with_default_port("19888")
            .with_default_https_port("19890")
            .with_protocol_key("mapreduce.jobhistory.http.policy", HTTPS_ONLY),
        // HBase serves HTTPS on the same info port when SSL is on
        ComponentRule::new("HBASE_MASTER", "hbase-site")
            .with_http_port_key("hbase.master.info.port")
            .with_default_port("16010")
            .with_protocol_key("hbase.ssl.enabled", &["true"]),
        ComponentRule::new("HBASE_REGIONSERVER", "hbase-site")
            .with_http_port_key("hbase.regionserver.info.port")
            .with_default_port("16030")
            .with_protocol_key("hbase.ssl.enabled", &["true"]),
        ComponentRule::new("JOBTRACKER", "mapred-site")
            .with_http_port_key("mapred.job.tracker.http.address")
            .with_default_port("50030"),
        ComponentRule::new("TASKTRACKER", "mapred-site")
            .with_http_port_key("mapred.task.tracker.http.address")
            .with_default_port("50060"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_contains_hadoop_components() {
        let table = RuleTable::builtin();
        assert_eq!(table.len(), 11);

        let nn = table.get("NAMENODE").unwrap();
        assert_eq!(nn.config_type, "hdfs-site");
        assert_eq!(nn.default_port.as_deref(), Some("50070"));
        assert!(nn.https_capable());
        assert!(nn.nameservice_scoped);
        assert_eq!(nn.rpc_tags.len(), 4);
        assert_eq!(nn.rpc_tags[0].tag, "client");
        // RPC listeners are matched before the web port
        assert_eq!(nn.rpc_tags[3].key, "dfs.namenode.http-address");

        let jt = table.get("JOBTRACKER").unwrap();
        assert!(!jt.https_capable());
        assert_eq!(jt.protocol_config_type(), None);
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let table = RuleTable::builtin();
        assert!(table.get("namenode").is_some());
        assert!(table.get("HBase_Master").is_some());
        assert!(table.get("UNKNOWN").is_none());
    }

    #[test]
    fn test_protocol_config_type_defaults_to_component() {
        let rule = ComponentRule::new("X", "x-site").with_protocol_key("x.ssl", &["true"]);
        assert_eq!(rule.protocol_config_type(), Some("x-site"));

        let mut rule = rule;
        rule.protocol.as_mut().unwrap().config_type = Some("core-site".to_string());
        assert_eq!(rule.protocol_config_type(), Some("core-site"));
    }

    #[test]
    fn test_overrides_replace_and_extend() {
        let table = RuleTable::builtin_with(vec![
            ComponentRule::new("namenode", "hdfs-site").with_default_port("9870"),
            ComponentRule::new("KAFKA_BROKER", "kafka-broker").with_default_port("9999"),
        ])
        .unwrap();

        assert_eq!(table.len(), 12);
        assert_eq!(
            table.get("NAMENODE").unwrap().default_port.as_deref(),
            Some("9870")
        );
        assert!(table.get("KAFKA_BROKER").is_some());
        // builtin stays untouched
        assert_eq!(
            RuleTable::builtin().get("NAMENODE").unwrap().default_port.as_deref(),
            Some("50070")
        );
    }

    #[test]
    fn test_validation_rejects_bad_rules() {
        let err = RuleTable::from_rules(vec![ComponentRule::new("", "x-site")]).unwrap_err();
        assert_eq!(err, RuleError::EmptyName { index: 0 });

        let err = RuleTable::from_rules(vec![ComponentRule::new("X", "x-site").with_http_port_key(" ")])
            .unwrap_err();
        assert!(matches!(err, RuleError::EmptyKey { .. }));

        for bad in ["abc", "0", "70000"] {
            let err = RuleTable::from_rules(vec![ComponentRule::new("X", "x-site").with_default_port(bad)])
                .unwrap_err();
            assert!(matches!(err, RuleError::InvalidDefaultPort { .. }));
        }
    }

    #[test]
    fn test_rule_deserialize_from_yaml() {
        let yaml = r#"
name: kafka_broker
config_type: kafka-broker
http_port_key: jmx.port
default_port: "9999"
protocol:
  key: ssl.enabled
rpc_tags:
  - tag: client
    key: listener.port
"#;
        let rule: ComponentRule = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(rule.protocol.as_ref().unwrap().https_values, vec!["HTTPS_ONLY"]);
        assert!(!rule.nameservice_scoped);

        let table = RuleTable::from_rules(vec![rule]).unwrap();
        assert_eq!(table.components(), vec!["KAFKA_BROKER"]);
    }
}
