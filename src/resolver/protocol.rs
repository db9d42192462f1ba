//! JMX protocol selection (plaintext vs encrypted)

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, warn};

use super::lookup::Lookups;
use super::rules::RuleTable;

/// Protocol a component's JMX listener is served over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum JmxProtocol {
    /// Plaintext HTTP
    #[default]
    Http,
    /// HTTP over TLS
    Https,
}

impl JmxProtocol {
    /// Returns `"http"` or `"https"`
    pub fn as_str(&self) -> &'static str {
        match self {
            JmxProtocol::Http => "http",
            JmxProtocol::Https => "https",
        }
    }

    /// Protocol implied by a caller-supplied `https_enabled` flag
    pub fn from_https_enabled(https_enabled: bool) -> Self {
        if https_enabled {
            JmxProtocol::Https
        } else {
            JmxProtocol::Http
        }
    }

    pub fn is_https(&self) -> bool {
        matches!(self, JmxProtocol::Https)
    }
}

impl Serialize for JmxProtocol {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for JmxProtocol {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.to_lowercase().as_str() {
            "http" => Ok(JmxProtocol::Http),
            "https" => Ok(JmxProtocol::Https),
            other => Err(serde::de::Error::custom(format!(
                "unknown JMX protocol '{}', expected one of: http, https",
                other
            ))),
        }
    }
}

impl std::fmt::Display for JmxProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Decides the JMX protocol from each component's security-mode key
///
/// Never fails: unknown components, components without an HTTPS-capable
/// listener, unset keys and store failures all yield [`JmxProtocol::Http`].
pub(crate) struct ProtocolSelector<'a> {
    lookups: &'a Lookups<'a>,
    rules: &'a RuleTable,
}

impl<'a> ProtocolSelector<'a> {
    pub(crate) fn new(lookups: &'a Lookups<'a>, rules: &'a RuleTable) -> Self {
        Self { lookups, rules }
    }

    pub(crate) async fn protocol(&self, cluster: &str, component: &str) -> JmxProtocol {
        let Some(rule) = self.rules.get(component) else {
            debug!(cluster, component, "No rule for component, using http");
            return JmxProtocol::Http;
        };
        let (Some(switch), Some(config_type)) = (&rule.protocol, rule.protocol_config_type()) else {
            return JmxProtocol::Http;
        };

        match self.lookups.config_value(cluster, config_type, &switch.key).await {
            Ok(Some(value)) => {
                let https = switch
                    .https_values
                    .iter()
                    .any(|v| v.eq_ignore_ascii_case(&value));
                debug!(cluster, component, key = %switch.key, value = %value, https, "Security mode resolved");
                JmxProtocol::from_https_enabled(https)
            }
            Ok(None) => JmxProtocol::Http,
            Err(e) => {
                warn!(cluster, component, key = %switch.key, error = %e, "Security mode lookup failed, using http");
                JmxProtocol::Http
            }
        }
    }
}
