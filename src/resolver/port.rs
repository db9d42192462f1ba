//! JMX port resolution

use tracing::{debug, warn};

use super::lookup::{extract_host, extract_port, Lookups};
use super::protocol::JmxProtocol;
use super::rules::{ComponentRule, RuleTable};
use crate::error::{ResolveError, ResolveResult};

/// Resolves a component's JMX port from its configured keys and defaults
///
/// Order:
/// 1. `https` with an encrypted-port key: the configured encrypted port,
///    otherwise the static HTTPS default. The plaintext key is skipped so an
///    HTTPS fetch never lands on the plaintext listener.
/// 2. Otherwise the plaintext-port key.
/// 3. The static default port.
/// 4. [`ResolveError::PortResolution`].
pub(crate) struct PortResolver<'a> {
    lookups: &'a Lookups<'a>,
    rules: &'a RuleTable,
}

impl<'a> PortResolver<'a> {
    pub(crate) fn new(lookups: &'a Lookups<'a>, rules: &'a RuleTable) -> Self {
        Self { lookups, rules }
    }

    pub(crate) async fn port(
        &self,
        cluster: &str,
        component: &str,
        host: &str,
        protocol: JmxProtocol,
    ) -> ResolveResult<String> {
        let unresolved = || ResolveError::PortResolution {
            cluster: cluster.to_string(),
            component: component.to_string(),
            protocol,
        };

        let Some(rule) = self.rules.get(component) else {
            warn!(cluster, component, "No JMX rule for component");
            return Err(unresolved());
        };

        if protocol.is_https() {
            if let Some(key) = &rule.https_port_key {
                if let Some(port) = self.configured_port(cluster, rule, key, host).await? {
                    return Ok(port);
                }
                return static_default(rule, protocol).ok_or_else(unresolved);
            }
        }

        if let Some(key) = &rule.http_port_key {
            if let Some(port) = self.configured_port(cluster, rule, key, host).await? {
                return Ok(port);
            }
        }

        static_default(rule, protocol).ok_or_else(unresolved)
    }

    /// Port configured under `key`, preferring the nameservice-scoped value
    /// whose address points at `host`
    async fn configured_port(
        &self,
        cluster: &str,
        rule: &ComponentRule,
        key: &str,
        host: &str,
    ) -> ResolveResult<Option<String>> {
        if rule.nameservice_scoped {
            let scoped = self
                .lookups
                .nameservice_values(cluster, &rule.config_type, key)
                .await?;
            let on_host = scoped.iter().find(|v| {
                extract_host(v).is_some_and(|h| h.eq_ignore_ascii_case(host))
            });
            if let Some(port) = on_host.and_then(|v| extract_port(v)) {
                debug!(cluster, component = %rule.name, host, key, port = %port, "Resolved nameservice-scoped port");
                return Ok(Some(port));
            }
        }

        let Some(value) = self
            .lookups
            .config_value(cluster, &rule.config_type, key)
            .await?
        else {
            return Ok(None);
        };

        match extract_port(&value) {
            Some(port) => {
                debug!(cluster, component = %rule.name, key, port = %port, "Resolved configured port");
                Ok(Some(port))
            }
            None => {
                warn!(
                    cluster,
                    component = %rule.name,
                    key,
                    value = %value,
                    "Configured JMX address has no usable port, ignoring"
                );
                Ok(None)
            }
        }
    }
}

fn static_default(rule: &ComponentRule, protocol: JmxProtocol) -> Option<String> {
    let port = if protocol.is_https() {
        rule.default_https_port.as_ref().or(rule.default_port.as_ref())
    } else {
        rule.default_port.as_ref()
    };
    if let Some(port) = port {
        debug!(component = %rule.name, protocol = %protocol, port = %port, "Using static default port");
    }
    port.cloned()
}
