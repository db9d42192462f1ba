//! RPC metric tag mapping

use tracing::{debug, warn};

use super::lookup::{extract_port, Lookups};
use super::rules::{ComponentRule, RuleTable};
use crate::error::ResolveResult;

/// Tag used when no configured RPC port matches
pub const DEFAULT_RPC_TAG: &str = "default";

/// Maps a port back to the RPC listener it belongs to (client, healthcheck, ...)
///
/// Never fails; anything unmatched gets the default tag.
pub(crate) struct TagMapper<'a> {
    lookups: &'a Lookups<'a>,
    rules: &'a RuleTable,
    default_tag: &'a str,
}

impl<'a> TagMapper<'a> {
    pub(crate) fn new(lookups: &'a Lookups<'a>, rules: &'a RuleTable, default_tag: &'a str) -> Self {
        Self {
            lookups,
            rules,
            default_tag,
        }
    }

    pub(crate) async fn rpc_tag(&self, cluster: &str, component: &str, port: &str) -> String {
        let (Some(wanted), Some(rule)) = (extract_port(port), self.rules.get(component)) else {
            return self.default_tag.to_string();
        };

        for tag in &rule.rpc_tags {
            match self.configured_ports(cluster, rule, &tag.key).await {
                Ok(ports) if ports.contains(&wanted) => {
                    debug!(cluster, component, port = %wanted, tag = %tag.tag, "Matched RPC tag");
                    return tag.tag.clone();
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(cluster, component, key = %tag.key, error = %e, "RPC port lookup failed, skipping tag");
                }
            }
        }

        self.default_tag.to_string()
    }

    async fn configured_ports(
        &self,
        cluster: &str,
        rule: &ComponentRule,
        key: &str,
    ) -> ResolveResult<Vec<String>> {
        let mut values = Vec::new();
        if let Some(value) = self
            .lookups
            .config_value(cluster, &rule.config_type, key)
            .await?
        {
            values.push(value);
        }
        if rule.nameservice_scoped {
            values.extend(
                self.lookups
                    .nameservice_values(cluster, &rule.config_type, key)
                    .await?,
            );
        }

        Ok(values.iter().filter_map(|v| extract_port(v)).collect())
    }
}
