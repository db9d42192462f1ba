//! Configuration management for rJMX-Locator
//!
//! Handles loading and validating configuration from YAML files.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::resolver::{ComponentRule, RuleError, RuleTable, DEFAULT_JMX_PATH, DEFAULT_RPC_TAG};

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Error reading the configuration file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Error parsing the configuration file
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Configuration validation error
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// Invalid component rule
    #[error("Invalid component rule: {0}")]
    Rule(#[from] RuleError),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Resolver behaviour
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Ambari REST adapter, if topology/configuration come from Ambari
    #[serde(default)]
    pub ambari: Option<AmbariConfig>,

    /// Component rules extending or overriding the built-in table
    #[serde(default)]
    pub components: Vec<ComponentRule>,
}

/// Resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Time budget in milliseconds for the store lookups of one resolver operation
    #[serde(default = "default_timeout")]
    pub lookup_timeout_ms: u64,

    /// Tag reported when no RPC port matches
    #[serde(default = "default_rpc_tag")]
    pub default_rpc_tag: String,

    /// JMX servlet path used when building endpoint URLs
    #[serde(default = "default_jmx_path")]
    pub jmx_path: String,
}

/// Ambari REST API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmbariConfig {
    /// Ambari server URL
    #[serde(default = "default_ambari_url")]
    pub url: String,

    /// Optional username for basic auth
    pub username: Option<String>,

    /// Optional password for basic auth
    pub password: Option<String>,

    /// Request timeout in milliseconds
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
}

// Default value functions
fn default_timeout() -> u64 {
    5000
}

fn default_rpc_tag() -> String {
    DEFAULT_RPC_TAG.to_string()
}

fn default_jmx_path() -> String {
    DEFAULT_JMX_PATH.to_string()
}

fn default_ambari_url() -> String {
    "http://localhost:8080".to_string()
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            lookup_timeout_ms: default_timeout(),
            default_rpc_tag: default_rpc_tag(),
            jmx_path: default_jmx_path(),
        }
    }
}

impl Default for AmbariConfig {
    fn default() -> Self {
        Self {
            url: default_ambari_url(),
            username: None,
            password: None,
            timeout_ms: default_timeout(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated
    ///
    /// # Note
    /// - If the file doesn't exist, returns `ConfigError::ReadError`
    /// - Use `Config::load_or_default()` if you want fallback to defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Parse and validate configuration from a YAML string
    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file, falling back to defaults if not found
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file not found, using defaults"
            );
            return Ok(Self::default());
        }

        Self::load(path)
    }

    /// Built-in rules with this configuration's components applied
    pub fn rule_table(&self) -> Result<RuleTable, ConfigError> {
        Ok(RuleTable::builtin_with(self.components.clone())?)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resolver.lookup_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "Lookup timeout must be greater than 0".to_string(),
            ));
        }

        if self.resolver.default_rpc_tag.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "Default RPC tag must not be empty".to_string(),
            ));
        }

        if !self.resolver.jmx_path.starts_with('/') {
            return Err(ConfigError::ValidationError(
                "JMX path must start with '/'".to_string(),
            ));
        }

        if let Some(ambari) = &self.ambari {
            url::Url::parse(&ambari.url).map_err(|e| {
                ConfigError::ValidationError(format!("Invalid Ambari URL '{}': {}", ambari.url, e))
            })?;

            if ambari.timeout_ms == 0 {
                return Err(ConfigError::ValidationError(
                    "Ambari timeout must be greater than 0".to_string(),
                ));
            }

            if ambari.username.is_some() != ambari.password.is_some() {
                return Err(ConfigError::ValidationError(
                    "Ambari username and password must be set together".to_string(),
                ));
            }
        }

        self.rule_table()?;

        Ok(())
    }
}
