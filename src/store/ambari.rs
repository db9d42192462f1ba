//! Ambari REST API 어댑터
//!
//! Ambari 서버의 `/api/v1/clusters` API로 토폴로지와 설정을 조회합니다.
//! Configuration lookups cost two requests (desired tag, then the tagged
//! property set); wrap the client in a
//! [`CachedConfigurationStore`](super::CachedConfigurationStore) for hot paths.

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use super::{ConfigurationStore, Host, TopologyDirectory};
use crate::config::AmbariConfig;
use crate::error::{ConfigStoreError, TopologyError};

/// Ambari 클라이언트 에러
#[derive(Error, Debug)]
pub enum AmbariError {
    /// HTTP 클라이언트 초기화 실패
    #[error("Failed to initialize HTTP client: {0}")]
    HttpClientInit(#[source] reqwest::Error),

    /// 잘못된 서버 URL
    #[error("Invalid Ambari URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// HTTP 요청 실패
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[source] reqwest::Error),

    /// HTTP 상태 코드 에러
    #[error("HTTP error status: {0}")]
    HttpStatus(u16),

    /// JSON 파싱 에러
    #[error("JSON parse error: {0}")]
    JsonParse(String),

    /// 타임아웃
    #[error("Request timed out after {0}ms")]
    Timeout(u64),
}

impl From<AmbariError> for TopologyError {
    fn from(err: AmbariError) -> Self {
        match err {
            AmbariError::Timeout(ms) => TopologyError::Timeout {
                timeout_ms: Some(ms),
            },
            other => TopologyError::Backend(other.to_string()),
        }
    }
}

impl From<AmbariError> for ConfigStoreError {
    fn from(err: AmbariError) -> Self {
        match err {
            AmbariError::Timeout(ms) => ConfigStoreError::Timeout {
                timeout_ms: Some(ms),
            },
            other => ConfigStoreError::Backend(other.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Items<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct HostComponentItem {
    #[serde(rename = "HostRoles")]
    host_roles: HostRoles,
}

#[derive(Debug, Deserialize)]
struct HostRoles {
    host_name: String,
}

#[derive(Debug, Deserialize)]
struct HostResource {
    #[serde(rename = "Hosts")]
    hosts: HostInfo,
}

#[derive(Debug, Deserialize)]
struct HostInfo {
    host_name: String,
    #[serde(default)]
    public_host_name: Option<String>,
    #[serde(default)]
    ip: Option<String>,
    #[serde(default)]
    rack_info: Option<String>,
    #[serde(default)]
    os_type: Option<String>,
    #[serde(default)]
    host_state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClusterResource {
    #[serde(rename = "Clusters")]
    clusters: DesiredConfigs,
}

#[derive(Debug, Deserialize)]
struct DesiredConfigs {
    #[serde(default)]
    desired_configs: HashMap<String, DesiredConfig>,
}

#[derive(Debug, Deserialize)]
struct DesiredConfig {
    tag: String,
}

#[derive(Debug, Deserialize)]
struct ConfigurationItem {
    #[serde(default)]
    properties: HashMap<String, String>,
}

/// Ambari REST 클라이언트 (TopologyDirectory + ConfigurationStore)
#[derive(Clone)]
pub struct AmbariClient {
    client: Client,
    base_url: Url,
    timeout: Duration,
    auth: Option<(String, String)>,
}

impl AmbariClient {
    /// 새 클라이언트 생성
    ///
    /// # Arguments
    /// * `base_url` - Ambari 서버 URL (예: "http://ambari:8080")
    /// * `timeout_ms` - 요청 타임아웃 (밀리초)
    pub fn new(base_url: &str, timeout_ms: u64) -> Result<Self, AmbariError> {
        let invalid = |reason: String| AmbariError::InvalidUrl {
            url: base_url.to_string(),
            reason,
        };
        let parsed = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
        if parsed.cannot_be_a_base() {
            return Err(invalid("not a base URL".to_string()));
        }

        let client = ClientBuilder::new()
            .timeout(Duration::from_millis(timeout_ms))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(AmbariError::HttpClientInit)?;

        Ok(Self {
            client,
            base_url: parsed,
            timeout: Duration::from_millis(timeout_ms),
            auth: None,
        })
    }

    /// 설정으로부터 생성 (Basic Auth 포함)
    pub fn from_config(config: &AmbariConfig) -> Result<Self, AmbariError> {
        let client = Self::new(&config.url, config.timeout_ms)?;
        match (&config.username, &config.password) {
            (Some(username), Some(password)) => Ok(client.with_auth(username, password)),
            _ => Ok(client),
        }
    }

    /// Basic Auth 설정
    pub fn with_auth(mut self, username: &str, password: &str) -> Self {
        self.auth = Some((username.to_string(), password.to_string()));
        self
    }

    fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(["api", "v1", "clusters"]).extend(segments);
        }
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        url
    }

    /// GET 후 JSON 역직렬화; 404는 `None`
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<Option<T>, AmbariError> {
        debug!(url = %url, "Sending Ambari request");

        let mut req = self.client.get(url);
        if let Some((username, password)) = &self.auth {
            req = req.basic_auth(username, Some(password));
        }

        let response = req.send().await.map_err(|e| self.request_error(e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(AmbariError::HttpStatus(status.as_u16()));
        }

        let body = response.text().await.map_err(|e| self.request_error(e))?;
        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| AmbariError::JsonParse(e.to_string()))
    }

    fn request_error(&self, err: reqwest::Error) -> AmbariError {
        if err.is_timeout() {
            AmbariError::Timeout(self.timeout.as_millis() as u64)
        } else {
            AmbariError::HttpRequest(err)
        }
    }

    /// Current desired tag of `config_type`
    async fn desired_tag(&self, cluster: &str, config_type: &str) -> Result<Option<String>, AmbariError> {
        let url = self.endpoint(&[cluster], &[("fields", "Clusters/desired_configs")]);
        let resource: Option<ClusterResource> = self.get_json(url).await?;
        Ok(resource
            .and_then(|r| r.clusters.desired_configs.get(config_type).map(|d| d.tag.clone())))
    }
}

#[async_trait]
impl TopologyDirectory for AmbariClient {
    #[instrument(skip(self))]
    async fn host_names_for_component(
        &self,
        cluster: &str,
        component: &str,
    ) -> Result<BTreeSet<String>, TopologyError> {
        let url = self.endpoint(
            &[cluster, "host_components"],
            &[
                ("HostRoles/component_name", component),
                ("fields", "HostRoles/host_name"),
            ],
        );
        let items: Option<Items<HostComponentItem>> = self.get_json(url).await?;
        Ok(items
            .map(|i| i.items.into_iter().map(|c| c.host_roles.host_name).collect())
            .unwrap_or_default())
    }

    #[instrument(skip(self))]
    async fn host(&self, cluster: &str, host: &str) -> Result<Host, TopologyError> {
        let url = self.endpoint(&[cluster, "hosts", host], &[]);
        let resource: Option<HostResource> = self.get_json(url).await?;
        let info = resource
            .ok_or_else(|| TopologyError::HostNotFound {
                cluster: cluster.to_string(),
                host: host.to_string(),
            })?
            .hosts;

        Ok(Host {
            public_host_name: info.public_host_name.unwrap_or_default(),
            host_name: info.host_name,
            ip: info.ip,
            rack_info: info.rack_info,
            os_type: info.os_type,
            state: info.host_state,
        }
        .normalized())
    }
}

#[async_trait]
impl ConfigurationStore for AmbariClient {
    #[instrument(skip(self))]
    async fn config_value(
        &self,
        cluster: &str,
        config_type: &str,
        key: &str,
    ) -> Result<Option<String>, ConfigStoreError> {
        let Some(tag) = self.desired_tag(cluster, config_type).await? else {
            return Ok(None);
        };

        let url = self.endpoint(
            &[cluster, "configurations"],
            &[("type", config_type), ("tag", tag.as_str())],
        );
        let items: Option<Items<ConfigurationItem>> = self.get_json(url).await?;
        Ok(items
            .and_then(|i| i.items.into_iter().next())
            .and_then(|mut item| item.properties.remove(key)))
    }
}
