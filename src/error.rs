//! Error types for rJMX-Locator
//!
//! Store adapters report [`TopologyError`] / [`ConfigStoreError`]; the
//! resolver surfaces everything to callers as [`ResolveError`].

use thiserror::Error;

use crate::resolver::JmxProtocol;

/// Topology Directory 에러
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopologyError {
    /// 클러스터에 존재하지 않는 호스트
    #[error("Host '{host}' not found in cluster '{cluster}'")]
    HostNotFound { cluster: String, host: String },

    /// 조회 타임아웃
    #[error("Topology lookup timed out{}", .timeout_ms.map(|ms| format!(" after {}ms", ms)).unwrap_or_default())]
    Timeout { timeout_ms: Option<u64> },

    /// 백엔드 장애 (연결 실패, 잘못된 응답 등)
    #[error("Topology backend error: {0}")]
    Backend(String),
}

/// Configuration Store 에러
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigStoreError {
    /// 조회 타임아웃
    #[error("Configuration lookup timed out{}", .timeout_ms.map(|ms| format!(" after {}ms", ms)).unwrap_or_default())]
    Timeout { timeout_ms: Option<u64> },

    /// 백엔드 장애
    #[error("Configuration backend error: {0}")]
    Backend(String),
}

/// Errors surfaced by [`EndpointResolver`](crate::resolver::EndpointResolver)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Host is unknown within the named cluster
    #[error("Host '{host}' not found in cluster '{cluster}'")]
    HostNotFound { cluster: String, host: String },

    /// No configured key and no static default exist for the component/protocol
    #[error("Unable to resolve {protocol} JMX port for component '{component}' in cluster '{cluster}'")]
    PortResolution {
        cluster: String,
        component: String,
        protocol: JmxProtocol,
    },

    /// Topology Directory did not answer in time
    #[error("Topology lookup for cluster '{cluster}' timed out{}", .timeout_ms.map(|ms| format!(" after {}ms", ms)).unwrap_or_default())]
    TopologyLookupTimeout {
        cluster: String,
        timeout_ms: Option<u64>,
    },

    /// Configuration Store did not answer in time
    #[error("Configuration lookup for cluster '{cluster}' timed out{}", .timeout_ms.map(|ms| format!(" after {}ms", ms)).unwrap_or_default())]
    ConfigLookupTimeout {
        cluster: String,
        timeout_ms: Option<u64>,
    },

    /// Non-timeout Topology Directory failure
    #[error("Topology error: {0}")]
    Topology(String),

    /// Non-timeout Configuration Store failure
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ResolveError {
    /// 재시도 가능한 에러인지 확인
    ///
    /// Only lookup timeouts are transient. Missing hosts and port gaps need a
    /// topology refresh or a configuration change, not a retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ResolveError::TopologyLookupTimeout { .. } | ResolveError::ConfigLookupTimeout { .. }
        )
    }

    pub(crate) fn from_topology(cluster: &str, err: TopologyError) -> Self {
        match err {
            TopologyError::HostNotFound { cluster, host } => {
                ResolveError::HostNotFound { cluster, host }
            }
            TopologyError::Timeout { timeout_ms } => ResolveError::TopologyLookupTimeout {
                cluster: cluster.to_string(),
                timeout_ms,
            },
            TopologyError::Backend(msg) => ResolveError::Topology(msg),
        }
    }

    pub(crate) fn from_config(cluster: &str, err: ConfigStoreError) -> Self {
        match err {
            ConfigStoreError::Timeout { timeout_ms } => ResolveError::ConfigLookupTimeout {
                cluster: cluster.to_string(),
                timeout_ms,
            },
            ConfigStoreError::Backend(msg) => ResolveError::Config(msg),
        }
    }
}

/// Result type alias for resolver operations
pub type ResolveResult<T> = Result<T, ResolveError>;
