//! Ambari REST 어댑터 통합 테스트
//!
//! wiremock을 사용한 HTTP 모킹 테스트

use std::sync::Arc;
use std::time::Duration;

use rjmx_locator::error::{ConfigStoreError, TopologyError};
use rjmx_locator::store::{AmbariClient, CachedConfigurationStore};
use rjmx_locator::{ConfigurationStore, EndpointQuery, EndpointResolver, JmxProtocol, TopologyDirectory};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_desired_configs(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/v1/clusters/c1"))
        .and(query_param("fields", "Clusters/desired_configs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "href": "http://ambari:8080/api/v1/clusters/c1?fields=Clusters/desired_configs",
            "Clusters": {
                "cluster_name": "c1",
                "version": "HDP-3.1",
                "desired_configs": {
                    "hdfs-site": { "tag": "version1700000000", "version": 3 }
                }
            }
        })))
        .mount(server)
        .await;
}

async fn mount_hdfs_site(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/v1/clusters/c1/configurations"))
        .and(query_param("type", "hdfs-site"))
        .and(query_param("tag", "version1700000000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{
                "type": "hdfs-site",
                "tag": "version1700000000",
                "version": 3,
                "properties": {
                    "dfs.http.policy": "HTTPS_ONLY",
                    "dfs.namenode.http-address": "nn1.example.com:50070",
                    "dfs.namenode.https-address": "nn1.example.com:50470",
                    "dfs.namenode.rpc-address": "nn1.example.com:8020"
                }
            }]
        })))
        .mount(server)
        .await;
}

async fn mount_topology(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/v1/clusters/c1/host_components"))
        .and(query_param("HostRoles/component_name", "NAMENODE"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                { "HostRoles": { "cluster_name": "c1", "component_name": "NAMENODE", "host_name": "nn1.internal" } }
            ]
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/clusters/c1/host_components"))
        .and(query_param("HostRoles/component_name", "HBASE_MASTER"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/clusters/c1/hosts/nn1.internal"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Hosts": {
                "cluster_name": "c1",
                "host_name": "nn1.internal",
                "public_host_name": "nn1.example.com",
                "ip": "10.0.0.11",
                "rack_info": "/default-rack",
                "os_type": "centos7",
                "host_state": "HEALTHY"
            }
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/clusters/c1/hosts/ghost"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "status": 404,
            "message": "The requested resource doesn't exist: Host not found, hostname=ghost"
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_host_lookups() {
    let server = MockServer::start().await;
    mount_topology(&server).await;
    let client = AmbariClient::new(&server.uri(), 5000).unwrap();

    let hosts = client.host_names_for_component("c1", "NAMENODE").await.unwrap();
    assert_eq!(hosts.into_iter().collect::<Vec<_>>(), vec!["nn1.internal"]);
    assert!(client
        .host_names_for_component("c1", "HBASE_MASTER")
        .await
        .unwrap()
        .is_empty());

    let host = client.host("c1", "nn1.internal").await.unwrap();
    assert_eq!(host.public_host_name, "nn1.example.com");
    assert_eq!(host.ip.as_deref(), Some("10.0.0.11"));
    assert_eq!(host.state.as_deref(), Some("HEALTHY"));

    let err = client.host("c1", "ghost").await.unwrap_err();
    assert_eq!(
        err,
        TopologyError::HostNotFound {
            cluster: "c1".to_string(),
            host: "ghost".to_string()
        }
    );
}

#[tokio::test]
async fn test_config_lookup() {
    let server = MockServer::start().await;
    mount_desired_configs(&server).await;
    mount_hdfs_site(&server).await;
    let client = AmbariClient::new(&server.uri(), 5000).unwrap();

    assert_eq!(
        client
            .config_value("c1", "hdfs-site", "dfs.namenode.http-address")
            .await
            .unwrap(),
        Some("nn1.example.com:50070".to_string())
    );
    assert_eq!(
        client.config_value("c1", "hdfs-site", "dfs.missing").await.unwrap(),
        None
    );
    // config type without a desired tag
    assert_eq!(
        client
            .config_value("c1", "yarn-site", "yarn.http.policy")
            .await
            .unwrap(),
        None
    );
}

#[tokio::test]
async fn test_basic_auth_is_sent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/clusters/c1/hosts/h1"))
        .and(wiremock::matchers::header("authorization", "Basic YWRtaW46YWRtaW4="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Hosts": { "host_name": "h1" }
        })))
        .mount(&server)
        .await;

    let client = AmbariClient::new(&server.uri(), 5000)
        .unwrap()
        .with_auth("admin", "admin");
    let host = client.host("c1", "h1").await.unwrap();
    assert_eq!(host.public_host_name, "h1");
}

#[tokio::test]
async fn test_server_error_is_backend_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = AmbariClient::new(&server.uri(), 5000).unwrap();
    let err = client
        .config_value("c1", "hdfs-site", "dfs.http.policy")
        .await
        .unwrap_err();
    assert!(matches!(err, ConfigStoreError::Backend(_)));
}

#[tokio::test]
async fn test_request_timeout() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
        .mount(&server)
        .await;

    let client = AmbariClient::new(&server.uri(), 100).unwrap();
    let err = client.host("c1", "h1").await.unwrap_err();
    assert_eq!(err, TopologyError::Timeout { timeout_ms: Some(100) });
}

#[tokio::test]
async fn test_resolve_through_ambari() {
    let server = MockServer::start().await;
    mount_desired_configs(&server).await;
    mount_hdfs_site(&server).await;
    mount_topology(&server).await;

    let client = Arc::new(AmbariClient::new(&server.uri(), 5000).unwrap());
    let cached = Arc::new(CachedConfigurationStore::new(
        AmbariClient::new(&server.uri(), 5000).unwrap(),
        Duration::from_secs(60),
    ));
    let resolver = EndpointResolver::new(client, cached.clone());

    let endpoints = resolver
        .resolve(&EndpointQuery::new("c1", "NAMENODE"))
        .await
        .unwrap();
    assert_eq!(endpoints.len(), 1);

    let nn = &endpoints[0];
    assert_eq!(nn.protocol, JmxProtocol::Https);
    assert_eq!(nn.port, "50470");
    assert_eq!(nn.rpc_tag, "default");
    assert_eq!(nn.url().unwrap().as_str(), "https://nn1.example.com:50470/jmx");

    assert_eq!(resolver.jmx_rpc_metric_tag("c1", "NAMENODE", "8020").await, "client");
    assert!(!cached.is_empty());
}
