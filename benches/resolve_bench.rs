//! Resolver 벤치마크
//!
//! In-memory snapshot 기준 엔드포인트 해석 비용 측정

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rjmx_locator::resolver::extract_port;
use rjmx_locator::store::ClusterSnapshot;
use rjmx_locator::{EndpointQuery, EndpointResolver, Host};

fn snapshot() -> ClusterSnapshot {
    let mut snapshot = ClusterSnapshot::new()
        .with_host("c1", Host::new("nn1").with_public_host_name("nn1.example.com"))
        .with_component("c1", "NAMENODE", "nn1")
        .with_config("c1", "hdfs-site", "dfs.namenode.http-address", "0.0.0.0:50070")
        .with_config("c1", "hdfs-site", "dfs.namenode.rpc-address", "nn1:8020")
        .with_config("c1", "hdfs-site", "dfs.datanode.http.address", "0.0.0.0:50075");

    for i in 0..100 {
        snapshot = snapshot.with_component("c1", "DATANODE", &format!("dn{:03}", i));
    }
    snapshot
}

fn benchmark_extract_port(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract_port");

    for value in ["50070", "0.0.0.0:50070", "https://nn1.example.com:50470/", "[::1]:9870"] {
        group.bench_with_input(BenchmarkId::from_parameter(value), &value, |b, v| {
            b.iter(|| extract_port(v))
        });
    }

    group.finish();
}

fn benchmark_resolve(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("Failed to build runtime");
    let snapshot = Arc::new(snapshot());
    let resolver = EndpointResolver::new(snapshot.clone(), snapshot);

    let mut group = c.benchmark_group("resolve");

    group.bench_function("port/namenode", |b| {
        b.iter(|| runtime.block_on(resolver.port("c1", "NAMENODE", "nn1", None)))
    });

    group.bench_function("rpc_tag/namenode", |b| {
        b.iter(|| runtime.block_on(resolver.jmx_rpc_metric_tag("c1", "NAMENODE", "8020")))
    });

    let query = EndpointQuery::new("c1", "DATANODE");
    group.bench_function("endpoints/100_datanodes", |b| {
        b.iter(|| runtime.block_on(resolver.resolve(&query)))
    });

    group.finish();
}

criterion_group!(benches, benchmark_extract_port, benchmark_resolve);
criterion_main!(benches);
