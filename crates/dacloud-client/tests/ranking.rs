#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
//! Latency ranking against mock endpoints with persisted lists

use dacloud_cache::{FileCacheConfig, FileCacheProvider, MemoryCacheProvider};
use dacloud_client::{
    ClientConfig, CloudClient, Endpoint, EndpointListKind, HttpTransport, RankingStatus,
};
use pretty_assertions::assert_eq;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BODY: &str = r#"{"properties":{"isBrowser":true}}"#;

async fn server(delay: Duration, status: u16) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(status)
                .set_body_string(BODY)
                .set_delay(delay),
        )
        .mount(&server)
        .await;
    server
}

fn endpoint(server: &MockServer) -> Endpoint {
    Endpoint::parse(&server.uri()).expect("mock server uri parses")
}

fn client(endpoints: Vec<Endpoint>, cache_dir: &Path) -> CloudClient {
    let ranking_cache = FileCacheProvider::new(FileCacheConfig::new(cache_dir));
    CloudClient::with_components(
        ClientConfig::new("key").with_endpoints(endpoints),
        Arc::new(HttpTransport::new().expect("Test operation should succeed")),
        Arc::new(MemoryCacheProvider::new()),
        Arc::new(ranking_cache),
    )
    .expect("Test operation should succeed")
}

#[tokio::test]
async fn ranked_list_is_shared_through_file_cache() {
    let slow = server(Duration::from_millis(150), 200).await;
    let fast = server(Duration::ZERO, 200).await;
    let broken = server(Duration::ZERO, 500).await;
    let endpoints = vec![endpoint(&slow), endpoint(&broken), endpoint(&fast)];
    let dir = tempfile::tempdir().expect("Test operation should succeed");

    let first = client(endpoints.clone(), dir.path());
    let candidates = first.endpoints().await.expect("Test operation should succeed");
    assert_eq!(candidates.status, RankingStatus::AutoFreshlyRanked);

    let order: Vec<String> = candidates.endpoints.iter().map(Endpoint::url).collect();
    assert_eq!(order, [endpoint(&fast).url(), endpoint(&slow).url()]);
    assert!(candidates.endpoints[1].average >= 150.0);
    assert_eq!(candidates.endpoints[1].latencies.len(), 3);
    first.shutdown().await.expect("Test operation should succeed");

    // A second client finds the persisted ranking and does not probe
    let probes = fast.received_requests().await.expect("recording").len();
    let second = client(endpoints, dir.path());
    let candidates = second.endpoints().await.expect("Test operation should succeed");
    assert_eq!(candidates.status, RankingStatus::Auto);
    assert_eq!(candidates.endpoints[0].url(), endpoint(&fast).url());
    assert_eq!(fast.received_requests().await.expect("recording").len(), probes);

    let result = second
        .result_by_user_agent("agent")
        .await
        .expect("Test operation should succeed");
    assert_eq!(result.cloud_url, Some(endpoint(&fast).url()));
    assert_eq!(result.ranking_status, Some(RankingStatus::Auto));
}

#[tokio::test]
async fn probes_carry_latency_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("x-da-latency-checker", "ntrue3131440"))
        .respond_with(ResponseTemplate::new(200).set_body_string(BODY))
        .expect(1)
        .mount(&server)
        .await;
    for probe in ["1", "2", "3"] {
        Mock::given(method("GET"))
            .and(header("x-da-latency-checker", probe))
            .respond_with(ResponseTemplate::new(200).set_body_string(BODY))
            .expect(1)
            .mount(&server)
            .await;
    }

    let dir = tempfile::tempdir().expect("Test operation should succeed");
    let client = client(vec![endpoint(&server)], dir.path());
    let measured = client
        .server_latencies()
        .await
        .expect("Test operation should succeed");

    assert_eq!(measured.len(), 1);
    assert!(measured[0].is_reachable());
    assert_eq!(measured[0].latencies.len(), 3);
    assert!(client.cached_endpoints(EndpointListKind::Auto).await.is_none());
}

#[tokio::test]
async fn nothing_reachable_falls_back_to_configured_order() {
    let a = server(Duration::ZERO, 500).await;
    let b = server(Duration::ZERO, 502).await;
    let dir = tempfile::tempdir().expect("Test operation should succeed");
    let client = client(vec![endpoint(&a), endpoint(&b)], dir.path());

    assert!(client.rank_servers().await.expect("Test operation should succeed").is_empty());

    let candidates = client.endpoints().await.expect("Test operation should succeed");
    assert_eq!(candidates.status, RankingStatus::Auto);
    assert_eq!(candidates.endpoints, vec![endpoint(&a), endpoint(&b)]);
}
