//! Integration tests for CircleCiClient.
//!
//! Uses wiremock for HTTP mocking.

use serde_json::json;
use sizewatch_core::{Artifact, CiProvider, CircleCiClient, SizeError, USER_AGENT_VALUE};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(mock_server: &MockServer) -> CircleCiClient {
    CircleCiClient::new(&mock_server.uri(), Some("ci-token".to_string()), 5)
        .expect("failed to create client")
}

async fn mount_download(mock_server: &MockServer, file: &str, size: usize) {
    Mock::given(method("GET"))
        .and(path(format!("/files/{}", file)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'x'; size]))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn test_fetch_artifacts_sizes_every_entry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/project/github/angular/angular/4242/artifacts"))
        .and(header("circle-token", "ci-token"))
        .and(header("user-agent", USER_AGENT_VALUE))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "path": "aio/gzip7/inline",
                "pretty_path": "aio/gzip7/inline",
                "node_index": 0,
                "url": format!("{}/files/inline", mock_server.uri())
            },
            {
                "path": "aio/uncompressed",
                "url": format!("{}/files/uncompressed", mock_server.uri())
            }
        ])))
        .mount(&mock_server)
        .await;
    mount_download(&mock_server, "inline", 1200).await;
    mount_download(&mock_server, "uncompressed", 9000).await;

    let fetched = client(&mock_server)
        .fetch_artifacts("angular", "angular", 4242)
        .await
        .expect("fetch failed");

    assert_eq!(
        fetched,
        vec![
            Artifact::from_path("aio/gzip7/inline", 1200).unwrap(),
            Artifact::from_path("aio/uncompressed", 9000).unwrap(),
        ]
    );
}

#[tokio::test]
async fn test_empty_build_yields_no_artifacts() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/project/github/acme/web/1/artifacts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let fetched = client(&mock_server).fetch_artifacts("acme", "web", 1).await.unwrap();
    assert!(fetched.is_empty());
}

#[tokio::test]
async fn test_list_server_error_is_upstream() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/project/github/acme/web/1/artifacts"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let err = client(&mock_server)
        .fetch_artifacts("acme", "web", 1)
        .await
        .unwrap_err();
    match err {
        SizeError::Upstream {
            service,
            status,
            message,
        } => {
            assert_eq!(service, "circleci");
            assert_eq!(status, Some(500));
            assert_eq!(message, "boom");
        }
        other => panic!("expected Upstream, got {other:?}"),
    }
    assert_eq!(
        SizeError::upstream("circleci", "x").exit_code(),
        4,
        "upstream failures map to exit code 4"
    );
}

#[tokio::test]
async fn test_missing_download_fails_whole_fetch() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/project/github/acme/web/7/artifacts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "path": "web/main.js", "url": format!("{}/files/main", mock_server.uri()) },
            { "path": "web/gone.js", "url": format!("{}/files/gone", mock_server.uri()) }
        ])))
        .mount(&mock_server)
        .await;
    mount_download(&mock_server, "main", 10).await;
    Mock::given(method("GET"))
        .and(path("/files/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let err = client(&mock_server)
        .fetch_artifacts("acme", "web", 7)
        .await
        .unwrap_err();
    assert!(matches!(err, SizeError::Upstream { status: Some(404), .. }));
}

#[tokio::test]
async fn test_invalid_artifact_path_is_rejected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/project/github/acme/web/8/artifacts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "path": "toplevel.txt", "url": format!("{}/files/top", mock_server.uri()) }
        ])))
        .mount(&mock_server)
        .await;
    mount_download(&mock_server, "top", 3).await;

    let err = client(&mock_server)
        .fetch_artifacts("acme", "web", 8)
        .await
        .unwrap_err();
    assert!(matches!(err, SizeError::InvalidArtifactPath { ref path } if path == "toplevel.txt"));
}
