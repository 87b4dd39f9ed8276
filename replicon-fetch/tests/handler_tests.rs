//! End-to-end handler tests against a local mock server.

use httpmock::prelude::*;
use replicon_core::{HandlerConfig, RetryConfig};
use replicon_fetch::{HandlerError, RepliconHandler, ResolutionError};
use serde_json::json;

/// Points discovery at `server` and answers it with roots on the same server.
fn mock_discovery(server: &MockServer) -> httpmock::Mock<'_> {
    let port = server.port();
    server.mock(|when, then| {
        when.method(POST)
            .path("/DiscoveryService1.svc/GetTenantEndpointDetails")
            .json_body(json!({"tenant": {"companyKey": "Acme"}}));
        then.status(200).json_body(json!({
            "d": {
                "applicationRootUrl": format!("http://localhost:{port}/Acme/"),
                "applicationRootUrls": [
                    {"rootUrl": format!("http://localhost:{port}/polaris/")}
                ],
                "tenant": {"slug": "acme"}
            }
        }));
    })
}

fn config(server: &MockServer) -> HandlerConfig {
    HandlerConfig::new("Acme")
        .with_token("tok")
        .with_discovery_url(server.url("/DiscoveryService1.svc/GetTenantEndpointDetails"))
        .with_retry(RetryConfig::immediate(2))
}

#[tokio::test]
async fn test_discover_then_call() {
    let server = MockServer::start();
    let discovery = mock_discovery(&server);
    let operation = server.mock(|when, then| {
        when.method(POST)
            .path("/Acme/services/UserService1.svc/GetUser2")
            .header("authorization", "Bearer tok")
            .header("content-type", "application/json")
            .json_body(json!({"userUri": "urn:replicon-tenant:acme:user:2"}));
        then.status(200)
            .header("x-execution-correlation-id", "c-42")
            .json_body(json!({"d": {"loginName": "jdoe"}}));
    });

    let handler = RepliconHandler::new(config(&server)).unwrap();
    let response = handler
        .call_web_service(
            "UserService1.svc",
            "GetUser2",
            json!({"userUri": "urn:replicon-tenant:acme:user:2"}),
        )
        .await
        .unwrap();

    // A second resolution is served from the cache.
    handler.resolve().await.unwrap();

    discovery.assert_calls(1);
    operation.assert();
    assert_eq!(response.correlation_id(), Some("c-42"));
    assert_eq!(response.value().unwrap()["d"]["loginName"], "jdoe");
    assert_eq!(
        handler.polaris_graphql_url().unwrap().as_str(),
        format!("http://localhost:{}/polaris/graphql", server.port())
    );
}

#[tokio::test]
async fn test_application_error_is_returned_not_raised() {
    let server = MockServer::start();
    mock_discovery(&server);
    let operation = server.mock(|when, then| {
        when.method(POST).path("/Acme/services/UserService1.svc/GetUser2");
        then.status(500)
            .json_body(json!({"error": {"reason": "User not found"}}));
    });

    let handler = RepliconHandler::new(config(&server)).unwrap();
    let response = handler
        .call_web_service("UserService1.svc", "GetUser2", json!({}))
        .await
        .unwrap();

    assert_eq!(operation.calls(), 1);
    assert_eq!(response.status, 500);
    assert_eq!(response.attempts, 1);
    assert_eq!(response.error(), Some(json!({"reason": "User not found"})));
}

#[tokio::test]
async fn test_concurrent_batch_over_http() {
    let server = MockServer::start();
    mock_discovery(&server);
    let operation = server.mock(|when, then| {
        when.method(POST).path("/Acme/services/UserService1.svc/PutUser");
        then.status(200).json_body(json!({"d": null}));
    });

    let handler = RepliconHandler::new(config(&server)).unwrap();
    let url = handler
        .resolve()
        .await
        .unwrap()
        .web_service("UserService1.svc", "PutUser")
        .unwrap();
    let payloads = (0..6).map(|i| json!({"user": i})).collect();

    let responses = handler.concurrent_batch(&url, payloads, 3).await.unwrap();

    assert_eq!(responses.len(), 6);
    assert_eq!(operation.calls(), 6);
    assert!(responses.iter().all(|r| r.status == 200));
}

#[tokio::test]
async fn test_unknown_company_key() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST)
            .path("/DiscoveryService1.svc/GetTenantEndpointDetails");
        then.status(200).json_body(json!({"d": null}));
    });

    let handler = RepliconHandler::new(config(&server)).unwrap();
    let err = handler
        .call_web_service("UserService1.svc", "GetUser2", json!({}))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        HandlerError::Resolution(ResolutionError::UnknownCompanyKey(_))
    ));
}
