// Common test utilities and fixtures
#![allow(dead_code)]

use axum_test::{TestRequest, TestServer};
use fluentcloud_mock::config::DEFAULT_SUBSCRIPTION_ID;
use fluentcloud_mock::{build_app, AppState, MockSettings};
use serde_json::{json, Value};

pub const TOKEN: &str = "test-token";
pub const API_VERSION: &str = "2023-09-01";
pub const SUB: &str = DEFAULT_SUBSCRIPTION_ID;

/// In-memory server over the full application (routes, middleware, CORS).
pub fn create_test_server(settings: MockSettings) -> TestServer {
    let state = AppState::new(settings.with_expected_token(TOKEN));
    TestServer::new(build_app(state)).unwrap()
}

pub fn group_path(name: &str) -> String {
    format!("/subscriptions/{}/resourceGroups/{}", SUB, name)
}

pub fn resource_path(group: &str, ns_type: &str, name: &str) -> String {
    format!("{}/providers/{}/{}", group_path(group), ns_type, name)
}

pub fn authed(request: TestRequest) -> TestRequest {
    request
        .authorization_bearer(TOKEN)
        .add_query_param("api-version", API_VERSION)
}

/// GET on an absolute monitor or next link handed out by the server.
pub fn follow(server: &TestServer, url: &str) -> TestRequest {
    let start = url.find("/subscriptions").unwrap_or(0);
    let rest = &url[start..];
    let (path, query) = rest.split_once('?').unwrap_or((rest, ""));
    let mut request = server.get(path).authorization_bearer(TOKEN);
    for (k, v) in query.split('&').filter_map(|p| p.split_once('=')) {
        request = request.add_query_param(k, v);
    }
    request
}

pub async fn create_group(server: &TestServer, name: &str) -> Value {
    let response = authed(server.put(&group_path(name)))
        .json(&json!({ "location": "eastus" }))
        .await;
    assert!(response.status_code().is_success(), "{}", response.text());
    response.json()
}

pub fn network_body(prefix: &str, subnets: &[(&str, &str)]) -> Value {
    json!({
        "location": "eastus",
        "properties": {
            "addressSpace": { "addressPrefixes": [prefix] },
            "subnets": subnets
                .iter()
                .map(|(n, p)| json!({ "name": n, "addressPrefix": p }))
                .collect::<Vec<_>>(),
        }
    })
}

/// Reads the async-operation monitor until it reports a terminal status.
pub async fn wait_for_operation(server: &TestServer, monitor: &str) -> Value {
    for _ in 0..10 {
        let status: Value = follow(server, monitor).await.json();
        if status["status"] != "InProgress" {
            return status;
        }
    }
    panic!("operation {} did not finish", monitor);
}
