//! A fake DIM server on top of `wiremock`.
//!
//! Accepts `alice` / `secret` at `/login`, hands out the `session=abc123`
//! cookie, serves `/index.html` only to requests carrying that cookie, and
//! answers `protocol_version` on `/jsonrpc`.

#![allow(dead_code)]

use std::path::Path;

use dimclient::{ClientConfig, DimClient};
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub const USERNAME: &str = "alice";
pub const PASSWORD: &str = "secret";
pub const SESSION_VALUE: &str = "abc123";

/// Starts a server reporting `protocol` from `protocol_version`.
pub async fn start_dim(protocol: u64) -> MockServer {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_index(&server).await;
    mount_rpc_result(&server, "protocol_version", json!(protocol)).await;
    server
}

pub async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_string_contains(format!("username={USERNAME}")))
        .and(body_string_contains(format!("password={PASSWORD}")))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", format!("session={SESSION_VALUE}; Path=/; HttpOnly")),
        )
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(401))
        .with_priority(10)
        .mount(server)
        .await;
}

pub async fn mount_index(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/index.html"))
        .and(header("cookie", format!("session={SESSION_VALUE}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/index.html"))
        .respond_with(ResponseTemplate::new(403))
        .with_priority(10)
        .mount(server)
        .await;
}

/// Answers every call to `rpc_method` with `result`.
pub async fn mount_rpc_result(server: &MockServer, rpc_method: &str, result: Value) {
    Mock::given(method("POST"))
        .and(path("/jsonrpc"))
        .and(body_partial_json(json!({ "method": rpc_method })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": result,
            "error": null,
            "id": null
        })))
        .mount(server)
        .await;
}

/// Client for `server` persisting cookies to `cookie_file`.
pub fn client_for(server: &MockServer, cookie_file: &Path) -> DimClient {
    DimClient::new(ClientConfig::new(server.uri()).cookie_file(cookie_file)).unwrap()
}

/// All requests the server received on `request_path`.
pub async fn requests_to(server: &MockServer, request_path: &str) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|request| request.url.path() == request_path)
        .collect()
}

/// Decoded JSON body of a captured request.
pub fn json_body(request: &Request) -> Value {
    serde_json::from_slice(&request.body).unwrap()
}
