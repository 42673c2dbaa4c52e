//! Integration tests using WireMock
//!
//! These tests drive the authenticated client over real HTTP against a mock
//! server, covering bearer attachment, the refresh exchange, and error mapping.

pub mod refresh_flow;
pub mod requests;
pub mod session;

use integrations_auth_http::prelude::*;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockBuilder, MockServer, ResponseTemplate};

pub const API_PREFIX: &str = "/api/v1";

/// Helper to start a mock server
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Helper to build a client against the mock server, optionally signed in
pub fn client_for(server: &MockServer, credentials: Option<(&str, &str)>) -> AuthenticatedClient {
    client_for_uri(&server.uri(), credentials)
}

/// Helper to build a client against any base URI, optionally signed in
pub fn client_for_uri(uri: &str, credentials: Option<(&str, &str)>) -> AuthenticatedClient {
    let config = auth_http_config()
        .base_url(format!("{}{}", uri, API_PREFIX))
        .build()
        .expect("Failed to build config");

    client_with_config(config, credentials)
}

/// Helper to build a client from a prepared configuration
pub fn client_with_config(
    config: ClientConfig,
    credentials: Option<(&str, &str)>,
) -> AuthenticatedClient {
    let store = match credentials {
        Some((access, refresh)) => {
            InMemoryCredentialStore::with_pair(CredentialPair::new(access, refresh))
        }
        None => InMemoryCredentialStore::new(),
    };

    AuthenticatedClient::with_store(config, store).expect("Failed to build client")
}

/// Helper to match a request presenting a specific bearer token
pub fn mock_with_bearer(method_matcher: &str, path_suffix: &str, token: &str) -> MockBuilder {
    Mock::given(method(method_matcher))
        .and(path(format!("{}{}", API_PREFIX, path_suffix)))
        .and(header("Authorization", format!("Bearer {}", token).as_str()))
}

/// Helper to create error response templates
pub fn error_response(status: u16, error_body: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(error_body)
}

/// Helper to create success response templates
pub fn success_response(body: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

/// Access token currently held by the client's store
pub async fn stored_access_token(client: &AuthenticatedClient) -> Option<String> {
    client
        .credentials()
        .get()
        .await
        .expect("store read")
        .map(|pair| pair.access_token().to_string())
}
