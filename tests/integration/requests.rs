//! Integration tests for request construction and error mapping

use super::*;
use integrations_auth_http::error::{NetworkError, ProtocolError};
use integrations_auth_http::prelude::*;
use serde::Deserialize;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::Mock;

#[derive(Debug, Deserialize)]
struct Reminder {
    id: u32,
    title: String,
}

#[tokio::test]
async fn test_get_with_query_and_bearer() {
    let mock_server = setup_mock_server().await;

    mock_with_bearer("GET", "/records", "T1")
        .and(query_param("page", "2"))
        .and(query_param("species", "bovine"))
        .and(header("Accept", "application/json"))
        .respond_with(success_response(json!({"items": [], "total": 0})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, Some(("T1", "R1")));

    let page: serde_json::Value = client
        .get("/records", &[("page", "2"), ("species", "bovine")])
        .await
        .unwrap();

    assert_eq!(page["total"], 0);
    assert_eq!(client.coordinator().refresh_count(), 0);
}

#[tokio::test]
async fn test_post_sends_json_body() {
    let mock_server = setup_mock_server().await;

    mock_with_bearer("POST", "/reminders", "T1")
        .and(header("Content-Type", "application/json"))
        .and(body_json(json!({"title": "Vaccinate herd"})))
        .respond_with(success_response(json!({"id": 12, "title": "Vaccinate herd"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, Some(("T1", "R1")));

    let reminder: Reminder = client
        .post("/reminders", &json!({"title": "Vaccinate herd"}))
        .await
        .unwrap();

    assert_eq!(reminder.id, 12);
    assert_eq!(reminder.title, "Vaccinate herd");
}

#[tokio::test]
async fn test_server_error_maps_detail_without_refresh() {
    let mock_server = setup_mock_server().await;

    mock_with_bearer("GET", "/stats", "T1")
        .respond_with(error_response(503, json!({"detail": "Maintenance window"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, Some(("T1", "R1")));

    let error = client
        .get::<serde_json::Value>("/stats", &[])
        .await
        .unwrap_err();

    assert_eq!(error.status(), Some(503));
    assert!(error.to_string().contains("Maintenance window"));
    assert_eq!(client.coordinator().refresh_count(), 0);
}

#[tokio::test]
async fn test_validation_error_messages_are_joined() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("PUT"))
        .and(path(format!("{}/farms/3", API_PREFIX)))
        .respond_with(error_response(
            422,
            json!({"detail": [{"msg": "name required"}, {"msg": "area must be positive"}]}),
        ))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, Some(("T1", "R1")));

    let error = client
        .put::<_, serde_json::Value>("/farms/3", &json!({"area": -1}))
        .await
        .unwrap_err();

    match error {
        ClientError::Request { status, message } => {
            assert_eq!(status, 422);
            assert_eq!(message, "name required; area must be positive");
        }
        other => panic!("expected Request error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_success_body_is_null() {
    let mock_server = setup_mock_server().await;

    mock_with_bearer("DELETE", "/reminders/12", "T1")
        .respond_with(wiremock::ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, Some(("T1", "R1")));

    let value = client
        .execute(&LogicalRequest::delete("/reminders/12"))
        .await
        .unwrap();

    assert!(value.is_null());
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    // Reserve a free port, then release it so nothing is listening there.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);

    let client = client_for_uri(&format!("http://{}", address), Some(("T1", "R1")));

    let error = client
        .execute(&LogicalRequest::get("/records"))
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        ClientError::Network(NetworkError::ConnectionFailed { .. })
    ));
    assert_eq!(client.coordinator().refresh_count(), 0);
}

#[tokio::test]
async fn test_redirect_is_not_followed() {
    let mock_server = setup_mock_server().await;

    mock_with_bearer("GET", "/records", "T1")
        .respond_with(
            wiremock::ResponseTemplate::new(302)
                .insert_header("Location", "https://elsewhere.test/"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, Some(("T1", "R1")));

    let error = client
        .execute(&LogicalRequest::get("/records"))
        .await
        .unwrap_err();

    match error {
        ClientError::Protocol(ProtocolError::UnexpectedRedirect { location }) => {
            assert_eq!(location, "https://elsewhere.test/");
        }
        other => panic!("expected UnexpectedRedirect, got {:?}", other),
    }
}

#[tokio::test]
async fn test_oversized_response_is_rejected() {
    let mock_server = setup_mock_server().await;

    mock_with_bearer("GET", "/export", "T1")
        .respond_with(success_response(json!({"rows": "x".repeat(256)})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = auth_http_config()
        .base_url(format!("{}{}", mock_server.uri(), API_PREFIX))
        .max_response_size(64)
        .build()
        .unwrap();
    let client = client_with_config(config, Some(("T1", "R1")));

    let error = client
        .execute(&LogicalRequest::get("/export"))
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        ClientError::Protocol(ProtocolError::ResponseTooLarge { size }) if size > 64
    ));
}
