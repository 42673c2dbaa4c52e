//! Integration tests for the 401 refresh path

use super::*;
use integrations_auth_http::prelude::*;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, method, path};
use wiremock::Mock;

fn refresh_path() -> String {
    format!("{}/auth/refresh", API_PREFIX)
}

#[tokio::test]
async fn test_expired_token_is_refreshed_and_request_replayed() {
    let mock_server = setup_mock_server().await;

    mock_with_bearer("GET", "/farms", "T1")
        .respond_with(error_response(401, json!({"detail": "Token expired"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    mock_with_bearer("GET", "/farms", "T2")
        .respond_with(success_response(json!([{"id": 1, "name": "North Pasture"}])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path(refresh_path()))
        .and(body_json(json!({"refresh_token": "R1"})))
        .respond_with(success_response(json!({"access_token": "T2", "token_type": "bearer"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, Some(("T1", "R1")));

    let farms: serde_json::Value = tokio_test::assert_ok!(client.get("/farms", &[]).await);

    assert_eq!(farms[0]["name"], "North Pasture");
    assert_eq!(stored_access_token(&client).await, Some("T2".to_string()));

    let pair = client.credentials().get().await.unwrap().unwrap();
    assert_eq!(pair.refresh_token(), "R1");
}

#[tokio::test]
async fn test_refresh_exchange_carries_no_bearer() {
    let mock_server = setup_mock_server().await;

    mock_with_bearer("GET", "/me", "T1")
        .respond_with(error_response(401, json!({})))
        .mount(&mock_server)
        .await;
    mock_with_bearer("GET", "/me", "T2")
        .respond_with(success_response(json!({"id": 7})))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path(refresh_path()))
        .respond_with(success_response(json!({"access_token": "T2", "refresh_token": "R2"})))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, Some(("T1", "R1")));
    tokio_test::assert_ok!(client.execute(&LogicalRequest::get("/me")).await);

    let received = mock_server.received_requests().await.unwrap();
    let refresh: Vec<_> = received
        .iter()
        .filter(|r| r.url.path() == refresh_path())
        .collect();
    assert_eq!(refresh.len(), 1);
    assert!(refresh[0].headers.get("authorization").is_none());

    let pair = client.credentials().get().await.unwrap().unwrap();
    assert_eq!(pair.access_token(), "T2");
    assert_eq!(pair.refresh_token(), "R2");
}

#[tokio::test]
async fn test_concurrent_requests_share_one_refresh() {
    let mock_server = setup_mock_server().await;

    for page in ["/a", "/b"] {
        mock_with_bearer("GET", page, "T1")
            .respond_with(error_response(401, json!({"detail": "Token expired"})))
            .expect(1)
            .mount(&mock_server)
            .await;
        mock_with_bearer("GET", page, "T2")
            .respond_with(success_response(json!({"page": page})))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    Mock::given(method("POST"))
        .and(path(refresh_path()))
        .respond_with(
            success_response(json!({"access_token": "T2"})).set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, Some(("T1", "R1")));

    let request_a = LogicalRequest::get("/a");
    let request_b = LogicalRequest::get("/b");
    let (a, b) = tokio::join!(client.execute(&request_a), client.execute(&request_b));

    assert_eq!(a.unwrap(), json!({"page": "/a"}));
    assert_eq!(b.unwrap(), json!({"page": "/b"}));
    assert_eq!(client.coordinator().refresh_count(), 1);
}

#[tokio::test]
async fn test_rejected_refresh_ends_session_for_all_callers() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path(format!("{}/reports", API_PREFIX)))
        .respond_with(error_response(401, json!({"detail": "Token expired"})))
        .expect(3)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path(refresh_path()))
        .respond_with(
            error_response(401, json!({"detail": "Refresh token revoked"}))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, Some(("T1", "R1")));
    let request = LogicalRequest::get("/reports");

    let (first, second, third) = tokio::join!(
        client.execute(&request),
        client.execute(&request),
        client.execute(&request)
    );

    for result in [first, second, third] {
        let error = tokio_test::assert_err!(result);
        assert!(error.is_auth_expired());
        assert!(error.to_string().contains("Refresh token revoked"));
    }

    assert_eq!(stored_access_token(&client).await, None);
    assert!(!client.is_logged_in().await.unwrap());
}

#[tokio::test]
async fn test_persistent_401_is_not_retried_twice() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path(format!("{}/admin", API_PREFIX)))
        .respond_with(error_response(401, json!({"detail": "Not authenticated"})))
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path(refresh_path()))
        .respond_with(success_response(json!({"access_token": "T2"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, Some(("T1", "R1")));

    let error = tokio_test::assert_err!(client.execute(&LogicalRequest::get("/admin")).await);

    match error {
        ClientError::Request { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "Not authenticated");
        }
        other => panic!("expected Request error, got {:?}", other),
    }
    assert_eq!(stored_access_token(&client).await, Some("T2".to_string()));
}
