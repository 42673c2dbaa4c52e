//! Integration tests for login and logout

use super::*;
use integrations_auth_http::prelude::*;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::Mock;

#[tokio::test]
async fn test_login_then_authenticated_request() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path(format!("{}/auth/login", API_PREFIX)))
        .and(body_json(json!({"username": "13800000000", "password": "secret"})))
        .respond_with(success_response(json!({
            "access_token": "A1",
            "refresh_token": "R1",
            "token_type": "bearer"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    mock_with_bearer("GET", "/users/me", "A1")
        .respond_with(success_response(json!({"username": "13800000000"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, None);
    assert!(!client.is_logged_in().await.unwrap());

    tokio_test::assert_ok!(client.login("13800000000", "secret").await);
    assert!(client.is_logged_in().await.unwrap());

    let me: serde_json::Value = client.get("/users/me", &[]).await.unwrap();
    assert_eq!(me["username"], "13800000000");

    client.logout().await.unwrap();
    assert_eq!(stored_access_token(&client).await, None);
}

#[tokio::test]
async fn test_wrong_password_is_request_error() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path(format!("{}/auth/login", API_PREFIX)))
        .respond_with(error_response(401, json!({"detail": "Incorrect phone or password"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("{}/auth/refresh", API_PREFIX)))
        .respond_with(success_response(json!({"access_token": "never"})))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, None);

    let error = tokio_test::assert_err!(client.login("13800000000", "wrong").await);

    assert_eq!(error.status(), Some(401));
    assert!(!error.is_auth_expired());
    assert!(!client.is_logged_in().await.unwrap());
}
