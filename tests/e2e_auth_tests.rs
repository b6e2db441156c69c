//! End-to-end tests for registration and token authentication

mod common;

use common::{TestClient, TestServer, OWNER_PASS, OWNER_USER};
use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn test_register_and_fetch_user() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.register("newcomer", "pa55word", "New Comer").await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "success");
    let user_id = body["data"]["userId"].as_str().unwrap().to_string();

    let response = client.get_user(&user_id).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["user"]["username"], "newcomer");
    assert!(body["data"]["user"].get("password").is_none());
}

#[tokio::test]
async fn test_register_with_taken_username_fails() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.register(OWNER_USER, "whatever", "Impostor").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "fail");
}

#[tokio::test]
async fn test_unknown_user_is_not_found() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.get_user("user-does-not-exist").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_login_with_invalid_password() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.login(OWNER_USER, "wrong_password").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = client.login("nonexistent_user", "password").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_then_logout_revokes_refresh_token() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone(), OWNER_USER, OWNER_PASS).await;
    let refresh_token = client.refresh_token.clone().unwrap();

    let response = client.refresh(&refresh_token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert!(body["data"]["accessToken"].as_str().is_some());

    let response = client.logout(&refresh_token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = client.refresh(&refresh_token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_protected_endpoint_requires_authentication() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.get_playlists().await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = client.like_album(&server.catalog.album_id).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
