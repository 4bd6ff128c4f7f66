//! Auth-service identity provider tests with mock server and temp session files

use classgate::auth::AnonKeyProvider;
use classgate::config::{AuthConfig, BackendConfig};
use classgate::error::IdentityError;
use classgate::identity::{AuthChange, GoTrueIdentity, IdentityProvider};
use serde_json::json;
use std::path::PathBuf;
use tempfile::TempDir;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// =============================================================================
// Test Helpers
// =============================================================================

fn backend(mock_server: &MockServer) -> BackendConfig {
    BackendConfig {
        url: mock_server.uri(),
        anon_key: Some("anon-key".to_string()),
        timeout_secs: 5,
        max_retries: 0,
        verify_ssl: true,
    }
}

fn auth_config(dir: &TempDir) -> AuthConfig {
    AuthConfig {
        persist_session: true,
        session_file: dir.path().join("session.json").display().to_string(),
        refresh_margin_secs: 60,
    }
}

fn create_identity(mock_server: &MockServer, dir: &TempDir) -> GoTrueIdentity {
    GoTrueIdentity::new(
        &backend(mock_server),
        &auth_config(dir),
        AnonKeyProvider::new("anon-key").unwrap(),
    )
    .unwrap()
}

fn token_body(access: &str, user: &str) -> serde_json::Value {
    json!({
        "access_token": access,
        "token_type": "bearer",
        "expires_in": 3600,
        "refresh_token": format!("refresh-{access}"),
        "user": { "id": user, "email": "kim@example.com" }
    })
}

fn write_session(dir: &TempDir, expires_at: i64) {
    let saved = json!({
        "access_token": "saved-access",
        "refresh_token": "saved-refresh",
        "expires_at": expires_at,
        "user": { "id": "u-1", "email": null }
    });
    std::fs::write(
        dir.path().join("session.json"),
        serde_json::to_string(&saved).unwrap(),
    )
    .unwrap();
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn session_file(dir: &TempDir) -> PathBuf {
    dir.path().join("session.json")
}

// =============================================================================
// Sign in
// =============================================================================

#[tokio::test]
async fn test_sign_in_persists_and_notifies() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .and(header("apikey", "anon-key"))
        .and(body_json(json!({ "email": "kim@example.com", "password": "pw" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("access-1", "u-1")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let identity = create_identity(&mock_server, &dir);
    let mut events = identity.subscribe();

    let session = identity
        .sign_in_with_password("kim@example.com", "pw")
        .await
        .unwrap();

    assert_eq!(session.user_id(), "u-1");
    assert_eq!(session.access_token.expose_secret(), "access-1");
    assert!(session_file(&dir).exists());

    let event = events.recv().await.unwrap();
    assert_eq!(event.kind, AuthChange::SignedIn);
    assert_eq!(event.session.map(|s| s.user.id), Some("u-1".to_string()));

    let current = identity.get_session().await.unwrap();
    assert_eq!(current.map(|s| s.user.id), Some("u-1".to_string()));
}

#[tokio::test]
async fn test_wrong_password_is_invalid_credentials() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials"
        })))
        .mount(&mock_server)
        .await;

    let identity = create_identity(&mock_server, &dir);
    let result = identity.sign_in_with_password("kim@example.com", "nope").await;

    assert!(matches!(result, Err(IdentityError::InvalidCredentials)));
    assert!(!session_file(&dir).exists());
    assert!(identity.get_session().await.unwrap().is_none());
}

// =============================================================================
// Saved sessions and refresh
// =============================================================================

#[tokio::test]
async fn test_saved_session_is_restored_without_network() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    write_session(&dir, now() + 3600);

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&mock_server)
        .await;

    let identity = create_identity(&mock_server, &dir);
    let session = identity.get_session().await.unwrap().unwrap();

    assert_eq!(session.user_id(), "u-1");
    assert_eq!(session.access_token.expose_secret(), "saved-access");
}

#[tokio::test]
async fn test_expiring_session_is_refreshed() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    write_session(&dir, now() + 10);

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .and(body_json(json!({ "refresh_token": "saved-refresh" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("access-2", "u-1")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let identity = create_identity(&mock_server, &dir);
    let mut events = identity.subscribe();

    let session = identity.get_session().await.unwrap().unwrap();
    assert_eq!(session.access_token.expose_secret(), "access-2");

    let event = events.recv().await.unwrap();
    assert_eq!(event.kind, AuthChange::TokenRefreshed);

    let saved = std::fs::read_to_string(session_file(&dir)).unwrap();
    assert!(saved.contains("access-2"));
}

#[tokio::test]
async fn test_rejected_refresh_signs_out() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    write_session(&dir, now() - 10);

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Refresh Token Not Found"
        })))
        .mount(&mock_server)
        .await;

    let identity = create_identity(&mock_server, &dir);
    let mut events = identity.subscribe();

    assert!(identity.get_session().await.unwrap().is_none());
    assert_eq!(events.recv().await.unwrap().kind, AuthChange::SignedOut);
    assert!(!session_file(&dir).exists());
}

#[tokio::test]
async fn test_corrupt_session_file_is_ignored() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    std::fs::write(session_file(&dir), "{ not json").unwrap();

    let identity = create_identity(&mock_server, &dir);

    assert!(identity.get_session().await.unwrap().is_none());
}

// =============================================================================
// Sign out
// =============================================================================

#[tokio::test]
async fn test_sign_out_clears_local_state_even_if_remote_fails() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    write_session(&dir, now() + 3600);

    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .and(header("Authorization", "Bearer saved-access"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    let identity = create_identity(&mock_server, &dir);
    let mut events = identity.subscribe();

    identity.sign_out().await.unwrap();

    assert!(identity.get_session().await.unwrap().is_none());
    assert!(!session_file(&dir).exists());
    assert_eq!(events.recv().await.unwrap().kind, AuthChange::SignedOut);
}
