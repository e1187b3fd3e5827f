//! Startup restore scenarios.

use tempfile::tempdir;
use vegas_core::bootstrap;
use vegas_core::config::Config;
use vegas_core::gateway::Gateway;
use vegas_core::session::{Session, SessionStore};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.backend.base_url = server.uri();
    config
}

fn seeded_store(dir: &tempfile::TempDir) -> SessionStore {
    let store = SessionStore::new(dir.path().join("session.json"));
    store
        .save(&Session {
            access_token: "stale-access".to_string(),
            refresh_token: "refresh-1".to_string(),
            user: None,
        })
        .unwrap();
    store
}

/// Fresh start with nothing stored: signed-out result, and no network
/// traffic at all.
#[tokio::test]
async fn test_no_stored_session_skips_network() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();
    let store = SessionStore::new(dir.path().join("session.json"));

    Mock::given(method("GET"))
        .and(path("/account"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let gateway = Gateway::new(&test_config(&server), store).unwrap();
    let restored = bootstrap::bootstrap(&gateway).await.unwrap();

    assert!(restored.is_none());
}

/// A stored session is proactively refreshed, then the balance is fetched
/// with the rotated token.
#[tokio::test]
async fn test_restore_refreshes_then_fetches_balance() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();
    let store = seeded_store(&dir);

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(body_json(serde_json::json!({ "refresh_token": "refresh-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "fresh-access",
            "refresh_token": "refresh-2",
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/account"))
        .and(header("authorization", "Bearer fresh-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "user": { "user_metadata": { "full_name": "Player One" } },
            "data": 500,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = Gateway::new(&test_config(&server), store.clone()).unwrap();
    let restored = bootstrap::bootstrap(&gateway).await.unwrap().unwrap();

    assert_eq!(restored.account.balance(), Some(500));
    assert_eq!(restored.account.full_name(), Some("Player One"));
    assert_eq!(restored.session.access_token, "fresh-access");
    assert_eq!(store.load().unwrap().refresh_token, "refresh-2");
}

/// A refresh token the backend rejects signs the user out quietly: store
/// cleared, no account request, no error.
#[tokio::test]
async fn test_rejected_refresh_signs_out_quietly() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();
    let store = seeded_store(&dir);

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/account"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let gateway = Gateway::new(&test_config(&server), store.clone()).unwrap();
    let restored = bootstrap::bootstrap(&gateway).await.unwrap();

    assert!(restored.is_none());
    assert!(store.load().is_none());
}

/// A balance failure after a successful refresh also clears the session;
/// there is no half-authenticated state.
#[tokio::test]
async fn test_balance_failure_clears_session() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();
    let store = seeded_store(&dir);

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "fresh-access",
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/account"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = Gateway::new(&test_config(&server), store.clone()).unwrap();
    let restored = bootstrap::bootstrap(&gateway).await.unwrap();

    assert!(restored.is_none());
    assert!(store.load().is_none());
}

/// A refresh response without a rotated refresh token keeps the stored one.
#[tokio::test]
async fn test_refresh_without_rotation_keeps_refresh_token() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();
    let store = seeded_store(&dir);

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "fresh-access",
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/account"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": 1 })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = Gateway::new(&test_config(&server), store.clone()).unwrap();
    bootstrap::bootstrap(&gateway).await.unwrap().unwrap();

    let session = store.load().unwrap();
    assert_eq!(session.access_token, "fresh-access");
    assert_eq!(session.refresh_token, "refresh-1");
}
