//! Gateway refresh-and-retry behavior against a mock backend.

use tempfile::tempdir;
use vegas_core::config::Config;
use vegas_core::gateway::{Gateway, SessionExpired};
use vegas_core::session::{Session, SessionStore};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

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

fn renewed_tokens() -> serde_json::Value {
    serde_json::json!({
        "access_token": "fresh-access",
        "refresh_token": "refresh-2",
    })
}

/// One 401 then a 200 on the replay: the caller sees the 200 and exactly
/// one refresh call was made.
#[tokio::test]
async fn test_refresh_then_retry_succeeds() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();
    let store = seeded_store(&dir);

    Mock::given(method("GET"))
        .and(path("/account"))
        .and(header("authorization", "Bearer stale-access"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(body_json(serde_json::json!({ "refresh_token": "refresh-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(renewed_tokens()))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/account"))
        .and(header("authorization", "Bearer fresh-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": 42 })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = Gateway::new(&test_config(&server), store.clone()).unwrap();
    let response = gateway.get("/account").await.unwrap();

    assert_eq!(response.status(), 200);

    let rotated = store.load().unwrap();
    assert_eq!(rotated.access_token, "fresh-access");
    assert_eq!(rotated.refresh_token, "refresh-2");
}

/// 401 on the original and on the replay: the caller sees the 401 and no
/// third attempt is made (the request mock is capped at two hits).
#[tokio::test]
async fn test_replayed_401_is_not_retried_again() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();
    let store = seeded_store(&dir);

    Mock::given(method("GET"))
        .and(path("/account"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(renewed_tokens()))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = Gateway::new(&test_config(&server), store.clone()).unwrap();
    let response = gateway.get("/account").await.unwrap();

    assert_eq!(response.status(), 401);
    // The replayed 401 does not tear down the session; only a failed
    // refresh does.
    assert!(store.load().is_some());
}

/// Two concurrent calls that both hit 401 share a single refresh and both
/// replay with the rotated token.
#[tokio::test]
async fn test_concurrent_401s_share_one_refresh() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();
    let store = seeded_store(&dir);

    // The second caller may observe the rotated token before its first
    // send, so the stale mock sees one or two hits.
    Mock::given(method("GET"))
        .and(path("/account"))
        .and(header("authorization", "Bearer stale-access"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1..=2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(renewed_tokens()))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/account"))
        .and(header("authorization", "Bearer fresh-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": 7 })))
        .expect(2)
        .mount(&server)
        .await;

    let gateway = Gateway::new(&test_config(&server), store).unwrap();
    let (first, second) = tokio::join!(gateway.get("/account"), gateway.get("/account"));

    assert_eq!(first.unwrap().status(), 200);
    assert_eq!(second.unwrap().status(), 200);
}

/// A rejected refresh token clears the store entirely and surfaces the
/// session-expired marker.
#[tokio::test]
async fn test_rejected_refresh_clears_store() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();
    let store = seeded_store(&dir);

    Mock::given(method("GET"))
        .and(path("/account"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = Gateway::new(&test_config(&server), store.clone()).unwrap();
    let err = gateway.get("/account").await.unwrap_err();

    assert!(err.downcast_ref::<SessionExpired>().is_some());
    assert!(store.load().is_none());
}

/// Without a stored session the request goes out unauthenticated and a 401
/// is returned as-is; no refresh is attempted.
#[tokio::test]
async fn test_no_session_sends_unauthenticated() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();
    let store = SessionStore::new(dir.path().join("session.json"));

    Mock::given(method("GET"))
        .and(path("/account"))
        .and(|request: &Request| !request.headers.contains_key("authorization"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let gateway = Gateway::new(&test_config(&server), store).unwrap();
    let response = gateway.get("/account").await.unwrap();

    assert_eq!(response.status(), 401);
}

/// Non-401 failures are propagated without any refresh or retry.
#[tokio::test]
async fn test_server_error_is_not_retried() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();
    let store = seeded_store(&dir);

    Mock::given(method("GET"))
        .and(path("/account"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let gateway = Gateway::new(&test_config(&server), store.clone()).unwrap();
    let response = gateway.get("/account").await.unwrap();

    assert_eq!(response.status(), 500);
    assert_eq!(store.load().unwrap().access_token, "stale-access");
}
