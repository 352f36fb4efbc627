//! Integration tests for the credential exchange flow using wiremock.
//!
//! These cover the retry/backoff schedule, the no-retry rule for plain 4xx
//! rejections, cancellation precedence, and deduplication of repeated
//! identity assertions.

use std::time::{Duration, Instant};

use serde_json::json;
use session::{ApiClient, CredentialExchanger, SessionStore};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::config::AppConfig;
use common::error::AuthError;

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

fn test_client(uri: &str) -> (SessionStore, ApiClient) {
    let store = SessionStore::new();
    let config = AppConfig {
        api_base_url: uri.to_string(),
        ..AppConfig::default()
    };
    let api = ApiClient::new(&config, store.clone()).expect("build api client");
    (store, api)
}

fn exchanger(api: &ApiClient) -> CredentialExchanger {
    CredentialExchanger::new(api, Duration::from_secs(2))
}

fn session_body(token: &str) -> serde_json::Value {
    json!({
        "ok": true,
        "accessToken": token,
        "user": {
            "id": 7,
            "nombre": "Luis",
            "apellido": "Mora",
            "roles": ["CLIENTE"],
            "telefonoE164": "+5215512345678",
            "telefonoVerificado": true
        }
    })
}

#[tokio::test]
async fn duplicate_assertions_trigger_one_backend_exchange() -> anyhow::Result<()> {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/firebase/exchange"))
        .and(body_json(json!({ "idToken": "idTokenA" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_body("T1")))
        .expect(1)
        .mount(&server)
        .await;

    let (store, api) = test_client(&server.uri());
    let exchanger = exchanger(&api);
    let cancel = CancellationToken::new();

    let first = exchanger.observe("idTokenA", &cancel).await?;
    // a near-duplicate notification for the same underlying credential
    let second = exchanger.observe("idTokenA", &cancel).await?;

    assert_eq!(first.access_token, "T1");
    assert_eq!(second.access_token, first.access_token);
    assert_eq!(
        second.user.as_ref().map(|u| u.id),
        first.user.as_ref().map(|u| u.id)
    );
    assert_eq!(store.access_token().as_deref(), Some("T1"));
    assert!(store.user().is_some());
    Ok(())
}

#[tokio::test]
async fn concurrent_observations_share_one_in_flight_exchange() -> anyhow::Result<()> {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/firebase/exchange"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(session_body("T1"))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (_store, api) = test_client(&server.uri());
    let exchanger = exchanger(&api);
    let cancel = CancellationToken::new();

    let (a, b) = tokio::join!(
        exchanger.observe("idTokenA", &cancel),
        exchanger.observe("idTokenA", &cancel)
    );

    assert_eq!(a?.access_token, "T1");
    assert_eq!(b?.access_token, "T1");
    Ok(())
}

#[tokio::test]
async fn transient_failures_follow_the_backoff_schedule() -> anyhow::Result<()> {
    init_tracing();
    let server = MockServer::start().await;

    // attempts 1 and 2 hit a 503, attempt 3 succeeds
    Mock::given(method("POST"))
        .and(path("/auth/firebase/exchange"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/firebase/exchange"))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_body("T1")))
        .expect(1)
        .mount(&server)
        .await;

    let (_store, api) = test_client(&server.uri());
    let exchanger = exchanger(&api);
    let cancel = CancellationToken::new();

    let started = Instant::now();
    let outcome = exchanger.exchange("idTokenA", &cancel).await?;
    let elapsed = started.elapsed();

    assert_eq!(outcome.access_token, "T1");
    // 250ms after attempt 1 plus 750ms after attempt 2
    assert!(elapsed >= Duration::from_millis(1000), "elapsed: {elapsed:?}");
    assert!(elapsed < Duration::from_millis(2500), "elapsed: {elapsed:?}");
    Ok(())
}

#[tokio::test]
async fn plain_4xx_rejection_is_not_retried() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/firebase/exchange"))
        .respond_with(ResponseTemplate::new(400))
        .expect(1)
        .mount(&server)
        .await;

    let (_store, api) = test_client(&server.uri());
    let exchanger = exchanger(&api);
    let cancel = CancellationToken::new();

    let err = exchanger
        .exchange("expired-token", &cancel)
        .await
        .expect_err("400 must fail the exchange");
    assert_eq!(err, AuthError::Rejected { status: 400 });
}

#[tokio::test]
async fn rate_limiting_exhausts_the_retry_budget() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/firebase/exchange"))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&server)
        .await;

    let (_store, api) = test_client(&server.uri());
    let exchanger = exchanger(&api);
    let cancel = CancellationToken::new();

    let err = exchanger
        .exchange("idTokenA", &cancel)
        .await
        .expect_err("429 on every attempt must fail");
    assert_eq!(err, AuthError::Upstream { status: 429 });
}

#[tokio::test]
async fn cancellation_beats_the_remaining_retry_budget() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/firebase/exchange"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let (_store, api) = test_client(&server.uri());
    let exchanger = exchanger(&api);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let started = Instant::now();
    let err = exchanger
        .exchange("idTokenA", &cancel)
        .await
        .expect_err("cancelled exchange must fail");
    assert_eq!(err, AuthError::Cancelled);
    // no backoff sleeps may run once the signal is set
    assert!(started.elapsed() < Duration::from_millis(200));
}

#[tokio::test]
async fn cancellation_mid_flight_leaves_the_store_untouched() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/firebase/exchange"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(session_body("T1"))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let (store, api) = test_client(&server.uri());
    let exchanger = exchanger(&api);
    let cancel = CancellationToken::new();

    let (observation, _) = tokio::join!(exchanger.observe("idTokenA", &cancel), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
    });
    let err = observation.expect_err("cancelled observation must fail");

    assert_eq!(err, AuthError::Cancelled);
    // the stale result must never reach the store
    assert!(store.access_token().is_none());
    assert!(store.user().is_none());
}

#[tokio::test]
async fn failed_exchange_clears_the_session() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/firebase/exchange"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let (store, api) = test_client(&server.uri());
    store.set_token(Some("stale".to_string()));
    let exchanger = exchanger(&api);
    let cancel = CancellationToken::new();

    let err = exchanger
        .observe("idTokenA", &cancel)
        .await
        .expect_err("403 must fail the exchange");
    assert_eq!(err, AuthError::Rejected { status: 403 });
    assert!(store.access_token().is_none());
}
