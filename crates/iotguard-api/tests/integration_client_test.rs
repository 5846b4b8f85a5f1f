// Integration tests for the identity, realtime, and weather clients using wiremock.
#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use iotguard_api::{
    Error, ForecastClient, GeocodingClient, IdentityClient, RealtimeClient, ReconnectConfig,
    StaticToken, TokenProvider,
};
use iotguard_api::transport::TransportConfig;

// ── Helpers ─────────────────────────────────────────────────────────

fn api_key() -> SecretString {
    SecretString::from("test-key")
}

async fn identity() -> (MockServer, IdentityClient) {
    let server = MockServer::start().await;
    let client = IdentityClient::with_client(reqwest::Client::new(), server.uri(), server.uri(), api_key());
    (server, client)
}

async fn realtime() -> (MockServer, RealtimeClient) {
    let server = MockServer::start().await;
    let client = RealtimeClient::new(server.uri(), &TransportConfig::default()).unwrap();
    (server, client)
}

/// Hands out `token-1`, `token-2`, ... one per connection attempt.
#[derive(Default)]
struct CountingToken(AtomicUsize);

#[async_trait]
impl TokenProvider for CountingToken {
    async fn id_token(&self) -> Result<Option<SecretString>, Error> {
        let n = self.0.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Some(SecretString::from(format!("token-{n}"))))
    }
}

fn fast_reconnect() -> ReconnectConfig {
    ReconnectConfig {
        initial_delay: Duration::from_millis(50),
        max_delay: Duration::from_millis(200),
        max_retries: None,
    }
}

fn event_stream(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(body.to_owned())
}

/// Wait until the snapshot satisfies `done`, returning it.
async fn wait_for(
    rx: &mut tokio::sync::watch::Receiver<Option<serde_json::Value>>,
    done: impl Fn(&serde_json::Value) -> bool,
) -> serde_json::Value {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Some(v) = rx.borrow_and_update().clone() {
                if done(&v) {
                    return v;
                }
            }
            rx.changed().await.unwrap();
        }
    })
    .await
    .unwrap()
}

/// The first connection ends with `tail`; the stream must come back with
/// a fresh token and take the second connection's value.
async fn assert_reconnects_after(tail: &str) {
    let (server, client) = realtime().await;

    let first = format!(
        "event: put\ndata: {{\"path\":\"/\",\"data\":{{\"temperature\":24.5,\"ldr\":120}}}}\n\n{tail}"
    );
    Mock::given(method("GET"))
        .and(path("/sensors.json"))
        .and(query_param("auth", "token-1"))
        .respond_with(event_stream(&first))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sensors.json"))
        .and(query_param("auth", "token-2"))
        .respond_with(event_stream(
            "event: put\ndata: {\"path\":\"/\",\"data\":{\"ldr\":999}}\n\n",
        ))
        .mount(&server)
        .await;

    let tokens = Arc::new(CountingToken::default());
    let handle = client
        .stream("sensors", tokens.clone(), fast_reconnect(), CancellationToken::new())
        .unwrap();
    let mut rx = handle.subscribe();

    let snapshot = wait_for(&mut rx, |v| v["ldr"] == json!(999)).await;
    assert_eq!(snapshot, json!({"ldr": 999}));
    assert!(tokens.0.load(Ordering::SeqCst) >= 2);
    handle.shutdown();
}

// ── Identity ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_sign_in_with_password() {
    let (server, client) = identity().await;

    Mock::given(method("POST"))
        .and(path("/v1/accounts:signInWithPassword"))
        .and(query_param("key", "test-key"))
        .and(body_json(json!({
            "email": "ops@example.com",
            "password": "hunter22",
            "returnSecureToken": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "localId": "uid-1",
            "email": "ops@example.com",
            "idToken": "id-abc",
            "refreshToken": "refresh-abc",
            "expiresIn": "3600"
        })))
        .mount(&server)
        .await;

    let tokens = client
        .sign_in_with_password("ops@example.com", &SecretString::from("hunter22"))
        .await
        .unwrap();

    assert_eq!(tokens.user_id, "uid-1");
    assert_eq!(tokens.email.as_deref(), Some("ops@example.com"));
    assert_eq!(tokens.id_token.expose_secret(), "id-abc");
    assert!(!tokens.expires_within(chrono::Duration::minutes(30)));
}

#[tokio::test]
async fn test_sign_in_rejected() {
    let (server, client) = identity().await;

    Mock::given(method("POST"))
        .and(path("/v1/accounts:signInWithPassword"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "code": 400, "message": "INVALID_LOGIN_CREDENTIALS", "errors": [] }
        })))
        .mount(&server)
        .await;

    let err = client
        .sign_in_with_password("ops@example.com", &SecretString::from("nope"))
        .await
        .unwrap_err();
    assert!(err.is_credentials_rejected(), "got {err:?}");
}

#[tokio::test]
async fn test_sign_up_weak_password() {
    let (server, client) = identity().await;

    Mock::given(method("POST"))
        .and(path("/v1/accounts:signUp"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "code": 400, "message": "WEAK_PASSWORD : Password should be at least 6 characters" }
        })))
        .mount(&server)
        .await;

    let err = client
        .sign_up("new@example.com", &SecretString::from("123"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Authentication { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_sign_up_invalid_email_keeps_provider_message() {
    let (server, client) = identity().await;

    Mock::given(method("POST"))
        .and(path("/v1/accounts:signUp"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "code": 400, "message": "INVALID_EMAIL" }
        })))
        .mount(&server)
        .await;

    let err = client
        .sign_up("not-an-email", &SecretString::from("hunter22"))
        .await
        .unwrap_err();
    assert!(
        matches!(err, Error::Authentication { ref message } if message == "INVALID_EMAIL"),
        "got {err:?}"
    );
    assert!(!err.is_credentials_rejected());
}

#[tokio::test]
async fn test_refresh_token() {
    let (server, client) = identity().await;

    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .and(query_param("key", "test-key"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "expires_in": "3600",
            "token_type": "Bearer",
            "refresh_token": "refresh-def",
            "id_token": "id-def",
            "user_id": "uid-1",
            "project_id": "123"
        })))
        .mount(&server)
        .await;

    let tokens = client.refresh(&SecretString::from("refresh-abc")).await.unwrap();
    assert_eq!(tokens.user_id, "uid-1");
    assert_eq!(tokens.refresh_token.expose_secret(), "refresh-def");
    assert!(tokens.email.is_none());
}

#[tokio::test]
async fn test_refresh_revoked() {
    let (server, client) = identity().await;

    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "code": 400, "message": "TOKEN_EXPIRED" }
        })))
        .mount(&server)
        .await;

    let err = client.refresh(&SecretString::from("old")).await.unwrap_err();
    assert!(err.is_auth_expired());
}

// ── Realtime REST ───────────────────────────────────────────────────

#[tokio::test]
async fn test_get_profile_with_auth() {
    let (server, client) = realtime().await;

    Mock::given(method("GET"))
        .and(path("/users/uid-1.json"))
        .and(query_param("auth", "id-abc"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"role": "admin", "email": "a@b.c"})),
        )
        .mount(&server)
        .await;

    let token = SecretString::from("id-abc");
    let value = client.get("users/uid-1", Some(&token)).await.unwrap();
    assert_eq!(value, Some(json!({"role": "admin", "email": "a@b.c"})));
}

#[tokio::test]
async fn test_get_missing_location_is_none() {
    let (server, client) = realtime().await;

    Mock::given(method("GET"))
        .and(path("/users/ghost.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .mount(&server)
        .await;

    assert_eq!(client.get("/users/ghost", None).await.unwrap(), None);
}

#[tokio::test]
async fn test_put_control_value() {
    let (server, client) = realtime().await;

    Mock::given(method("PUT"))
        .and(path("/controls/servo1.json"))
        .and(query_param("print", "silent"))
        .and(body_json(json!(true)))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client.put("controls/servo1", &json!(true), None).await.unwrap();
}

#[tokio::test]
async fn test_put_permission_denied() {
    let (server, client) = realtime().await;

    Mock::given(method("PUT"))
        .and(path("/controls/system.json"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": "Permission denied"})),
        )
        .mount(&server)
        .await;

    let err = client.put("controls/system", &json!(false), None).await.unwrap_err();
    assert!(
        matches!(err, Error::Database { status: 401, ref message } if message == "Permission denied"),
        "got {err:?}"
    );
}

// ── Realtime event stream ───────────────────────────────────────────

#[tokio::test]
async fn test_stream_delivers_snapshots() {
    let (server, client) = realtime().await;

    let body = concat!(
        "event: put\n",
        "data: {\"path\":\"/\",\"data\":{\"temperature\":24.5,\"ldr\":120}}\n\n",
        "event: keep-alive\n",
        "data: null\n\n",
        "event: patch\n",
        "data: {\"path\":\"/\",\"data\":{\"ldr\":480}}\n\n",
    );

    Mock::given(method("GET"))
        .and(path("/sensors.json"))
        .and(header("accept", "text/event-stream"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(body),
        )
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let reconnect = ReconnectConfig {
        initial_delay: Duration::from_secs(5),
        ..ReconnectConfig::default()
    };
    let handle = client
        .stream("sensors", Arc::new(StaticToken::default()), reconnect, cancel.clone())
        .unwrap();
    let mut rx = handle.subscribe();

    let snapshot = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Some(v) = rx.borrow_and_update().clone() {
                if v["ldr"] == json!(480) {
                    return v;
                }
            }
            rx.changed().await.unwrap();
        }
    })
    .await
    .unwrap();

    assert_eq!(snapshot, json!({"temperature": 24.5, "ldr": 480}));
    handle.shutdown();
    assert!(cancel.is_cancelled());
}

#[tokio::test]
async fn test_stream_reconnects_when_body_ends() {
    let (server, client) = realtime().await;

    Mock::given(method("GET"))
        .and(path("/sensors.json"))
        .respond_with(event_stream(
            "event: put\ndata: {\"path\":\"/\",\"data\":{\"temperature\":24.5,\"ldr\":120}}\n\n",
        ))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sensors.json"))
        .respond_with(event_stream(
            "event: put\ndata: {\"path\":\"/\",\"data\":{\"ldr\":999}}\n\n",
        ))
        .mount(&server)
        .await;

    let handle = client
        .stream(
            "sensors",
            Arc::new(StaticToken::default()),
            fast_reconnect(),
            CancellationToken::new(),
        )
        .unwrap();
    let mut rx = handle.subscribe();

    let first = wait_for(&mut rx, |v| v["ldr"] == json!(120)).await;
    assert_eq!(first["temperature"], json!(24.5));

    // The first put after reconnecting replaces the whole value.
    let second = wait_for(&mut rx, |v| v["ldr"] == json!(999)).await;
    assert_eq!(second, json!({"ldr": 999}));
    handle.shutdown();
}

#[tokio::test]
async fn test_stream_cancel_event_reconnects_with_fresh_token() {
    assert_reconnects_after("event: cancel\ndata: \"Permission denied\"\n\n").await;
}

#[tokio::test]
async fn test_stream_auth_revoked_reconnects_with_fresh_token() {
    assert_reconnects_after("event: auth_revoked\ndata: \"credential is no longer valid\"\n\n")
        .await;
}

#[tokio::test]
async fn test_stream_shutdown_stops_without_reconnecting() {
    let (server, client) = realtime().await;

    Mock::given(method("GET"))
        .and(path("/sensors.json"))
        .respond_with(event_stream(
            "event: put\ndata: {\"path\":\"/\",\"data\":{\"ldr\":120}}\n\n",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let reconnect = ReconnectConfig {
        initial_delay: Duration::from_millis(200),
        ..fast_reconnect()
    };
    let handle = client
        .stream("sensors", Arc::new(StaticToken::default()), reconnect, CancellationToken::new())
        .unwrap();
    let mut rx = handle.subscribe();
    wait_for(&mut rx, |v| v["ldr"] == json!(120)).await;

    handle.shutdown();
    let closed = tokio::time::timeout(Duration::from_secs(5), rx.changed())
        .await
        .unwrap();
    assert!(closed.is_err());
    assert_eq!(*rx.borrow(), Some(json!({"ldr": 120})));
}

#[tokio::test]
async fn test_stream_gives_up_after_max_retries() {
    let (server, client) = realtime().await;

    Mock::given(method("GET"))
        .and(path("/sensors.json"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let reconnect = ReconnectConfig {
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(50),
        max_retries: Some(2),
    };
    let handle = client
        .stream("sensors", Arc::new(StaticToken::default()), reconnect, CancellationToken::new())
        .unwrap();
    let mut rx = handle.subscribe();

    // The sender is dropped once the loop gives up.
    let closed = tokio::time::timeout(Duration::from_secs(5), rx.changed())
        .await
        .unwrap();
    assert!(closed.is_err());
    assert_eq!(*rx.borrow(), None);
}

// ── Weather ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_geocode_search() {
    let server = MockServer::start().await;
    let client = GeocodingClient::with_client(reqwest::Client::new(), server.uri());

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Dhaka"))
        .and(query_param("format", "json"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"lat": "23.8104753", "lon": "90.4119873", "display_name": "Dhaka, Bangladesh"}
        ])))
        .mount(&server)
        .await;

    let results = client.search("Dhaka", 1).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].display_name, "Dhaka, Bangladesh");
    assert!((results[0].lat - 23.810_475_3).abs() < 1e-6);
}

#[tokio::test]
async fn test_forecast_hourly() {
    let server = MockServer::start().await;
    let client = ForecastClient::with_client(reqwest::Client::new(), server.uri());

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("hourly", "temperature_2m,precipitation_probability"))
        .and(query_param("timezone", "auto"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "latitude": 23.8,
            "longitude": 90.4,
            "hourly": {
                "time": ["2026-10-16T00:00", "2026-10-16T01:00"],
                "temperature_2m": [27.3, 26.9],
                "precipitation_probability": [65, 40]
            }
        })))
        .mount(&server)
        .await;

    let hourly = client.hourly(23.8, 90.4).await.unwrap();
    assert_eq!(hourly.time.len(), 2);
    assert_eq!(hourly.temperature_2m[0], Some(27.3));
    assert_eq!(hourly.precipitation_probability[0], Some(65.0));
}

#[tokio::test]
async fn test_forecast_server_error() {
    let server = MockServer::start().await;
    let client = ForecastClient::with_client(reqwest::Client::new(), server.uri());

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let err = client.hourly(0.0, 0.0).await.unwrap_err();
    assert!(matches!(err, Error::Http { status: 502, .. }));
    assert!(err.is_transient());
}
