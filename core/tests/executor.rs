//! Refresh-and-retry behaviour of `RequestExecutor` against in-memory transports.
//!
//! `ScriptedTransport` replays canned responses in order and records every
//! request it was handed, so each test can assert exactly which round-trips
//! happened.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use roome_core::{
    ApiError, HttpMethod, HttpRequest, HttpResponse, MemoryTokenStore, RequestExecutor, TokenKey, TokenPair,
    TokenStore, Transport,
};
use serde::Deserialize;

const REFRESH_URL: &str = "http://roome.test/auth/token";
const PROFILE_URL: &str = "http://roome.test/profiles";

struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, ApiError>>>,
    sent: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    fn new(responses: Vec<Result<HttpResponse, ApiError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            sent: Mutex::new(Vec::new()),
        })
    }

    fn sent(&self) -> Vec<HttpRequest> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        self.sent.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected request to {}", request.url))
    }
}

fn tokens(access: &str, refresh: &str) -> TokenPair {
    TokenPair {
        access_token: access.to_string(),
        refresh_token: refresh.to_string(),
    }
}

fn ok(body: &str) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::new(200, body))
}

fn status(code: u16) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::new(code, ""))
}

fn refreshed(access: &str, refresh: &str) -> Result<HttpResponse, ApiError> {
    ok(&format!(
        r#"{{"data":{{"accessToken":"{access}","refreshToken":"{refresh}"}}}}"#
    ))
}

fn setup(responses: Vec<Result<HttpResponse, ApiError>>) -> (Arc<ScriptedTransport>, Arc<MemoryTokenStore>, RequestExecutor) {
    let transport = ScriptedTransport::new(responses);
    let store = Arc::new(MemoryTokenStore::with_tokens(&tokens("A1", "R1")));
    let executor = RequestExecutor::new(transport.clone(), store.clone(), REFRESH_URL);
    (transport, store, executor)
}

fn profile_request() -> HttpRequest {
    HttpRequest::new(HttpMethod::Get, PROFILE_URL).with_bearer("A1")
}

#[tokio::test]
async fn success_returns_exact_bytes() {
    let raw = vec![0xffu8, 0x00, b'{', 0x7f];
    let (transport, _, executor) = setup(vec![Ok(HttpResponse::new(201, raw.clone()))]);
    let body = executor.execute(profile_request()).await.unwrap();
    assert_eq!(body, raw);
    assert_eq!(transport.sent().len(), 1);
}

#[tokio::test]
async fn repeated_success_shares_no_state() {
    let (transport, store, executor) = setup(vec![ok("one"), ok("two")]);
    assert_eq!(executor.execute(profile_request()).await.unwrap(), b"one");
    assert_eq!(executor.execute(profile_request()).await.unwrap(), b"two");
    let sent = transport.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0], sent[1]);
    assert_eq!(store.read(TokenKey::AccessToken).as_deref(), Some("A1"));
    assert_eq!(store.read(TokenKey::RefreshToken).as_deref(), Some("R1"));
}

#[tokio::test]
async fn bad_request_surfaces_payload_without_retry() {
    let (transport, _, executor) = setup(vec![Ok(HttpResponse::new(
        400,
        r#"{"code":7,"message":"nickname too long"}"#,
    ))]);
    match executor.execute(profile_request()).await.unwrap_err() {
        ApiError::Application(payload) => assert_eq!(payload.message, "nickname too long"),
        other => panic!("expected Application, got {other:?}"),
    }
    assert_eq!(transport.sent().len(), 1);
}

#[tokio::test]
async fn bad_request_with_unreadable_body_is_decode_error() {
    let (_, _, executor) = setup(vec![Ok(HttpResponse::new(400, "<html>"))]);
    let err = executor.execute(profile_request()).await.unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
}

#[tokio::test]
async fn other_status_is_not_retried() {
    let (transport, _, executor) = setup(vec![status(500)]);
    let err = executor.execute(profile_request()).await.unwrap_err();
    assert!(matches!(err, ApiError::UnexpectedStatus(500)));
    assert_eq!(transport.sent().len(), 1);
}

#[tokio::test]
async fn transport_failure_propagates_immediately() {
    let (transport, _, executor) = setup(vec![Err(ApiError::Transport("offline".to_string()))]);
    let err = executor.execute(profile_request()).await.unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
    assert_eq!(transport.sent().len(), 1);
}

#[tokio::test]
async fn unauthorized_refreshes_once_and_retries_once() {
    let (transport, store, executor) = setup(vec![status(401), refreshed("A2", "R2"), ok("profile")]);

    let body = executor.execute(profile_request()).await.unwrap();
    assert_eq!(body, b"profile");

    let sent = transport.sent();
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[0].bearer_token(), Some("A1"));

    assert_eq!(sent[1].method, HttpMethod::Post);
    assert_eq!(sent[1].url, REFRESH_URL);
    let refresh_body: serde_json::Value = serde_json::from_str(sent[1].body.as_deref().unwrap()).unwrap();
    assert_eq!(refresh_body, serde_json::json!({ "refreshToken": "R1" }));

    assert_eq!(sent[2].url, PROFILE_URL);
    assert_eq!(sent[2].header("Authorization"), Some("Bearer A2"));

    assert_eq!(store.read(TokenKey::AccessToken).as_deref(), Some("A2"));
    assert_eq!(store.read(TokenKey::RefreshToken).as_deref(), Some("R2"));
}

#[tokio::test]
async fn failed_refresh_is_no_response_and_skips_retry() {
    let (transport, store, executor) = setup(vec![status(401), status(401)]);
    let err = executor.execute(profile_request()).await.unwrap_err();
    assert!(matches!(err, ApiError::NoResponse));
    assert!(err.requires_sign_in());
    assert_eq!(transport.sent().len(), 2);
    assert_eq!(store.read(TokenKey::AccessToken).as_deref(), Some("A1"));
}

#[tokio::test]
async fn refresh_with_bad_body_is_no_response() {
    let (transport, _, executor) = setup(vec![status(401), ok(r#"{"data":{}}"#)]);
    let err = executor.execute(profile_request()).await.unwrap_err();
    assert!(matches!(err, ApiError::NoResponse));
    assert_eq!(transport.sent().len(), 2);
}

#[tokio::test]
async fn retried_request_failure_propagates_without_second_refresh() {
    let (transport, _, executor) = setup(vec![status(401), refreshed("A2", "R2"), status(401)]);
    let err = executor.execute(profile_request()).await.unwrap_err();
    assert!(matches!(err, ApiError::UnexpectedStatus(401)));
    assert_eq!(transport.sent().len(), 3);
}

#[tokio::test]
async fn transport_failure_during_refresh_propagates() {
    let (_, _, executor) = setup(vec![status(401), Err(ApiError::Transport("reset".to_string()))]);
    let err = executor.execute(profile_request()).await.unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
}

#[tokio::test]
async fn fetch_url_data_does_not_refresh_on_401() {
    let (transport, store, executor) = setup(vec![status(401)]);
    let err = executor.fetch_url_data("http://roome.test/share/image.png").await.unwrap_err();
    assert!(matches!(err, ApiError::UnexpectedStatus(401)));

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].method, HttpMethod::Get);
    assert!(sent[0].headers.is_empty());
    assert_eq!(store.read(TokenKey::AccessToken).as_deref(), Some("A1"));
}

#[tokio::test]
async fn fetch_url_data_classifies_400() {
    let (_, _, executor) = setup(vec![Ok(HttpResponse::new(400, r#"{"message":"gone"}"#))]);
    let err = executor.fetch_url_data("http://roome.test/x").await.unwrap_err();
    assert!(matches!(err, ApiError::Application(_)));
}

#[derive(Debug, Deserialize, PartialEq)]
struct Nickname {
    nickname: String,
}

#[tokio::test]
async fn fetch_decoded_value_decodes_after_refresh() {
    let (_, _, executor) = setup(vec![status(401), refreshed("A2", "R2"), ok(r#"{"nickname":"roomie"}"#)]);
    let value: Nickname = executor.fetch_decoded_value(profile_request()).await.unwrap();
    assert_eq!(value.nickname, "roomie");
}

#[tokio::test]
async fn fetch_decoded_value_reports_decode_error() {
    let (_, _, executor) = setup(vec![ok(r#"{"name":"roomie"}"#)]);
    let err = executor
        .fetch_decoded_value::<Nickname>(profile_request())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
}

/// Backend that only accepts the current access token and rotates tokens on
/// refresh. The first two protected requests wait for each other so both
/// callers are guaranteed to see a 401 before either refreshes.
struct RotatingBackend {
    current: Mutex<String>,
    refreshes: AtomicUsize,
    protected_calls: AtomicUsize,
    gate: tokio::sync::Barrier,
}

#[async_trait]
impl Transport for RotatingBackend {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        if request.url == REFRESH_URL {
            let n = self.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::task::yield_now().await;
            let access = format!("A{}", n + 1);
            *self.current.lock().unwrap() = access.clone();
            return refreshed(&access, &format!("R{}", n + 1));
        }
        if self.protected_calls.fetch_add(1, Ordering::SeqCst) < 2 {
            self.gate.wait().await;
        }
        let current = self.current.lock().unwrap().clone();
        if request.bearer_token() == Some(current.as_str()) {
            ok("profile")
        } else {
            status(401)
        }
    }
}

#[tokio::test]
async fn concurrent_unauthorized_calls_share_one_refresh() {
    let backend = Arc::new(RotatingBackend {
        current: Mutex::new("A-fresh".to_string()),
        refreshes: AtomicUsize::new(0),
        protected_calls: AtomicUsize::new(0),
        gate: tokio::sync::Barrier::new(2),
    });
    let store = Arc::new(MemoryTokenStore::with_tokens(&tokens("A1", "R1")));
    let executor = RequestExecutor::new(backend.clone(), store.clone(), REFRESH_URL);

    let (a, b) = tokio::join!(
        executor.execute(profile_request()),
        executor.execute(profile_request())
    );
    assert_eq!(a.unwrap(), b"profile");
    assert_eq!(b.unwrap(), b"profile");
    assert_eq!(backend.refreshes.load(Ordering::SeqCst), 1);
    assert_eq!(store.read(TokenKey::AccessToken).as_deref(), Some("A2"));
}

/// Backend whose first protected request is held until the test releases it,
/// so a call's 401 can arrive after another call has refreshed and finished.
struct StaggeredBackend {
    current: Mutex<String>,
    refreshes: AtomicUsize,
    protected_calls: AtomicUsize,
    release_first: tokio::sync::Notify,
}

impl StaggeredBackend {
    fn revoke_current(&self) {
        *self.current.lock().unwrap() = "revoked".to_string();
    }
}

#[async_trait]
impl Transport for StaggeredBackend {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        if request.url == REFRESH_URL {
            let n = self.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
            let access = format!("A{}", n + 1);
            *self.current.lock().unwrap() = access.clone();
            return refreshed(&access, &format!("R{}", n + 1));
        }
        if self.protected_calls.fetch_add(1, Ordering::SeqCst) == 0 {
            self.release_first.notified().await;
        }
        let current = self.current.lock().unwrap().clone();
        if request.bearer_token() == Some(current.as_str()) {
            ok("profile")
        } else {
            status(401)
        }
    }
}

#[tokio::test]
async fn late_unauthorized_call_refreshes_when_rotated_token_is_rejected() {
    let backend = Arc::new(StaggeredBackend {
        current: Mutex::new("A-fresh".to_string()),
        refreshes: AtomicUsize::new(0),
        protected_calls: AtomicUsize::new(0),
        release_first: tokio::sync::Notify::new(),
    });
    let store = Arc::new(MemoryTokenStore::with_tokens(&tokens("A1", "R1")));
    let executor = RequestExecutor::new(backend.clone(), store.clone(), REFRESH_URL);

    let late = executor.execute(profile_request());
    let early = async {
        let out = executor.execute(profile_request()).await;
        // the token the early call rotated to is gone before the late 401 lands
        backend.revoke_current();
        backend.release_first.notify_one();
        out
    };
    let (late, early) = tokio::join!(late, early);

    assert_eq!(early.unwrap(), b"profile");
    assert_eq!(late.unwrap(), b"profile");
    assert_eq!(backend.refreshes.load(Ordering::SeqCst), 2);
    assert_eq!(store.read(TokenKey::AccessToken).as_deref(), Some("A3"));
    assert_eq!(store.read(TokenKey::RefreshToken).as_deref(), Some("R3"));
}

#[tokio::test]
async fn sequential_unauthorized_calls_each_refresh() {
    let (transport, store, executor) = setup(vec![
        status(401),
        refreshed("A2", "R2"),
        ok("first"),
        status(401),
        refreshed("A3", "R3"),
        ok("second"),
    ]);
    assert_eq!(executor.execute(profile_request()).await.unwrap(), b"first");

    let request = HttpRequest::new(HttpMethod::Get, PROFILE_URL).with_bearer("A2");
    assert_eq!(executor.execute(request).await.unwrap(), b"second");

    let sent = transport.sent();
    assert_eq!(sent.len(), 6);
    let refresh_body: serde_json::Value = serde_json::from_str(sent[4].body.as_deref().unwrap()).unwrap();
    assert_eq!(refresh_body["refreshToken"], "R2");
    assert_eq!(sent[5].bearer_token(), Some("A3"));
    assert_eq!(store.read(TokenKey::AccessToken).as_deref(), Some("A3"));
}
