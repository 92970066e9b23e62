//! In-memory stand-in for the roome backend.
//!
//! Issues uuid access/refresh tokens, rotates them on `/auth/token`, guards
//! the member and profile endpoints with bearer checks, and exposes a few
//! `/test/*` hooks so black-box clients can force token expiry and count
//! refreshes.

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

const STRENGTHS: [&str; 6] = [
    "observation",
    "reasoning",
    "teamwork",
    "leadership",
    "calmness",
    "speed",
];
const HORROR_POSITIONS: [&str; 3] = ["scaredy", "bystander", "vanguard"];
const DEVICE_LOCKS: [&str; 3] = ["device", "lock", "either"];
// (title, mode, shape, direction, start, end)
const COLORS: [(&str, &str, &str, &str, &str, &str); 4] = [
    ("red", "gradient", "linear", "tl_br", "#FF453C", "#FFA8A4"),
    ("orange", "gradient", "linear", "tl_br", "#FF8A00", "#FFC47A"),
    ("blue", "gradient", "linear", "tl_br", "#2F6FFF", "#9CB9FF"),
    ("black", "solid", "linear", "tl_br", "#1A1A1A", "#1A1A1A"),
];
const NICKNAME_MAX_CHARS: usize = 8;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: i64,
    pub message: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub nickname: String,
    pub room_count: Option<String>,
    pub strengths: Vec<String>,
    pub horror_theme_position: Option<String>,
    pub device_lock_preference: Option<String>,
    pub color: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogItem {
    pub id: u32,
    pub title: String,
    pub description: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ColorOption {
    pub id: u32,
    pub title: String,
    pub mode: String,
    pub shape: String,
    pub direction: String,
    pub start_color: String,
    pub end_color: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DefaultProfile {
    pub strengths: Vec<CatalogItem>,
    pub horror_theme_positions: Vec<CatalogItem>,
    pub device_lock_preferences: Vec<CatalogItem>,
    pub colors: Vec<ColorOption>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignIn {
    pub provider: String,
    pub id_token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Refresh {
    pub refresh_token: String,
}

#[derive(Deserialize)]
pub struct RoomCount {
    pub count: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomCountRange {
    pub min_count: u32,
    pub max_count: u32,
}

#[derive(Deserialize)]
pub struct Ids {
    pub ids: Vec<u32>,
}

#[derive(Deserialize)]
pub struct Id {
    pub id: u32,
}

#[derive(Deserialize)]
pub struct Nickname {
    pub nickname: String,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Terms {
    pub age_over_fourteen: bool,
    pub service: bool,
    pub personal_information: bool,
    pub marketing: bool,
}

#[derive(Default)]
struct Tokens {
    access: HashSet<String>,
    refresh: HashSet<String>,
}

/// Server-side state shared by every handler.
#[derive(Default)]
pub struct MockState {
    tokens: RwLock<Tokens>,
    profile: RwLock<Option<Profile>>,
    terms: RwLock<Option<Terms>>,
    refresh_calls: AtomicUsize,
}

impl MockState {
    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// Invalidate every access token; refresh tokens stay valid.
    pub async fn expire_access_tokens(&self) {
        self.tokens.write().await.access.clear();
    }

    /// Terms recorded by the last successful agreement call.
    pub async fn agreed_terms(&self) -> Option<Terms> {
        *self.terms.read().await
    }

    async fn issue(&self) -> TokenPair {
        let pair = TokenPair {
            access_token: Uuid::new_v4().to_string(),
            refresh_token: Uuid::new_v4().to_string(),
        };
        let mut tokens = self.tokens.write().await;
        tokens.access.insert(pair.access_token.clone());
        tokens.refresh.insert(pair.refresh_token.clone());
        pair
    }
}

pub type Shared = Arc<MockState>;

pub fn app() -> Router {
    app_with_state(Arc::new(MockState::default()))
}

pub fn app_with_state(state: Shared) -> Router {
    Router::new()
        .route("/auth/signin", post(sign_in))
        .route("/auth/token", post(refresh))
        .route("/members/terms-agreement", put(agree_terms))
        .route("/members/nickname", put(nickname))
        .route("/profiles", get(my_profile))
        .route("/profiles/defaults", get(default_profile))
        .route("/profiles/room-count", put(room_count))
        .route("/profiles/room-count-range", put(room_count_range))
        .route("/profiles/strengths", put(strengths))
        .route("/profiles/horror-theme-positions", put(horror_position))
        .route("/profiles/device-lock-preferences", put(device_lock))
        .route("/profiles/color", put(color))
        .route("/members", delete(withdraw))
        .route("/status/{code}", get(status))
        .route("/test/expire-access-tokens", post(expire))
        .route("/test/refresh-count", get(refresh_count))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_state(listener, Arc::new(MockState::default())).await
}

pub async fn run_with_state(listener: TcpListener, state: Shared) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(state)).await
}

fn bad_request(code: i64, message: &str) -> Response {
    let payload = ErrorPayload {
        code,
        message: message.to_string(),
    };
    (StatusCode::BAD_REQUEST, Json(payload)).into_response()
}

async fn authorize(state: &MockState, headers: &HeaderMap) -> Result<(), Response> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default();
    if state.tokens.read().await.access.contains(token) {
        Ok(())
    } else {
        debug!("rejected bearer token");
        Err(StatusCode::UNAUTHORIZED.into_response())
    }
}

async fn sign_in(State(state): State<Shared>, Json(input): Json<SignIn>) -> Response {
    if !matches!(input.provider.as_str(), "kakao" | "apple") {
        return bad_request(1001, "unsupported provider");
    }
    if input.id_token.is_empty() {
        return bad_request(1002, "id token is empty");
    }
    let pair = state.issue().await;
    state.profile.write().await.get_or_insert_with(|| Profile {
        nickname: "roomie".to_string(),
        ..Profile::default()
    });
    info!(provider = %input.provider, "member signed in");
    Json(Envelope { data: pair }).into_response()
}

async fn refresh(State(state): State<Shared>, Json(input): Json<Refresh>) -> Response {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    let known = state.tokens.write().await.refresh.remove(&input.refresh_token);
    if !known {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(Envelope { data: state.issue().await }).into_response()
}

async fn agree_terms(State(state): State<Shared>, headers: HeaderMap, Json(input): Json<Terms>) -> Response {
    if let Err(denied) = authorize(&state, &headers).await {
        return denied;
    }
    if !(input.age_over_fourteen && input.service && input.personal_information) {
        return bad_request(2005, "mandatory terms must be accepted");
    }
    *state.terms.write().await = Some(input);
    StatusCode::OK.into_response()
}

async fn nickname(State(state): State<Shared>, headers: HeaderMap, Json(input): Json<Nickname>) -> Response {
    if let Err(denied) = authorize(&state, &headers).await {
        return denied;
    }
    let chars = input.nickname.chars().count();
    if !(2..=NICKNAME_MAX_CHARS).contains(&chars) || !input.nickname.chars().all(char::is_alphanumeric) {
        return bad_request(2004, "nickname must be 2 to 8 letters or digits");
    }
    update_profile(&state, |p| p.nickname = input.nickname).await
}

fn catalogue(titles: &[&str]) -> Vec<CatalogItem> {
    titles
        .iter()
        .zip(1..)
        .map(|(title, id)| CatalogItem {
            id,
            title: title.to_string(),
            description: format!("{title} member"),
        })
        .collect()
}

async fn default_profile(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(denied) = authorize(&state, &headers).await {
        return denied;
    }
    let colors = COLORS
        .iter()
        .zip(1..)
        .map(|((title, mode, shape, direction, start, end), id)| ColorOption {
            id,
            title: title.to_string(),
            mode: mode.to_string(),
            shape: shape.to_string(),
            direction: direction.to_string(),
            start_color: start.to_string(),
            end_color: end.to_string(),
        })
        .collect();
    let data = DefaultProfile {
        strengths: catalogue(&STRENGTHS),
        horror_theme_positions: catalogue(&HORROR_POSITIONS),
        device_lock_preferences: catalogue(&DEVICE_LOCKS),
        colors,
    };
    Json(Envelope { data }).into_response()
}

async fn my_profile(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(denied) = authorize(&state, &headers).await {
        return denied;
    }
    match state.profile.read().await.clone() {
        Some(profile) => Json(Envelope { data: profile }).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn update_profile(state: &MockState, apply: impl FnOnce(&mut Profile)) -> Response {
    let mut profile = state.profile.write().await;
    apply(profile.get_or_insert_with(Profile::default));
    StatusCode::OK.into_response()
}

async fn room_count(State(state): State<Shared>, headers: HeaderMap, Json(input): Json<RoomCount>) -> Response {
    if let Err(denied) = authorize(&state, &headers).await {
        return denied;
    }
    update_profile(&state, |p| p.room_count = Some(input.count.to_string())).await
}

async fn room_count_range(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(input): Json<RoomCountRange>,
) -> Response {
    if let Err(denied) = authorize(&state, &headers).await {
        return denied;
    }
    if input.min_count > input.max_count {
        return bad_request(2001, "minimum room count exceeds maximum");
    }
    update_profile(&state, |p| {
        p.room_count = Some(format!("{}~{}", input.min_count, input.max_count))
    })
    .await
}

async fn strengths(State(state): State<Shared>, headers: HeaderMap, Json(input): Json<Ids>) -> Response {
    if let Err(denied) = authorize(&state, &headers).await {
        return denied;
    }
    let names: Option<Vec<String>> = input
        .ids
        .iter()
        .map(|id| STRENGTHS.get((*id as usize).wrapping_sub(1)).map(|s| s.to_string()))
        .collect();
    match names {
        Some(names) if !names.is_empty() => update_profile(&state, |p| p.strengths = names).await,
        _ => bad_request(2002, "unknown strength id"),
    }
}

async fn horror_position(State(state): State<Shared>, headers: HeaderMap, Json(input): Json<Id>) -> Response {
    if let Err(denied) = authorize(&state, &headers).await {
        return denied;
    }
    match HORROR_POSITIONS.get((input.id as usize).wrapping_sub(1)) {
        Some(name) => update_profile(&state, |p| p.horror_theme_position = Some(name.to_string())).await,
        None => bad_request(2003, "unknown horror theme position"),
    }
}

async fn device_lock(State(state): State<Shared>, headers: HeaderMap, Json(input): Json<Id>) -> Response {
    if let Err(denied) = authorize(&state, &headers).await {
        return denied;
    }
    match DEVICE_LOCKS.get((input.id as usize).wrapping_sub(1)) {
        Some(name) => update_profile(&state, |p| p.device_lock_preference = Some(name.to_string())).await,
        None => bad_request(2006, "unknown device and lock preference"),
    }
}

async fn color(State(state): State<Shared>, headers: HeaderMap, Json(input): Json<Id>) -> Response {
    if let Err(denied) = authorize(&state, &headers).await {
        return denied;
    }
    match COLORS.get((input.id as usize).wrapping_sub(1)) {
        Some((title, ..)) => update_profile(&state, |p| p.color = Some(title.to_string())).await,
        None => bad_request(2007, "unknown color"),
    }
}

async fn withdraw(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(denied) = authorize(&state, &headers).await {
        return denied;
    }
    *state.tokens.write().await = Tokens::default();
    *state.profile.write().await = None;
    *state.terms.write().await = None;
    info!("member withdrawn");
    StatusCode::NO_CONTENT.into_response()
}

/// Answer with an arbitrary status, for clients probing status handling.
async fn status(Path(code): Path<u16>) -> Response {
    if code == 400 {
        return bad_request(3000, "requested failure");
    }
    match StatusCode::from_u16(code) {
        Ok(status) => (status, format!("status {code}")).into_response(),
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn expire(State(state): State<Shared>) -> StatusCode {
    state.expire_access_tokens().await;
    StatusCode::NO_CONTENT
}

async fn refresh_count(State(state): State<Shared>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "count": state.refresh_calls() }))
}
