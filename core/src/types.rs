//! Wire DTOs for the roome API.
//!
//! # Design
//! These types mirror the mock-server's schema but are defined independently;
//! the end-to-end integration test catches any drift. Field names go over the
//! wire in camelCase.

use serde::{Deserialize, Serialize};

/// Access and refresh credentials issued by the auth endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// `{ "data": ... }` wrapper used by every roome response with a payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Envelope<T> {
    pub data: T,
}

/// Body of the token refresh request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenBody {
    pub refresh_token: String,
}

/// Structured business error returned with status 400.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    pub provider: String,
    pub id_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomCount {
    pub count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomCountRange {
    pub min_count: u32,
    pub max_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrengthIds {
    pub ids: Vec<u32>,
}

/// Body of every "pick one from the catalogue" call: horror position,
/// device-and-lock preference and colour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionId {
    pub id: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Nickname {
    pub nickname: String,
}

/// Sign-up terms. The first three are mandatory on the server side.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TermsAgreement {
    pub age_over_fourteen: bool,
    pub service: bool,
    pub personal_information: bool,
    pub marketing: bool,
}

/// Entry of a profile catalogue, as listed on the selection screens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogItem {
    pub id: u32,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// Profile card background.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
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

/// Everything a member can choose from while building a profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DefaultProfile {
    #[serde(default)]
    pub strengths: Vec<CatalogItem>,
    #[serde(default)]
    pub horror_theme_positions: Vec<CatalogItem>,
    #[serde(default)]
    pub device_lock_preferences: Vec<CatalogItem>,
    #[serde(default)]
    pub colors: Vec<ColorOption>,
}

/// The signed-in member's profile as shown on the "my profile" screen.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub nickname: String,
    #[serde(default)]
    pub room_count: Option<String>,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub horror_theme_position: Option<String>,
    #[serde(default)]
    pub device_lock_preference: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}
