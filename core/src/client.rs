//! Request builders and response parsers for the roome endpoints.
//!
//! # Design
//! `RoomeClient` holds only configuration and never performs I/O. Each
//! endpoint has a `build_*` method producing an `HttpRequest`; endpoints that
//! return data have a matching `parse_*`. `Session` wires these to the
//! executor, and the FFI exposes the same requests to hosts that do their
//! own networking.

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest};
use crate::types::{
    DefaultProfile, Envelope, Nickname, Profile, RoomCount, RoomCountRange, SelectionId, SignInRequest, StrengthIds,
    TermsAgreement, TokenPair,
};

pub const SIGN_IN_PATH: &str = "/auth/signin";
pub const ROOM_COUNT_PATH: &str = "/profiles/room-count";
pub const ROOM_RANGE_PATH: &str = "/profiles/room-count-range";
pub const STRENGTHS_PATH: &str = "/profiles/strengths";
pub const HORROR_POSITION_PATH: &str = "/profiles/horror-theme-positions";
pub const DEVICE_LOCK_PATH: &str = "/profiles/device-lock-preferences";
pub const COLOR_PATH: &str = "/profiles/color";
pub const PROFILE_PATH: &str = "/profiles";
pub const DEFAULT_PROFILE_PATH: &str = "/profiles/defaults";
pub const MEMBERS_PATH: &str = "/members";
pub const NICKNAME_PATH: &str = "/members/nickname";
pub const TERMS_PATH: &str = "/members/terms-agreement";

#[derive(Debug, Clone)]
pub struct RoomeClient {
    config: ClientConfig,
}

impl RoomeClient {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn build_sign_in(&self, input: &SignInRequest) -> Result<HttpRequest, ApiError> {
        HttpRequest::json(HttpMethod::Post, self.config.url(SIGN_IN_PATH), input)
    }

    pub fn build_register_room_count(&self, access_token: &str, count: u32) -> Result<HttpRequest, ApiError> {
        let req = HttpRequest::json(HttpMethod::Put, self.config.url(ROOM_COUNT_PATH), &RoomCount { count })?;
        Ok(req.with_bearer(access_token))
    }

    pub fn build_register_room_range(&self, access_token: &str, min: u32, max: u32) -> Result<HttpRequest, ApiError> {
        let body = RoomCountRange {
            min_count: min,
            max_count: max,
        };
        let req = HttpRequest::json(HttpMethod::Put, self.config.url(ROOM_RANGE_PATH), &body)?;
        Ok(req.with_bearer(access_token))
    }

    pub fn build_register_strengths(&self, access_token: &str, ids: &[u32]) -> Result<HttpRequest, ApiError> {
        let body = StrengthIds { ids: ids.to_vec() };
        let req = HttpRequest::json(HttpMethod::Put, self.config.url(STRENGTHS_PATH), &body)?;
        Ok(req.with_bearer(access_token))
    }

    pub fn build_register_horror_position(&self, access_token: &str, id: u32) -> Result<HttpRequest, ApiError> {
        self.build_selection(access_token, HORROR_POSITION_PATH, id)
    }

    pub fn build_register_device_and_lock(&self, access_token: &str, id: u32) -> Result<HttpRequest, ApiError> {
        self.build_selection(access_token, DEVICE_LOCK_PATH, id)
    }

    pub fn build_register_color(&self, access_token: &str, id: u32) -> Result<HttpRequest, ApiError> {
        self.build_selection(access_token, COLOR_PATH, id)
    }

    fn build_selection(&self, access_token: &str, path: &str, id: u32) -> Result<HttpRequest, ApiError> {
        let req = HttpRequest::json(HttpMethod::Put, self.config.url(path), &SelectionId { id })?;
        Ok(req.with_bearer(access_token))
    }

    pub fn build_register_nickname(&self, access_token: &str, nickname: &str) -> Result<HttpRequest, ApiError> {
        let body = Nickname {
            nickname: nickname.to_string(),
        };
        let req = HttpRequest::json(HttpMethod::Put, self.config.url(NICKNAME_PATH), &body)?;
        Ok(req.with_bearer(access_token))
    }

    pub fn build_agree_terms(&self, access_token: &str, terms: &TermsAgreement) -> Result<HttpRequest, ApiError> {
        let req = HttpRequest::json(HttpMethod::Put, self.config.url(TERMS_PATH), terms)?;
        Ok(req.with_bearer(access_token))
    }

    pub fn build_default_profile(&self, access_token: &str) -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, self.config.url(DEFAULT_PROFILE_PATH)).with_bearer(access_token)
    }

    pub fn build_my_profile(&self, access_token: &str) -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, self.config.url(PROFILE_PATH)).with_bearer(access_token)
    }

    pub fn build_withdraw(&self, access_token: &str) -> HttpRequest {
        HttpRequest::new(HttpMethod::Delete, self.config.url(MEMBERS_PATH)).with_bearer(access_token)
    }

    pub fn parse_tokens(&self, body: &[u8]) -> Result<TokenPair, ApiError> {
        let envelope: Envelope<TokenPair> = serde_json::from_slice(body).map_err(ApiError::decode)?;
        Ok(envelope.data)
    }

    pub fn parse_profile(&self, body: &[u8]) -> Result<Profile, ApiError> {
        let envelope: Envelope<Profile> = serde_json::from_slice(body).map_err(ApiError::decode)?;
        Ok(envelope.data)
    }

    pub fn parse_default_profile(&self, body: &[u8]) -> Result<DefaultProfile, ApiError> {
        let envelope: Envelope<DefaultProfile> = serde_json::from_slice(body).map_err(ApiError::decode)?;
        Ok(envelope.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> RoomeClient {
        RoomeClient::new(ClientConfig::new("http://localhost:3000"))
    }

    fn json_body(req: &HttpRequest) -> serde_json::Value {
        serde_json::from_str(req.body.as_deref().unwrap()).unwrap()
    }

    #[test]
    fn build_sign_in_has_no_authorization() {
        let req = client()
            .build_sign_in(&SignInRequest {
                provider: "kakao".to_string(),
                id_token: "kakao-id-token".to_string(),
            })
            .unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://localhost:3000/auth/signin");
        assert!(req.header("Authorization").is_none());
        let body = json_body(&req);
        assert_eq!(body["provider"], "kakao");
        assert_eq!(body["idToken"], "kakao-id-token");
    }

    #[test]
    fn build_register_strengths_produces_put_with_bearer() {
        let req = client().build_register_strengths("A1", &[1, 4, 7]).unwrap();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.url, "http://localhost:3000/profiles/strengths");
        assert_eq!(req.header("Authorization"), Some("Bearer A1"));
        assert_eq!(req.header("Content-Type"), Some("application/json"));
        assert_eq!(json_body(&req), serde_json::json!({ "ids": [1, 4, 7] }));
    }

    #[test]
    fn build_register_horror_position_body() {
        let req = client().build_register_horror_position("A1", 2).unwrap();
        assert_eq!(req.url, "http://localhost:3000/profiles/horror-theme-positions");
        assert_eq!(json_body(&req), serde_json::json!({ "id": 2 }));
    }

    #[test]
    fn selection_builders_share_body_shape() {
        let device = client().build_register_device_and_lock("A1", 2).unwrap();
        assert_eq!(device.method, HttpMethod::Put);
        assert_eq!(device.url, "http://localhost:3000/profiles/device-lock-preferences");
        assert_eq!(json_body(&device), serde_json::json!({ "id": 2 }));

        let color = client().build_register_color("A1", 5).unwrap();
        assert_eq!(color.url, "http://localhost:3000/profiles/color");
        assert_eq!(color.header("Authorization"), Some("Bearer A1"));
        assert_eq!(json_body(&color), serde_json::json!({ "id": 5 }));
    }

    #[test]
    fn build_nickname_and_terms() {
        let nickname = client().build_register_nickname("A1", "roomie").unwrap();
        assert_eq!(nickname.url, "http://localhost:3000/members/nickname");
        assert_eq!(json_body(&nickname), serde_json::json!({ "nickname": "roomie" }));

        let terms = TermsAgreement {
            age_over_fourteen: true,
            service: true,
            personal_information: true,
            marketing: false,
        };
        let req = client().build_agree_terms("A1", &terms).unwrap();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.url, "http://localhost:3000/members/terms-agreement");
        assert_eq!(json_body(&req)["ageOverFourteen"], true);
        assert_eq!(json_body(&req)["marketing"], false);
    }

    #[test]
    fn build_default_profile_is_authorized_get() {
        let req = client().build_default_profile("A1");
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost:3000/profiles/defaults");
        assert_eq!(req.bearer_token(), Some("A1"));
    }

    #[test]
    fn parse_default_profile_unwraps_envelope() {
        let body = br#"{"data":{"strengths":[{"id":1,"title":"observation"}],"colors":[]}}"#;
        let catalogue = client().parse_default_profile(body).unwrap();
        assert_eq!(catalogue.strengths[0].id, 1);
        assert!(catalogue.colors.is_empty());
        assert!(catalogue.device_lock_preferences.is_empty());
    }

    #[test]
    fn build_room_count_and_range() {
        let count = client().build_register_room_count("A1", 42).unwrap();
        assert_eq!(json_body(&count), serde_json::json!({ "count": 42 }));

        let range = client().build_register_room_range("A1", 10, 30).unwrap();
        assert_eq!(range.url, "http://localhost:3000/profiles/room-count-range");
        assert_eq!(json_body(&range), serde_json::json!({ "minCount": 10, "maxCount": 30 }));
    }

    #[test]
    fn missing_access_token_still_sends_bearer_prefix() {
        let req = client().build_my_profile("");
        assert_eq!(req.header("Authorization"), Some("Bearer "));
        assert!(req.body.is_none());
    }

    #[test]
    fn build_withdraw_is_delete() {
        let req = client().build_withdraw("A1");
        assert_eq!(req.method, HttpMethod::Delete);
        assert_eq!(req.url, "http://localhost:3000/members");
    }

    #[test]
    fn parse_profile_success() {
        let body = br#"{"data":{"nickname":"roomie","roomCount":"30~50","strengths":["observation"]}}"#;
        let profile = client().parse_profile(body).unwrap();
        assert_eq!(profile.nickname, "roomie");
        assert_eq!(profile.room_count.as_deref(), Some("30~50"));
        assert_eq!(profile.strengths, vec!["observation".to_string()]);
        assert!(profile.color.is_none());
    }

    #[test]
    fn parse_tokens_bad_json() {
        let err = client().parse_tokens(b"not json").unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }
}
