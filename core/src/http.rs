//! HTTP request and response types shared by every layer of the core.
//!
//! # Design
//! Requests and responses are plain data. `RoomeClient` builds `HttpRequest`
//! values, a `Transport` (or the host, through the FFI) turns them into
//! `HttpResponse` values, and `Exchange` classifies the result. Nothing in
//! this module performs I/O.
//!
//! Header names are compared case-insensitively, as HTTP requires. Bodies
//! on requests are already-serialized JSON; bodies on responses are raw bytes
//! so a successful call can hand them back untouched.

use std::fmt;

use serde::Serialize;

use crate::error::ApiError;

pub const AUTHORIZATION: &str = "authorization";
pub const CONTENT_TYPE: &str = "content-type";

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// A request with no headers and no body.
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// A request whose body is `payload` encoded as JSON.
    pub fn json<T: Serialize>(
        method: HttpMethod,
        url: impl Into<String>,
        payload: &T,
    ) -> Result<Self, ApiError> {
        let body = serde_json::to_string(payload).map_err(|e| ApiError::Serialization(e.to_string()))?;
        let mut request = Self::new(method, url);
        request.set_header(CONTENT_TYPE, "application/json");
        request.body = Some(body);
        Ok(request)
    }

    /// First value of header `name`, ignoring ASCII case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Replace every existing value of `name` (in any letter case) with `value`.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.into()));
    }

    /// Copy of this request carrying `Authorization: Bearer <token>`.
    pub fn with_bearer(&self, token: &str) -> Self {
        let mut request = self.clone();
        request.set_header(AUTHORIZATION, format!("Bearer {token}"));
        request
    }

    /// Token carried in the `Authorization: Bearer` header, if any.
    pub fn bearer_token(&self) -> Option<&str> {
        self.header(AUTHORIZATION)?.strip_prefix("Bearer ")
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }
}
