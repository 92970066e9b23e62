//! Error types for the roome client core.
//!
//! # Design
//! One enum covers every way a call can fail so callers can match on the
//! category that matters to them. `Application` carries the decoded 400 body
//! because the UI shows its message inline. `NoResponse` doubles as "the
//! refresh flow could not produce credentials", which callers treat as a
//! forced sign-out.

use thiserror::Error;

use crate::types::ErrorPayload;

/// Errors returned by the request pipeline.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced an HTTP response (no connectivity, timeout).
    #[error("transport failed: {0}")]
    Transport(String),

    /// The server answered 400 with a structured business error.
    #[error("application error: {}", .0.message)]
    Application(ErrorPayload),

    /// The server answered with a status this call does not handle.
    #[error("unexpected HTTP status {0}")]
    UnexpectedStatus(u16),

    /// The response body could not be decoded into the expected shape.
    #[error("decoding failed: {0}")]
    Decode(String),

    /// No valid HTTP response, or the token refresh produced no credentials.
    #[error("no usable response")]
    NoResponse,

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Client configuration is missing or malformed.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// `Exchange::advance` was called after the exchange completed.
    #[error("exchange already finished")]
    ExchangeFinished,
}

impl ApiError {
    /// Whether the caller should drop the session and send the user to sign-in.
    pub fn requires_sign_in(&self) -> bool {
        matches!(self, ApiError::NoResponse | ApiError::UnexpectedStatus(401))
    }

    pub(crate) fn decode(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}
