//! Sans-IO state machine for one logical API call.
//!
//! # Design
//! An `Exchange` never touches the network. The driver sends the request
//! returned by `request()`, feeds the response to `advance`, and keeps going
//! until it gets `Step::Done` or an error:
//!
//! ```text
//! Original --2xx--> Done
//!          --401--> Refreshing --2xx--> Retrying --2xx--> Done
//!                   Refreshing --resume--> Resumed --2xx--> Done
//!                                                  --401--> Refreshing
//! ```
//!
//! A call refreshes at most once. `Resumed` covers a call that skipped its
//! own refresh because a concurrent call had already rotated the token; if
//! that token is rejected too, the call still gets its one refresh. The
//! refresh call and the final retry go through the bare classification where
//! every non-2xx status is an `UnexpectedStatus`, so the refresh can never
//! recurse. `RequestExecutor`
//! drives this machine over a `Transport`; the FFI lets a host drive it with
//! its own HTTP stack.

use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::token_store::{TokenKey, TokenStore};
use crate::types::{Envelope, ErrorPayload, RefreshTokenBody, TokenPair};

/// What the driver has to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Send this request and feed its response back.
    Send(HttpRequest),
    /// Send this token refresh request and feed its response back.
    Refresh(HttpRequest),
    /// The call succeeded with this response body.
    Done(Vec<u8>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Original,
    Refreshing,
    Resumed,
    Retrying,
    Finished,
}

/// One API call with at most one refresh-and-retry.
#[derive(Debug, Clone)]
pub struct Exchange {
    original: HttpRequest,
    refresh_url: Option<String>,
    phase: Phase,
    sent_token: Option<String>,
    resumed: bool,
}

impl Exchange {
    /// A call that answers a 401 by refreshing tokens at `refresh_url` and
    /// retrying once.
    pub fn authenticated(request: HttpRequest, refresh_url: impl Into<String>) -> Self {
        Self {
            sent_token: request.bearer_token().map(str::to_string),
            original: request,
            refresh_url: Some(refresh_url.into()),
            phase: Phase::Original,
            resumed: false,
        }
    }

    /// A call that reports a 401 as `UnexpectedStatus(401)`.
    pub fn unauthenticated(request: HttpRequest) -> Self {
        Self {
            sent_token: request.bearer_token().map(str::to_string),
            original: request,
            refresh_url: None,
            phase: Phase::Original,
            resumed: false,
        }
    }

    /// The first request to send.
    pub fn request(&self) -> &HttpRequest {
        &self.original
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// Access token carried by the last request sent to the endpoint itself.
    pub fn sent_token(&self) -> Option<&str> {
        self.sent_token.as_deref()
    }

    /// Whether a pending refresh may be skipped with
    /// `resume_with_current_token`. Allowed once per exchange.
    pub fn can_resume(&self) -> bool {
        self.phase == Phase::Refreshing && !self.resumed
    }

    /// Feed the response to the most recently issued request.
    ///
    /// Any error finishes the exchange.
    pub fn advance(&mut self, response: HttpResponse, store: &dyn TokenStore) -> Result<Step, ApiError> {
        let phase = std::mem::replace(&mut self.phase, Phase::Finished);
        match phase {
            Phase::Original => self.on_original(response, store),
            Phase::Refreshing => self.on_refresh(response, store),
            Phase::Resumed => self.on_resumed(response, store),
            Phase::Retrying => check_bare(response).map(Step::Done),
            Phase::Finished => Err(ApiError::ExchangeFinished),
        }
    }

    /// Skip the pending refresh and retry with the access token already in
    /// `store`. Used when a concurrent call refreshed while this one waited.
    pub fn resume_with_current_token(&mut self, store: &dyn TokenStore) -> Result<Step, ApiError> {
        if !self.can_resume() {
            self.phase = Phase::Finished;
            return Err(ApiError::ExchangeFinished);
        }
        match store.read(TokenKey::AccessToken) {
            Some(token) => {
                self.phase = Phase::Resumed;
                self.resumed = true;
                Ok(Step::Send(self.send_with(&token)))
            }
            None => {
                self.phase = Phase::Finished;
                Err(ApiError::NoResponse)
            }
        }
    }

    fn on_original(&mut self, response: HttpResponse, store: &dyn TokenStore) -> Result<Step, ApiError> {
        debug!(status = response.status, "classifying response");
        if !has_valid_status(&response) {
            return Err(ApiError::NoResponse);
        }
        match response.status {
            200..=299 => Ok(Step::Done(response.body)),
            400 => Err(application_error(&response.body)),
            401 => match &self.refresh_url {
                Some(url) => {
                    let request = refresh_request(url, store)?;
                    self.phase = Phase::Refreshing;
                    Ok(Step::Refresh(request))
                }
                // fetch_url_data path: kept as observed in the app, even
                // though every other 401 triggers a refresh.
                None => Err(ApiError::UnexpectedStatus(401)),
            },
            status => Err(ApiError::UnexpectedStatus(status)),
        }
    }

    fn on_refresh(&mut self, response: HttpResponse, store: &dyn TokenStore) -> Result<Step, ApiError> {
        let body = check_bare(response).map_err(|e| {
            warn!(error = %e, "token refresh rejected");
            ApiError::NoResponse
        })?;
        let tokens: Envelope<TokenPair> = serde_json::from_slice(&body).map_err(|e| {
            warn!(error = %e, "token refresh returned an unreadable body");
            ApiError::NoResponse
        })?;

        store.update_pair(&tokens.data);
        info!("access token rotated");

        self.phase = Phase::Retrying;
        Ok(Step::Send(self.send_with(&tokens.data.access_token)))
    }

    fn on_resumed(&mut self, response: HttpResponse, store: &dyn TokenStore) -> Result<Step, ApiError> {
        if response.status != 401 {
            return check_bare(response).map(Step::Done);
        }
        let Some(url) = &self.refresh_url else {
            return Err(ApiError::UnexpectedStatus(401));
        };
        debug!("token from concurrent refresh rejected, refreshing");
        let request = refresh_request(url, store)?;
        self.phase = Phase::Refreshing;
        Ok(Step::Refresh(request))
    }

    fn send_with(&mut self, token: &str) -> HttpRequest {
        self.sent_token = Some(token.to_string());
        self.original.with_bearer(token)
    }
}

/// POST `{"refreshToken": ...}` to `url`. A missing refresh token is sent as
/// an empty string and left for the server to reject.
pub fn refresh_request(url: &str, store: &dyn TokenStore) -> Result<HttpRequest, ApiError> {
    let body = RefreshTokenBody {
        refresh_token: store.read(TokenKey::RefreshToken).unwrap_or_default(),
    };
    HttpRequest::json(HttpMethod::Post, url, &body).map_err(|e| {
        warn!(error = %e, "could not build token refresh request");
        ApiError::NoResponse
    })
}

/// Classification for the refresh call and the retry: 2xx or nothing.
fn check_bare(response: HttpResponse) -> Result<Vec<u8>, ApiError> {
    debug!(status = response.status, "classifying response without refresh");
    if !has_valid_status(&response) {
        return Err(ApiError::NoResponse);
    }
    if response.is_success() {
        Ok(response.body)
    } else {
        Err(ApiError::UnexpectedStatus(response.status))
    }
}

fn has_valid_status(response: &HttpResponse) -> bool {
    (100..=599).contains(&response.status)
}

fn application_error(body: &[u8]) -> ApiError {
    match serde_json::from_slice::<ErrorPayload>(body) {
        Ok(payload) => ApiError::Application(payload),
        Err(e) => ApiError::decode(e),
    }
}
