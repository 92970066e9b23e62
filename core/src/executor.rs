//! Async driver for `Exchange` over a `Transport`.
//!
//! # Design
//! `RequestExecutor` adds exactly two things on top of the state machine:
//! the network round-trips, and a single-flight guard around the token
//! refresh. Calls that hit 401 at the same time queue on `refresh_lock`.
//! Under the lock a call compares the stored access token with the one it
//! sent: if they differ, another call already rotated it and this one
//! retries with the stored token; otherwise it refreshes.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::error::ApiError;
use crate::exchange::{Exchange, Step};
use crate::http::{HttpMethod, HttpRequest};
use crate::token_store::{TokenKey, TokenStore};
use crate::transport::Transport;

pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    tokens: Arc<dyn TokenStore>,
    refresh_url: String,
    refresh_lock: Mutex<()>,
}

impl RequestExecutor {
    pub fn new(transport: Arc<dyn Transport>, tokens: Arc<dyn TokenStore>, refresh_url: impl Into<String>) -> Self {
        Self {
            transport,
            tokens,
            refresh_url: refresh_url.into(),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn tokens(&self) -> &dyn TokenStore {
        self.tokens.as_ref()
    }

    /// Execute `request`, refreshing tokens and retrying once on 401.
    #[instrument(name = "api_request", skip_all, fields(http.method = %request.method, http.url = %request.url))]
    pub async fn execute(&self, request: HttpRequest) -> Result<Vec<u8>, ApiError> {
        let exchange = Exchange::authenticated(request, self.refresh_url.clone());
        self.drive(exchange).await
    }

    /// `execute` followed by strict JSON decoding of the body.
    pub async fn fetch_decoded_value<T: DeserializeOwned>(&self, request: HttpRequest) -> Result<T, ApiError> {
        let body = self.execute(request).await?;
        serde_json::from_slice(&body).map_err(ApiError::decode)
    }

    /// Plain GET of `url`.
    ///
    /// Unlike `execute`, a 401 here is returned as `UnexpectedStatus(401)`
    /// without a refresh. The app has always behaved this way; keep it until
    /// the asymmetry is settled.
    #[instrument(name = "url_fetch", skip(self))]
    pub async fn fetch_url_data(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        self.execute_without_refresh(HttpRequest::new(HttpMethod::Get, url)).await
    }

    /// Execute `request` with `execute`'s classification but no 401 handling.
    pub async fn execute_without_refresh(&self, request: HttpRequest) -> Result<Vec<u8>, ApiError> {
        self.drive(Exchange::unauthenticated(request)).await
    }

    async fn drive(&self, mut exchange: Exchange) -> Result<Vec<u8>, ApiError> {
        let response = self.transport.send(exchange.request()).await?;
        let mut step = exchange.advance(response, self.tokens())?;
        loop {
            step = match step {
                Step::Done(body) => return Ok(body),
                Step::Send(request) => {
                    let response = self.transport.send(&request).await?;
                    exchange.advance(response, self.tokens())?
                }
                Step::Refresh(request) => self.refresh(&mut exchange, &request).await?,
            };
        }
    }

    async fn refresh(&self, exchange: &mut Exchange, request: &HttpRequest) -> Result<Step, ApiError> {
        let _guard = self.refresh_lock.lock().await;
        let current = self.tokens.read(TokenKey::AccessToken);
        if exchange.can_resume() && current.is_some() && current.as_deref() != exchange.sent_token() {
            debug!("tokens already refreshed by a concurrent call");
            return exchange.resume_with_current_token(self.tokens());
        }

        let response = self.transport.send(request).await?;
        exchange.advance(response, self.tokens())
    }
}
