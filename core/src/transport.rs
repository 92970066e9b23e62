//! The network seam: send one `HttpRequest`, get one `HttpResponse`.
//!
//! `UreqTransport` is the stock implementation. Status codes are returned as
//! data rather than errors so that `Exchange` owns every status decision;
//! only failures that never produced a response become `ApiError::Transport`.

use std::time::Duration;

use async_trait::async_trait;
use tracing::instrument;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Executes a single HTTP round-trip.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// Blocking ureq agent run on tokio's blocking pool.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self { agent }
    }

    /// Perform the round-trip on the calling thread.
    pub fn send_blocking(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let agent = &self.agent;
        let body = request.body.as_deref().map(str::as_bytes);

        let result = match request.method {
            HttpMethod::Get => with_headers(agent.get(&request.url), &request.headers).call(),
            HttpMethod::Delete => with_headers(agent.delete(&request.url), &request.headers).call(),
            HttpMethod::Post => send_with_body(with_headers(agent.post(&request.url), &request.headers), body),
            HttpMethod::Put => send_with_body(with_headers(agent.put(&request.url), &request.headers), body),
            HttpMethod::Patch => send_with_body(with_headers(agent.patch(&request.url), &request.headers), body),
        };
        let mut response = result.map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
            .collect();
        let body = response
            .body_mut()
            .read_to_vec()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(HttpResponse { status, headers, body })
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(crate::config::DEFAULT_TIMEOUT_SECS))
    }
}

#[async_trait]
impl Transport for UreqTransport {
    #[instrument(name = "http_send", skip_all, fields(http.method = %request.method, http.url = %request.url))]
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let transport = self.clone();
        let request = request.clone();
        tokio::task::spawn_blocking(move || transport.send_blocking(&request))
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?
    }
}

fn with_headers<B>(mut builder: ureq::RequestBuilder<B>, headers: &[(String, String)]) -> ureq::RequestBuilder<B> {
    for (key, value) in headers {
        builder = builder.header(key.as_str(), value.as_str());
    }
    builder
}

fn send_with_body(
    builder: ureq::RequestBuilder<ureq::typestate::WithBody>,
    body: Option<&[u8]>,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match body {
        Some(bytes) => builder.send(bytes),
        None => builder.send_empty(),
    }
}
