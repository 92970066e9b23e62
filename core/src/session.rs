//! Explicit session context.
//!
//! A `Session` owns everything a signed-in member's calls need: the endpoint
//! builder, the executor and, through it, the token store. Screens receive a
//! `&Session` instead of reaching for global state.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::client::RoomeClient;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::executor::RequestExecutor;
use crate::token_store::{TokenKey, TokenStore};
use crate::transport::{Transport, UreqTransport};
use crate::types::{DefaultProfile, Profile, SignInRequest, TermsAgreement, TokenPair};

pub struct Session {
    client: RoomeClient,
    executor: RequestExecutor,
}

impl Session {
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>, tokens: Arc<dyn TokenStore>) -> Self {
        let executor = RequestExecutor::new(transport, tokens, config.refresh_url());
        Self {
            client: RoomeClient::new(config),
            executor,
        }
    }

    /// Session backed by the stock ureq transport.
    pub fn with_ureq(config: ClientConfig, tokens: Arc<dyn TokenStore>) -> Self {
        let transport = Arc::new(UreqTransport::new(config.timeout()));
        Self::new(config, transport, tokens)
    }

    pub fn client(&self) -> &RoomeClient {
        &self.client
    }

    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    pub fn tokens(&self) -> &dyn TokenStore {
        self.executor.tokens()
    }

    pub fn is_signed_in(&self) -> bool {
        self.tokens().read(TokenKey::AccessToken).is_some()
    }

    fn access_token(&self) -> String {
        self.tokens().read(TokenKey::AccessToken).unwrap_or_default()
    }

    /// Exchange a social-login id token for roome credentials and store them.
    #[instrument(skip(self, id_token))]
    pub async fn sign_in(&self, provider: &str, id_token: &str) -> Result<TokenPair, ApiError> {
        let request = self.client.build_sign_in(&SignInRequest {
            provider: provider.to_string(),
            id_token: id_token.to_string(),
        })?;
        let body = self.executor.execute_without_refresh(request).await?;
        let tokens = self.client.parse_tokens(&body)?;
        self.tokens().update_pair(&tokens);
        info!("signed in");
        Ok(tokens)
    }

    /// Record the sign-up terms. Rejected unless the mandatory ones are set.
    pub async fn agree_terms(&self, terms: &TermsAgreement) -> Result<(), ApiError> {
        let request = self.client.build_agree_terms(&self.access_token(), terms)?;
        self.executor.execute(request).await.map(drop)
    }

    /// Set or change the nickname. Form violations come back as
    /// `ApiError::Application` carrying the server's message.
    pub async fn register_nickname(&self, nickname: &str) -> Result<(), ApiError> {
        let request = self.client.build_register_nickname(&self.access_token(), nickname)?;
        self.executor.execute(request).await.map(drop)
    }

    pub async fn register_room_count(&self, count: u32) -> Result<(), ApiError> {
        let request = self.client.build_register_room_count(&self.access_token(), count)?;
        self.executor.execute(request).await.map(drop)
    }

    pub async fn register_room_range(&self, min: u32, max: u32) -> Result<(), ApiError> {
        let request = self.client.build_register_room_range(&self.access_token(), min, max)?;
        self.executor.execute(request).await.map(drop)
    }

    pub async fn register_strengths(&self, ids: &[u32]) -> Result<(), ApiError> {
        let request = self.client.build_register_strengths(&self.access_token(), ids)?;
        self.executor.execute(request).await.map(drop)
    }

    pub async fn register_horror_position(&self, id: u32) -> Result<(), ApiError> {
        let request = self.client.build_register_horror_position(&self.access_token(), id)?;
        self.executor.execute(request).await.map(drop)
    }

    pub async fn register_device_and_lock(&self, id: u32) -> Result<(), ApiError> {
        let request = self.client.build_register_device_and_lock(&self.access_token(), id)?;
        self.executor.execute(request).await.map(drop)
    }

    pub async fn register_color(&self, id: u32) -> Result<(), ApiError> {
        let request = self.client.build_register_color(&self.access_token(), id)?;
        self.executor.execute(request).await.map(drop)
    }

    /// Catalogues the profile screens choose from.
    pub async fn default_profile(&self) -> Result<DefaultProfile, ApiError> {
        let request = self.client.build_default_profile(&self.access_token());
        let body = self.executor.execute(request).await?;
        self.client.parse_default_profile(&body)
    }

    pub async fn my_profile(&self) -> Result<Profile, ApiError> {
        let request = self.client.build_my_profile(&self.access_token());
        let body = self.executor.execute(request).await?;
        self.client.parse_profile(&body)
    }

    /// Delete the member account, then forget its credentials.
    #[instrument(skip(self))]
    pub async fn withdraw(&self) -> Result<(), ApiError> {
        let request = self.client.build_withdraw(&self.access_token());
        self.executor.execute(request).await?;
        self.tokens().clear();
        info!("member withdrawn");
        Ok(())
    }

    pub fn sign_out(&self) {
        self.tokens().clear();
    }
}
