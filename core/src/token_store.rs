//! Credential storage seam.
//!
//! The host app keeps tokens in platform secure storage; the core only needs
//! read and write access, so storage sits behind `TokenStore`.
//! `MemoryTokenStore` backs tests and the FFI client handle.

use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use crate::types::TokenPair;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKey {
    AccessToken,
    RefreshToken,
}

impl fmt::Display for TokenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKey::AccessToken => f.write_str("accessToken"),
            TokenKey::RefreshToken => f.write_str("refreshToken"),
        }
    }
}

/// Read/write access to the persisted token pair.
pub trait TokenStore: Send + Sync {
    fn read(&self, key: TokenKey) -> Option<String>;

    fn update(&self, key: TokenKey, value: &str);

    fn remove(&self, key: TokenKey);

    /// Replace both tokens in one atomic write. A reader must see either the
    /// old pair or the new one, never a new access token next to an old
    /// refresh token.
    fn update_pair(&self, tokens: &TokenPair);

    fn clear(&self) {
        self.remove(TokenKey::AccessToken);
        self.remove(TokenKey::RefreshToken);
    }
}

/// Process-local token store.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<HashMap<TokenKey, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(tokens: &TokenPair) -> Self {
        let store = Self::new();
        store.update_pair(tokens);
        store
    }
}

// A poisoned lock only means a writer panicked mid-insert; the map itself is
// still a valid map, so keep serving it.
impl TokenStore for MemoryTokenStore {
    fn read(&self, key: TokenKey) -> Option<String> {
        let tokens = self.tokens.read().unwrap_or_else(|e| e.into_inner());
        tokens.get(&key).cloned()
    }

    fn update(&self, key: TokenKey, value: &str) {
        let mut tokens = self.tokens.write().unwrap_or_else(|e| e.into_inner());
        tokens.insert(key, value.to_string());
    }

    fn remove(&self, key: TokenKey) {
        let mut tokens = self.tokens.write().unwrap_or_else(|e| e.into_inner());
        tokens.remove(&key);
    }

    fn update_pair(&self, pair: &TokenPair) {
        let mut tokens = self.tokens.write().unwrap_or_else(|e| e.into_inner());
        tokens.insert(TokenKey::AccessToken, pair.access_token.clone());
        tokens.insert(TokenKey::RefreshToken, pair.refresh_token.clone());
    }

    fn clear(&self) {
        let mut tokens = self.tokens.write().unwrap_or_else(|e| e.into_inner());
        tokens.clear();
    }
}
