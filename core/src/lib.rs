//! Network core for the roome app.
//!
//! # Overview
//! Executes roome API calls and handles credential expiry: a 401 triggers a
//! single token refresh followed by exactly one retry of the original call.
//!
//! # Design
//! - `Exchange` is the sans-IO state machine holding every status rule.
//! - `RequestExecutor` drives it over a `Transport` and serializes refreshes.
//! - `RoomeClient` builds endpoint requests without I/O; `Session` is the
//!   explicit context tying client, executor and `TokenStore` together.
//! - Types use owned `String` / `Vec` fields so they map cleanly onto the FFI.

pub mod client;
pub mod config;
pub mod error;
pub mod exchange;
pub mod executor;
pub mod http;
pub mod session;
pub mod token_store;
pub mod transport;
pub mod types;

pub use client::RoomeClient;
pub use config::ClientConfig;
pub use error::ApiError;
pub use exchange::{Exchange, Step};
pub use executor::RequestExecutor;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use session::Session;
pub use token_store::{MemoryTokenStore, TokenKey, TokenStore};
pub use transport::{Transport, UreqTransport};
pub use types::{CatalogItem, ColorOption, DefaultProfile, ErrorPayload, Profile, TermsAgreement, TokenPair};
