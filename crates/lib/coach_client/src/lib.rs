//! # coach_client
//!
//! Session-aware client for the coaching platform REST API.
//!
//! Owns the bearer-token lifecycle, attaches credentials to outbound
//! requests through an interceptor pipeline, classifies failures and
//! triggers forced logout and navigation when the backend rejects the
//! session. Also provides the polling and push notification sources.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod interceptors;
pub mod navigation;
pub mod retry;
pub mod session;
pub mod sources;
pub mod token_store;

pub use auth::{ActionOutcome, AuthOutcome};
pub use client::{ApiClient, ApiClientBuilder};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use navigation::{ChannelNavigator, Navigator, Route, TracingNavigator};
pub use retry::{RetryPolicy, retry_unavailable};
pub use session::{SessionState, SessionStore};
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore};
