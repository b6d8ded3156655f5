//! Interceptor pipeline for outbound requests.
//!
//! Every request passes through an ordered list of interceptors before it
//! is sent; every failed request passes back through them in reverse order
//! (onion model). Interceptors attach credentials, classify failures, and
//! run the session side effects of a 401.

pub mod backend_unavailable;
pub mod bearer;
pub mod login_redirect;
pub mod request_log;
pub mod session_reset;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use tracing::warn;

use crate::error::ClientError;
use crate::navigation::Navigator;
use crate::session::SessionStore;
use crate::token_store::TokenStore;

pub use backend_unavailable::{BackendUnavailableInterceptor, FALLBACK_MESSAGE};
pub use bearer::BearerAuthInterceptor;
pub use login_redirect::LoginRedirectInterceptor;
pub use request_log::RequestLogInterceptor;
pub use session_reset::SessionResetInterceptor;

/// Per-request context shared by the interceptors.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    /// Endpoint path relative to the API base, for logging.
    pub path: String,
    /// Token to use instead of the session's (token validation at bootstrap).
    pub explicit_token: Option<String>,
    /// Token actually attached to the request, set by the bearer interceptor.
    pub bearer: Option<String>,
    pub started_at: DateTime<Utc>,
}

impl RequestContext {
    pub fn new(method: Method, path: impl Into<String>, explicit_token: Option<String>) -> Self {
        Self {
            method,
            path: path.into(),
            explicit_token,
            bearer: None,
            started_at: Utc::now(),
        }
    }
}

/// Interceptor trait: implement for custom request/response handling.
#[async_trait]
pub trait Interceptor: Send + Sync {
    /// Called before the request is sent. Return Err to abort the request.
    async fn on_request(
        &self,
        ctx: &mut RequestContext,
        request: &mut reqwest::Request,
    ) -> Result<(), ClientError>;

    /// Called when the request failed. May reclassify the error in place.
    async fn on_error(
        &self,
        ctx: &RequestContext,
        error: &mut ClientError,
    ) -> Result<(), ClientError>;

    /// Interceptor identifier for debugging/logging.
    fn name(&self) -> &str;
}

/// Ordered pipeline of interceptors.
///
/// `run_request` executes interceptors in order, short-circuiting on error.
/// `run_error` executes them in reverse order; a failing interceptor is
/// logged and the original error keeps propagating.
#[derive(Clone)]
pub struct InterceptorPipeline {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl InterceptorPipeline {
    pub fn new(interceptors: Vec<Arc<dyn Interceptor>>) -> Self {
        Self { interceptors }
    }

    /// Create an empty pipeline (no-op).
    pub fn empty() -> Self {
        Self {
            interceptors: Vec::new(),
        }
    }

    /// Insert an interceptor at the front: its request hook runs first and
    /// its error hook last.
    pub fn prepend(&mut self, interceptor: Arc<dyn Interceptor>) {
        self.interceptors.insert(0, interceptor);
    }

    pub fn names(&self) -> Vec<&str> {
        self.interceptors.iter().map(|i| i.name()).collect()
    }

    pub async fn run_request(
        &self,
        ctx: &mut RequestContext,
        request: &mut reqwest::Request,
    ) -> Result<(), ClientError> {
        for interceptor in &self.interceptors {
            interceptor.on_request(ctx, request).await?;
        }
        Ok(())
    }

    pub async fn run_error(&self, ctx: &RequestContext, error: &mut ClientError) {
        for interceptor in self.interceptors.iter().rev() {
            if let Err(e) = interceptor.on_error(ctx, error).await {
                warn!(
                    interceptor = interceptor.name(),
                    path = %ctx.path,
                    "interceptor failed while handling error: {e}"
                );
            }
        }
    }
}

/// Build the default interceptor pipeline.
///
/// Pipeline order: RequestLog → BearerAuth → LoginRedirect → SessionReset →
/// BackendUnavailable. Errors therefore pass BackendUnavailable, then
/// SessionReset (401 ends the session), then LoginRedirect (navigates once),
/// and RequestLog sees the final classification.
pub fn default_pipeline(
    session: Arc<SessionStore>,
    tokens: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
) -> InterceptorPipeline {
    InterceptorPipeline::new(vec![
        Arc::new(RequestLogInterceptor),
        Arc::new(BearerAuthInterceptor::new(session.clone())),
        Arc::new(LoginRedirectInterceptor::new(navigator)),
        Arc::new(SessionResetInterceptor::new(session, tokens)),
        Arc::new(BackendUnavailableInterceptor),
    ])
}
