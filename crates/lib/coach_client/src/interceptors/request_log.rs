//! Request log interceptor: traces every request and its failure class.
//!
//! First in the pipeline, so its error hook runs last and logs the final
//! classification.

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};

use super::{Interceptor, RequestContext};
use crate::error::ClientError;

pub struct RequestLogInterceptor;

#[async_trait]
impl Interceptor for RequestLogInterceptor {
    async fn on_request(
        &self,
        ctx: &mut RequestContext,
        _request: &mut reqwest::Request,
    ) -> Result<(), ClientError> {
        debug!(method = %ctx.method, path = %ctx.path, "request");
        Ok(())
    }

    async fn on_error(
        &self,
        ctx: &RequestContext,
        error: &mut ClientError,
    ) -> Result<(), ClientError> {
        let elapsed_ms = (Utc::now() - ctx.started_at).num_milliseconds();
        let class = match error {
            ClientError::Unauthorized { .. } => "unauthorized",
            ClientError::BackendUnavailable { .. } => "backend_unavailable",
            ClientError::Http(_) => "http",
            ClientError::Network(_) => "network",
            ClientError::Decode(_) => "decode",
            _ => "other",
        };
        warn!(
            method = %ctx.method,
            path = %ctx.path,
            status = error.status().map(|s| s.as_u16()),
            class,
            elapsed_ms,
            "request failed: {error}"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "RequestLog"
    }
}
