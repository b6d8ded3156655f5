//! Backend unavailable interceptor: 503 and 202 mean the backend's
//! datastore is not ready.
//!
//! Reclassifies the failure as [`ClientError::BackendUnavailable`] with a
//! user-facing message and a retry hint. It never retries; callers decide.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::warn;

use super::{Interceptor, RequestContext};
use crate::error::{ClientError, DEFAULT_RETRY_AFTER, HttpFailure};

/// Shown when the response carries no usable message.
pub const FALLBACK_MESSAGE: &str =
    "The service is temporarily unavailable. Please try again in a few moments.";

pub struct BackendUnavailableInterceptor;

impl BackendUnavailableInterceptor {
    fn is_unavailable(status: StatusCode) -> bool {
        status == StatusCode::SERVICE_UNAVAILABLE || status == StatusCode::ACCEPTED
    }

    fn message(failure: &HttpFailure) -> String {
        failure
            .body
            .as_ref()
            .and_then(|body| body.get("message"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| FALLBACK_MESSAGE.to_string())
    }

    /// Body `retryAfter` (seconds), then the `Retry-After` header, then the default.
    fn retry_after(failure: &HttpFailure) -> Duration {
        failure
            .body
            .as_ref()
            .and_then(|body| body.get("retryAfter"))
            .and_then(seconds_from_value)
            .or(failure.retry_after_header)
            .unwrap_or(DEFAULT_RETRY_AFTER)
    }
}

fn seconds_from_value(value: &Value) -> Option<Duration> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok()),
        Value::String(s) => s.trim().parse::<u64>().ok().map(Duration::from_secs),
        _ => None,
    }
}

#[async_trait]
impl Interceptor for BackendUnavailableInterceptor {
    async fn on_request(
        &self,
        _ctx: &mut RequestContext,
        _request: &mut reqwest::Request,
    ) -> Result<(), ClientError> {
        Ok(())
    }

    async fn on_error(
        &self,
        ctx: &RequestContext,
        error: &mut ClientError,
    ) -> Result<(), ClientError> {
        let ClientError::Http(failure) = &*error else {
            return Ok(());
        };
        if !Self::is_unavailable(failure.status) {
            return Ok(());
        }

        let status = failure.status;
        let message = Self::message(failure);
        let retry_after = Self::retry_after(failure);
        warn!(
            path = %ctx.path,
            status = status.as_u16(),
            retry_after_secs = retry_after.as_secs_f64(),
            "backend unavailable"
        );

        *error = ClientError::BackendUnavailable {
            status,
            message,
            retry_after,
        };
        Ok(())
    }

    fn name(&self) -> &str {
        "BackendUnavailable"
    }
}
