//! Session reset interceptor: a 401 ends the session.
//!
//! Turns HTTP 401 failures into [`ClientError::Unauthorized`]. If the
//! rejected request carried the current session token, the session is
//! invalidated and the persisted token cleared. Concurrent 401s for the
//! same token clear the session once; only that call is flagged
//! `session_cleared`.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{info, warn};

use super::{Interceptor, RequestContext};
use crate::error::ClientError;
use crate::session::SessionStore;
use crate::token_store::TokenStore;

pub struct SessionResetInterceptor {
    session: Arc<SessionStore>,
    tokens: Arc<dyn TokenStore>,
}

impl SessionResetInterceptor {
    pub fn new(session: Arc<SessionStore>, tokens: Arc<dyn TokenStore>) -> Self {
        Self { session, tokens }
    }
}

#[async_trait]
impl Interceptor for SessionResetInterceptor {
    async fn on_request(
        &self,
        _ctx: &mut RequestContext,
        _request: &mut reqwest::Request,
    ) -> Result<(), ClientError> {
        // Session reset only runs on failed responses.
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
        if failure.status != StatusCode::UNAUTHORIZED {
            return Ok(());
        }

        let message = failure.message.clone();
        let session_cleared = ctx
            .bearer
            .as_deref()
            .is_some_and(|token| self.session.invalidate(token));

        *error = ClientError::Unauthorized {
            message,
            session_cleared,
        };

        if session_cleared {
            info!(path = %ctx.path, "session rejected by backend, signing out");
            if let Err(e) = self.tokens.clear() {
                warn!("failed to clear stored token: {e}");
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "SessionReset"
    }
}
