//! Bearer auth interceptor: attaches `Authorization: Bearer <token>`.
//!
//! Uses the request's explicit token if it has one, otherwise the session
//! token. No token means the request goes out without credentials.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderValue};

use super::{Interceptor, RequestContext};
use crate::error::ClientError;
use crate::session::SessionStore;

pub struct BearerAuthInterceptor {
    session: Arc<SessionStore>,
}

impl BearerAuthInterceptor {
    pub fn new(session: Arc<SessionStore>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl Interceptor for BearerAuthInterceptor {
    async fn on_request(
        &self,
        ctx: &mut RequestContext,
        request: &mut reqwest::Request,
    ) -> Result<(), ClientError> {
        let Some(token) = ctx.explicit_token.clone().or_else(|| self.session.token()) else {
            return Ok(());
        };

        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| ClientError::Interceptor(format!("invalid bearer token: {e}")))?;
        value.set_sensitive(true);
        request.headers_mut().insert(AUTHORIZATION, value);
        ctx.bearer = Some(token);
        Ok(())
    }

    async fn on_error(
        &self,
        _ctx: &RequestContext,
        _error: &mut ClientError,
    ) -> Result<(), ClientError> {
        // Credentials are only attached on the way out.
        Ok(())
    }

    fn name(&self) -> &str {
        "BearerAuth"
    }
}
