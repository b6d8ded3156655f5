//! Login redirect interceptor: sends the user to the login page after the
//! backend rejected the session. Terminal: the request is not retried.

use std::sync::Arc;

use async_trait::async_trait;

use super::{Interceptor, RequestContext};
use crate::error::ClientError;
use crate::navigation::{Navigator, Route};

pub struct LoginRedirectInterceptor {
    navigator: Arc<dyn Navigator>,
}

impl LoginRedirectInterceptor {
    pub fn new(navigator: Arc<dyn Navigator>) -> Self {
        Self { navigator }
    }
}

#[async_trait]
impl Interceptor for LoginRedirectInterceptor {
    async fn on_request(
        &self,
        _ctx: &mut RequestContext,
        _request: &mut reqwest::Request,
    ) -> Result<(), ClientError> {
        Ok(())
    }

    async fn on_error(
        &self,
        _ctx: &RequestContext,
        error: &mut ClientError,
    ) -> Result<(), ClientError> {
        // Only the call that ended the session redirects.
        if let ClientError::Unauthorized {
            session_cleared: true,
            ..
        } = error
        {
            self.navigator.navigate(Route::Login);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "LoginRedirect"
    }
}
