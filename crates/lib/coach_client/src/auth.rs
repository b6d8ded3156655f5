//! Session operations: login, registration, logout, token validation and
//! the password and email-verification flows.
//!
//! `login` and `register` never return `Err`; failures come back as
//! [`AuthOutcome::Failure`] with the classified error.

use coach_core::models::{RegisterRequest, User};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::client::{ApiClient, RequestSpec};
use crate::error::{ClientError, ClientResult};
use crate::navigation::Route;

/// Result of `login` and `register`.
#[derive(Debug)]
pub enum AuthOutcome {
    Success { user: User },
    Failure { error: ClientError },
}

impl AuthOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AuthOutcome::Success { .. })
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            AuthOutcome::Success { user } => Some(user),
            AuthOutcome::Failure { .. } => None,
        }
    }
}

/// Result of account actions that only report success.
#[derive(Debug)]
pub enum ActionOutcome {
    Success { message: Option<String> },
    Failure { error: ClientError },
}

impl ActionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ActionOutcome::Success { .. })
    }
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    success: Option<bool>,
    token: Option<String>,
    user: Option<User>,
    message: Option<String>,
}

/// `GET /auth/me` answers `{user}`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MeResponse {
    success: Option<bool>,
    user: Option<User>,
    message: Option<String>,
}

impl MeResponse {
    /// The user only counts when present and not reported as `success: false`.
    fn into_user(self) -> ClientResult<User> {
        let rejected = |message: Option<String>| {
            ClientError::Rejected(message.unwrap_or_else(|| "Session validation failed".into()))
        };
        if self.success == Some(false) {
            return Err(rejected(self.message));
        }
        self.user.ok_or_else(|| rejected(self.message))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ActionResponse {
    success: Option<bool>,
    message: Option<String>,
}

impl ApiClient {
    /// `POST /auth/login`: authenticate with email and password.
    pub async fn login(&self, email: &str, password: &str) -> AuthOutcome {
        let body = json!({ "email": email, "password": password });
        self.authenticate("/auth/login", Ok(body), "Login failed")
            .await
    }

    /// `POST /auth/register`: create an account and sign in with it.
    pub async fn register(&self, request: &RegisterRequest) -> AuthOutcome {
        let body = serde_json::to_value(request)
            .map_err(|e| ClientError::Decode(format!("request body: {e}")));
        self.authenticate("/auth/register", body, "Registration failed")
            .await
    }

    async fn authenticate(
        &self,
        path: &str,
        body: ClientResult<Value>,
        fallback: &str,
    ) -> AuthOutcome {
        let replaced = self.session.begin_authentication();

        let result = async {
            let spec = RequestSpec::new(Method::POST, self.config.endpoint(path)?, path).body(body?);
            let response: AuthResponse = self.send_json(spec).await?;
            accepted_credentials(response, fallback)
        }
        .await;

        match result {
            Ok((token, user)) => {
                if let Err(e) = self.tokens.save(&token) {
                    warn!("failed to persist session token: {e}");
                }
                info!(user = %user.display_name(), path, "signed in");
                self.session.establish(token, user.clone());
                AuthOutcome::Success { user }
            }
            Err(error) => {
                self.session.fail_authentication();
                if replaced.is_some()
                    && let Err(e) = self.tokens.clear()
                {
                    warn!("failed to clear stored token: {e}");
                }
                info!(path, "authentication failed: {error}");
                AuthOutcome::Failure { error }
            }
        }
    }

    /// Sign out locally. There is no server round-trip.
    pub fn logout(&self) {
        let was_signed_in = self.session.end();
        if let Err(e) = self.tokens.clear() {
            warn!("failed to clear stored token: {e}");
        }
        info!(was_signed_in, "signed out");
        self.navigator.navigate(Route::Landing);
    }

    /// Restore the persisted session, validating the token with `GET /auth/me`.
    ///
    /// A rejected token is cleared and leaves the session anonymous without
    /// redirecting. A network failure, or a 2xx answer without a user, keeps
    /// the stored token for the next attempt and returns the error.
    pub async fn bootstrap(&self) -> ClientResult<Option<User>> {
        let Some(token) = self.tokens.load()? else {
            return Ok(None);
        };
        let spec = RequestSpec::new(Method::GET, self.config.endpoint("/auth/me")?, "/auth/me")
            .token(token.clone());

        self.session.begin_authentication();
        let result = match self.send_json::<Option<MeResponse>>(spec).await {
            Ok(me) => me.unwrap_or_default().into_user(),
            Err(error) => Err(error),
        };
        match result {
            Ok(user) => {
                info!(user = %user.display_name(), "session restored");
                self.session.establish(token, user.clone());
                Ok(Some(user))
            }
            Err(error) => {
                self.session.fail_authentication();
                if error.is_unauthorized() {
                    info!("stored session token rejected");
                    self.tokens.clear()?;
                    return Ok(None);
                }
                Err(error)
            }
        }
    }

    /// `PUT /auth/change-password`.
    pub async fn change_password(&self, current_password: &str, new_password: &str) -> ActionOutcome {
        let body = json!({
            "currentPassword": current_password,
            "newPassword": new_password,
        });
        let path = "/auth/change-password";
        let spec = self
            .config
            .endpoint(path)
            .map(|url| RequestSpec::new(Method::PUT, url, path).body(body));
        self.action(spec, "Password change failed").await
    }

    /// `POST /auth/forgot-password`: request a password reset email.
    pub async fn forgot_password(&self, email: &str) -> ActionOutcome {
        let path = "/auth/forgot-password";
        let spec = self
            .config
            .endpoint(path)
            .map(|url| RequestSpec::new(Method::POST, url, path).body(json!({ "email": email })));
        self.action(spec, "Password reset request failed").await
    }

    /// `PUT /auth/reset-password/{token}`: set a new password with a reset token.
    pub async fn reset_password(&self, reset_token: &str, password: &str) -> ActionOutcome {
        let spec = self
            .config
            .endpoint_segments(&["auth", "reset-password", reset_token])
            .map(|url| {
                RequestSpec::new(Method::PUT, url, "/auth/reset-password/{token}")
                    .body(json!({ "password": password }))
            });
        self.action(spec, "Password reset failed").await
    }

    /// `GET /auth/verify-email/{token}`.
    pub async fn verify_email(&self, verification_token: &str) -> ActionOutcome {
        let spec = self
            .config
            .endpoint_segments(&["auth", "verify-email", verification_token])
            .map(|url| RequestSpec::new(Method::GET, url, "/auth/verify-email/{token}"));
        self.action(spec, "Email verification failed").await
    }

    async fn action(&self, spec: ClientResult<RequestSpec>, fallback: &str) -> ActionOutcome {
        let result = async {
            let response: Option<ActionResponse> = self.send_json(spec?).await?;
            let response = response.unwrap_or_default();
            if response.success == Some(false) {
                return Err(ClientError::Rejected(
                    response.message.unwrap_or_else(|| fallback.to_string()),
                ));
            }
            Ok(response.message)
        }
        .await;

        match result {
            Ok(message) => ActionOutcome::Success { message },
            Err(error) => ActionOutcome::Failure { error },
        }
    }
}

/// A login or registration response only counts when it carries both a
/// token and a user and does not report `success: false`.
fn accepted_credentials(response: AuthResponse, fallback: &str) -> ClientResult<(String, User)> {
    let rejected = || {
        ClientError::Rejected(
            response
                .message
                .clone()
                .unwrap_or_else(|| fallback.to_string()),
        )
    };
    if response.success == Some(false) {
        return Err(rejected());
    }
    match (response.token.clone(), response.user.clone()) {
        (Some(token), Some(user)) if !token.is_empty() => Ok((token, user)),
        _ => Err(rejected()),
    }
}
