//! Session-aware HTTP client for the coaching platform API.
//!
//! Every request goes through the [`InterceptorPipeline`]; success
//! responses are decoded from JSON, failures are classified into
//! [`ClientError`] variants.

use std::sync::Arc;
use std::time::Duration;

use coach_core::models::User;
use reqwest::header::{ACCEPT, RETRY_AFTER};
use reqwest::{Method, Response, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult, HttpFailure, message_from_body};
use crate::interceptors::{Interceptor, InterceptorPipeline, RequestContext, default_pipeline};
use crate::navigation::{Navigator, TracingNavigator};
use crate::session::{SessionState, SessionStore};
use crate::token_store::{FileTokenStore, TokenStore};

const JSON: &str = "application/json";

/// One outbound call.
pub(crate) struct RequestSpec {
    pub method: Method,
    pub url: Url,
    /// Path used in logs.
    pub label: String,
    pub body: Option<Value>,
    pub explicit_token: Option<String>,
    pub accept: &'static str,
    /// Overrides the client-wide request timeout.
    pub timeout: Option<Duration>,
}

impl RequestSpec {
    pub fn new(method: Method, url: Url, label: impl Into<String>) -> Self {
        Self {
            method,
            url,
            label: label.into(),
            body: None,
            explicit_token: None,
            accept: JSON,
            timeout: None,
        }
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn token(mut self, token: String) -> Self {
        self.explicit_token = Some(token);
        self
    }

    pub fn accept(mut self, accept: &'static str) -> Self {
        self.accept = accept;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Cheaply cloneable API client sharing one session.
#[derive(Clone)]
pub struct ApiClient {
    pub(crate) http: reqwest::Client,
    pub(crate) config: Arc<ClientConfig>,
    pub(crate) session: Arc<SessionStore>,
    pub(crate) tokens: Arc<dyn TokenStore>,
    pub(crate) navigator: Arc<dyn Navigator>,
    pub(crate) pipeline: Arc<InterceptorPipeline>,
}

impl ApiClient {
    pub fn builder(config: ClientConfig) -> ApiClientBuilder {
        ApiClientBuilder::new(config)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    pub fn current_user(&self) -> Option<User> {
        self.session.user()
    }

    pub fn token(&self) -> Option<String> {
        self.session.token()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn pipeline(&self) -> &InterceptorPipeline {
        &self.pipeline
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let spec = RequestSpec::new(Method::GET, self.config.endpoint(path)?, path);
        self.send_json(spec).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let spec =
            RequestSpec::new(Method::POST, self.config.endpoint(path)?, path).body(to_value(body)?);
        self.send_json(spec).await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let spec =
            RequestSpec::new(Method::PUT, self.config.endpoint(path)?, path).body(to_value(body)?);
        self.send_json(spec).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let spec = RequestSpec::new(Method::DELETE, self.config.endpoint(path)?, path);
        self.send_json(spec).await
    }

    pub(crate) async fn send_json<T: DeserializeOwned>(&self, spec: RequestSpec) -> ClientResult<T> {
        let response = self.execute(spec).await?;
        decode_json(response).await
    }

    /// Run one request through the pipeline.
    ///
    /// Returns the response for 2xx statuses other than 202; everything else
    /// comes back as an error after the error interceptors ran.
    pub(crate) async fn execute(&self, spec: RequestSpec) -> ClientResult<Response> {
        let mut builder = self
            .http
            .request(spec.method.clone(), spec.url)
            .header(ACCEPT, spec.accept);
        if let Some(body) = &spec.body {
            builder = builder.json(body);
        }
        if let Some(timeout) = spec.timeout {
            builder = builder.timeout(timeout);
        }
        let mut request = builder.build()?;

        let mut ctx = RequestContext::new(spec.method, spec.label, spec.explicit_token);
        self.pipeline.run_request(&mut ctx, &mut request).await?;

        let result = match self.http.execute(request).await {
            Ok(response) => check_status(response).await,
            Err(e) => Err(ClientError::from(e)),
        };

        match result {
            Ok(response) => {
                debug!(
                    method = %ctx.method,
                    path = %ctx.path,
                    status = response.status().as_u16(),
                    "response"
                );
                Ok(response)
            }
            Err(mut error) => {
                self.pipeline.run_error(&ctx, &mut error).await;
                Err(error)
            }
        }
    }
}

fn to_value<B: Serialize + ?Sized>(body: &B) -> ClientResult<Value> {
    serde_json::to_value(body).map_err(|e| ClientError::Decode(format!("request body: {e}")))
}

/// Split success from failure. 202 counts as a failure: the backend uses it
/// to report a datastore that is still connecting.
async fn check_status(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() && status != StatusCode::ACCEPTED {
        return Ok(response);
    }

    let retry_after_header = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs);
    // An unreadable body only costs us the message.
    let text = response.text().await.unwrap_or_default();
    let body = serde_json::from_str::<Value>(&text).ok();
    let message = body
        .as_ref()
        .and_then(message_from_body)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        });

    Err(ClientError::Http(HttpFailure {
        status,
        message,
        body,
        retry_after_header,
    }))
}

/// Decode a JSON body; an empty body decodes as `null`.
async fn decode_json<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    let bytes = response.bytes().await?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return serde_json::from_value(Value::Null)
            .map_err(|e| ClientError::Decode(format!("empty response body: {e}")));
    }
    serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
}

/// Builder for [`ApiClient`].
pub struct ApiClientBuilder {
    config: ClientConfig,
    session: Option<Arc<SessionStore>>,
    tokens: Option<Arc<dyn TokenStore>>,
    navigator: Option<Arc<dyn Navigator>>,
    extra: Vec<Arc<dyn Interceptor>>,
}

impl ApiClientBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            session: None,
            tokens: None,
            navigator: None,
            extra: Vec::new(),
        }
    }

    /// Share an existing session instead of starting anonymous.
    pub fn session(mut self, session: Arc<SessionStore>) -> Self {
        self.session = Some(session);
        self
    }

    /// Token persistence; defaults to a [`FileTokenStore`] at the configured path.
    pub fn token_store(mut self, tokens: Arc<dyn TokenStore>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Navigation target; defaults to [`TracingNavigator`].
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Add an interceptor in front of the default pipeline.
    pub fn interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.extra.push(interceptor);
        self
    }

    pub fn build(self) -> ClientResult<ApiClient> {
        let http = reqwest::Client::builder()
            .timeout(self.config.request_timeout)
            .user_agent(concat!("coach-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let session = self.session.unwrap_or_default();
        let tokens = self.tokens.unwrap_or_else(|| {
            Arc::new(
                FileTokenStore::new(self.config.token_file.clone())
                    .with_legacy(self.config.legacy_token_file.clone()),
            )
        });
        let navigator = self
            .navigator
            .unwrap_or_else(|| Arc::new(TracingNavigator));

        let mut pipeline = default_pipeline(session.clone(), tokens.clone(), navigator.clone());
        for interceptor in self.extra.into_iter().rev() {
            pipeline.prepend(interceptor);
        }

        Ok(ApiClient {
            http,
            config: Arc::new(self.config),
            session,
            tokens,
            navigator,
            pipeline: Arc::new(pipeline),
        })
    }
}
