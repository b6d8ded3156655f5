//! Client configuration.

use std::path::PathBuf;
use std::time::Duration;

use coach_core::notifications::source::NotificationSourceKind;
use url::Url;

use crate::error::{ClientError, ClientResult};

/// Default API base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

/// Fixed per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default pacing for the notification feed.
pub const DEFAULT_NOTIFICATION_INTERVAL: Duration = Duration::from_secs(30);

/// Configuration for [`crate::ApiClient`].
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// API base URL; always ends with `/` so endpoints join beneath it.
    pub api_url: Url,
    pub request_timeout: Duration,
    /// Token file (single source of truth for the persisted session).
    pub token_file: PathBuf,
    /// Old token location, read once and migrated into `token_file`.
    pub legacy_token_file: Option<PathBuf>,
    pub notification_source: NotificationSourceKind,
    pub notification_interval: Duration,
}

impl ClientConfig {
    /// Configuration with defaults for everything but the base URL.
    pub fn new(api_url: &str) -> ClientResult<Self> {
        Ok(Self {
            api_url: normalize_base(api_url)?,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            token_file: default_token_file(),
            legacy_token_file: None,
            notification_source: NotificationSourceKind::default(),
            notification_interval: DEFAULT_NOTIFICATION_INTERVAL,
        })
    }

    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                           | Default                           |
    /// |------------------------------------|-----------------------------------|
    /// | `COACH_API_URL`                    | `http://localhost:5000/api`       |
    /// | `COACH_REQUEST_TIMEOUT_SECS`       | `10`                              |
    /// | `COACH_TOKEN_FILE`                 | `<data dir>/coach/session.json`   |
    /// | `COACH_LEGACY_TOKEN_FILE`          | unset                             |
    /// | `COACH_NOTIFICATION_SOURCE`        | `simulated`                       |
    /// | `COACH_NOTIFICATION_INTERVAL_SECS` | `30`                              |
    pub fn from_env() -> ClientResult<Self> {
        let api_url = std::env::var("COACH_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.into());
        let mut config = Self::new(&api_url)?;

        if let Some(secs) = env_secs("COACH_REQUEST_TIMEOUT_SECS")? {
            config.request_timeout = secs;
        }
        if let Ok(path) = std::env::var("COACH_TOKEN_FILE")
            && !path.is_empty()
        {
            config.token_file = PathBuf::from(path);
        }
        config.legacy_token_file = std::env::var("COACH_LEGACY_TOKEN_FILE")
            .ok()
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);
        if let Ok(kind) = std::env::var("COACH_NOTIFICATION_SOURCE") {
            config.notification_source = kind.parse().map_err(|e| {
                ClientError::Config(format!("COACH_NOTIFICATION_SOURCE: {e}"))
            })?;
        }
        if let Some(secs) = env_secs("COACH_NOTIFICATION_INTERVAL_SECS")? {
            config.notification_interval = secs;
        }

        Ok(config)
    }

    /// Replace the base URL.
    pub fn with_api_url(mut self, api_url: &str) -> ClientResult<Self> {
        self.api_url = normalize_base(api_url)?;
        Ok(self)
    }

    /// Resolve an endpoint path (`/auth/login`) against the base URL.
    pub fn endpoint(&self, path: &str) -> ClientResult<Url> {
        Ok(self.api_url.join(path.trim_start_matches('/'))?)
    }

    /// Resolve an endpoint from path segments; each segment is percent-encoded.
    pub fn endpoint_segments(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::Config(format!("{} cannot be a base URL", self.api_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

fn normalize_base(raw: &str) -> ClientResult<Url> {
    let mut url = Url::parse(raw.trim())?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn env_secs(var: &str) -> ClientResult<Option<Duration>> {
    let Ok(raw) = std::env::var(var) else {
        return Ok(None);
    };
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ClientError::Config(format!("{var} must be at least 1 second"))),
        Ok(secs) => Ok(Some(Duration::from_secs(secs))),
        Err(_) => Err(ClientError::Config(format!(
            "{var}: '{raw}' is not a number of seconds"
        ))),
    }
}

/// Default token file location.
pub fn default_token_file() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("coach")
        .join("session.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_trailing_slash() {
        let config = ClientConfig::new("http://localhost:5000/api").unwrap();
        assert_eq!(config.api_url.as_str(), "http://localhost:5000/api/");
        assert_eq!(
            config.endpoint("/auth/login").unwrap().as_str(),
            "http://localhost:5000/api/auth/login"
        );
    }

    #[test]
    fn segments_are_percent_encoded() {
        let config = ClientConfig::new("http://localhost:5000/api/").unwrap();
        let url = config
            .endpoint_segments(&["auth", "reset-password", "a/b c"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:5000/api/auth/reset-password/a%2Fb%20c"
        );
    }

    #[test]
    fn invalid_base_url_is_config_error() {
        assert!(matches!(
            ClientConfig::new("not a url"),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    fn defaults() {
        let config = ClientConfig::new(DEFAULT_API_URL).unwrap();
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.notification_source, NotificationSourceKind::Simulated);
        assert!(config.token_file.ends_with("coach/session.json"));
    }
}
