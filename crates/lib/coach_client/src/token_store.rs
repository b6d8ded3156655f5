//! Persisted bearer token.
//!
//! The token file is the single source of truth. A legacy location (a file
//! holding just the raw token) is only read when the token file is absent;
//! its token is migrated into the token file and the legacy file removed.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::error::{ClientError, ClientResult};

/// Persisted tokens expire after 7 days.
pub const TOKEN_TTL_DAYS: i64 = 7;

/// Storage for the session's bearer token.
pub trait TokenStore: Send + Sync {
    /// The stored token, or `None` if absent or expired.
    fn load(&self) -> ClientResult<Option<String>>;

    fn save(&self, token: &str) -> ClientResult<()>;

    fn clear(&self) -> ClientResult<()>;
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// JSON file token store with expiry.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
    legacy_path: Option<PathBuf>,
    ttl: Duration,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            legacy_path: None,
            ttl: Duration::days(TOKEN_TTL_DAYS),
        }
    }

    /// Migrate a token from `legacy_path` when the token file is absent.
    pub fn with_legacy(mut self, legacy_path: Option<PathBuf>) -> Self {
        self.legacy_path = legacy_path;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_primary(&self) -> ClientResult<Option<PersistedToken>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(storage_error(&self.path, e)),
        };
        match serde_json::from_str::<PersistedToken>(&raw) {
            Ok(persisted) => Ok(Some(persisted)),
            Err(e) => {
                warn!(path = %self.path.display(), "discarding unreadable token file: {e}");
                remove_if_exists(&self.path)?;
                Ok(None)
            }
        }
    }

    fn migrate_legacy(&self) -> ClientResult<Option<String>> {
        let Some(legacy) = &self.legacy_path else {
            return Ok(None);
        };
        let token = match std::fs::read_to_string(legacy) {
            Ok(raw) => raw.trim().to_string(),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(storage_error(legacy, e)),
        };
        if token.is_empty() {
            remove_if_exists(legacy)?;
            return Ok(None);
        }
        // The legacy file is the only copy until the save lands.
        self.save(&token)?;
        remove_if_exists(legacy)?;
        info!(from = %legacy.display(), to = %self.path.display(), "migrated legacy token");
        Ok(Some(token))
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> ClientResult<Option<String>> {
        match self.read_primary()? {
            Some(persisted) if persisted.expires_at > Utc::now() => Ok(Some(persisted.token)),
            Some(_) => {
                info!(path = %self.path.display(), "stored token expired");
                remove_if_exists(&self.path)?;
                Ok(None)
            }
            None => self.migrate_legacy(),
        }
    }

    fn save(&self, token: &str) -> ClientResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(|e| storage_error(dir, e))?;
        let persisted = PersistedToken {
            token: token.to_string(),
            expires_at: Utc::now() + self.ttl,
        };
        let json = serde_json::to_string_pretty(&persisted)
            .map_err(|e| ClientError::Storage(e.to_string()))?;
        write_private(dir, &self.path, json.as_bytes())
    }

    fn clear(&self) -> ClientResult<()> {
        remove_if_exists(&self.path)?;
        if let Some(legacy) = &self.legacy_path {
            remove_if_exists(legacy)?;
        }
        Ok(())
    }
}

/// In-memory token store; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> ClientResult<Option<String>> {
        Ok(self
            .token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, token: &str) -> ClientResult<()> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> ClientResult<()> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// Write through a temp file in `dir` and rename it over `path`. Temp files
/// are created owner-only (0600 on unix), and the rename keeps that mode.
fn write_private(dir: &Path, path: &Path, contents: &[u8]) -> ClientResult<()> {
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| storage_error(dir, e))?;
    tmp.write_all(contents)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| storage_error(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| storage_error(path, e.error))?;
    Ok(())
}

fn remove_if_exists(path: &Path) -> ClientResult<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(storage_error(path, e)),
    }
}

fn storage_error(path: &Path, e: std::io::Error) -> ClientError {
    ClientError::Storage(format!("{}: {e}", path.display()))
}
