//! Durable slot holding the session token between runs.

use crate::error::{ClientError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// How long a persisted token is kept after login.
pub const TOKEN_TTL_DAYS: i64 = 7;

pub trait TokenStore: Send {
    /// Returns the stored token, or `None` if absent or expired.
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, token: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

impl<T: TokenStore + Sync> TokenStore for std::sync::Arc<T> {
    fn load(&self) -> Result<Option<String>> {
        (**self).load()
    }

    fn save(&self, token: &str) -> Result<()> {
        (**self).save(token)
    }

    fn clear(&self) -> Result<()> {
        (**self).clear()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct StoredToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl StoredToken {
    fn fresh(token: &str, now: DateTime<Utc>) -> Self {
        StoredToken {
            token: token.to_string(),
            expires_at: now + Duration::days(TOKEN_TTL_DAYS),
        }
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// JSON file in the data directory.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(data_dir: &Path) -> Self {
        FileTokenStore {
            path: data_dir.join("session.json"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, stored: &StoredToken) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(stored)
            .map_err(|e| ClientError::Storage(e.to_string()))?;
        let mut file = open_private(&self.path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

// The session file holds a bearer token, so only the owner may read it.
#[cfg(unix)]
fn open_private(path: &Path) -> io::Result<File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // mode() only applies when the file is created
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    Ok(file)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let stored: StoredToken = match serde_json::from_str(&raw) {
            Ok(stored) => stored,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Discarding unreadable session file");
                self.clear()?;
                return Ok(None);
            }
        };

        if stored.is_expired(Utc::now()) {
            debug!(expired_at = %stored.expires_at, "Persisted token expired");
            self.clear()?;
            return Ok(None);
        }
        Ok(Some(stored.token))
    }

    fn save(&self, token: &str) -> Result<()> {
        self.write(&StoredToken::fresh(token, Utc::now()))
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Process-local store, used where nothing should touch disk.
#[derive(Default)]
pub struct MemoryTokenStore {
    slot: Mutex<Option<StoredToken>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        MemoryTokenStore {
            slot: Mutex::new(Some(StoredToken::fresh(token, Utc::now()))),
        }
    }

    pub fn with_expired_token(token: &str) -> Self {
        MemoryTokenStore {
            slot: Mutex::new(Some(StoredToken {
                token: token.to_string(),
                expires_at: Utc::now() - Duration::seconds(1),
            })),
        }
    }

    fn slot(&self) -> Result<std::sync::MutexGuard<'_, Option<StoredToken>>> {
        self.slot
            .lock()
            .map_err(|_| ClientError::Storage("token slot poisoned".to_string()))
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>> {
        let mut slot = self.slot()?;
        if slot.as_ref().is_some_and(|s| s.is_expired(Utc::now())) {
            *slot = None;
        }
        Ok(slot.as_ref().map(|s| s.token.clone()))
    }

    fn save(&self, token: &str) -> Result<()> {
        *self.slot()? = Some(StoredToken::fresh(token, Utc::now()));
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.slot()? = None;
        Ok(())
    }
}
