use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::api::CreatedSession;

/// Key of the single persisted session entry.
pub const SESSION_KEY: &str = "bsky-session";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub handle: String,
    pub did: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub access_jwt: String,
    pub refresh_jwt: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl From<CreatedSession> for SessionData {
    fn from(created: CreatedSession) -> Self {
        Self {
            handle: created.handle,
            did: created.did,
            email: created.email,
            access_jwt: created.access_jwt,
            refresh_jwt: created.refresh_jwt,
            created_at: Utc::now(),
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to write session: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize session: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Holder of at most one authenticated session.
///
/// `read` never fails: anything unreadable is reported as absent.
pub trait SessionStore: Send + Sync {
    fn read(&self) -> Option<SessionData>;

    /// Persist `session`, replacing whatever was stored before.
    fn write(&self, session: &SessionData) -> Result<(), StoreError>;

    fn clear(&self) -> Result<(), StoreError>;
}

/// Session persisted as `<dir>/<key>.json`.
pub struct FileSessionStore {
    dir: PathBuf,
    key: String,
}

impl FileSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_key(dir, SESSION_KEY)
    }

    pub fn with_key(dir: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            key: key.into(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.key))
    }

    fn temp_path(&self) -> PathBuf {
        self.dir.join(format!("{}.json.tmp", self.key))
    }

    fn read_path(path: &Path) -> Option<SessionData> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                debug!(?path, error = %e, "No readable session file");
                return None;
            }
        };
        match serde_json::from_str(&contents) {
            Ok(data) => Some(data),
            Err(e) => {
                debug!(?path, error = %e, "Ignoring malformed session file");
                None
            }
        }
    }
}

impl SessionStore for FileSessionStore {
    fn read(&self) -> Option<SessionData> {
        Self::read_path(&self.path())
    }

    fn write(&self, session: &SessionData) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir)?;
        let contents = serde_json::to_string_pretty(session)?;
        let tmp = self.temp_path();
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, self.path())?;
        debug!(handle = %session.handle, "Session saved");
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let path = self.path();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

/// In-process store; nothing survives the process.
#[derive(Default)]
pub struct MemorySessionStore {
    data: Mutex<Option<SessionData>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn read(&self) -> Option<SessionData> {
        self.data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn write(&self, session: &SessionData) -> Result<(), StoreError> {
        *self.data.lock().unwrap_or_else(PoisonError::into_inner) = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self.data.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
