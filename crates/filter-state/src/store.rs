//! The filter session file.
//!
//! A session holds what a browser tab would keep between interactions: the
//! query string with each view's filter and the pinned and temporary key
//! sets. It lives as JSON in the user's state directory, or wherever the
//! caller points it.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const SESSION_FILENAME: &str = "session.json";

/// Persisted filter session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Query string holding `f.<view>` parameters, without a leading `?`.
    #[serde(default)]
    pub query: String,

    /// Pinned merge keys in pin order.
    #[serde(default)]
    pub pinned: Vec<String>,

    /// Temporary merge keys in insertion order.
    #[serde(default)]
    pub temporary: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Session {
    /// True until the session has been saved once.
    pub fn is_new(&self) -> bool {
        self.updated_at.is_none()
    }
}

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("cannot locate a state directory for the session file")]
    NoStateDir,

    #[error("failed to read session '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write session '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("session file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SessionStoreError>;

/// Reads and writes one session file.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Store at the default location, `fx/session.json` under the XDG state
    /// directory (the local data directory where there is none).
    pub fn new() -> Result<Self> {
        let dirs = ProjectDirs::from("", "", "fx").ok_or(SessionStoreError::NoStateDir)?;
        let dir = dirs.state_dir().unwrap_or_else(|| dirs.data_local_dir());
        Ok(Self::with_path(dir.join(SESSION_FILENAME)))
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the session. A missing file is a new, empty session.
    pub async fn load(&self) -> Result<Session> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Session::default()),
            Err(source) => Err(SessionStoreError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Writes the session through a temp file renamed over the old one, so
    /// a crash never leaves a half-written session behind.
    pub async fn save(&self, session: &Session) -> Result<()> {
        let write_error = |path: &Path| {
            let path = path.to_path_buf();
            move |source: io::Error| SessionStoreError::Write { path, source }
        };

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(write_error(parent))?;
        }

        let json = serde_json::to_string_pretty(session)?;
        let temp_path = self.path.with_extension("tmp");
        tokio::fs::write(&temp_path, json)
            .await
            .map_err(write_error(&temp_path))?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(write_error(&self.path))?;
        Ok(())
    }
}
