use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::error::{Result, SyncError};

const TOKEN_ENV: &str = "REPO_LEDGER_TOKEN";
const DEVELOPER_ENV: &str = "REPO_LEDGER_DEVELOPER_ID";

/// The authenticated developer and the bearer token for the remote backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub developer_id: String,
    pub token: String,
}

impl Session {
    fn is_complete(&self) -> bool {
        !self.developer_id.trim().is_empty() && !self.token.trim().is_empty()
    }
}

/// Source of the current authenticated session.
pub trait SessionProvider {
    /// The current session, or [`SyncError::NotAuthenticated`].
    fn current_session(&self) -> Result<Session>;
}

/// Reads the session written by the login flow to `session.json`.
///
/// `REPO_LEDGER_TOKEN` and `REPO_LEDGER_DEVELOPER_ID` take precedence when both
/// are set, which is how CI and scripted runs authenticate.
#[derive(Debug, Clone)]
pub struct FileSession {
    path: PathBuf,
}

impl FileSession {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Session file in the platform configuration directory.
    pub fn from_config_dir() -> anyhow::Result<Self> {
        Ok(Self::new(crate::config::ConfigManager::session_path()?))
    }

    fn from_env() -> Option<Session> {
        let session = Session {
            developer_id: std::env::var(DEVELOPER_ENV).ok()?,
            token: std::env::var(TOKEN_ENV).ok()?,
        };
        session.is_complete().then_some(session)
    }
}

impl SessionProvider for FileSession {
    fn current_session(&self) -> Result<Session> {
        if let Some(session) = Self::from_env() {
            return Ok(session);
        }

        if !self.path.exists() {
            return Err(SyncError::NotAuthenticated);
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            log::warn!("Failed to read session {}: {}", self.path.display(), e);
            SyncError::NotAuthenticated
        })?;

        let session: Session = serde_json::from_str(&content).map_err(|e| {
            log::warn!("Failed to parse session {}: {}", self.path.display(), e);
            SyncError::NotAuthenticated
        })?;

        if session.is_complete() {
            Ok(session)
        } else {
            Err(SyncError::NotAuthenticated)
        }
    }
}
