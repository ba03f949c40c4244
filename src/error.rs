use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result alias used throughout the sync engine.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Failures raised by the repository sync engine.
///
/// Validation variants describe something the developer can fix (wrong path,
/// missing git identity, unassigned project). Infrastructure variants wrap the
/// git subprocess, the local database or the remote backend and are logged with
/// full context before reaching the caller.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Path does not exist: {}", path.display())]
    PathNotFound { path: PathBuf },

    #[error("Path is not accessible: {}: {source}", path.display())]
    PathInaccessible {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Not a git repository (or not its root): {}", path.display())]
    NotAGitRepository { path: PathBuf },

    #[error("Repository at {} has no commits yet", path.display())]
    NoCommitsYet { path: PathBuf },

    #[error("git user.name is not configured for {}. Run 'git config user.name \"Your Name\"' inside the repository", path.display())]
    GitUserNotConfigured { path: PathBuf },

    #[error("Repository '{repo_id}' is not associated with a project")]
    MissingProjectAssociation { repo_id: String },

    #[error("No active repository '{repo_id}' for developer '{developer_id}'")]
    RepositoryNotFound {
        repo_id: String,
        developer_id: String,
    },

    #[error("Repository path is unreachable: {}", path.display())]
    PathUnreachable { path: PathBuf },

    #[error("Repository at {} is already registered as '{repo_id}'", path.display())]
    AlreadyRegistered { path: PathBuf, repo_id: String },

    #[error("Repository at {} has fingerprint {found}, expected {expected}", path.display())]
    FingerprintMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },

    #[error("git command failed: git {command} (in {}): {stderr}", path.display())]
    GitCommandFailed {
        command: String,
        path: PathBuf,
        stderr: String,
    },

    #[error("git command timed out after {timeout:?}: git {command} (in {})", path.display())]
    GitTimedOut {
        command: String,
        path: PathBuf,
        timeout: Duration,
    },

    #[error("Local storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Remote backend unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("Remote backend rejected credentials: {0}")]
    Unauthorized(String),

    #[error("Remote backend returned HTTP {status}: {body}")]
    RemoteRejected { status: u16, body: String },

    #[error("Remote accepted {accepted} of {sent} commit(s) for '{repo_id}'")]
    PartialUpload {
        repo_id: String,
        accepted: usize,
        sent: usize,
    },

    #[error("Malformed response from {endpoint}: {reason}")]
    MalformedRemoteResponse { endpoint: String, reason: String },

    #[error("Not signed in. No authenticated session is available")]
    NotAuthenticated,
}

impl SyncError {
    /// Whether the error describes something the developer can fix themselves.
    ///
    /// Callers show these with their specific cause; everything else is an
    /// infrastructure failure that gets logged and reported generically.
    pub fn is_user_actionable(&self) -> bool {
        matches!(
            self,
            SyncError::PathNotFound { .. }
                | SyncError::PathInaccessible { .. }
                | SyncError::NotAGitRepository { .. }
                | SyncError::NoCommitsYet { .. }
                | SyncError::GitUserNotConfigured { .. }
                | SyncError::MissingProjectAssociation { .. }
                | SyncError::RepositoryNotFound { .. }
                | SyncError::PathUnreachable { .. }
                | SyncError::AlreadyRegistered { .. }
                | SyncError::FingerprintMismatch { .. }
                | SyncError::NotAuthenticated
        )
    }

    /// Whether the remote could not be reached at all (as opposed to refusing
    /// the request). Only this class of failure triggers the offline view.
    pub fn is_network_unreachable(&self) -> bool {
        matches!(self, SyncError::NetworkUnreachable(_))
    }
}
