//! Repository query abstraction.
//!
//! The extraction engine talks to git only through [`RepositoryQuery`]. The
//! shipped implementation, [`GitCli`], shells out to the `git` binary; an
//! in-process implementation can be dropped in without touching callers.

mod git;

use chrono::{DateTime, Utc};
use std::path::Path;
use std::process::Command;

use crate::error::Result;
use crate::store::RepoStatus;

pub use git::GitCli;

/// A local branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchInfo {
    pub name: String,
}

/// One entry of an author-filtered commit log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub hash: String,
    pub author_name: String,
    pub date: DateTime<Utc>,
    pub message: String,
    pub parent_hashes: Vec<String>,
}

impl LogEntry {
    /// First parent, `None` for a root commit.
    pub fn first_parent(&self) -> Option<&str> {
        self.parent_hashes.first().map(String::as_str)
    }
}

/// A file-level change classification from `git diff-tree --name-status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameStatus {
    /// Status letter (`A`, `M`, `D`, `R`, `C`, `T`, ...)
    pub status_code: char,
    pub file_name: String,
}

impl NameStatus {
    pub fn is_added(&self) -> bool {
        self.status_code == 'A'
    }

    pub fn is_removed(&self) -> bool {
        self.status_code == 'D'
    }
}

/// Read-only queries against a local git working tree.
pub trait RepositoryQuery {
    /// Validate that `path` is the root of a git working tree with at least one
    /// commit, returning the root commit hash as the repository fingerprint.
    fn validate_repository(&self, path: &Path) -> Result<String>;

    /// Classify whether a registered path is still usable. Never fails.
    fn check_reachable(&self, path: &Path) -> RepoStatus;

    /// The `user.name` git resolves for this repository.
    fn user_name(&self, path: &Path) -> Result<String>;

    /// Local branches (`refs/heads/*`).
    fn list_local_branches(&self, path: &Path) -> Result<Vec<BranchInfo>>;

    /// Commits on `branch` whose author name equals `author`, optionally
    /// limited to those at or after `since`.
    fn log_commits(
        &self,
        path: &Path,
        branch: &str,
        author: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<LogEntry>>;

    /// File-level add/modify/delete classification for one commit.
    fn diff_tree_name_status(&self, path: &Path, commit_hash: &str) -> Result<Vec<NameStatus>>;

    /// Raw `git show --stat` block for one commit.
    fn show_stat_summary(&self, path: &Path, commit_hash: &str) -> Result<String>;
}

/// Check if the git binary is installed.
pub fn is_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_parent() {
        let mut entry = LogEntry {
            hash: "c".to_string(),
            author_name: "Dev".to_string(),
            date: Utc::now(),
            message: "merge".to_string(),
            parent_hashes: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(entry.first_parent(), Some("a"));

        entry.parent_hashes.clear();
        assert_eq!(entry.first_parent(), None);
    }

    #[test]
    fn test_name_status_classification() {
        let added = NameStatus {
            status_code: 'A',
            file_name: "new.rs".to_string(),
        };
        let removed = NameStatus {
            status_code: 'D',
            file_name: "old.rs".to_string(),
        };
        let renamed = NameStatus {
            status_code: 'R',
            file_name: "moved.rs".to_string(),
        };
        assert!(added.is_added() && !added.is_removed());
        assert!(removed.is_removed() && !removed.is_added());
        assert!(!renamed.is_added() && !renamed.is_removed());
    }
}
