use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::parser::FileChange;

/// Filesystem/git reachability of a registered repository.
///
/// Independent of whether the repository is in sync with the remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoStatus {
    /// Path exists and is a git working tree
    Active,
    /// Path no longer exists
    Missing,
    /// Path exists but could not be accessed
    Moved,
    /// Path exists but is no longer a git repository
    Deleted,
}

impl RepoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepoStatus::Active => "active",
            RepoStatus::Missing => "missing",
            RepoStatus::Moved => "moved",
            RepoStatus::Deleted => "deleted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(RepoStatus::Active),
            "missing" => Some(RepoStatus::Missing),
            "moved" => Some(RepoStatus::Moved),
            "deleted" => Some(RepoStatus::Deleted),
            _ => None,
        }
    }
}

impl fmt::Display for RepoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for RepoStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for RepoStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        RepoStatus::parse(s).ok_or_else(|| FromSqlError::Other(format!("unknown status '{s}'").into()))
    }
}

/// Access level the developer holds on a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "read")]
    Read,
    #[serde(rename = "read-write")]
    ReadWrite,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Read => "read",
            Permission::ReadWrite => "read-write",
        }
    }
}

impl Default for Permission {
    fn default() -> Self {
        Permission::ReadWrite
    }
}

impl ToSql for Permission {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Permission {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "read" => Ok(Permission::Read),
            "read-write" => Ok(Permission::ReadWrite),
            other => Err(FromSqlError::Other(
                format!("unknown permission '{other}'").into(),
            )),
        }
    }
}

/// A registered repository as stored locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    pub local_id: i64,
    /// Identifier assigned by the remote backend
    pub repo_id: String,
    pub name: String,
    pub description: String,
    pub path: PathBuf,
    pub status: RepoStatus,
    pub developer_id: String,
    pub project_id: Option<String>,
    pub permission: Permission,
    /// Root commit hash; never changes after registration
    pub repo_fingerprint: String,
    /// Watermark for incremental extraction
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to insert a repository row.
#[derive(Debug, Clone)]
pub struct NewRepository {
    pub repo_id: String,
    pub name: String,
    pub description: String,
    pub path: PathBuf,
    pub developer_id: String,
    pub project_id: Option<String>,
    pub permission: Permission,
    pub repo_fingerprint: String,
}

/// File- and line-level totals for one commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitStats {
    pub files_changed: u32,
    pub files_added: u32,
    pub files_removed: u32,
    pub lines_added: u32,
    pub lines_removed: u32,
}

/// A commit discovered by extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRecord {
    pub repo_id: String,
    pub developer_id: String,
    pub project_id: String,
    /// First branch the commit was seen on during extraction
    pub branch: String,
    pub message: String,
    pub commit_hash: String,
    pub timestamp: DateTime<Utc>,
    pub stats: CommitStats,
    pub changes: Vec<FileChange>,
    pub parent_commit: Option<String>,
}

/// A commit row read back from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredCommit {
    pub id: i64,
    pub record: CommitRecord,
    pub synced: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
