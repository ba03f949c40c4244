//! In-process fakes for exercising the sync engine without git or a backend.

use chrono::{DateTime, Utc};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Result, SyncError};
use crate::remote::{
    CommitPayload, RegisterRepositoryRequest, RegisteredRepository, RemoteApi, RemoteProject,
    RemoteRepository, UploadAck,
};
use crate::scm::{BranchInfo, LogEntry, NameStatus, RepositoryQuery};
use crate::session::{Session, SessionProvider};
use crate::store::{NewRepository, Permission, RepoStatus, Store};

pub(crate) const DEV: &str = "dev-1";
pub(crate) const AUTHOR: &str = "Test Dev";

pub(crate) fn entry(hash: &str, date: DateTime<Utc>, parents: &[&str]) -> LogEntry {
    LogEntry {
        hash: hash.to_string(),
        author_name: AUTHOR.to_string(),
        date,
        message: format!("commit {hash}"),
        parent_hashes: parents.iter().map(|p| p.to_string()).collect(),
    }
}

#[derive(Default)]
pub(crate) struct FakeGit {
    pub fingerprints: HashMap<PathBuf, String>,
    pub unreachable: HashMap<PathBuf, RepoStatus>,
    pub user_name: Option<String>,
    pub branches: Vec<(String, Vec<LogEntry>)>,
    pub name_status: HashMap<String, Vec<NameStatus>>,
    pub stats: HashMap<String, String>,
    pub failing_show: Option<String>,
    /// Return every commit regardless of `since`
    pub ignore_since: bool,
    pub since_calls: RefCell<Vec<Option<DateTime<Utc>>>>,
}

impl FakeGit {
    pub fn with_author() -> Self {
        FakeGit {
            user_name: Some(AUTHOR.to_string()),
            ..Default::default()
        }
    }
}

impl RepositoryQuery for FakeGit {
    fn validate_repository(&self, path: &Path) -> Result<String> {
        self.fingerprints
            .get(path)
            .cloned()
            .ok_or_else(|| SyncError::PathNotFound {
                path: path.to_path_buf(),
            })
    }

    fn check_reachable(&self, path: &Path) -> RepoStatus {
        self.unreachable
            .get(path)
            .copied()
            .unwrap_or(RepoStatus::Active)
    }

    fn user_name(&self, path: &Path) -> Result<String> {
        self.user_name
            .clone()
            .ok_or_else(|| SyncError::GitUserNotConfigured {
                path: path.to_path_buf(),
            })
    }

    fn list_local_branches(&self, _path: &Path) -> Result<Vec<BranchInfo>> {
        Ok(self
            .branches
            .iter()
            .map(|(name, _)| BranchInfo { name: name.clone() })
            .collect())
    }

    fn log_commits(
        &self,
        _path: &Path,
        branch: &str,
        author: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<LogEntry>> {
        self.since_calls.borrow_mut().push(since);
        let entries = self
            .branches
            .iter()
            .find(|(name, _)| name == branch)
            .map(|(_, entries)| entries.clone())
            .unwrap_or_default();

        Ok(entries
            .into_iter()
            .filter(|e| e.author_name == author)
            .filter(|e| self.ignore_since || since.map_or(true, |s| e.date >= s))
            .collect())
    }

    fn diff_tree_name_status(&self, _path: &Path, commit_hash: &str) -> Result<Vec<NameStatus>> {
        Ok(self.name_status.get(commit_hash).cloned().unwrap_or_default())
    }

    fn show_stat_summary(&self, path: &Path, commit_hash: &str) -> Result<String> {
        if self.failing_show.as_deref() == Some(commit_hash) {
            return Err(SyncError::GitCommandFailed {
                command: format!("show --stat {commit_hash}"),
                path: path.to_path_buf(),
                stderr: "fatal: bad object".to_string(),
            });
        }
        Ok(self.stats.get(commit_hash).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
pub(crate) struct FakeRemote {
    pub repos: Vec<RemoteRepository>,
    pub projects: Vec<RemoteProject>,
    pub assigned_id: String,
    pub list_error: Option<fn() -> SyncError>,
    pub upload_error: Option<fn() -> SyncError>,
    /// Acknowledge at most this many commits per upload
    pub accept_limit: Option<usize>,
    pub registrations: RefCell<Vec<RegisterRepositoryRequest>>,
    pub uploads: RefCell<Vec<Vec<CommitPayload>>>,
}

impl RemoteApi for FakeRemote {
    fn register_repository(
        &self,
        _session: &Session,
        request: &RegisterRepositoryRequest,
    ) -> Result<RegisteredRepository> {
        self.registrations.borrow_mut().push(request.clone());
        Ok(RegisteredRepository {
            repo_id: self.assigned_id.clone(),
            name: request.name.clone(),
            description: request.description.clone(),
            path: request.path.clone(),
            project_id: request.project_id.clone(),
            permission: None,
        })
    }

    fn list_repositories(&self, _session: &Session) -> Result<Vec<RemoteRepository>> {
        match self.list_error {
            Some(make_error) => Err(make_error()),
            None => Ok(self.repos.clone()),
        }
    }

    fn upload_commits(&self, _session: &Session, commits: &[CommitPayload]) -> Result<UploadAck> {
        if let Some(make_error) = self.upload_error {
            return Err(make_error());
        }
        self.uploads.borrow_mut().push(commits.to_vec());
        Ok(UploadAck {
            accepted: self.accept_limit.map_or(commits.len(), |n| n.min(commits.len())),
        })
    }

    fn list_projects(&self, _session: &Session) -> Result<Vec<RemoteProject>> {
        Ok(self.projects.clone())
    }
}

pub(crate) struct FakeSession(pub Option<Session>);

impl FakeSession {
    pub fn signed_in() -> Self {
        FakeSession(Some(Session {
            developer_id: DEV.to_string(),
            token: "token".to_string(),
        }))
    }
}

impl SessionProvider for FakeSession {
    fn current_session(&self) -> Result<Session> {
        self.0.clone().ok_or(SyncError::NotAuthenticated)
    }
}

/// Store with one registered repository `repo-1` at `/work/repo-1`.
pub(crate) fn store_with_repo(project_id: Option<&str>) -> Store {
    let store = Store::open_in_memory().unwrap();
    store
        .insert_repository(&NewRepository {
            repo_id: "repo-1".to_string(),
            name: "repo-1".to_string(),
            description: String::new(),
            path: PathBuf::from("/work/repo-1"),
            developer_id: DEV.to_string(),
            project_id: project_id.map(str::to_string),
            permission: Permission::ReadWrite,
            repo_fingerprint: "root-1".to_string(),
        })
        .unwrap();
    store
}
