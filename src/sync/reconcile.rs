//! Classification of local versus remote repository sets.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;

use crate::remote::RemoteRepository;
use crate::store::{RepoStatus, Repository};

/// Per-repository sync annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Known locally and remotely
    Synced,
    /// Registered locally, absent on the remote
    MissingRemote,
    /// Listed by the remote, not registered locally
    MissingLocal,
    /// Remote could not be reached; local data only
    Offline,
}

/// Overall state of a consolidated view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewStatus {
    Synced,
    RequiresAction,
    Offline,
}

impl ViewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewStatus::Synced => "synced",
            ViewStatus::RequiresAction => "requires_action",
            ViewStatus::Offline => "offline",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonCounts {
    pub local: usize,
    pub remote: usize,
    pub missing_in_remote: usize,
    pub missing_in_local: usize,
}

/// Outcome of comparing the local and remote repository sets.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonResult {
    pub local: Vec<Repository>,
    pub remote: Vec<RemoteRepository>,
    pub missing_in_remote: Vec<Repository>,
    pub missing_in_local: Vec<RemoteRepository>,
    pub counts: ComparisonCounts,
}

/// A repository row in a consolidated view, from either side.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryView {
    pub repo_id: String,
    pub name: String,
    pub path: String,
    pub description: String,
    pub project_id: Option<String>,
    /// Reachability, only known for locally registered repositories
    pub status: Option<RepoStatus>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub sync_status: SyncStatus,
}

impl RepositoryView {
    fn from_local(repo: &Repository, sync_status: SyncStatus) -> Self {
        RepositoryView {
            repo_id: repo.repo_id.clone(),
            name: repo.name.clone(),
            path: repo.path.display().to_string(),
            description: repo.description.clone(),
            project_id: repo.project_id.clone(),
            status: Some(repo.status),
            last_synced_at: repo.last_synced_at,
            sync_status,
        }
    }

    fn from_remote(repo: &RemoteRepository) -> Self {
        RepositoryView {
            repo_id: repo.repo_id.clone(),
            name: repo.name.clone(),
            path: repo.path.clone(),
            description: repo.description.clone(),
            project_id: repo.project_id.clone(),
            status: None,
            last_synced_at: None,
            sync_status: SyncStatus::MissingLocal,
        }
    }
}

/// Annotated repository list returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoriesView {
    pub status: ViewStatus,
    pub repositories: Vec<RepositoryView>,
    /// Absent when the remote could not be consulted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counts: Option<ComparisonCounts>,
}

impl RepositoriesView {
    pub fn count_with(&self, sync_status: SyncStatus) -> usize {
        self.repositories
            .iter()
            .filter(|r| r.sync_status == sync_status)
            .count()
    }
}

/// Compare local and remote sets keyed by repository id.
pub fn compare_repositories(
    local: Vec<Repository>,
    remote: Vec<RemoteRepository>,
) -> ComparisonResult {
    let local_ids: HashSet<&str> = local.iter().map(|r| r.repo_id.as_str()).collect();
    let remote_ids: HashSet<&str> = remote.iter().map(|r| r.repo_id.as_str()).collect();

    let missing_in_remote: Vec<Repository> = local
        .iter()
        .filter(|r| !remote_ids.contains(r.repo_id.as_str()))
        .cloned()
        .collect();
    let missing_in_local: Vec<RemoteRepository> = remote
        .iter()
        .filter(|r| !local_ids.contains(r.repo_id.as_str()))
        .cloned()
        .collect();

    let counts = ComparisonCounts {
        local: local.len(),
        remote: remote.len(),
        missing_in_remote: missing_in_remote.len(),
        missing_in_local: missing_in_local.len(),
    };

    ComparisonResult {
        local,
        remote,
        missing_in_remote,
        missing_in_local,
        counts,
    }
}

/// Build the annotated view for a comparison.
///
/// Repositories present on both sides are the local set minus the local-only
/// ids.
pub fn consolidated_view(comparison: &ComparisonResult) -> RepositoriesView {
    if comparison.missing_in_remote.is_empty() && comparison.missing_in_local.is_empty() {
        return RepositoriesView {
            status: ViewStatus::Synced,
            repositories: comparison
                .local
                .iter()
                .map(|r| RepositoryView::from_local(r, SyncStatus::Synced))
                .collect(),
            counts: Some(comparison.counts),
        };
    }

    let local_only: HashSet<&str> = comparison
        .missing_in_remote
        .iter()
        .map(|r| r.repo_id.as_str())
        .collect();

    let in_both = comparison
        .local
        .iter()
        .filter(|r| !local_only.contains(r.repo_id.as_str()))
        .map(|r| RepositoryView::from_local(r, SyncStatus::Synced));
    let missing_remote = comparison
        .missing_in_remote
        .iter()
        .map(|r| RepositoryView::from_local(r, SyncStatus::MissingRemote));
    let missing_local = comparison
        .missing_in_local
        .iter()
        .map(RepositoryView::from_remote);

    RepositoriesView {
        status: ViewStatus::RequiresAction,
        repositories: in_both.chain(missing_remote).chain(missing_local).collect(),
        counts: Some(comparison.counts),
    }
}

/// View used when the remote is unreachable: every local repository, marked offline.
pub fn offline_view(local: &[Repository]) -> RepositoriesView {
    RepositoriesView {
        status: ViewStatus::Offline,
        repositories: local
            .iter()
            .map(|r| RepositoryView::from_local(r, SyncStatus::Offline))
            .collect(),
        counts: None,
    }
}
