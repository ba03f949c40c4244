//! Sync orchestration: registration, commit extraction, upload and the
//! consolidated repository view.
//!
//! [`SyncService`] is built once by the composition root with its store, git
//! backend, remote client and session source, and exposes the callable
//! operations. Scheduling them is up to the caller.

mod extract;
mod push;
mod reconcile;
mod register;
mod status;

#[cfg(test)]
pub(crate) mod testing;

pub use extract::{CommitExtractor, ExtractionOutcome, RepoExtraction};
pub use push::PushOutcome;
pub use reconcile::{
    compare_repositories, consolidated_view, offline_view, ComparisonCounts, ComparisonResult,
    RepositoriesView, RepositoryView, SyncStatus, ViewStatus,
};
pub use register::RegisterOptions;

use crate::error::{Result, SyncError};
use crate::remote::RemoteApi;
use crate::scm::RepositoryQuery;
use crate::session::{Session, SessionProvider};
use crate::store::{Repository, Store};

/// Entry point for all sync operations.
pub struct SyncService<Q, R, S> {
    store: Store,
    git: Q,
    remote: R,
    session: S,
}

impl<Q, R, S> SyncService<Q, R, S>
where
    Q: RepositoryQuery,
    R: RemoteApi,
    S: SessionProvider,
{
    pub fn new(store: Store, git: Q, remote: R, session: S) -> Self {
        Self {
            store,
            git,
            remote,
            session,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Release the service, handing the store back for an orderly close.
    pub fn into_store(self) -> Store {
        self.store
    }

    /// Validate a path and return its fingerprint.
    pub fn validate_local_repository(&self, path: &std::path::Path) -> Result<String> {
        self.git.validate_repository(path)
    }

    /// All repositories stored for the signed-in developer.
    pub fn local_repositories(&self) -> Result<Vec<Repository>> {
        let session = self.session()?;
        self.store.repositories_for_developer(&session.developer_id)
    }

    fn session(&self) -> Result<Session> {
        self.session.current_session()
    }

    /// A non-deleted repository of this developer, or `RepositoryNotFound`.
    fn require_repository(&self, repo_id: &str, developer_id: &str) -> Result<Repository> {
        self.store
            .find_active_repository(repo_id, developer_id)?
            .ok_or_else(|| SyncError::RepositoryNotFound {
                repo_id: repo_id.to_string(),
                developer_id: developer_id.to_string(),
            })
    }
}
