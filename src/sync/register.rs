//! Repository registration and local bookkeeping.

use std::path::{Path, PathBuf};

use super::SyncService;
use crate::error::{Result, SyncError};
use crate::remote::{RegisterRepositoryRequest, RemoteApi};
use crate::scm::RepositoryQuery;
use crate::session::SessionProvider;
use crate::store::{NewRepository, RepoStatus, Repository};

/// Input for [`SyncService::register_repository`].
#[derive(Debug, Clone, Default)]
pub struct RegisterOptions {
    pub path: PathBuf,
    /// Defaults to the directory name
    pub name: Option<String>,
    pub description: String,
    pub project_id: Option<String>,
}

fn default_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

impl<Q, R, S> SyncService<Q, R, S>
where
    Q: RepositoryQuery,
    R: RemoteApi,
    S: SessionProvider,
{
    /// Validate a working tree, register it with the remote and store it locally.
    ///
    /// A working tree whose fingerprint is already registered for this
    /// developer is rejected, even at a different path.
    pub fn register_repository(&self, options: &RegisterOptions) -> Result<Repository> {
        let session = self.session()?;
        let fingerprint = self.git.validate_repository(&options.path)?;
        let path = std::fs::canonicalize(&options.path).unwrap_or_else(|_| options.path.clone());

        if let Some(existing) = self
            .store
            .find_by_fingerprint(&session.developer_id, &fingerprint)?
        {
            return Err(SyncError::AlreadyRegistered {
                path,
                repo_id: existing.repo_id,
            });
        }

        let request = RegisterRepositoryRequest {
            name: options
                .name
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| default_name(&path)),
            description: options.description.clone(),
            path: path.display().to_string(),
            project_id: options.project_id.clone(),
            developer_id: session.developer_id.clone(),
            repo_fingerprint: fingerprint.clone(),
        };
        let registered = self.remote.register_repository(&session, &request)?;

        let repo = self.store.insert_repository(&NewRepository {
            repo_id: registered.repo_id,
            name: request.name,
            description: request.description,
            path,
            developer_id: session.developer_id,
            project_id: registered.project_id.or(request.project_id),
            permission: registered.permission.unwrap_or_default(),
            repo_fingerprint: fingerprint,
        })?;

        log::info!(
            "Registered {} ({}) at {}",
            repo.name,
            repo.repo_id,
            repo.path.display()
        );
        Ok(repo)
    }

    /// Point a registered repository at a new location.
    ///
    /// The new working tree must carry the same fingerprint.
    pub fn relocate_repository(&self, repo_id: &str, new_path: &Path) -> Result<Repository> {
        let session = self.session()?;
        let repo = self.require_repository(repo_id, &session.developer_id)?;

        let found = self.git.validate_repository(new_path)?;
        let path = std::fs::canonicalize(new_path).unwrap_or_else(|_| new_path.to_path_buf());
        if found != repo.repo_fingerprint {
            return Err(SyncError::FingerprintMismatch {
                path,
                expected: repo.repo_fingerprint,
                found,
            });
        }

        self.store.update_path(repo_id, &path)?;
        if repo.status != RepoStatus::Active {
            self.store.update_status(repo_id, RepoStatus::Active)?;
        }
        log::info!(
            "Relocated {} from {} to {}",
            repo_id,
            repo.path.display(),
            path.display()
        );

        self.require_repository(repo_id, &session.developer_id)
    }

    /// Change the display name and/or description.
    pub fn update_repository_details(
        &self,
        repo_id: &str,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Repository> {
        let session = self.session()?;
        self.require_repository(repo_id, &session.developer_id)?;
        self.store.update_details(repo_id, name, description)?;
        self.require_repository(repo_id, &session.developer_id)
    }

    /// Re-check every registered path and persist status changes.
    pub fn refresh_repository_statuses(&self) -> Result<Vec<(String, RepoStatus)>> {
        let session = self.session()?;
        let mut statuses = Vec::new();

        for repo in self.store.repositories_for_developer(&session.developer_id)? {
            let status = self.git.check_reachable(&repo.path);
            if status != repo.status {
                log::info!("{} is now {} (was {})", repo.repo_id, status, repo.status);
                self.store.update_status(&repo.repo_id, status)?;
            }
            statuses.push((repo.repo_id, status));
        }

        Ok(statuses)
    }
}
