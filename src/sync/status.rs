use super::reconcile::{self, ComparisonResult, RepositoriesView};
use super::SyncService;
use crate::error::Result;
use crate::remote::{RemoteApi, RemoteProject, RemoteRepository};
use crate::scm::RepositoryQuery;
use crate::session::SessionProvider;

impl<Q, R, S> SyncService<Q, R, S>
where
    Q: RepositoryQuery,
    R: RemoteApi,
    S: SessionProvider,
{
    /// Compare the developer's stored repositories against a remote listing.
    pub fn compare_repositories(
        &self,
        developer_id: &str,
        remote: Vec<RemoteRepository>,
    ) -> Result<ComparisonResult> {
        let local = self.store.repositories_for_developer(developer_id)?;
        Ok(reconcile::compare_repositories(local, remote))
    }

    /// Consolidated local/remote view for the signed-in developer.
    ///
    /// If the remote cannot be reached the local list is returned marked
    /// offline. Authentication and protocol failures are still errors.
    pub fn repositories_view(&self) -> Result<RepositoriesView> {
        let session = self.session()?;

        let remote = match self.remote.list_repositories(&session) {
            Ok(remote) => remote,
            Err(e) if e.is_network_unreachable() => {
                log::warn!("Remote unreachable, showing local repositories only: {}", e);
                let local = self.store.repositories_for_developer(&session.developer_id)?;
                return Ok(reconcile::offline_view(&local));
            }
            Err(e) => return Err(e),
        };

        let comparison = self.compare_repositories(&session.developer_id, remote)?;
        log::debug!(
            "Compared {} local and {} remote repositories",
            comparison.counts.local,
            comparison.counts.remote
        );
        Ok(reconcile::consolidated_view(&comparison))
    }

    /// Projects the signed-in developer can attach repositories to.
    pub fn list_projects(&self) -> Result<Vec<RemoteProject>> {
        let session = self.session()?;
        self.remote.list_projects(&session)
    }
}
