use serde::Serialize;

use super::SyncService;
use crate::error::{Result, SyncError};
use crate::remote::{CommitPayload, RemoteApi};
use crate::scm::RepositoryQuery;
use crate::session::{Session, SessionProvider};
use crate::store::{RepoStatus, Repository};

/// Upload result for one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushOutcome {
    pub repo_id: String,
    pub uploaded: usize,
}

impl<Q, R, S> SyncService<Q, R, S>
where
    Q: RepositoryQuery,
    R: RemoteApi,
    S: SessionProvider,
{
    /// Upload stored commits that have not reached the remote yet.
    ///
    /// With `repo_id` only that repository is pushed; otherwise every
    /// non-deleted repository of the developer. Stops at the first failed
    /// upload, leaving its commits unsynced. A partial acknowledgement counts
    /// as a failure: nothing in that batch is marked synced.
    pub fn push_unsynced_commits(&self, repo_id: Option<&str>) -> Result<Vec<PushOutcome>> {
        let session = self.session()?;

        let repos = match repo_id {
            Some(id) => vec![self.require_repository(id, &session.developer_id)?],
            None => self
                .store
                .repositories_for_developer(&session.developer_id)?
                .into_iter()
                .filter(|r| r.status != RepoStatus::Deleted)
                .collect(),
        };

        let mut outcomes = Vec::new();
        for repo in &repos {
            if let Some(outcome) = self.push_repository(&session, repo)? {
                outcomes.push(outcome);
            }
        }
        Ok(outcomes)
    }

    fn push_repository(
        &self,
        session: &Session,
        repo: &Repository,
    ) -> Result<Option<PushOutcome>> {
        let pending = self
            .store
            .unsynced_commits(&repo.repo_id, &session.developer_id)?;
        let Some(up_to_id) = pending.iter().map(|c| c.id).max() else {
            log::debug!("Nothing to push for {}", repo.repo_id);
            return Ok(None);
        };

        let batch: Vec<CommitPayload> = pending
            .iter()
            .map(|c| CommitPayload::from(&c.record))
            .collect();
        let ack = self.remote.upload_commits(session, &batch)?;
        if ack.accepted < batch.len() {
            return Err(SyncError::PartialUpload {
                repo_id: repo.repo_id.clone(),
                accepted: ack.accepted,
                sent: batch.len(),
            });
        }
        if ack.accepted > batch.len() {
            log::warn!(
                "Remote acknowledged {} commit(s) for {} but only {} were sent",
                ack.accepted,
                repo.repo_id,
                batch.len()
            );
        }

        let marked = self
            .store
            .mark_commits_synced(&repo.repo_id, &session.developer_id, up_to_id)?;
        log::info!("Pushed {} commit(s) for {}", marked, repo.name);

        Ok(Some(PushOutcome {
            repo_id: repo.repo_id.clone(),
            uploaded: batch.len(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::testing::{entry, store_with_repo, FakeGit, FakeRemote, FakeSession, DEV};
    use chrono::{TimeZone, Utc};

    fn service_with_commits(remote: FakeRemote) -> SyncService<FakeGit, FakeRemote, FakeSession> {
        let mut git = FakeGit::with_author();
        git.branches = vec![(
            "main".to_string(),
            vec![
                entry("c2", Utc.with_ymd_and_hms(2025, 2, 2, 0, 0, 0).unwrap(), &["c1"]),
                entry("c1", Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap(), &[]),
            ],
        )];
        let service = SyncService::new(
            store_with_repo(Some("proj-1")),
            git,
            remote,
            FakeSession::signed_in(),
        );
        service.extract_new_commits("repo-1").unwrap();
        service
    }

    #[test]
    fn test_push_uploads_and_marks_synced() {
        let service = service_with_commits(FakeRemote::default());

        let outcomes = service.push_unsynced_commits(None).unwrap();
        assert_eq!(
            outcomes,
            vec![PushOutcome {
                repo_id: "repo-1".to_string(),
                uploaded: 2,
            }]
        );

        let uploads = service.remote.uploads.borrow();
        assert_eq!(uploads.len(), 1);
        // Oldest first
        assert_eq!(uploads[0][0].commit_hash, "c1");
        assert_eq!(uploads[0][0].project_id, "proj-1");
        assert_eq!(uploads[0][1].parent_commit.as_deref(), Some("c1"));

        assert!(service.store().unsynced_commits("repo-1", DEV).unwrap().is_empty());
    }

    #[test]
    fn test_second_push_is_a_no_op() {
        let service = service_with_commits(FakeRemote::default());
        service.push_unsynced_commits(Some("repo-1")).unwrap();

        let outcomes = service.push_unsynced_commits(Some("repo-1")).unwrap();
        assert!(outcomes.is_empty());
        assert_eq!(service.remote.uploads.borrow().len(), 1);
    }

    #[test]
    fn test_failed_upload_keeps_commits_pending() {
        let service = service_with_commits(FakeRemote {
            upload_error: Some(|| SyncError::NetworkUnreachable("connection refused".to_string())),
            ..Default::default()
        });

        assert!(service.push_unsynced_commits(None).is_err());
        assert_eq!(service.store().unsynced_commits("repo-1", DEV).unwrap().len(), 2);
    }

    #[test]
    fn test_partial_ack_leaves_batch_pending() {
        let service = service_with_commits(FakeRemote {
            accept_limit: Some(1),
            ..Default::default()
        });

        let err = service.push_unsynced_commits(None).unwrap_err();
        assert!(matches!(
            err,
            SyncError::PartialUpload {
                accepted: 1,
                sent: 2,
                ..
            }
        ));
        assert!(!err.is_user_actionable());
        assert_eq!(service.store().unsynced_commits("repo-1", DEV).unwrap().len(), 2);
    }

    #[test]
    fn test_zero_ack_is_retried_on_next_push() {
        let mut service = service_with_commits(FakeRemote {
            accept_limit: Some(0),
            ..Default::default()
        });
        assert!(service.push_unsynced_commits(Some("repo-1")).is_err());

        service.remote.accept_limit = None;
        let outcomes = service.push_unsynced_commits(Some("repo-1")).unwrap();
        assert_eq!(outcomes[0].uploaded, 2);
        assert_eq!(service.remote.uploads.borrow().len(), 2);
        assert!(service.store().unsynced_commits("repo-1", DEV).unwrap().is_empty());
    }

    #[test]
    fn test_push_unknown_repository() {
        let service = service_with_commits(FakeRemote::default());
        assert!(matches!(
            service.push_unsynced_commits(Some("repo-x")),
            Err(SyncError::RepositoryNotFound { .. })
        ));
    }
}
