//! Incremental extraction of the developer's own commits across all local branches.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;

use super::SyncService;
use crate::error::{Result, SyncError};
use crate::parser::parse_show_stat;
use crate::remote::RemoteApi;
use crate::scm::{LogEntry, RepositoryQuery};
use crate::session::SessionProvider;
use crate::store::{CommitRecord, CommitStats, RepoStatus, Repository, Store};

/// Result of one extraction run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionOutcome {
    pub repo_id: String,
    /// Every commit discovered in this run, including ones already stored
    pub commits: Vec<CommitRecord>,
    /// How many of `commits` were new rows
    pub inserted: usize,
    /// The `last_synced_at` value written at the end of the run
    pub watermark: DateTime<Utc>,
}

/// Per-repository result of [`SyncService::extract_all`].
#[derive(Debug)]
pub struct RepoExtraction {
    pub repo_id: String,
    pub name: String,
    pub result: Result<ExtractionOutcome>,
}

/// Walks local branches and turns the developer's commits into stored records.
///
/// Branches and commits are processed sequentially. The first branch on which
/// a commit hash appears is the one recorded for it.
pub struct CommitExtractor<'a, Q: ?Sized> {
    store: &'a Store,
    git: &'a Q,
}

impl<'a, Q: RepositoryQuery + ?Sized> CommitExtractor<'a, Q> {
    pub fn new(store: &'a Store, git: &'a Q) -> Self {
        Self { store, git }
    }

    /// Extract commits authored since the repository's watermark.
    ///
    /// Fails as a whole on any error; nothing is written and the watermark
    /// stays put.
    pub fn extract_new_commits(
        &self,
        repo_id: &str,
        developer_id: &str,
    ) -> Result<ExtractionOutcome> {
        let started_at = Utc::now();

        let repo = self
            .store
            .find_active_repository(repo_id, developer_id)?
            .ok_or_else(|| SyncError::RepositoryNotFound {
                repo_id: repo_id.to_string(),
                developer_id: developer_id.to_string(),
            })?;

        let project_id = repo
            .project_id
            .clone()
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| SyncError::MissingProjectAssociation {
                repo_id: repo_id.to_string(),
            })?;

        let reachability = self.git.check_reachable(&repo.path);
        if reachability != RepoStatus::Active {
            if reachability != repo.status {
                self.store.update_status(repo_id, reachability)?;
            }
            log::warn!(
                "Repository {} at {} is {}",
                repo_id,
                repo.path.display(),
                reachability
            );
            return Err(SyncError::PathUnreachable { path: repo.path });
        }

        let author = self.git.user_name(&repo.path)?;
        log::debug!(
            "Extracting commits by '{}' from {} since {:?}",
            author,
            repo.path.display(),
            repo.last_synced_at
        );

        let commits = self.collect_commits(&repo, &project_id, &author)?;

        let inserted = if commits.is_empty() {
            0
        } else {
            self.store.bulk_insert_commits(&commits)?
        };

        let watermark = next_watermark(repo.last_synced_at, started_at);
        self.store.update_last_synced_at(repo_id, watermark)?;
        if repo.status != RepoStatus::Active {
            self.store.update_status(repo_id, RepoStatus::Active)?;
        }

        log::info!(
            "Extracted {} commit(s) from {} ({} new)",
            commits.len(),
            repo.name,
            inserted
        );

        Ok(ExtractionOutcome {
            repo_id: repo_id.to_string(),
            commits,
            inserted,
            watermark,
        })
    }

    fn collect_commits(
        &self,
        repo: &Repository,
        project_id: &str,
        author: &str,
    ) -> Result<Vec<CommitRecord>> {
        let branches = self.git.list_local_branches(&repo.path)?;
        let mut seen: HashSet<String> = HashSet::new();
        let mut records = Vec::new();

        for branch in &branches {
            let entries =
                self.git
                    .log_commits(&repo.path, &branch.name, author, repo.last_synced_at)?;

            for entry in entries {
                if !seen.insert(entry.hash.clone()) {
                    continue;
                }
                records.push(self.build_record(repo, project_id, &branch.name, entry)?);
            }
        }

        Ok(records)
    }

    fn build_record(
        &self,
        repo: &Repository,
        project_id: &str,
        branch: &str,
        entry: LogEntry,
    ) -> Result<CommitRecord> {
        let files = self.git.diff_tree_name_status(&repo.path, &entry.hash)?;
        let stat = parse_show_stat(&self.git.show_stat_summary(&repo.path, &entry.hash)?);

        let stats = CommitStats {
            files_changed: files.len() as u32,
            files_added: files.iter().filter(|f| f.is_added()).count() as u32,
            files_removed: files.iter().filter(|f| f.is_removed()).count() as u32,
            lines_added: stat.total_insertions,
            lines_removed: stat.total_deletions,
        };
        let parent_commit = entry.first_parent().map(str::to_string);

        Ok(CommitRecord {
            repo_id: repo.repo_id.clone(),
            developer_id: repo.developer_id.clone(),
            project_id: project_id.to_string(),
            branch: branch.to_string(),
            message: entry.message,
            commit_hash: entry.hash,
            timestamp: entry.date,
            stats,
            changes: stat.changes,
            parent_commit,
        })
    }
}

/// The watermark never moves backwards and always advances past the previous one.
fn next_watermark(previous: Option<DateTime<Utc>>, candidate: DateTime<Utc>) -> DateTime<Utc> {
    match previous {
        Some(prev) if candidate <= prev => prev + Duration::milliseconds(1),
        _ => candidate,
    }
}

impl<Q, R, S> SyncService<Q, R, S>
where
    Q: RepositoryQuery,
    R: RemoteApi,
    S: SessionProvider,
{
    /// Extract new commits for one of the signed-in developer's repositories.
    pub fn extract_new_commits(&self, repo_id: &str) -> Result<ExtractionOutcome> {
        let session = self.session()?;
        CommitExtractor::new(&self.store, &self.git)
            .extract_new_commits(repo_id, &session.developer_id)
    }

    /// Extract every non-deleted repository in turn.
    ///
    /// A failure is recorded against its repository and does not stop the rest.
    pub fn extract_all(&self) -> Result<Vec<RepoExtraction>> {
        let session = self.session()?;
        let extractor = CommitExtractor::new(&self.store, &self.git);

        let mut results = Vec::new();
        for repo in self.store.repositories_for_developer(&session.developer_id)? {
            if repo.status == RepoStatus::Deleted {
                continue;
            }
            let result = extractor.extract_new_commits(&repo.repo_id, &session.developer_id);
            if let Err(e) = &result {
                log::error!("Extraction failed for {}: {}", repo.repo_id, e);
            }
            results.push(RepoExtraction {
                repo_id: repo.repo_id,
                name: repo.name,
                result,
            });
        }

        Ok(results)
    }
}
