//! Local SQLite storage for repository registrations and extracted commits.
//!
//! A [`Store`] owns one connection. It is opened by the composition root and
//! handed to the components that need it, then closed on shutdown.

mod models;
mod schema;

pub use models::{
    CommitRecord, CommitStats, NewRepository, Permission, RepoStatus, Repository, StoredCommit,
};

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::parser::FileChange;

const REPOSITORY_COLUMNS: &str = "local_id, repo_id, name, description, path, status, \
     developer_id, project_id, permission, repo_fingerprint, last_synced_at, created_at, updated_at";

const COMMIT_COLUMNS: &str = "id, repo_id, developer_id, project_id, branch, message, \
     commit_hash, timestamp, files_changed, files_added, files_removed, lines_added, \
     lines_removed, changes, parent_commit, synced, created_at, updated_at";

/// Handle to the local repository database.
#[derive(Debug)]
pub struct Store {
    conn: Connection,
    db_path: Option<PathBuf>,
}

impl Store {
    /// Open (or create) a store at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn,
            db_path: Some(path.to_path_buf()),
        };
        store.initialize()?;
        log::debug!("Opened repository store at {}", path.display());
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn,
            db_path: None,
        };
        store.initialize()?;
        Ok(store)
    }

    fn initialize(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        if self.db_path.is_some() {
            // Returns the resulting mode as a row, so query rather than execute
            let _: String = self
                .conn
                .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        }

        self.conn.execute_batch(schema::SCHEMA_SQL)?;
        self.conn
            .pragma_update(None, "user_version", schema::SCHEMA_VERSION)?;
        Ok(())
    }

    /// Path of the backing database file, `None` for in-memory stores.
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Close the underlying connection, surfacing any error from SQLite.
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| e)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Repositories
    // ------------------------------------------------------------------

    /// Insert a newly registered repository and return the stored row.
    pub fn insert_repository(&self, repo: &NewRepository) -> Result<Repository> {
        let now = Utc::now();
        self.conn.execute(
            "INSERT INTO repositories (repo_id, name, description, path, status, developer_id, \
             project_id, permission, repo_fingerprint, last_synced_at, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, NULL, ?10, ?10)",
            params![
                repo.repo_id,
                repo.name,
                repo.description,
                repo.path.to_string_lossy(),
                RepoStatus::Active,
                repo.developer_id,
                repo.project_id,
                repo.permission,
                repo.repo_fingerprint,
                now,
            ],
        )?;

        let local_id = self.conn.last_insert_rowid();
        let stored = self.conn.query_row(
            &format!("SELECT {REPOSITORY_COLUMNS} FROM repositories WHERE local_id = ?1"),
            params![local_id],
            repository_from_row,
        )?;
        Ok(stored)
    }

    /// Look up a repository by its remote identifier.
    pub fn get_repository(&self, repo_id: &str) -> Result<Option<Repository>> {
        let repo = self
            .conn
            .query_row(
                &format!("SELECT {REPOSITORY_COLUMNS} FROM repositories WHERE repo_id = ?1"),
                params![repo_id],
                repository_from_row,
            )
            .optional()?;
        Ok(repo)
    }

    /// Look up a developer's repository that has not been marked deleted.
    pub fn find_active_repository(
        &self,
        repo_id: &str,
        developer_id: &str,
    ) -> Result<Option<Repository>> {
        let repo = self
            .conn
            .query_row(
                &format!(
                    "SELECT {REPOSITORY_COLUMNS} FROM repositories \
                     WHERE repo_id = ?1 AND developer_id = ?2 AND status <> 'deleted'"
                ),
                params![repo_id, developer_id],
                repository_from_row,
            )
            .optional()?;
        Ok(repo)
    }

    /// Find a developer's live registration for the given root-commit fingerprint.
    /// Rows marked deleted are ignored.
    pub fn find_by_fingerprint(
        &self,
        developer_id: &str,
        fingerprint: &str,
    ) -> Result<Option<Repository>> {
        let repo = self
            .conn
            .query_row(
                &format!(
                    "SELECT {REPOSITORY_COLUMNS} FROM repositories \
                     WHERE developer_id = ?1 AND repo_fingerprint = ?2 \
                     AND status <> 'deleted' ORDER BY local_id LIMIT 1"
                ),
                params![developer_id, fingerprint],
                repository_from_row,
            )
            .optional()?;
        Ok(repo)
    }

    /// All repositories registered by a developer, ordered by name.
    pub fn repositories_for_developer(&self, developer_id: &str) -> Result<Vec<Repository>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {REPOSITORY_COLUMNS} FROM repositories \
             WHERE developer_id = ?1 ORDER BY name, local_id"
        ))?;
        let rows = stmt.query_map(params![developer_id], repository_from_row)?;
        let repos = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(repos)
    }

    /// Set the reachability status. Returns `false` when no such repository exists.
    pub fn update_status(&self, repo_id: &str, status: RepoStatus) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE repositories SET status = ?2, updated_at = ?3 WHERE repo_id = ?1",
            params![repo_id, status, Utc::now()],
        )?;
        Ok(changed > 0)
    }

    /// Advance the extraction watermark.
    pub fn update_last_synced_at(&self, repo_id: &str, synced_at: DateTime<Utc>) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE repositories SET last_synced_at = ?2, updated_at = ?3 WHERE repo_id = ?1",
            params![repo_id, synced_at, Utc::now()],
        )?;
        Ok(changed > 0)
    }

    /// Update name and/or description; `None` leaves the field unchanged.
    pub fn update_details(
        &self,
        repo_id: &str,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE repositories SET name = COALESCE(?2, name), \
             description = COALESCE(?3, description), updated_at = ?4 WHERE repo_id = ?1",
            params![repo_id, name, description, Utc::now()],
        )?;
        Ok(changed > 0)
    }

    /// Point a repository at a new location on disk.
    pub fn update_path(&self, repo_id: &str, path: &Path) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE repositories SET path = ?2, updated_at = ?3 WHERE repo_id = ?1",
            params![repo_id, path.to_string_lossy(), Utc::now()],
        )?;
        Ok(changed > 0)
    }

    // ------------------------------------------------------------------
    // Commits
    // ------------------------------------------------------------------

    /// Insert a commit unless one with the same (hash, project, developer)
    /// already exists. Returns whether a row was inserted.
    pub fn insert_commit_ignore_duplicates(&self, record: &CommitRecord) -> Result<bool> {
        Ok(insert_commit(&self.conn, record, Utc::now())?)
    }

    /// Insert a batch of commits in a single transaction.
    ///
    /// Duplicates are individually skipped; any other failure rolls back the
    /// whole batch. Returns the number of rows actually inserted.
    pub fn bulk_insert_commits(&self, records: &[CommitRecord]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let now = Utc::now();
        let mut inserted = 0;
        for record in records {
            if insert_commit(&tx, record, now)? {
                inserted += 1;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    /// Commits of a repository that have not been uploaded yet, oldest first.
    pub fn unsynced_commits(&self, repo_id: &str, developer_id: &str) -> Result<Vec<StoredCommit>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COMMIT_COLUMNS} FROM git_commits \
             WHERE repo_id = ?1 AND developer_id = ?2 AND synced = 0 \
             ORDER BY timestamp, id"
        ))?;
        let rows = stmt.query_map(params![repo_id, developer_id], commit_from_row)?;
        let commits = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(commits)
    }

    /// Mark every unsynced commit of a repository with `id <= up_to_id` as synced.
    pub fn mark_commits_synced(
        &self,
        repo_id: &str,
        developer_id: &str,
        up_to_id: i64,
    ) -> Result<usize> {
        let changed = self.conn.execute(
            "UPDATE git_commits SET synced = 1, updated_at = ?3 \
             WHERE repo_id = ?1 AND developer_id = ?2 AND synced = 0 AND id <= ?4",
            params![repo_id, developer_id, Utc::now(), up_to_id],
        )?;
        Ok(changed)
    }

    /// Number of stored commits for a repository.
    pub fn commit_count(&self, repo_id: &str, developer_id: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM git_commits WHERE repo_id = ?1 AND developer_id = ?2",
            params![repo_id, developer_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

fn insert_commit(
    conn: &Connection,
    record: &CommitRecord,
    now: DateTime<Utc>,
) -> rusqlite::Result<bool> {
    let changes = serde_json::to_string(&record.changes)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

    let inserted = conn.execute(
        "INSERT INTO git_commits (repo_id, developer_id, project_id, branch, message, \
         commit_hash, timestamp, files_changed, files_added, files_removed, lines_added, \
         lines_removed, changes, parent_commit, synced, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, 0, ?15, ?15) \
         ON CONFLICT (commit_hash, project_id, developer_id) DO NOTHING",
        params![
            record.repo_id,
            record.developer_id,
            record.project_id,
            record.branch,
            record.message,
            record.commit_hash,
            record.timestamp,
            record.stats.files_changed,
            record.stats.files_added,
            record.stats.files_removed,
            record.stats.lines_added,
            record.stats.lines_removed,
            changes,
            record.parent_commit,
            now,
        ],
    )?;
    Ok(inserted > 0)
}

fn repository_from_row(row: &Row<'_>) -> rusqlite::Result<Repository> {
    let path: String = row.get(4)?;
    Ok(Repository {
        local_id: row.get(0)?,
        repo_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        path: PathBuf::from(path),
        status: row.get(5)?,
        developer_id: row.get(6)?,
        project_id: row.get(7)?,
        permission: row.get(8)?,
        repo_fingerprint: row.get(9)?,
        last_synced_at: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

fn commit_from_row(row: &Row<'_>) -> rusqlite::Result<StoredCommit> {
    let changes_json: String = row.get(13)?;
    let changes: Vec<FileChange> = serde_json::from_str(&changes_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(13, Type::Text, Box::new(e)))?;

    Ok(StoredCommit {
        id: row.get(0)?,
        record: CommitRecord {
            repo_id: row.get(1)?,
            developer_id: row.get(2)?,
            project_id: row.get(3)?,
            branch: row.get(4)?,
            message: row.get(5)?,
            commit_hash: row.get(6)?,
            timestamp: row.get(7)?,
            stats: CommitStats {
                files_changed: row.get(8)?,
                files_added: row.get(9)?,
                files_removed: row.get(10)?,
                lines_added: row.get(11)?,
                lines_removed: row.get(12)?,
            },
            changes,
            parent_commit: row.get(14)?,
        },
        synced: row.get(15)?,
        created_at: row.get(16)?,
        updated_at: row.get(17)?,
    })
}
