/// Current schema version, recorded in `PRAGMA user_version`.
pub const SCHEMA_VERSION: i32 = 1;

/// All DDL for the local store. Every statement is idempotent.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS repositories (
    local_id         INTEGER PRIMARY KEY AUTOINCREMENT,
    repo_id          TEXT NOT NULL UNIQUE,
    name             TEXT NOT NULL,
    description      TEXT NOT NULL DEFAULT '',
    path             TEXT NOT NULL,
    status           TEXT NOT NULL DEFAULT 'active'
                     CHECK (status IN ('active', 'missing', 'moved', 'deleted')),
    developer_id     TEXT NOT NULL,
    project_id       TEXT,
    permission       TEXT NOT NULL DEFAULT 'read-write'
                     CHECK (permission IN ('read', 'read-write')),
    repo_fingerprint TEXT NOT NULL,
    last_synced_at   TEXT,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_repositories_developer
    ON repositories (developer_id);

CREATE INDEX IF NOT EXISTS idx_repositories_fingerprint
    ON repositories (developer_id, repo_fingerprint);

CREATE TRIGGER IF NOT EXISTS repositories_fingerprint_immutable
    BEFORE UPDATE OF repo_fingerprint ON repositories
    WHEN OLD.repo_fingerprint <> NEW.repo_fingerprint
BEGIN
    SELECT RAISE(ABORT, 'repo_fingerprint is immutable');
END;

CREATE TABLE IF NOT EXISTS git_commits (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    repo_id        TEXT NOT NULL,
    developer_id   TEXT NOT NULL,
    project_id     TEXT NOT NULL,
    branch         TEXT NOT NULL,
    message        TEXT NOT NULL,
    commit_hash    TEXT NOT NULL,
    timestamp      TEXT NOT NULL,
    files_changed  INTEGER NOT NULL DEFAULT 0,
    files_added    INTEGER NOT NULL DEFAULT 0,
    files_removed  INTEGER NOT NULL DEFAULT 0,
    lines_added    INTEGER NOT NULL DEFAULT 0,
    lines_removed  INTEGER NOT NULL DEFAULT 0,
    changes        TEXT NOT NULL DEFAULT '[]',
    parent_commit  TEXT,
    synced         INTEGER NOT NULL DEFAULT 0,
    created_at     TEXT NOT NULL,
    updated_at     TEXT NOT NULL,
    UNIQUE (commit_hash, project_id, developer_id)
);

CREATE INDEX IF NOT EXISTS idx_git_commits_repo_synced
    ON git_commits (repo_id, developer_id, synced);

CREATE TRIGGER IF NOT EXISTS git_commits_synced_forward_only
    BEFORE UPDATE OF synced ON git_commits
    WHEN OLD.synced = 1 AND NEW.synced = 0
BEGIN
    SELECT RAISE(ABORT, 'synced commits cannot be marked unsynced');
END;
"#;
