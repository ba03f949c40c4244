//! Contract with the remote system of record.
//!
//! Payloads are explicit structs; every response passes through a decode and
//! validation step so a missing identifier surfaces as
//! [`SyncError::MalformedRemoteResponse`] instead of an empty string further down.

mod client;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};
use crate::parser::FileChange;
use crate::session::Session;
use crate::store::{CommitRecord, CommitStats, Permission};

pub use client::HttpRemote;

/// Body of a repository registration request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRepositoryRequest {
    pub name: String,
    pub description: String,
    pub path: String,
    pub project_id: Option<String>,
    pub developer_id: String,
    pub repo_fingerprint: String,
}

/// Registration as acknowledged by the remote.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredRepository {
    #[serde(rename = "_id", alias = "repoId")]
    pub repo_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub permission: Option<Permission>,
}

/// A repository as listed by the remote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRepository {
    #[serde(rename = "_id", alias = "repoId")]
    pub repo_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub project_id: Option<String>,
}

/// A project the developer can attach repositories to.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteProject {
    #[serde(rename = "_id", alias = "projectId")]
    pub project_id: String,
    #[serde(default)]
    pub name: String,
}

impl std::fmt::Display for RemoteProject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.project_id)
    }
}

/// One commit in an upload batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitPayload {
    pub repo_id: String,
    pub developer_id: String,
    pub project_id: String,
    pub commit_hash: String,
    pub message: String,
    pub branch: String,
    pub timestamp: DateTime<Utc>,
    pub stats: CommitStats,
    pub changes: Vec<FileChange>,
    pub parent_commit: Option<String>,
}

impl From<&CommitRecord> for CommitPayload {
    fn from(record: &CommitRecord) -> Self {
        CommitPayload {
            repo_id: record.repo_id.clone(),
            developer_id: record.developer_id.clone(),
            project_id: record.project_id.clone(),
            commit_hash: record.commit_hash.clone(),
            message: record.message.clone(),
            branch: record.branch.clone(),
            timestamp: record.timestamp,
            stats: record.stats,
            changes: record.changes.clone(),
            parent_commit: record.parent_commit.clone(),
        }
    }
}

/// Remote acknowledgement of an upload.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UploadAck {
    #[serde(default)]
    pub accepted: usize,
}

/// Operations the sync engine needs from the remote backend.
pub trait RemoteApi {
    fn register_repository(
        &self,
        session: &Session,
        request: &RegisterRepositoryRequest,
    ) -> Result<RegisteredRepository>;

    fn list_repositories(&self, session: &Session) -> Result<Vec<RemoteRepository>>;

    fn upload_commits(&self, session: &Session, commits: &[CommitPayload]) -> Result<UploadAck>;

    fn list_projects(&self, session: &Session) -> Result<Vec<RemoteProject>>;
}

/// Decode a JSON body, naming the endpoint on failure.
pub(crate) fn decode<T: DeserializeOwned>(endpoint: &str, body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| malformed(endpoint, e.to_string()))
}

pub(crate) fn malformed(endpoint: &str, reason: impl Into<String>) -> SyncError {
    let reason = reason.into();
    log::error!("Malformed response from {}: {}", endpoint, reason);
    SyncError::MalformedRemoteResponse {
        endpoint: endpoint.to_string(),
        reason,
    }
}

impl RegisteredRepository {
    pub(crate) fn validate(self, endpoint: &str) -> Result<Self> {
        if self.repo_id.trim().is_empty() {
            return Err(malformed(endpoint, "registration response has an empty repository id"));
        }
        Ok(self)
    }
}

pub(crate) fn validate_repositories(
    endpoint: &str,
    repos: Vec<RemoteRepository>,
) -> Result<Vec<RemoteRepository>> {
    if let Some(pos) = repos.iter().position(|r| r.repo_id.trim().is_empty()) {
        return Err(malformed(
            endpoint,
            format!("repository at index {pos} has an empty id"),
        ));
    }
    Ok(repos)
}

pub(crate) fn validate_projects(
    endpoint: &str,
    projects: Vec<RemoteProject>,
) -> Result<Vec<RemoteProject>> {
    if let Some(pos) = projects.iter().position(|p| p.project_id.trim().is_empty()) {
        return Err(malformed(
            endpoint,
            format!("project at index {pos} has an empty id"),
        ));
    }
    Ok(projects)
}
