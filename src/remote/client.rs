//! Blocking HTTPS client for the remote backend.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use super::{
    decode, validate_projects, validate_repositories, CommitPayload, RegisterRepositoryRequest,
    RegisteredRepository, RemoteApi, RemoteProject, RemoteRepository, UploadAck,
};
use crate::error::{Result, SyncError};
use crate::session::Session;

/// [`RemoteApi`] over JSON/HTTPS with bearer-token authentication.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    agent: ureq::Agent,
    base_url: String,
}

#[derive(Serialize)]
struct UploadCommitsBody<'a> {
    commits: &'a [CommitPayload],
}

impl HttpRemote {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("repo-ledger/", env!("CARGO_PKG_VERSION")))
            .build();

        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    fn get<T: DeserializeOwned>(
        &self,
        session: &Session,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let mut request = self
            .agent
            .get(&self.url(endpoint))
            .set("Authorization", &bearer(session))
            .set("Accept", "application/json");
        for (key, value) in query {
            request = request.query(key, value);
        }

        log::debug!("GET {}", endpoint);
        let body = read_response(endpoint, request.call())?;
        decode(endpoint, &body)
    }

    fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        session: &Session,
        endpoint: &str,
        payload: &B,
    ) -> Result<T> {
        let request = self
            .agent
            .post(&self.url(endpoint))
            .set("Authorization", &bearer(session))
            .set("Accept", "application/json");

        log::debug!("POST {}", endpoint);
        let body = read_response(endpoint, request.send_json(payload))?;
        decode(endpoint, &body)
    }
}

impl RemoteApi for HttpRemote {
    fn register_repository(
        &self,
        session: &Session,
        request: &RegisterRepositoryRequest,
    ) -> Result<RegisteredRepository> {
        let endpoint = "/repositories";
        let registered: RegisteredRepository = self.post(session, endpoint, request)?;
        registered.validate(endpoint)
    }

    fn list_repositories(&self, session: &Session) -> Result<Vec<RemoteRepository>> {
        let endpoint = "/repositories";
        let repos = self.get(
            session,
            endpoint,
            &[("developerId", session.developer_id.as_str())],
        )?;
        validate_repositories(endpoint, repos)
    }

    fn upload_commits(&self, session: &Session, commits: &[CommitPayload]) -> Result<UploadAck> {
        self.post(session, "/commits", &UploadCommitsBody { commits })
    }

    fn list_projects(&self, session: &Session) -> Result<Vec<RemoteProject>> {
        let endpoint = "/projects";
        let projects = self.get(
            session,
            endpoint,
            &[("developerId", session.developer_id.as_str())],
        )?;
        validate_projects(endpoint, projects)
    }
}

fn bearer(session: &Session) -> String {
    format!("Bearer {}", session.token)
}

/// Map a ureq outcome onto the error taxonomy and return the body text.
fn read_response(
    endpoint: &str,
    result: std::result::Result<ureq::Response, ureq::Error>,
) -> Result<String> {
    match result {
        Ok(response) => response
            .into_string()
            .map_err(|e| SyncError::NetworkUnreachable(format!("{endpoint}: {e}"))),
        Err(ureq::Error::Status(status, response)) => {
            let body = response.into_string().unwrap_or_default();
            log::warn!("{} returned HTTP {}: {}", endpoint, status, body);
            if status == 401 || status == 403 {
                Err(SyncError::Unauthorized(format!("{endpoint}: HTTP {status}")))
            } else {
                Err(SyncError::RemoteRejected { status, body })
            }
        }
        Err(ureq::Error::Transport(transport)) => {
            log::warn!("{} unreachable: {}", endpoint, transport);
            Err(SyncError::NetworkUnreachable(format!(
                "{endpoint}: {transport}"
            )))
        }
    }
}
