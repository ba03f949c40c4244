//! Status and project listing handlers

use anyhow::Result;
use colored::Colorize;
use std::path::Path;

use crate::remote::RemoteApi;
use crate::report::{self, StatusReport};
use crate::scm::RepositoryQuery;
use crate::session::SessionProvider;
use crate::sync::SyncService;

/// Handle the status command
pub fn handle_status<Q, R, S>(
    service: &SyncService<Q, R, S>,
    format: &str,
    output: Option<&Path>,
) -> Result<()>
where
    Q: RepositoryQuery,
    R: RemoteApi,
    S: SessionProvider,
{
    let view = service.repositories_view()?;
    report::output_report(&StatusReport::from_view(view), format, output)
}

/// Handle the projects command
pub fn handle_projects<Q, R, S>(service: &SyncService<Q, R, S>) -> Result<()>
where
    Q: RepositoryQuery,
    R: RemoteApi,
    S: SessionProvider,
{
    let projects = service.list_projects()?;

    if projects.is_empty() {
        println!("{}", "No projects available.".yellow());
        return Ok(());
    }

    println!("{}", "Projects".cyan().bold());
    println!("{}", "=".repeat(40).cyan());
    for project in &projects {
        println!("  {} {}", project.name.bold(), project.project_id.dimmed());
    }

    Ok(())
}
