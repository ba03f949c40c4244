//! Repository management handlers
//!
//! Registration (with the interactive project picker), relocation, editing
//! and the reachability check.

use anyhow::{Context, Result};
use colored::Colorize;
use inquire::{InquireError, Select};
use std::path::{Path, PathBuf};

use crate::remote::{RemoteApi, RemoteProject};
use crate::scm::RepositoryQuery;
use crate::session::SessionProvider;
use crate::store::{RepoStatus, Repository};
use crate::sync::{RegisterOptions, SyncService};

/// Handle the register command
pub fn handle_register<Q, R, S>(
    service: &SyncService<Q, R, S>,
    path: PathBuf,
    name: Option<String>,
    description: Option<String>,
    project: Option<String>,
) -> Result<()>
where
    Q: RepositoryQuery,
    R: RemoteApi,
    S: SessionProvider,
{
    let project_id = match project {
        Some(project) => Some(project),
        None => pick_project(service.list_projects()?)?,
    };

    let repo = service.register_repository(&RegisterOptions {
        path,
        name,
        description: description.unwrap_or_default(),
        project_id,
    })?;

    println!("{} {}", "✓ Registered".green().bold(), repo.name.bold());
    print_repository(&repo);

    if repo.project_id.is_none() {
        println!(
            "\n{} No project attached; extraction needs one.",
            "Note:".yellow()
        );
    }

    Ok(())
}

/// Let the developer choose a project. `None` when there is nothing to
/// choose from, the prompt is skipped, or no terminal is attached.
fn pick_project(projects: Vec<RemoteProject>) -> Result<Option<String>> {
    if projects.is_empty() {
        println!("{}", "No projects available on the remote.".yellow());
        return Ok(None);
    }

    match Select::new("Attach to project:", projects)
        .with_help_message("Esc to register without a project")
        .prompt_skippable()
    {
        Ok(choice) => Ok(choice.map(|p| p.project_id)),
        Err(InquireError::NotTTY) => {
            log::debug!("No terminal for the project picker; registering without a project");
            Ok(None)
        }
        Err(e) => Err(e).context("Project selection failed"),
    }
}

/// Handle the check command
pub fn handle_check<Q, R, S>(service: &SyncService<Q, R, S>) -> Result<()>
where
    Q: RepositoryQuery,
    R: RemoteApi,
    S: SessionProvider,
{
    let statuses = service.refresh_repository_statuses()?;

    if statuses.is_empty() {
        println!("{}", "No repositories registered.".yellow());
        return Ok(());
    }

    for (repo_id, status) in &statuses {
        let label = match status {
            RepoStatus::Active => status.as_str().green(),
            RepoStatus::Missing | RepoStatus::Moved => status.as_str().yellow(),
            RepoStatus::Deleted => status.as_str().red(),
        };
        println!("  {} {}", label, repo_id);
    }

    let unhealthy = statuses
        .iter()
        .filter(|(_, s)| *s != RepoStatus::Active)
        .count();
    if unhealthy > 0 {
        println!(
            "\n{} {} repositor{} need attention. Use {} if one was moved.",
            "Note:".yellow(),
            unhealthy,
            if unhealthy == 1 { "y" } else { "ies" },
            "repo-ledger relocate".cyan()
        );
    }

    Ok(())
}

/// Handle the relocate command
pub fn handle_relocate<Q, R, S>(
    service: &SyncService<Q, R, S>,
    repo_id: &str,
    new_path: &Path,
) -> Result<()>
where
    Q: RepositoryQuery,
    R: RemoteApi,
    S: SessionProvider,
{
    let repo = service.relocate_repository(repo_id, new_path)?;
    println!("{} {}", "✓ Relocated".green().bold(), repo.name.bold());
    print_repository(&repo);
    Ok(())
}

/// Handle the edit command
pub fn handle_edit<Q, R, S>(
    service: &SyncService<Q, R, S>,
    repo_id: &str,
    name: Option<&str>,
    description: Option<&str>,
) -> Result<()>
where
    Q: RepositoryQuery,
    R: RemoteApi,
    S: SessionProvider,
{
    if name.is_none() && description.is_none() {
        println!("{}", "Nothing to change.".yellow());
        return Ok(());
    }

    let repo = service.update_repository_details(repo_id, name, description)?;
    println!("{} {}", "✓ Updated".green().bold(), repo.name.bold());
    print_repository(&repo);
    Ok(())
}

fn print_repository(repo: &Repository) {
    println!("   {} {}", "Id:".dimmed(), repo.repo_id);
    println!("   {} {}", "Path:".dimmed(), repo.path.display());
    if !repo.description.is_empty() {
        println!("   {} {}", "Description:".dimmed(), repo.description);
    }
    if let Some(project) = &repo.project_id {
        println!("   {} {}", "Project:".dimmed(), project);
    }
    println!("   {} {}", "Permission:".dimmed(), repo.permission.as_str());
}
