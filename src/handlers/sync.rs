//! Extract and push handlers

use anyhow::Result;
use colored::Colorize;

use crate::error::SyncError;
use crate::remote::RemoteApi;
use crate::scm::RepositoryQuery;
use crate::session::SessionProvider;
use crate::sync::{ExtractionOutcome, RepoExtraction, SyncService};

/// Handle the extract command
///
/// With a repository id only that repository is extracted and any failure is
/// returned. Without one, every repository is extracted and failures are
/// reported per repository.
pub fn handle_extract<Q, R, S>(service: &SyncService<Q, R, S>, repo_id: Option<&str>) -> Result<()>
where
    Q: RepositoryQuery,
    R: RemoteApi,
    S: SessionProvider,
{
    if let Some(repo_id) = repo_id {
        let outcome = service.extract_new_commits(repo_id)?;
        print_outcome(repo_id, &outcome);
        return Ok(());
    }

    let results = service.extract_all()?;
    if results.is_empty() {
        println!("{}", "No repositories registered.".yellow());
        return Ok(());
    }

    let failed = print_results(&results);
    if failed > 0 {
        println!(
            "\n{} {} of {} repositories failed.",
            "Warning:".yellow().bold(),
            failed,
            results.len()
        );
    }

    Ok(())
}

fn print_outcome(name: &str, outcome: &ExtractionOutcome) {
    println!(
        "  {} {}: {} commit(s) found, {} new",
        "✓".green(),
        name.bold(),
        outcome.commits.len(),
        outcome.inserted.to_string().cyan()
    );
}

/// Print per-repository results and return the number of failures.
fn print_results(results: &[RepoExtraction]) -> usize {
    let mut failed = 0;
    for extraction in results {
        match &extraction.result {
            Ok(outcome) => print_outcome(&extraction.name, outcome),
            Err(e) => {
                failed += 1;
                println!(
                    "  {} {}: {}",
                    "✗".red(),
                    extraction.name.bold(),
                    describe_failure(e)
                );
            }
        }
    }
    failed
}

/// Specific cause for actionable errors, a generic one otherwise.
pub(crate) fn describe_failure(error: &SyncError) -> String {
    if error.is_user_actionable() {
        error.to_string()
    } else {
        format!("failed ({})", error_kind(error))
    }
}

fn error_kind(error: &SyncError) -> &'static str {
    match error {
        SyncError::GitCommandFailed { .. } | SyncError::GitTimedOut { .. } => "git error",
        SyncError::Storage(_) => "storage error",
        SyncError::NetworkUnreachable(_) => "remote unreachable",
        SyncError::Unauthorized(_) => "not authorized",
        SyncError::RemoteRejected { .. }
        | SyncError::MalformedRemoteResponse { .. }
        | SyncError::PartialUpload { .. } => "remote error",
        _ => "error",
    }
}

/// Handle the push command
pub fn handle_push<Q, R, S>(service: &SyncService<Q, R, S>, repo_id: Option<&str>) -> Result<()>
where
    Q: RepositoryQuery,
    R: RemoteApi,
    S: SessionProvider,
{
    let outcomes = service.push_unsynced_commits(repo_id)?;

    if outcomes.is_empty() {
        println!("{}", "Everything is already pushed.".green());
        return Ok(());
    }

    let total: usize = outcomes.iter().map(|o| o.uploaded).sum();
    for outcome in &outcomes {
        println!(
            "  {} {}: {} commit(s)",
            "✓".green(),
            outcome.repo_id.bold(),
            outcome.uploaded
        );
    }
    println!("{} {} commit(s) pushed.", "✓".green().bold(), total);

    Ok(())
}
