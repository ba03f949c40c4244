use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::sync::{RepositoriesView, RepositoryView, SyncStatus, ViewStatus};

/// Snapshot of the consolidated repository view, ready for display or export.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    /// RFC 3339 time the report was generated
    pub timestamp: String,

    #[serde(flatten)]
    pub view: RepositoriesView,
}

fn sync_label(status: SyncStatus) -> &'static str {
    match status {
        SyncStatus::Synced => "synced",
        SyncStatus::MissingRemote => "not on remote",
        SyncStatus::MissingLocal => "not registered here",
        SyncStatus::Offline => "offline",
    }
}

fn last_synced(repo: &RepositoryView) -> String {
    repo.last_synced_at
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "never".to_string())
}

impl StatusReport {
    pub fn from_view(view: RepositoriesView) -> Self {
        StatusReport {
            timestamp: chrono::Utc::now().to_rfc3339(),
            view,
        }
    }

    /// Generate a markdown report
    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str("# Repository Sync Report\n\n");
        output.push_str(&format!("**Generated:** {}\n", self.timestamp));
        output.push_str(&format!("**Status:** {}\n", self.view.status.as_str()));
        if let Some(counts) = &self.view.counts {
            output.push_str(&format!(
                "**Local:** {} / **Remote:** {} / **Missing remotely:** {} / **Missing locally:** {}\n",
                counts.local, counts.remote, counts.missing_in_remote, counts.missing_in_local
            ));
        }
        output.push('\n');

        if self.view.repositories.is_empty() {
            output.push_str("No repositories registered.\n");
            return output;
        }

        output.push_str("| Repository | Id | Path | State | Sync | Last extracted |\n");
        output.push_str("|---|---|---|---|---|---|\n");
        for repo in &self.view.repositories {
            output.push_str(&format!(
                "| {} | `{}` | `{}` | {} | {} | {} |\n",
                repo.name,
                repo.repo_id,
                repo.path,
                repo.status.map(|s| s.as_str()).unwrap_or("-"),
                sync_label(repo.sync_status),
                last_synced(repo)
            ));
        }

        output
    }

    /// Generate a JSON report
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize report to JSON")
    }

    /// Print a colored console summary
    pub fn print_summary(&self) {
        println!("\n{}", "=== Repositories ===".bold().cyan());

        let status = match self.view.status {
            ViewStatus::Synced => "in sync".green(),
            ViewStatus::RequiresAction => "requires action".yellow(),
            ViewStatus::Offline => "offline (local data only)".red(),
        };
        println!("{}: {}", "Status".bold(), status);

        if let Some(counts) = &self.view.counts {
            println!(
                "{}: {} local, {} remote",
                "Totals".bold(),
                counts.local.to_string().cyan(),
                counts.remote.to_string().cyan()
            );
        }

        if self.view.repositories.is_empty() {
            println!("\n{}", "No repositories registered.".dimmed());
            println!("Run {} to add one.", "repo-ledger register <path>".cyan());
            return;
        }

        println!();
        for repo in &self.view.repositories {
            let sync = match repo.sync_status {
                SyncStatus::Synced => sync_label(repo.sync_status).green(),
                SyncStatus::MissingRemote | SyncStatus::MissingLocal => {
                    sync_label(repo.sync_status).yellow()
                }
                SyncStatus::Offline => sync_label(repo.sync_status).dimmed(),
            };
            println!(
                "  {} {} [{}]",
                repo.name.bold(),
                format!("({})", repo.repo_id).dimmed(),
                sync
            );
            println!("     Path: {}", repo.path);
            if let Some(state) = repo.status {
                println!("     State: {}", state);
            }
            println!("     Last extracted: {}", last_synced(repo));
        }
        println!();
    }

    /// Save report to file
    pub fn save(&self, path: &Path, format: &str) -> Result<()> {
        let content = match format.to_lowercase().as_str() {
            "json" => self.to_json()?,
            "markdown" | "md" => self.to_markdown(),
            _ => return Err(anyhow::anyhow!("Unsupported format: {format}")),
        };

        fs::write(path, content)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;

        println!(
            "{} {}",
            "Report saved to:".green().bold(),
            path.display().to_string().cyan()
        );

        Ok(())
    }
}

/// Print or save a report in the requested format
pub fn output_report(report: &StatusReport, format: &str, output: Option<&Path>) -> Result<()> {
    if let Some(output_path) = output {
        return report.save(output_path, format);
    }

    match format.to_lowercase().as_str() {
        "json" => println!("{}", report.to_json()?),
        "markdown" | "md" => println!("{}", report.to_markdown()),
        _ => report.print_summary(),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RepoStatus;
    use crate::sync::ComparisonCounts;
    use tempfile::TempDir;

    fn view() -> RepositoriesView {
        RepositoriesView {
            status: ViewStatus::RequiresAction,
            repositories: vec![
                RepositoryView {
                    repo_id: "r-1".to_string(),
                    name: "api".to_string(),
                    path: "/work/api".to_string(),
                    description: String::new(),
                    project_id: Some("p-1".to_string()),
                    status: Some(RepoStatus::Active),
                    last_synced_at: None,
                    sync_status: SyncStatus::MissingRemote,
                },
                RepositoryView {
                    repo_id: "r-2".to_string(),
                    name: "web".to_string(),
                    path: "/remote/web".to_string(),
                    description: String::new(),
                    project_id: None,
                    status: None,
                    last_synced_at: None,
                    sync_status: SyncStatus::MissingLocal,
                },
            ],
            counts: Some(ComparisonCounts {
                local: 1,
                remote: 1,
                missing_in_remote: 1,
                missing_in_local: 1,
            }),
        }
    }

    #[test]
    fn test_markdown_lists_every_repository() {
        let markdown = StatusReport::from_view(view()).to_markdown();
        assert!(markdown.contains("# Repository Sync Report"));
        assert!(markdown.contains("**Status:** requires_action"));
        assert!(markdown.contains("| api | `r-1` | `/work/api` | active | not on remote | never |"));
        assert!(markdown.contains("| web | `r-2` | `/remote/web` | - | not registered here | never |"));
    }

    #[test]
    fn test_markdown_empty_view() {
        let report = StatusReport::from_view(RepositoriesView {
            status: ViewStatus::Synced,
            repositories: Vec::new(),
            counts: None,
        });
        assert!(report.to_markdown().contains("No repositories registered."));
    }

    #[test]
    fn test_json_is_flat() {
        let json = StatusReport::from_view(view()).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["status"], "requires_action");
        assert_eq!(value["repositories"].as_array().unwrap().len(), 2);
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_save_rejects_unknown_format() {
        let temp = TempDir::new().unwrap();
        let report = StatusReport::from_view(view());
        assert!(report.save(&temp.path().join("out.txt"), "xml").is_err());

        let path = temp.path().join("out.md");
        report.save(&path, "md").unwrap();
        assert!(fs::read_to_string(path).unwrap().contains("api"));
    }
}
