use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use repo_ledger::config::ConfigManager;
use repo_ledger::handlers;
use repo_ledger::logger;
use repo_ledger::remote::HttpRemote;
use repo_ledger::scm::{self, GitCli};
use repo_ledger::session::FileSession;
use repo_ledger::settings::{self, Settings};
use repo_ledger::store::Store;
use repo_ledger::sync::SyncService;
use repo_ledger::SyncError;

type Service = SyncService<GitCli, HttpRemote, FileSession>;

#[derive(Parser)]
#[command(name = "repo-ledger")]
#[command(about = "Record your own commits from local Git repositories and sync them to the ledger", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a local Git repository
    Register {
        /// Path to the root of the working tree
        path: PathBuf,

        /// Display name (defaults to the directory name)
        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        /// Project id to attach (prompts with a picker when omitted)
        #[arg(short, long)]
        project: Option<String>,
    },

    /// Extract new commits into the local ledger
    Extract {
        /// Only this repository (default: all)
        #[arg(short, long)]
        repo: Option<String>,
    },

    /// Upload commits that have not been pushed yet
    Push {
        /// Only this repository (default: all)
        #[arg(short, long)]
        repo: Option<String>,
    },

    /// Compare local and remote repositories
    Status {
        /// Output format: console, json or markdown
        #[arg(short, long, default_value = "console")]
        format: String,

        /// Output file (default: print to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Re-check that registered paths are still Git repositories
    Check,

    /// Point a registered repository at its new location
    Relocate {
        repo_id: String,
        new_path: PathBuf,
    },

    /// Change a repository's name or description
    Edit {
        repo_id: String,

        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long)]
        description: Option<String>,
    },

    /// List projects available on the remote
    Projects,

    /// Configure settings
    Config {
        /// Base URL of the remote API
        #[arg(long)]
        api_url: Option<String>,

        /// Per-call git timeout in seconds
        #[arg(long)]
        git_timeout: Option<u64>,

        /// Per-request HTTP timeout in seconds
        #[arg(long)]
        http_timeout: Option<u64>,

        /// Location of the local database
        #[arg(long)]
        database: Option<PathBuf>,

        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

fn main() {
    if let Err(e) = logger::init_logger() {
        eprintln!("{} Failed to initialize logging: {:#}", "Warning:".yellow(), e);
    }

    if let Err(e) = run(Cli::parse()) {
        report_error(&e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Config {
            api_url,
            git_timeout,
            http_timeout,
            database,
            show,
        } => {
            if show {
                settings::show_settings()
            } else if api_url.is_none()
                && git_timeout.is_none()
                && http_timeout.is_none()
                && database.is_none()
            {
                handlers::handle_config_interactive()
            } else {
                settings::update_settings(api_url, git_timeout, http_timeout, database)
            }
        }
        command => {
            let service = build_service()?;
            let result = dispatch(&service, command);
            service
                .into_store()
                .close()
                .context("Failed to close the local database")?;
            result
        }
    }
}

fn dispatch(service: &Service, command: Commands) -> Result<()> {
    match command {
        Commands::Register {
            path,
            name,
            description,
            project,
        } => handlers::handle_register(service, path, name, description, project),
        Commands::Extract { repo } => handlers::handle_extract(service, repo.as_deref()),
        Commands::Push { repo } => handlers::handle_push(service, repo.as_deref()),
        Commands::Status { format, output } => {
            handlers::handle_status(service, &format, output.as_deref())
        }
        Commands::Check => handlers::handle_check(service),
        Commands::Relocate { repo_id, new_path } => {
            handlers::handle_relocate(service, &repo_id, &new_path)
        }
        Commands::Edit {
            repo_id,
            name,
            description,
        } => handlers::handle_edit(service, &repo_id, name.as_deref(), description.as_deref()),
        Commands::Projects => handlers::handle_projects(service),
        Commands::Config { .. } => Ok(()),
    }
}

/// Wire the store, git backend, remote client and session source together.
fn build_service() -> Result<Service> {
    if !scm::is_available() {
        anyhow::bail!("git was not found on PATH");
    }

    let settings = Settings::load()?;
    let db_path = settings.resolved_database_path()?;
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let store = Store::open(&db_path)
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?;

    let git = GitCli::new(settings.git_timeout());
    let remote = HttpRemote::new(&settings.api_base_url, settings.http_timeout());
    let session = FileSession::from_config_dir()?;

    log::debug!(
        "Using database {} and remote {}",
        db_path.display(),
        settings.api_base_url
    );
    Ok(SyncService::new(store, git, remote, session))
}

/// Actionable errors are shown as-is; anything else is logged in full and
/// summarized on the console.
fn report_error(error: &anyhow::Error) {
    if let Some(sync_error) = error.downcast_ref::<SyncError>() {
        if sync_error.is_user_actionable() {
            eprintln!("{} {}", "Error:".red().bold(), sync_error);
            return;
        }
    }

    log::debug!("{:#}", error);
    let _ = logger::log_to_file(&format!("ERROR: {error:#}"));

    let hint = ConfigManager::log_file_path()
        .map(|p| format!(" See {} for details.", p.display()))
        .unwrap_or_default();
    match error.downcast_ref::<SyncError>() {
        Some(SyncError::NetworkUnreachable(_)) => {
            eprintln!("{} Could not reach the remote.{}", "Error:".red().bold(), hint)
        }
        Some(SyncError::Unauthorized(_)) => eprintln!(
            "{} The remote rejected your credentials. Sign in again.",
            "Error:".red().bold()
        ),
        Some(_) => eprintln!("{} Sync failed.{}", "Error:".red().bold(), hint),
        None => eprintln!("{} {:#}", "Error:".red().bold(), error),
    }
}
