//! # repo-ledger
//!
//! Extracts a developer's own commits from local Git repositories, keeps them
//! in a local SQLite ledger and pushes them to a remote system of record.
//!
//! ## Overview
//!
//! A repository is registered once, identified across moves by its root-commit
//! fingerprint. Each extraction walks every local branch for commits authored
//! by the configured `user.name` since the last watermark, records file and
//! line statistics, and stores them idempotently. Unsynced commits are later
//! uploaded in batches. The local and remote repository lists can be compared
//! at any time; when the remote is unreachable the local list is shown marked
//! offline.
//!
//! ## Architecture
//!
//! - Git access behind the [`scm::RepositoryQuery`] capability ([`scm`])
//! - `git show --stat` parsing ([`parser`])
//! - Local persistence ([`store`])
//! - Remote contract and HTTP client ([`remote`]), credentials ([`session`])
//! - Extraction, reconciliation and orchestration ([`sync`])
//! - Configuration, logging and output ([`config`], [`settings`], [`logger`], [`report`])

/// Platform-agnostic configuration directory management.
///
/// Locates the settings file, session file, database and log file following
/// platform conventions (XDG on Linux, Application Support on macOS, AppData
/// on Windows).
pub mod config;

/// Error taxonomy shared by the library.
pub mod error;

/// Command handlers used by the `repo-ledger` binary.
pub mod handlers;

/// Logging configuration and utilities.
///
/// Console logging through `env_logger` (controlled by `RUST_LOG`) plus a
/// persistent log file in the config directory with size-based rotation.
pub mod logger;

/// Parser for `git show --stat` summaries.
pub mod parser;

/// Remote backend contract and its HTTP implementation.
pub mod remote;

/// Status report rendering (console, Markdown, JSON).
pub mod report;

/// Git repository inspection through the git CLI.
pub mod scm;

/// Authenticated session source.
pub mod session;

/// User settings stored as TOML.
pub mod settings;

/// SQLite-backed local store of repositories and commits.
pub mod store;

/// Commit extraction, upload and reconciliation.
///
/// [`sync::SyncService`] is the entry point; it owns the store and composes the
/// git, remote and session capabilities it is constructed with.
pub mod sync;

pub use error::{Result, SyncError};
