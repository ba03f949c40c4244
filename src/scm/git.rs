//! Git backend using CLI commands.

use chrono::{DateTime, Utc};
use std::fs;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use super::{BranchInfo, LogEntry, NameStatus, RepositoryQuery};
use crate::error::{Result, SyncError};
use crate::store::RepoStatus;

const RECORD_SEPARATOR: char = '\x1e';
const FIELD_SEPARATOR: char = '\x1f';
const LOG_FORMAT: &str = "--format=%x1e%H%x1f%an%x1f%aI%x1f%P%x1f%B";
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Captured result of one git invocation.
struct GitOutput {
    status: ExitStatus,
    stdout: String,
    stderr: String,
}

/// [`RepositoryQuery`] implementation that runs the `git` CLI.
///
/// Every invocation is bounded by `timeout`; a hung git process is killed and
/// reported as [`SyncError::GitTimedOut`].
#[derive(Debug, Clone)]
pub struct GitCli {
    timeout: Duration,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl GitCli {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Run a git command, returning its output whatever the exit code.
    ///
    /// Only spawn failures and timeouts are errors here.
    fn exec(&self, workdir: &Path, args: &[&str]) -> Result<GitOutput> {
        let command = args.join(" ");
        let spawn_failed = |e: std::io::Error| SyncError::GitCommandFailed {
            command: command.clone(),
            path: workdir.to_path_buf(),
            stderr: format!("failed to run git: {e}"),
        };

        let mut child = Command::new("git")
            .args(args)
            .current_dir(workdir)
            .env("LC_ALL", "C")
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_failed)?;

        // Drain both pipes on their own threads so a chatty command can't
        // block on a full pipe while we wait on it.
        let stdout_reader = child.stdout.take().map(spawn_reader);
        let stderr_reader = child.stderr.take().map(spawn_reader);

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            if let Some(status) = child.try_wait().map_err(spawn_failed)? {
                break status;
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                log::error!(
                    "git {} timed out after {:?} in {}",
                    command,
                    self.timeout,
                    workdir.display()
                );
                return Err(SyncError::GitTimedOut {
                    command: command.clone(),
                    path: workdir.to_path_buf(),
                    timeout: self.timeout,
                });
            }
            thread::sleep(POLL_INTERVAL);
        };

        Ok(GitOutput {
            status,
            stdout: join_reader(stdout_reader),
            stderr: join_reader(stderr_reader),
        })
    }

    /// Run a git command and return trimmed stdout, failing on non-zero exit.
    fn run_git(&self, workdir: &Path, args: &[&str]) -> Result<String> {
        let output = self.exec(workdir, args)?;

        if !output.status.success() {
            let command = args.join(" ");
            log::error!(
                "git {} failed in {}: {}",
                command,
                workdir.display(),
                output.stderr.trim()
            );
            return Err(SyncError::GitCommandFailed {
                command,
                path: workdir.to_path_buf(),
                stderr: output.stderr.trim().to_string(),
            });
        }

        Ok(output.stdout.trim().to_string())
    }

    /// Run a git command whose non-zero exit is an answer rather than an error.
    fn try_git(&self, workdir: &Path, args: &[&str]) -> Result<Option<String>> {
        let output = self.exec(workdir, args)?;
        if output.status.success() {
            Ok(Some(output.stdout.trim().to_string()))
        } else {
            Ok(None)
        }
    }

    /// Whether `path` is exactly the top level of a work tree.
    fn is_work_tree_root(&self, path: &Path) -> Result<bool> {
        let Some(toplevel) = self.try_git(path, &["rev-parse", "--show-toplevel"])? else {
            return Ok(false);
        };

        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let toplevel = PathBuf::from(toplevel);
        let toplevel = toplevel.canonicalize().unwrap_or(toplevel);
        Ok(toplevel == canonical)
    }
}

impl RepositoryQuery for GitCli {
    fn validate_repository(&self, path: &Path) -> Result<String> {
        ensure_directory(path)?;

        if !self.is_work_tree_root(path)? {
            return Err(SyncError::NotAGitRepository {
                path: path.to_path_buf(),
            });
        }

        if self
            .try_git(path, &["rev-parse", "--verify", "--quiet", "HEAD"])?
            .is_none()
        {
            return Err(SyncError::NoCommitsYet {
                path: path.to_path_buf(),
            });
        }

        let roots = self.run_git(path, &["rev-list", "--max-parents=0", "HEAD"])?;
        roots
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .last()
            .map(str::to_string)
            .ok_or_else(|| SyncError::NoCommitsYet {
                path: path.to_path_buf(),
            })
    }

    fn check_reachable(&self, path: &Path) -> RepoStatus {
        match fs::metadata(path) {
            Err(e) if e.kind() == ErrorKind::NotFound => RepoStatus::Missing,
            Err(e) => {
                log::debug!("{} is not accessible: {}", path.display(), e);
                RepoStatus::Moved
            }
            Ok(meta) if !meta.is_dir() => RepoStatus::Deleted,
            Ok(_) => match self.is_work_tree_root(path) {
                Ok(true) => RepoStatus::Active,
                Ok(false) => RepoStatus::Deleted,
                Err(e) => {
                    log::debug!("Could not inspect {}: {}", path.display(), e);
                    RepoStatus::Moved
                }
            },
        }
    }

    fn user_name(&self, path: &Path) -> Result<String> {
        match self.try_git(path, &["config", "user.name"])? {
            Some(name) if !name.is_empty() => Ok(name),
            _ => Err(SyncError::GitUserNotConfigured {
                path: path.to_path_buf(),
            }),
        }
    }

    fn list_local_branches(&self, path: &Path) -> Result<Vec<BranchInfo>> {
        let output = self.run_git(
            path,
            &["for-each-ref", "--format=%(refname:short)", "refs/heads/"],
        )?;

        Ok(output
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(|name| BranchInfo {
                name: name.to_string(),
            })
            .collect())
    }

    fn log_commits(
        &self,
        path: &Path,
        branch: &str,
        author: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<LogEntry>> {
        let rev = format!("refs/heads/{branch}");
        let author_arg = format!("--author={author}");
        let since_arg = since.map(|ts| format!("--since={}", ts.format("%Y-%m-%d %H:%M:%S +0000")));

        let mut args = vec!["log", rev.as_str(), LOG_FORMAT, "--fixed-strings", author_arg.as_str()];
        if let Some(since_arg) = &since_arg {
            args.push(since_arg.as_str());
        }
        args.push("--");

        let output = self.run_git(path, &args)?;
        let entries = parse_log_output(&output).map_err(|reason| SyncError::GitCommandFailed {
            command: args.join(" "),
            path: path.to_path_buf(),
            stderr: reason,
        })?;

        // --author is a substring match; keep exact name matches only
        Ok(entries
            .into_iter()
            .filter(|entry| entry.author_name == author)
            .collect())
    }

    fn diff_tree_name_status(&self, path: &Path, commit_hash: &str) -> Result<Vec<NameStatus>> {
        let output = self.run_git(
            path,
            &[
                "diff-tree",
                "--no-commit-id",
                "--name-status",
                "-r",
                "--root",
                commit_hash,
            ],
        )?;
        Ok(parse_name_status(&output))
    }

    fn show_stat_summary(&self, path: &Path, commit_hash: &str) -> Result<String> {
        self.run_git(
            path,
            &[
                "show",
                "--stat",
                // Without a terminal git assumes 80 columns and shortens long
                // paths to ".../name"
                "--stat-width=4096",
                "--stat-name-width=4096",
                "--format=",
                "--no-color",
                commit_hash,
            ],
        )
    }
}

fn ensure_directory(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(SyncError::PathNotFound {
            path: path.to_path_buf(),
        });
    }

    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(SyncError::NotAGitRepository {
            path: path.to_path_buf(),
        }),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(SyncError::PathNotFound {
            path: path.to_path_buf(),
        }),
        Err(e) => Err(SyncError::PathInaccessible {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn join_reader(reader: Option<thread::JoinHandle<String>>) -> String {
    reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

/// Parse output produced with [`LOG_FORMAT`].
fn parse_log_output(output: &str) -> std::result::Result<Vec<LogEntry>, String> {
    let mut entries = Vec::new();

    for record in output.split(RECORD_SEPARATOR) {
        if record.trim().is_empty() {
            continue;
        }

        let mut fields = record.splitn(5, FIELD_SEPARATOR);
        let hash = fields.next().unwrap_or("").trim();
        let author_name = fields.next().unwrap_or("");
        let date = fields.next().unwrap_or("");
        let parents = fields.next().unwrap_or("");
        let message = fields.next().unwrap_or("");

        if hash.is_empty() {
            return Err(format!("log record without a hash: {record:?}"));
        }

        let date = DateTime::parse_from_rfc3339(date.trim())
            .map_err(|e| format!("bad author date {date:?} for {hash}: {e}"))?
            .with_timezone(&Utc);

        entries.push(LogEntry {
            hash: hash.to_string(),
            author_name: author_name.to_string(),
            date,
            message: message.trim().to_string(),
            parent_hashes: parents.split_whitespace().map(str::to_string).collect(),
        });
    }

    Ok(entries)
}

/// Parse `git diff-tree --name-status` lines (`M\tpath`, `R100\told\tnew`).
fn parse_name_status(output: &str) -> Vec<NameStatus> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split('\t');
            let status_code = fields.next()?.trim().chars().next()?;
            let file_name = fields.last()?.trim();
            if file_name.is_empty() {
                return None;
            }
            Some(NameStatus {
                status_code,
                file_name: file_name.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn git(dir: &Path, args: &[&str]) {
        let status = Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .unwrap()
            .status;
        assert!(status.success(), "git {:?} failed", args);
    }

    fn init_repo(dir: &Path) {
        git(dir, &["init", "--quiet"]);
        git(dir, &["config", "user.name", "Test Dev"]);
        git(dir, &["config", "user.email", "dev@example.com"]);
        git(dir, &["config", "commit.gpgsign", "false"]);
    }

    #[test]
    fn test_parse_log_output() {
        let output = "\x1eaaa\x1fTest Dev\x1f2025-01-02T03:04:05+01:00\x1f\x1fInitial commit\n\n\
                      \x1ebbb\x1fTest Dev\x1f2025-01-03T00:00:00Z\x1faaa ccc\x1fMerge branch\n\nbody line\n";
        let entries = parse_log_output(output).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].hash, "aaa");
        assert!(entries[0].parent_hashes.is_empty());
        assert_eq!(entries[0].message, "Initial commit");
        assert_eq!(entries[0].date.to_rfc3339(), "2025-01-02T02:04:05+00:00");
        assert_eq!(entries[1].parent_hashes, vec!["aaa", "ccc"]);
        assert_eq!(entries[1].message, "Merge branch\n\nbody line");
    }

    #[test]
    fn test_parse_log_output_rejects_bad_date() {
        let output = "\x1eaaa\x1fDev\x1fyesterday\x1f\x1fmsg";
        assert!(parse_log_output(output).is_err());
    }

    #[test]
    fn test_parse_name_status() {
        let output = "A\tsrc/new.rs\nM\tsrc/lib.rs\nD\told.txt\nR087\ta.rs\tb.rs\n";
        let entries = parse_name_status(output);

        assert_eq!(entries.len(), 4);
        assert!(entries[0].is_added());
        assert!(entries[2].is_removed());
        assert_eq!(entries[3].status_code, 'R');
        assert_eq!(entries[3].file_name, "b.rs");
    }

    #[test]
    fn test_validate_missing_path() {
        let temp = TempDir::new().unwrap();
        let err = GitCli::default()
            .validate_repository(&temp.path().join("nope"))
            .unwrap_err();
        assert!(matches!(err, SyncError::PathNotFound { .. }));
    }

    #[test]
    fn test_validate_empty_path() {
        let err = GitCli::default()
            .validate_repository(Path::new(""))
            .unwrap_err();
        assert!(matches!(err, SyncError::PathNotFound { .. }));
    }

    #[test]
    fn test_validate_plain_directory() {
        if !crate::scm::is_available() {
            eprintln!("Skipping: git not installed");
            return;
        }
        let temp = TempDir::new().unwrap();
        let err = GitCli::default().validate_repository(temp.path()).unwrap_err();
        assert!(matches!(err, SyncError::NotAGitRepository { .. }));
    }

    #[test]
    fn test_validate_empty_repository() {
        if !crate::scm::is_available() {
            eprintln!("Skipping: git not installed");
            return;
        }
        let temp = TempDir::new().unwrap();
        init_repo(temp.path());
        let err = GitCli::default().validate_repository(temp.path()).unwrap_err();
        assert!(matches!(err, SyncError::NoCommitsYet { .. }));
    }

    #[test]
    fn test_subdirectory_is_not_repository_root() {
        if !crate::scm::is_available() {
            eprintln!("Skipping: git not installed");
            return;
        }
        let temp = TempDir::new().unwrap();
        init_repo(temp.path());
        let sub = temp.path().join("sub");
        fs::create_dir(&sub).unwrap();

        let err = GitCli::default().validate_repository(&sub).unwrap_err();
        assert!(matches!(err, SyncError::NotAGitRepository { .. }));
    }

    #[test]
    fn test_check_reachable_classification() {
        if !crate::scm::is_available() {
            eprintln!("Skipping: git not installed");
            return;
        }
        let temp = TempDir::new().unwrap();
        let cli = GitCli::default();

        assert_eq!(cli.check_reachable(&temp.path().join("gone")), RepoStatus::Missing);
        assert_eq!(cli.check_reachable(temp.path()), RepoStatus::Deleted);

        init_repo(temp.path());
        assert_eq!(cli.check_reachable(temp.path()), RepoStatus::Active);
    }

    #[test]
    fn test_user_name_from_repository_config() {
        if !crate::scm::is_available() {
            eprintln!("Skipping: git not installed");
            return;
        }
        let temp = TempDir::new().unwrap();
        init_repo(temp.path());
        assert_eq!(GitCli::default().user_name(temp.path()).unwrap(), "Test Dev");
    }

    #[test]
    fn test_show_stat_keeps_long_paths() {
        if !crate::scm::is_available() {
            eprintln!("Skipping: git not installed");
            return;
        }
        let temp = TempDir::new().unwrap();
        init_repo(temp.path());
        let dir = "services/billing/internal/reconciliation/adapters/outbound";
        let file = format!("{dir}/settlement_batch_exporter_implementation.rs");
        fs::create_dir_all(temp.path().join(dir)).unwrap();
        fs::write(temp.path().join(&file), "a\nb\n").unwrap();
        git(temp.path(), &["add", "."]);
        git(temp.path(), &["commit", "--quiet", "-m", "long path"]);

        let stat = GitCli::default()
            .show_stat_summary(temp.path(), "HEAD")
            .unwrap();
        let parsed = crate::parser::parse_show_stat(&stat);

        assert_eq!(parsed.changes.len(), 1);
        assert_eq!(parsed.changes[0].file_name, file);
        assert_eq!(parsed.changes[0].added, 2);
    }

    #[test]
    fn test_timeout_is_enforced() {
        if !crate::scm::is_available() {
            eprintln!("Skipping: git not installed");
            return;
        }
        let temp = TempDir::new().unwrap();
        init_repo(temp.path());
        // An alias that sleeps stands in for a hung git process
        git(temp.path(), &["config", "alias.hang", "!sleep 5"]);

        let cli = GitCli::new(Duration::from_millis(200));
        let err = cli.run_git(temp.path(), &["hang"]).unwrap_err();
        assert!(matches!(err, SyncError::GitTimedOut { .. }));
    }
}
