use anyhow::{Context, Result};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const API_URL_ENV: &str = "REPO_LEDGER_API_URL";

/// User settings for the sync engine, stored as TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Base URL of the remote backend API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Upper bound for a single git invocation, in seconds
    #[serde(default = "default_git_timeout_secs")]
    pub git_timeout_secs: u64,

    /// Upper bound for a single HTTP request, in seconds
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Override for the local database location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
}

fn default_api_base_url() -> String {
    "http://localhost:3000/api".to_string()
}

fn default_git_timeout_secs() -> u64 {
    30
}

fn default_http_timeout_secs() -> u64 {
    15
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            api_base_url: default_api_base_url(),
            git_timeout_secs: default_git_timeout_secs(),
            http_timeout_secs: default_http_timeout_secs(),
            database_path: None,
        }
    }
}

impl Settings {
    /// Load settings from the config directory, applying environment overrides
    pub fn load() -> Result<Self> {
        let mut settings = Self::load_from(&crate::config::ConfigManager::settings_path()?)?;
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                settings.api_base_url = url;
            }
        }
        Ok(settings)
    }

    /// Load settings from a specific file; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let settings: Settings = toml::from_str(&content).context("Failed to parse config file")?;

        Ok(settings)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    pub fn git_timeout(&self) -> Duration {
        Duration::from_secs(self.git_timeout_secs.max(1))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.max(1))
    }

    /// Database location, falling back to the config directory
    pub fn resolved_database_path(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => crate::config::ConfigManager::database_path(),
        }
    }
}

/// Update settings from command-line flags
pub fn update_settings(
    api_url: Option<String>,
    git_timeout_secs: Option<u64>,
    http_timeout_secs: Option<u64>,
    database_path: Option<PathBuf>,
) -> Result<()> {
    let path = crate::config::ConfigManager::settings_path()?;
    let mut settings = Settings::load_from(&path)?;

    if let Some(url) = api_url {
        settings.api_base_url = url;
    }
    if let Some(secs) = git_timeout_secs {
        settings.git_timeout_secs = secs;
    }
    if let Some(secs) = http_timeout_secs {
        settings.http_timeout_secs = secs;
    }
    if let Some(db) = database_path {
        settings.database_path = Some(db);
    }

    settings.save_to(&path)?;
    println!("{}", "Configuration updated.".green());
    show_settings()
}

/// Print the effective settings
pub fn show_settings() -> Result<()> {
    let settings = Settings::load()?;

    println!("{}", "Current Configuration:".bold());
    println!("  {}: {}", "API base URL".cyan(), settings.api_base_url);
    println!("  {}: {}s", "Git timeout".cyan(), settings.git_timeout_secs);
    println!("  {}: {}s", "HTTP timeout".cyan(), settings.http_timeout_secs);
    println!(
        "  {}: {}",
        "Database".cyan(),
        settings.resolved_database_path()?.display()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let settings = Settings::load_from(&temp.path().join("config.toml")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "api_base_url = \"https://ledger.example.com/api\"\n").unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.api_base_url, "https://ledger.example.com/api");
        assert_eq!(settings.git_timeout_secs, 30);
        assert!(settings.database_path.is_none());
    }

    #[test]
    fn test_save_and_reload() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");
        let settings = Settings {
            git_timeout_secs: 5,
            database_path: Some(temp.path().join("db.sqlite")),
            ..Default::default()
        };

        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path).unwrap(), settings);
    }

    #[test]
    fn test_zero_timeouts_are_clamped() {
        let settings = Settings {
            git_timeout_secs: 0,
            http_timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(settings.git_timeout(), Duration::from_secs(1));
        assert_eq!(settings.http_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "git_timeout_secs = \"soon\"").unwrap();
        assert!(Settings::load_from(&path).is_err());
    }
}
