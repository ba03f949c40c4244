//! Configuration command handlers
//!
//! Menu-based editing of `config.toml`.

use anyhow::{Context, Result};
use colored::Colorize;
use inquire::{Confirm, MultiSelect, Text};
use std::path::PathBuf;

use crate::settings::Settings;

const API_URL: &str = "API base URL";
const GIT_TIMEOUT: &str = "Git timeout (seconds)";
const HTTP_TIMEOUT: &str = "HTTP timeout (seconds)";
const DATABASE: &str = "Database path";

/// Handle interactive configuration menu
///
/// Shows all settings and lets the user pick which ones to modify
pub fn handle_config_interactive() -> Result<()> {
    println!("{}", "Interactive Configuration".cyan().bold());
    println!("{}", "=".repeat(60).cyan());
    println!();

    let path = crate::config::ConfigManager::settings_path()?;
    let current = Settings::load_from(&path).context("Failed to load current configuration")?;

    println!("{}", "Current Settings:".bold());
    display_settings_summary(&current);
    println!();

    let selections = MultiSelect::new(
        "Select settings to modify (Space to select, Enter to confirm):",
        vec![API_URL, GIT_TIMEOUT, HTTP_TIMEOUT, DATABASE],
    )
    .with_help_message("Use arrow keys to navigate, Space to select/deselect, Enter when done")
    .prompt()
    .context("Failed to get user selections")?;

    if selections.is_empty() {
        println!("{}", "No settings selected. Configuration unchanged.".yellow());
        return Ok(());
    }

    let mut modified = current.clone();
    for selection in selections {
        match selection {
            API_URL => {
                let input = Text::new("API base URL:")
                    .with_default(&modified.api_base_url)
                    .prompt()?;
                modified.api_base_url = input.trim().trim_end_matches('/').to_string();
            }
            GIT_TIMEOUT => {
                modified.git_timeout_secs = prompt_secs(GIT_TIMEOUT, modified.git_timeout_secs)?;
            }
            HTTP_TIMEOUT => {
                modified.http_timeout_secs =
                    prompt_secs(HTTP_TIMEOUT, modified.http_timeout_secs)?;
            }
            DATABASE => {
                let input = Text::new("Database path:")
                    .with_help_message("Leave empty to use the default location")
                    .prompt()?;
                modified.database_path = if input.trim().is_empty() {
                    None
                } else {
                    Some(PathBuf::from(input.trim()))
                };
            }
            _ => {}
        }
        println!("  {} {}", "✓".green(), selection);
    }

    println!();
    println!("{}", "New Configuration:".cyan().bold());
    display_settings_summary(&modified);
    println!();

    let confirm = Confirm::new("Save this configuration?")
        .with_default(true)
        .prompt()?;

    if confirm {
        modified
            .save_to(&path)
            .context("Failed to save configuration")?;
        println!("\n{} Configuration saved successfully!", "✓".green().bold());
    } else {
        println!("\n{}", "Configuration not saved.".yellow());
    }

    Ok(())
}

fn prompt_secs(label: &str, current: u64) -> Result<u64> {
    let input = Text::new(&format!("{label}:"))
        .with_default(&current.to_string())
        .prompt()?;
    let secs: u64 = input
        .trim()
        .parse()
        .context("Invalid number. Must be a positive integer.")?;
    Ok(secs.max(1))
}

fn display_settings_summary(settings: &Settings) {
    println!("  {}: {}", API_URL.cyan(), settings.api_base_url);
    println!("  {}: {}", GIT_TIMEOUT.cyan(), settings.git_timeout_secs);
    println!("  {}: {}", HTTP_TIMEOUT.cyan(), settings.http_timeout_secs);
    let db = settings
        .database_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "default".to_string());
    println!("  {}: {}", DATABASE.cyan(), db);
}
