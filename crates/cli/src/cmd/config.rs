//! Configuration management command
//!
//! Provides CLI interface to view and edit the vault's settings.

use crate::util;
use anyhow::{Context, Result};
use fm_core::config::{example_config, KEYS};
use fm_core::ConfigStore;
use owo_colors::OwoColorize;
use std::path::Path;

/// List all configuration values
pub async fn run_list(vault: Option<&Path>) -> Result<()> {
    let (_vault, store, settings) = util::open(vault)?;

    println!("{}", "fmstamp Configuration".bold());
    println!("{}: {}", "Location".dimmed(), store.path().display().dimmed());
    if !store.exists() {
        println!("{}", "(file missing, showing defaults)".yellow());
    }
    println!();

    for (key, _) in KEYS {
        let value = settings.get(key)?;
        let shown = match *key {
            "excluded_folders" if settings.excluded_folders.is_empty() => "(none)".dimmed().to_string(),
            "excluded_folders" => settings.excluded_folders.join(", "),
            "created_date_property" if value.is_empty() => "(disabled)".dimmed().to_string(),
            "moment_format" if value.is_empty() => "(ISO 8601)".dimmed().to_string(),
            "history_max_items" if settings.history_max_items == 0 => {
                format!("0 {}", "(unlimited)".dimmed())
            }
            "timeout" => format!("{} {}", value, format!("({}s)", value).dimmed()),
            _ => value,
        };
        println!("  {} = {}", key.cyan(), shown);
    }

    Ok(())
}

/// Get a single configuration value
pub async fn run_get(vault: Option<&Path>, key: &str) -> Result<()> {
    let (_vault, _store, settings) = util::open(vault)?;
    let value = settings
        .get(key)
        .context("Use 'fmstamp config list' to see available keys")?;
    println!("{}", value);
    Ok(())
}

/// Set a configuration value
pub async fn run_set(vault: Option<&Path>, key: &str, value: &str) -> Result<()> {
    let (_vault, store, mut settings) = util::open(vault)?;

    settings
        .set(key, value)
        .context("Use 'fmstamp config list' to see available keys")?;
    store.save(&settings)?;

    // Malformed values fall back to defaults, so echo what was stored
    let stored = settings.get(key)?;
    println!("{} {} = {}", "✓".green(), key.cyan(), stored);
    if stored != value.trim() {
        println!("{}", format!("Note: '{}' was not accepted as given", value).yellow());
    }
    println!(
        "{}",
        "Note: Restart 'fmstamp watch' for changes to take effect".yellow()
    );

    Ok(())
}

/// Show the config file path and optionally create it
pub async fn run_path(vault: Option<&Path>, create: bool) -> Result<()> {
    let root = util::resolve_root(vault)?;
    let store = ConfigStore::for_vault(&root);
    let config_path = store.path();

    if create && !store.exists() {
        store.init_if_missing()?;
        println!("{} Created config file at: {}", "✓".green(), config_path.display());
    } else if store.exists() {
        println!("{}", config_path.display());
    } else {
        println!("{}", config_path.display());
        println!("{}", "File does not exist. Use --create to create it.".yellow());
    }

    Ok(())
}

/// Show example configuration
pub async fn run_example() -> Result<()> {
    println!("{}", example_config());
    Ok(())
}
