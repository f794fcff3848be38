//! Initialize fmstamp in a vault

use anyhow::{Context, Result};
use fm_core::ConfigStore;
use owo_colors::OwoColorize;
use std::path::Path;

pub async fn run(vault: Option<&Path>) -> Result<()> {
    let root = match vault {
        Some(root) => root.to_path_buf(),
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    if !root.is_dir() {
        anyhow::bail!("Vault directory not found: {}", root.display());
    }

    let store = ConfigStore::for_vault(&root);
    if store.init_if_missing()? {
        println!("{} Initialized fmstamp at {}", "✓".green(), root.display());
        println!("Created {}", store.path().display());
        println!();
        println!("Next steps:");
        println!("  - Run 'fmstamp config list' to review settings");
        println!("  - Run 'fmstamp watch' to start stamping edited notes");
    } else {
        println!("{}", "fmstamp is already initialized".yellow());
        println!("Location: {}", store.path().display());
    }
    Ok(())
}
