//! Excluded folder management

use crate::util;
use anyhow::Result;
use fm_core::config::normalize_folder;
use owo_colors::OwoColorize;
use std::path::Path;

pub async fn run_list(vault: Option<&Path>) -> Result<()> {
    let (_vault, _store, settings) = util::open(vault)?;

    if settings.excluded_folders.is_empty() {
        println!("{}", "No excluded folders".dimmed());
        return Ok(());
    }
    for folder in &settings.excluded_folders {
        println!("{}", folder);
    }
    Ok(())
}

pub async fn run_add(vault: Option<&Path>, folder: &str) -> Result<()> {
    let (vault, store, mut settings) = util::open(vault)?;

    let folder = normalize_folder(folder);
    if folder.is_empty() {
        anyhow::bail!("Folder name is empty");
    }
    if settings.excluded_folders.contains(&folder) {
        println!("{} is already excluded", folder.cyan());
        return Ok(());
    }

    if !vault.folders().contains(&folder) {
        println!(
            "{}",
            format!("Warning: folder '{}' does not exist in the vault yet", folder).yellow()
        );
    }

    settings.excluded_folders.push(folder.clone());
    store.save(&settings)?;
    println!("{} Excluded {}", "✓".green(), folder.cyan());
    Ok(())
}

pub async fn run_remove(vault: Option<&Path>, folder: &str) -> Result<()> {
    let (_vault, store, mut settings) = util::open(vault)?;

    let folder = normalize_folder(folder);
    let before = settings.excluded_folders.len();
    settings.excluded_folders.retain(|f| f != &folder);
    if settings.excluded_folders.len() == before {
        anyhow::bail!("'{}' is not an excluded folder", folder);
    }

    store.save(&settings)?;
    println!("{} No longer excluding {}", "✓".green(), folder.cyan());
    Ok(())
}
