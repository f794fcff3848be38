//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use fm_core::config::CONFIG_DIR;
use fm_core::{ConfigStore, Settings, Vault};
use std::path::{Path, PathBuf};

/// Find the vault root by walking up from cwd to find .fmstamp/
pub fn find_vault_root() -> Result<PathBuf> {
    let mut current = std::env::current_dir().context("Failed to get current directory")?;

    loop {
        let config_dir = current.join(CONFIG_DIR);
        if config_dir.is_dir() {
            return Ok(current);
        }

        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => anyhow::bail!("Not an fmstamp vault (no {} directory found, run 'fmstamp init')", CONFIG_DIR),
        }
    }
}

/// Vault root from `--vault` or discovery, canonicalized
pub fn resolve_root(explicit: Option<&Path>) -> Result<PathBuf> {
    let root = match explicit {
        Some(root) => root.to_path_buf(),
        None => find_vault_root()?,
    };
    root.canonicalize()
        .with_context(|| format!("Vault directory not found: {}", root.display()))
}

/// Open the vault and load its settings
pub fn open(explicit: Option<&Path>) -> Result<(Vault, ConfigStore, Settings)> {
    let root = resolve_root(explicit)?;
    let vault = Vault::open(&root).with_context(|| format!("Failed to open vault {}", root.display()))?;
    let store = ConfigStore::for_vault(&root);
    let settings = store
        .load()
        .with_context(|| format!("Failed to load {}", store.path().display()))?;
    Ok((vault, store, settings))
}

/// Document identity for a path given on the command line
///
/// Accepts paths relative to cwd, absolute paths, and vault-relative
/// identities.
pub fn document_id(vault: &Vault, arg: &str) -> Result<String> {
    let path = Path::new(arg);
    let from_cwd = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .context("Failed to get current directory")?
            .join(path)
    };

    if let Ok(canonical) = from_cwd.canonicalize() {
        if let Some(id) = vault.identity_of(&canonical) {
            return Ok(id);
        }
    }

    vault
        .identity_of(path)
        .filter(|id| vault.root().join(id).is_file())
        .with_context(|| format!("'{}' is not a note in {}", arg, vault.root().display()))
}
