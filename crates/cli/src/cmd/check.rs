//! Dry run: explain what stamping a note would do

use crate::util;
use anyhow::{Context, Result};
use fm_core::host::DocumentHost;
use fm_core::{Prepared, SystemClock, Updater};
use owo_colors::OwoColorize;
use std::path::Path;

pub async fn run(vault: Option<&Path>, path: &str) -> Result<()> {
    let (vault, _store, settings) = util::open(vault)?;
    let id = util::document_id(&vault, path)?;
    let property = settings.frontmatter_property.clone();
    let updater = Updater::new(vault, SystemClock, settings);

    let metadata = updater
        .host()
        .read_metadata(&id)
        .with_context(|| format!("Failed to read {}", id))?;

    println!("{}", id.bold());
    match metadata.get(&property) {
        Some(current) => println!("  {}: {}", "current".dimmed(), serde_json::to_string(current)?),
        None => println!("  {}: {}", "current".dimmed(), "(absent)".dimmed()),
    }

    match updater.prepare(&id)? {
        Prepared::Write(plan) => {
            println!(
                "  {}: {} = {}",
                "would write".green(),
                property.cyan(),
                serde_json::to_string(&plan.value.to_value())?
            );
            if let Some(gap) = plan.gap_secs {
                println!("  {}: {}s", "since last stamp".dimmed(), gap);
            }
        }
        Prepared::Skip(reason) => {
            println!("  {}: {}", "would skip".yellow(), reason);
        }
    }
    Ok(())
}
