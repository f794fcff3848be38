//! Stamp notes immediately

use crate::util;
use anyhow::Result;
use fm_core::{SystemClock, UpdateOutcome, Updater};
use owo_colors::OwoColorize;
use std::path::Path;

pub async fn run(vault: Option<&Path>, paths: &[String]) -> Result<()> {
    let (vault, _store, settings) = util::open(vault)?;
    let property = settings.frontmatter_property.clone();
    let updater = Updater::new(vault.clone(), SystemClock, settings);

    let mut failures = 0;
    for arg in paths {
        let outcome = util::document_id(&vault, arg)
            .and_then(|id| Ok((updater.run_once(&id)?, id)));

        match outcome {
            Ok((UpdateOutcome::Written(value), id)) => {
                println!("{} {} {} = {}", "✓".green(), id, property.cyan(), value);
            }
            Ok((UpdateOutcome::Skipped(reason), id)) => {
                println!("{} {} {}", "-".yellow(), id, format!("(skipped: {})", reason).dimmed());
            }
            Err(e) => {
                failures += 1;
                eprintln!("{} {}: {:#}", "✗".red(), arg, e);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} note(s) could not be stamped", failures, paths.len());
    }
    Ok(())
}
