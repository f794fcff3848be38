//! Watch a vault and stamp notes once edits settle

use crate::util;
use anyhow::Result;
use fm_core::{SystemClock, Updater};
use owo_colors::OwoColorize;
use std::path::Path;
use tokio::sync::mpsc;
use tracing::info;
use watcher::source::spawn_input_source;
use watcher::{Engine, FsEventSource, SourceKind};

pub async fn run(vault: Option<&Path>) -> Result<()> {
    let (vault, store, settings) = util::open(vault)?;
    let kind = SourceKind::from_settings(&settings);
    let timeout = settings.timeout;

    let engine = Engine::new(Updater::new(vault.clone(), SystemClock, settings));
    let (tx, rx) = mpsc::unbounded_channel();

    // Held for the lifetime of the loop; dropping it stops the watcher
    let _fs_source = match kind {
        SourceKind::Filesystem => Some(FsEventSource::start(vault.clone(), tx)?),
        SourceKind::Input => {
            spawn_input_source(vault.clone(), tx)?;
            None
        }
    };

    let source = match kind {
        SourceKind::Filesystem => "file events",
        SourceKind::Input => "stdin",
    };
    eprintln!(
        "{} Watching {} ({}, {}s timeout)",
        "●".green(),
        vault.root().display(),
        source,
        timeout
    );
    info!("Settings loaded from {}", store.path().display());

    engine
        .run(rx, async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupted");
            }
        })
        .await;

    eprintln!("{} Stopped", "●".dimmed());
    Ok(())
}
