//! Edit signal sources
//!
//! Two sources produce document identities for the engine:
//! - [`FsEventSource`]: filesystem change events from `notify`
//! - [`read_input`]: one path per line, optionally followed by a tab and the
//!   key that was typed (the fine-grained typing signal)
//!
//! Anything that does not resolve to a note in the vault is dropped.

use anyhow::{Context, Result};
use fm_core::{Settings, Vault};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::io::BufRead;
use std::path::Path;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, trace, warn};

/// Which signal drives the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Filesystem,
    Input,
}

impl SourceKind {
    pub fn from_settings(settings: &Settings) -> Self {
        if settings.use_keyup_events {
            SourceKind::Input
        } else {
            SourceKind::Filesystem
        }
    }
}

/// Event kinds that stand for a content change
///
/// Metadata-only changes and the source half of a rename are not edits;
/// `Both` renames are reported again as `To`.
pub fn is_edit_kind(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(ModifyKind::Name(RenameMode::From | RenameMode::Both)) => false,
        EventKind::Modify(_) => true,
        _ => false,
    }
}

/// Document identities touched by an event
pub fn edited_documents(vault: &Vault, event: &Event) -> Vec<String> {
    if !is_edit_kind(&event.kind) {
        return Vec::new();
    }

    let mut ids = Vec::new();
    for path in &event.paths {
        match vault.identity_of(path) {
            Some(id) if !ids.contains(&id) => ids.push(id),
            Some(_) => {}
            None => trace!("Dropping event for {}", path.display()),
        }
    }
    ids
}

/// Filesystem watcher feeding identities into a channel
///
/// Watching stops when the source is dropped.
pub struct FsEventSource {
    _watcher: RecommendedWatcher,
}

impl FsEventSource {
    pub fn start(vault: Vault, tx: UnboundedSender<String>) -> Result<Self> {
        let root = vault.root().to_path_buf();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    for id in edited_documents(&vault, &event) {
                        // Receiver gone means the engine is shutting down
                        let _ = tx.send(id);
                    }
                }
                Err(e) => warn!("Watcher error: {}", e),
            },
            notify::Config::default(),
        )
        .context("Failed to create file watcher")?;

        watcher
            .watch(&root, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch {}", root.display()))?;

        debug!("Watching {}", root.display());
        Ok(Self { _watcher: watcher })
    }
}

/// A key counts as typing when it is one visible character
pub fn is_typing_key(key: &str) -> bool {
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => !c.is_whitespace() && !c.is_control(),
        _ => false,
    }
}

/// Resolve one input line to a document identity
///
/// `path` alone is an edit; `path<TAB>key` is an edit only when `key` is a
/// typing key.
pub fn parse_input_line(vault: &Vault, line: &str) -> Option<String> {
    let line = line.trim_end_matches(['\r', '\n']);
    let (path, key) = match line.split_once('\t') {
        Some((path, key)) => (path, Some(key)),
        None => (line, None),
    };

    if let Some(key) = key {
        if !is_typing_key(key) {
            trace!("Ignoring non-typing key {:?}", key);
            return None;
        }
    }

    let path = path.trim();
    if path.is_empty() {
        return None;
    }
    let id = vault.identity_of(Path::new(path));
    if id.is_none() {
        trace!("Dropping input for {}", path);
    }
    id
}

/// Forward identities read from `reader` until end of input
pub fn read_input<R: BufRead>(reader: R, vault: &Vault, tx: &UnboundedSender<String>) -> Result<()> {
    for line in reader.lines() {
        let line = line.context("Failed to read input")?;
        if let Some(id) = parse_input_line(vault, &line) {
            if tx.send(id).is_err() {
                break;
            }
        }
    }
    debug!("Input source closed");
    Ok(())
}

/// Read typing signals from stdin on a detached thread
///
/// A blocking stdin read cannot be cancelled, so it must not live on the
/// runtime: the process exits without waiting for the next line.
pub fn spawn_input_source(vault: Vault, tx: UnboundedSender<String>) -> Result<()> {
    std::thread::Builder::new()
        .name("fmstamp-input".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            if let Err(e) = read_input(stdin.lock(), &vault, &tx) {
                warn!("Input source stopped: {:#}", e);
            }
        })
        .context("Failed to start input reader")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, MetadataKind};
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    fn vault() -> (TempDir, Vault) {
        let temp_dir = TempDir::new().unwrap();
        let vault = Vault::open(temp_dir.path()).unwrap();
        (temp_dir, vault)
    }

    #[test]
    fn test_edit_kinds() {
        assert!(is_edit_kind(&EventKind::Create(CreateKind::File)));
        assert!(is_edit_kind(&EventKind::Modify(ModifyKind::Data(DataChange::Content))));
        assert!(is_edit_kind(&EventKind::Modify(ModifyKind::Name(RenameMode::To))));
        assert!(!is_edit_kind(&EventKind::Modify(ModifyKind::Name(RenameMode::From))));
        assert!(!is_edit_kind(&EventKind::Modify(ModifyKind::Metadata(
            MetadataKind::WriteTime
        ))));
        assert!(!is_edit_kind(&EventKind::Remove(notify::event::RemoveKind::File)));
    }

    #[test]
    fn test_edited_documents_filters_paths() {
        let (temp_dir, vault) = vault();
        let event = Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Any)))
            .add_path(temp_dir.path().join("notes/a.md"))
            .add_path(temp_dir.path().join("notes/a.md"))
            .add_path(temp_dir.path().join(".fmstamp/config.toml"))
            .add_path(temp_dir.path().join("notes/.tmpXYZ"))
            .add_path(temp_dir.path().join("image.png"));

        assert_eq!(edited_documents(&vault, &event), vec!["notes/a.md"]);
    }

    #[test]
    fn test_typing_keys() {
        assert!(is_typing_key("a"));
        assert!(is_typing_key("é"));
        assert!(is_typing_key("."));
        assert!(!is_typing_key(" "));
        assert!(!is_typing_key("Shift"));
        assert!(!is_typing_key(""));
        assert!(!is_typing_key("\u{1b}"));
    }

    #[test]
    fn test_parse_input_line() {
        let (temp_dir, vault) = vault();
        assert_eq!(parse_input_line(&vault, "notes/a.md\n").as_deref(), Some("notes/a.md"));
        assert_eq!(parse_input_line(&vault, "notes/a.md\tx").as_deref(), Some("notes/a.md"));
        assert_eq!(parse_input_line(&vault, "notes/a.md\tArrowLeft"), None);
        assert_eq!(parse_input_line(&vault, "notes/a.txt"), None);
        assert_eq!(parse_input_line(&vault, ""), None);

        let absolute = temp_dir.path().join("b.md");
        assert_eq!(
            parse_input_line(&vault, absolute.to_str().unwrap()).as_deref(),
            Some("b.md")
        );
    }

    #[test]
    fn test_read_input_forwards_identities() {
        let (_temp_dir, vault) = vault();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let input: &[u8] = b"a.md\nb.md\tControl\nc.md\tk\n";

        read_input(input, &vault, &tx).unwrap();
        drop(tx);

        let mut ids = Vec::new();
        while let Ok(id) = rx.try_recv() {
            ids.push(id);
        }
        assert_eq!(ids, vec!["a.md", "c.md"]);
    }

    #[tokio::test]
    async fn test_own_atomic_write_reports_the_note_once() {
        use fm_core::DocumentHost;
        use std::time::Duration;
        use tokio::time::timeout;

        let (temp_dir, vault) = vault();
        std::fs::create_dir(temp_dir.path().join("notes")).unwrap();
        std::fs::write(temp_dir.path().join("notes/a.md"), "---\ntitle: A\n---\nbody\n").unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let _source = FsEventSource::start(vault.clone(), tx).unwrap();

        vault
            .mutate_metadata("notes/a.md", &mut |metadata| {
                metadata.insert("modified".to_string(), serde_json::json!("now"));
            })
            .unwrap();

        let mut ids = Vec::new();
        while let Ok(Some(id)) = timeout(Duration::from_millis(500), rx.recv()).await {
            ids.push(id);
        }

        // Temp file events and the rename source half never surface
        assert!(!ids.is_empty());
        assert!(ids.iter().all(|id| id == "notes/a.md"), "unexpected ids: {:?}", ids);
        #[cfg(target_os = "linux")]
        assert_eq!(ids.len(), 1, "ids: {:?}", ids);
    }
}
