//! Markdown vault host
//!
//! A vault is a directory of `.md` notes. Each note may start with a YAML
//! frontmatter block delimited by `---` lines; that block is the metadata
//! the engine reads and writes. Identities are vault-relative paths with
//! `/` separators.

use crate::error::{Error, Result};
use crate::host::{DocumentHost, Metadata};
use crate::store::{atomic_write, normalize_path};
use chrono::{DateTime, FixedOffset, Local};
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

const DELIMITER: &str = "---";

/// Directory of Markdown notes
#[derive(Debug, Clone)]
pub struct Vault {
    root: PathBuf,
}

impl Vault {
    /// Open an existing vault directory
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(Error::NotFound(root.display().to_string()));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path of a document identity
    pub fn path_of(&self, id: &str) -> Result<PathBuf> {
        let id = normalize_path(id)?;
        Ok(self.root.join(id))
    }

    /// Identity of a filesystem path, if it names a note inside the vault
    ///
    /// Hidden files and anything under a dot-directory (including the
    /// config directory) are not notes.
    pub fn identity_of(&self, path: &Path) -> Option<String> {
        let relative = if path.is_absolute() || path.starts_with(&self.root) {
            path.strip_prefix(&self.root).ok()?
        } else {
            path
        };

        if relative.extension().and_then(|e| e.to_str()) != Some("md") {
            return None;
        }

        let mut segments = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(segment) => {
                    let segment = segment.to_str()?;
                    if segment.starts_with('.') {
                        return None;
                    }
                    segments.push(segment);
                }
                Component::CurDir => {}
                _ => return None,
            }
        }

        if segments.is_empty() {
            return None;
        }
        Some(segments.join("/"))
    }

    /// All note identities, sorted
    pub fn documents(&self) -> Vec<String> {
        let mut documents: Vec<String> = self
            .walk()
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| self.identity_of(entry.path()))
            .collect();
        documents.sort();
        documents
    }

    /// All folder identities below the root, sorted
    pub fn folders(&self) -> Vec<String> {
        let mut folders: Vec<String> = self
            .walk()
            .filter(|entry| entry.depth() > 0 && entry.file_type().is_dir())
            .filter_map(|entry| {
                let relative = entry.path().strip_prefix(&self.root).ok()?;
                let parts: Option<Vec<&str>> =
                    relative.components().map(|c| c.as_os_str().to_str()).collect();
                Some(parts?.join("/"))
            })
            .collect();
        folders.sort();
        folders
    }

    fn walk(&self) -> impl Iterator<Item = DirEntry> {
        WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry))
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    debug!("Skipping unreadable vault entry: {}", err);
                    None
                }
            })
    }

    fn read_text(&self, id: &str) -> Result<(PathBuf, String)> {
        let path = self.path_of(id)?;
        match fs::read_to_string(&path) {
            Ok(text) => Ok((path, text)),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(Error::NotFound(id.to_string())),
            Err(err) => Err(Error::io(path, err)),
        }
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

/// Split a note into its frontmatter source and body
///
/// Returns `None` when the note has no frontmatter block.
pub fn split_frontmatter(text: &str) -> Option<(&str, &str)> {
    let rest = text
        .strip_prefix("---\n")
        .or_else(|| text.strip_prefix("---\r\n"))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == DELIMITER {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

/// Parse frontmatter source into metadata
pub fn parse_frontmatter(id: &str, source: &str) -> Result<Metadata> {
    let value: Value = serde_yaml::from_str(source).map_err(|e| Error::Frontmatter {
        path: id.to_string(),
        message: e.to_string(),
    })?;

    match value {
        Value::Null => Ok(Metadata::new()),
        Value::Object(map) => Ok(map),
        other => Err(Error::Frontmatter {
            path: id.to_string(),
            message: format!("expected a mapping, found {}", kind_of(&other)),
        }),
    }
}

/// Reassemble a note from metadata and body
pub fn render_document(metadata: &Metadata, body: &str) -> Result<String> {
    let yaml = if metadata.is_empty() {
        String::new()
    } else {
        serde_yaml::to_string(metadata).map_err(|e| Error::Serialize {
            what: "frontmatter",
            message: e.to_string(),
        })?
    };
    Ok(format!("{DELIMITER}\n{yaml}{DELIMITER}\n{body}"))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

impl DocumentHost for Vault {
    fn read_metadata(&self, id: &str) -> Result<Metadata> {
        let (_, text) = self.read_text(id)?;
        match split_frontmatter(&text) {
            Some((source, _)) => parse_frontmatter(id, source),
            None => Ok(Metadata::new()),
        }
    }

    fn mutate_metadata(&self, id: &str, mutation: &mut dyn FnMut(&mut Metadata)) -> Result<()> {
        let (path, text) = self.read_text(id)?;
        let (original, body) = match split_frontmatter(&text) {
            Some((source, body)) => (parse_frontmatter(id, source)?, body),
            None => (Metadata::new(), text.as_str()),
        };

        let mut metadata = original.clone();
        mutation(&mut metadata);
        if metadata == original {
            debug!("Metadata of {} unchanged, not writing", id);
            return Ok(());
        }

        let rendered = render_document(&metadata, body)?;
        atomic_write(&path, rendered.as_bytes())
    }

    fn created_at(&self, id: &str) -> Result<DateTime<FixedOffset>> {
        let path = self.path_of(id)?;
        let meta = match fs::metadata(&path) {
            Ok(meta) => meta,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(Error::NotFound(id.to_string()))
            }
            Err(err) => return Err(Error::io(path, err)),
        };

        // Not every filesystem records a birth time
        let created = meta
            .created()
            .or_else(|_| meta.modified())
            .map_err(|e| Error::io(&path, e))?;
        Ok(DateTime::<Local>::from(created).fixed_offset())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn vault_with(files: &[(&str, &str)]) -> (TempDir, Vault) {
        let temp_dir = TempDir::new().unwrap();
        for (name, content) in files {
            let path = temp_dir.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        let vault = Vault::open(temp_dir.path()).unwrap();
        (temp_dir, vault)
    }

    #[test]
    fn test_split_frontmatter() {
        assert_eq!(
            split_frontmatter("---\ntitle: A\n---\nbody\n"),
            Some(("title: A\n", "body\n"))
        );
        assert_eq!(split_frontmatter("---\n---\n"), Some(("", "")));
        assert_eq!(
            split_frontmatter("---\r\ntitle: A\r\n---\r\nbody"),
            Some(("title: A\r\n", "body"))
        );
        assert_eq!(split_frontmatter("no frontmatter\n---\n"), None);
        assert_eq!(split_frontmatter("---\nunterminated: true\n"), None);
    }

    #[test]
    fn test_parse_frontmatter() {
        let metadata = parse_frontmatter("a.md", "title: A\ntags: [x, y]\nn: 3\n").unwrap();
        assert_eq!(metadata["title"], json!("A"));
        assert_eq!(metadata["tags"], json!(["x", "y"]));
        assert_eq!(metadata["n"], json!(3));

        assert!(parse_frontmatter("a.md", "").unwrap().is_empty());
        assert!(matches!(
            parse_frontmatter("a.md", "- just\n- a list\n"),
            Err(Error::Frontmatter { .. })
        ));
    }

    #[test]
    fn test_mutate_preserves_body() {
        let (temp_dir, vault) = vault_with(&[("notes/a.md", "---\ntitle: A\n---\n# Heading\n\ntext\n")]);

        vault
            .mutate_metadata("notes/a.md", &mut |m| {
                m.insert("modified".to_string(), json!("2024-01-01"));
            })
            .unwrap();

        let text = fs::read_to_string(temp_dir.path().join("notes/a.md")).unwrap();
        assert!(text.ends_with("---\n# Heading\n\ntext\n"));

        let metadata = vault.read_metadata("notes/a.md").unwrap();
        assert_eq!(metadata["title"], json!("A"));
        assert_eq!(metadata["modified"], json!("2024-01-01"));
    }

    #[test]
    fn test_mutate_adds_frontmatter() {
        let (temp_dir, vault) = vault_with(&[("plain.md", "just text\n")]);

        vault
            .mutate_metadata("plain.md", &mut |m| {
                m.insert("modified".to_string(), json!(1_700_000_000));
            })
            .unwrap();

        let text = fs::read_to_string(temp_dir.path().join("plain.md")).unwrap();
        assert!(text.starts_with("---\n"));
        assert!(text.ends_with("---\njust text\n"));
        assert_eq!(
            vault.read_metadata("plain.md").unwrap()["modified"],
            json!(1_700_000_000)
        );
    }

    #[test]
    fn test_unchanged_mutation_does_not_write() {
        let original = "---\ntitle:   'spaced'\n---\nbody\n";
        let (temp_dir, vault) = vault_with(&[("a.md", original)]);

        vault.mutate_metadata("a.md", &mut |_| {}).unwrap();
        assert_eq!(fs::read_to_string(temp_dir.path().join("a.md")).unwrap(), original);
    }

    #[test]
    fn test_missing_document() {
        let (_temp_dir, vault) = vault_with(&[]);
        assert!(matches!(vault.read_metadata("gone.md"), Err(Error::NotFound(_))));
        assert!(matches!(vault.created_at("gone.md"), Err(Error::NotFound(_))));
        assert!(matches!(vault.read_metadata("../escape.md"), Err(Error::InvalidPath(_))));
    }

    #[test]
    fn test_identity_and_listing() {
        let (temp_dir, vault) = vault_with(&[
            ("a.md", ""),
            ("notes/b.md", ""),
            ("notes/image.png", ""),
            (".fmstamp/config.toml", ""),
            (".trash/c.md", ""),
            ("templates/daily.md", ""),
        ]);

        assert_eq!(vault.documents(), vec!["a.md", "notes/b.md", "templates/daily.md"]);
        assert_eq!(vault.folders(), vec!["notes", "templates"]);

        let absolute = temp_dir.path().join("notes/b.md");
        assert_eq!(vault.identity_of(&absolute).as_deref(), Some("notes/b.md"));
        assert_eq!(vault.identity_of(&temp_dir.path().join(".trash/c.md")), None);
        assert_eq!(vault.identity_of(&temp_dir.path().join("notes/image.png")), None);
        assert_eq!(vault.identity_of(Path::new("/elsewhere/x.md")), None);
    }

    #[test]
    fn test_created_at_is_available() {
        let (_temp_dir, vault) = vault_with(&[("a.md", "")]);
        let created = vault.created_at("a.md").unwrap();
        let now = Local::now().fixed_offset();
        assert!((now - created).num_seconds().abs() < 60);
    }
}
