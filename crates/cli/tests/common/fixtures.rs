//! Vault fixtures for integration tests

use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Temporary vault directory with helpers to write and inspect notes
pub struct TestVault {
    dir: TempDir,
}

impl TestVault {
    /// Empty vault, not yet initialized
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn note_path(&self, id: &str) -> PathBuf {
        self.dir.path().join(id)
    }

    /// Write a note, creating parent folders
    pub fn write_note(&self, id: &str, content: &str) {
        let path = self.note_path(id);
        fs::create_dir_all(path.parent().expect("note has a parent")).expect("Failed to create folder");
        fs::write(path, content).expect("Failed to write note");
    }

    pub fn read_note(&self, id: &str) -> String {
        fs::read_to_string(self.note_path(id)).expect("Failed to read note")
    }

    /// Frontmatter of a note as JSON; empty when there is none
    pub fn metadata(&self, id: &str) -> Map<String, Value> {
        let text = self.read_note(id);
        let Some(rest) = text.strip_prefix("---\n") else {
            return Map::new();
        };
        let end = rest.find("\n---\n").map(|i| i + 1).unwrap_or(0);
        let yaml = &rest[..end];
        match serde_yaml::from_str::<Value>(yaml).expect("Invalid frontmatter") {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    /// Replace the config file, which also marks the directory as a vault
    pub fn configure(&self, toml: &str) {
        let dir = self.dir.path().join(".fmstamp");
        fs::create_dir_all(&dir).expect("Failed to create config dir");
        fs::write(dir.join("config.toml"), toml).expect("Failed to write config");
    }
}
