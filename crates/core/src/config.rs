//! Settings record and its on-disk store
//!
//! The store lives at `<vault>/.fmstamp/config.toml`. Loading never fails on
//! bad values: each recognised key is read on its own and anything missing
//! or malformed falls back to that field's default.

use crate::bucket::Frequency;
use crate::error::{Error, Result};
use crate::format::DateFormatter;
use crate::store::atomic_write;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Directory (relative to the vault root) holding fmstamp state
pub const CONFIG_DIR: &str = ".fmstamp";
/// Settings file name inside [`CONFIG_DIR`]
pub const CONFIG_FILE: &str = "config.toml";

const DEFAULT_PROPERTY: &str = "modified";
const DEFAULT_EXCLUDE_FIELD: &str = "exclude_modified_update";
const DEFAULT_APPEND_FIELD: &str = "append_modified_update";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Recognised keys with the camelCase spelling accepted as an alias
pub const KEYS: &[(&str, &str)] = &[
    ("frontmatter_property", "frontmatterProperty"),
    ("created_date_property", "createdDateProperty"),
    ("moment_format", "momentFormat"),
    ("store_history_log", "storeHistoryLog"),
    ("history_newest_first", "historyNewestFirst"),
    ("history_max_items", "historyMaxItems"),
    ("excluded_folders", "excludedFolders"),
    ("exclude_field", "excludeField"),
    ("append_field", "appendField"),
    ("append_maximum_frequency", "appendMaximumFrequency"),
    ("only_update_existing", "onlyUpdateExisting"),
    ("use_keyup_events", "useKeyupEvents"),
    ("timeout", "timeout"),
];

/// Process-wide configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    /// Field holding the modified timestamp (or its history log)
    pub frontmatter_property: String,
    /// Field for the creation timestamp; empty disables it
    pub created_date_property: String,
    /// Moment-style pattern; empty selects ISO 8601 with offset
    pub moment_format: String,
    /// Always keep the tracked field as a history log
    pub store_history_log: bool,
    /// Newest history entry at index 0 instead of at the end
    pub history_newest_first: bool,
    /// Maximum history length, 0 for unbounded
    pub history_max_items: usize,
    /// Path prefixes whose documents are never updated
    pub excluded_folders: Vec<String>,
    /// Per-document field that disables updates when truthy
    pub exclude_field: String,
    /// Per-document field that forces history mode when truthy
    pub append_field: String,
    /// Bucket size for collapsing history entries
    pub append_maximum_frequency: Frequency,
    /// Only touch documents that already carry the tracked field
    pub only_update_existing: bool,
    /// Drive updates from explicit input signals instead of file events
    pub use_keyup_events: bool,
    /// Debounce window in seconds
    pub timeout: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            frontmatter_property: DEFAULT_PROPERTY.to_string(),
            created_date_property: String::new(),
            moment_format: String::new(),
            store_history_log: false,
            history_newest_first: false,
            history_max_items: 0,
            excluded_folders: Vec::new(),
            exclude_field: DEFAULT_EXCLUDE_FIELD.to_string(),
            append_field: DEFAULT_APPEND_FIELD.to_string(),
            append_maximum_frequency: Frequency::Day,
            only_update_existing: false,
            use_keyup_events: false,
            timeout: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Settings {
    /// Parse settings text; a syntax error yields the defaults
    pub fn from_toml_str(text: &str) -> Self {
        match text.parse::<toml::Table>() {
            Ok(table) => Self::from_table(&table),
            Err(e) => {
                warn!("Config is not valid TOML, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Merge a table over the defaults, one key at a time
    pub fn from_table(table: &toml::Table) -> Self {
        let mut settings = Self::default();
        for (key, alias) in KEYS {
            if let Some(value) = table.get(*key).or_else(|| table.get(*alias)) {
                settings.apply(key, value);
            }
        }
        settings
    }

    /// Set a single key from user text (either key spelling)
    pub fn set(&mut self, key: &str, raw: &str) -> Result<()> {
        let key = canonical_key(key)?;
        self.apply(key, &toml::Value::String(raw.to_string()));
        Ok(())
    }

    /// Current value of a key, rendered for display
    pub fn get(&self, key: &str) -> Result<String> {
        let value = match canonical_key(key)? {
            "frontmatter_property" => self.frontmatter_property.clone(),
            "created_date_property" => self.created_date_property.clone(),
            "moment_format" => self.moment_format.clone(),
            "store_history_log" => self.store_history_log.to_string(),
            "history_newest_first" => self.history_newest_first.to_string(),
            "history_max_items" => self.history_max_items.to_string(),
            "excluded_folders" => self.excluded_folders.join("\n"),
            "exclude_field" => self.exclude_field.clone(),
            "append_field" => self.append_field.clone(),
            "append_maximum_frequency" => self.append_maximum_frequency.to_string(),
            "only_update_existing" => self.only_update_existing.to_string(),
            "use_keyup_events" => self.use_keyup_events.to_string(),
            _ => self.timeout.to_string(),
        };
        Ok(value)
    }

    fn apply(&mut self, key: &str, value: &toml::Value) {
        match key {
            "frontmatter_property" => {
                if let Some(text) = as_text(value).filter(|t| !t.is_empty()) {
                    self.frontmatter_property = text;
                }
            }
            "created_date_property" => {
                if let Some(text) = as_text(value) {
                    self.created_date_property = text;
                }
            }
            "moment_format" => {
                if let Some(text) = value.as_str() {
                    self.moment_format = text.to_string();
                }
            }
            "store_history_log" => set_bool(&mut self.store_history_log, value),
            "history_newest_first" => set_bool(&mut self.history_newest_first, value),
            "history_max_items" => {
                self.history_max_items = as_integer(value)
                    .filter(|n| *n > 0)
                    .and_then(|n| usize::try_from(n).ok())
                    .unwrap_or(0);
            }
            "excluded_folders" => {
                if let Some(folders) = as_folders(value) {
                    self.excluded_folders = folders;
                }
            }
            "exclude_field" => {
                if let Some(text) = as_text(value).filter(|t| !t.is_empty()) {
                    self.exclude_field = text;
                }
            }
            "append_field" => {
                if let Some(text) = as_text(value).filter(|t| !t.is_empty()) {
                    self.append_field = text;
                }
            }
            "append_maximum_frequency" => {
                self.append_maximum_frequency = value
                    .as_str()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_default();
            }
            "only_update_existing" => set_bool(&mut self.only_update_existing, value),
            "use_keyup_events" => set_bool(&mut self.use_keyup_events, value),
            "timeout" => {
                self.timeout = as_integer(value)
                    .filter(|n| *n > 0)
                    .and_then(|n| u64::try_from(n).ok())
                    .unwrap_or(DEFAULT_TIMEOUT_SECS);
            }
            _ => {}
        }
    }

    /// Debounce window
    pub fn debounce(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Compiled timestamp pattern
    pub fn formatter(&self) -> DateFormatter {
        DateFormatter::new(&self.moment_format)
    }

    /// Serialize for the config file
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Serialize {
            what: "settings",
            message: e.to_string(),
        })
    }
}

fn canonical_key(key: &str) -> Result<&'static str> {
    KEYS.iter()
        .find(|(snake, camel)| *snake == key || *camel == key)
        .map(|(snake, _)| *snake)
        .ok_or_else(|| Error::UnknownKey(key.to_string()))
}

fn as_text(value: &toml::Value) -> Option<String> {
    value.as_str().map(|s| s.trim().to_string())
}

fn as_integer(value: &toml::Value) -> Option<i64> {
    match value {
        toml::Value::Integer(n) => Some(*n),
        toml::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn set_bool(target: &mut bool, value: &toml::Value) {
    let parsed = match value {
        toml::Value::Boolean(b) => Some(*b),
        toml::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    if let Some(b) = parsed {
        *target = b;
    }
}

/// Folder list from an array, or from newline-separated text
fn as_folders(value: &toml::Value) -> Option<Vec<String>> {
    let raw: Vec<&str> = match value {
        toml::Value::Array(items) => items.iter().filter_map(|v| v.as_str()).collect(),
        toml::Value::String(text) => text.lines().collect(),
        _ => return None,
    };
    Some(
        raw.into_iter()
            .map(normalize_folder)
            .filter(|f| !f.is_empty())
            .collect(),
    )
}

/// Trim whitespace and surrounding slashes from a folder prefix
pub fn normalize_folder(folder: &str) -> String {
    folder.trim().trim_matches('/').to_string()
}

/// Loads and saves [`Settings`]
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Store for the vault rooted at `root`
    pub fn for_vault(root: &Path) -> Self {
        Self {
            path: root.join(CONFIG_DIR).join(CONFIG_FILE),
        }
    }

    /// Store at an explicit file path
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Load settings; a missing file yields the defaults
    pub fn load(&self) -> Result<Settings> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Ok(Settings::from_toml_str(&text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Settings::default()),
            Err(e) => Err(Error::io(&self.path, e)),
        }
    }

    /// Persist settings atomically
    pub fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        atomic_write(&self.path, settings.to_toml()?.as_bytes())
    }

    /// Write the defaults unless a file exists; returns whether it was created
    pub fn init_if_missing(&self) -> Result<bool> {
        if self.exists() {
            return Ok(false);
        }
        self.save(&Settings::default())?;
        Ok(true)
    }
}

/// Annotated example configuration
pub fn example_config() -> String {
    r#"# fmstamp configuration (.fmstamp/config.toml)

# Field updated when a note changes
frontmatter_property = "modified"

# Optional creation-date field, written once ("" disables)
created_date_property = "created"

# Moment-style pattern; "" means ISO 8601 with offset (YYYY-MM-DDTHH:mm:ssZ).
# Purely numeric output (e.g. "X" for epoch seconds) is stored as an integer.
moment_format = ""

# Keep a list of edit times instead of a single value
store_history_log = false
history_newest_first = false
history_max_items = 0                  # 0 = unlimited
append_maximum_frequency = "day"       # minute, hour, day, week, month, quarter, year

# Folders (and their subfolders) that are never touched
excluded_folders = ["templates", "archive/2019"]

# Per-note overrides
exclude_field = "exclude_modified_update"
append_field = "append_modified_update"

only_update_existing = false

# Take edit signals from stdin (one note path per line) instead of file events
use_keyup_events = false

# Seconds of quiet before a note is stamped
timeout = 10
"#
    .to_string()
}
