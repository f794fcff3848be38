//! Update policy evaluation
//!
//! Decides from the current metadata whether a document may be stamped at
//! all. Evaluated at write time, never at notification time, since the
//! metadata can change during the debounce window.

use crate::config::Settings;
use crate::host::Metadata;
use serde_json::Value;
use std::fmt;

/// Why a write was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockReason {
    /// `only_update_existing` is on and the tracked field is absent
    MissingField,
    /// The per-document exclude field is truthy
    ExcludedByField,
    /// The document lives under an excluded folder
    ExcludedFolder(String),
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockReason::MissingField => f.write_str("tracked field absent"),
            BlockReason::ExcludedByField => f.write_str("excluded by field"),
            BlockReason::ExcludedFolder(folder) => write!(f, "in excluded folder '{}'", folder),
        }
    }
}

/// Outcome of policy evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Block(BlockReason),
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allow)
    }
}

/// Evaluate the rules in order; the first blocking rule wins
pub fn evaluate(metadata: &Metadata, settings: &Settings, path: &str) -> Verdict {
    if settings.only_update_existing && !metadata.contains_key(&settings.frontmatter_property) {
        return Verdict::Block(BlockReason::MissingField);
    }

    if is_truthy(metadata.get(&settings.exclude_field)) {
        return Verdict::Block(BlockReason::ExcludedByField);
    }

    if let Some(folder) = excluded_folder(settings, path) {
        return Verdict::Block(BlockReason::ExcludedFolder(folder.to_string()));
    }

    Verdict::Allow
}

pub fn should_write(metadata: &Metadata, settings: &Settings, path: &str) -> bool {
    evaluate(metadata, settings, path).is_allowed()
}

/// First configured folder that contains `path`
pub fn excluded_folder<'a>(settings: &'a Settings, path: &str) -> Option<&'a str> {
    settings
        .excluded_folders
        .iter()
        .map(String::as_str)
        .find(|folder| {
            path.strip_prefix(folder)
                .is_some_and(|rest| rest.starts_with('/'))
        })
}

/// Frontmatter truthiness: absent, null, false, 0 and "" are false
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}
