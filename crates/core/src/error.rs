//! Error types for core operations

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the host boundary and the config store
#[derive(Debug, Error)]
pub enum Error {
    /// Filesystem failure while reading or writing a document or config file
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The metadata block exists but is not a YAML mapping
    #[error("malformed frontmatter in {path}: {message}")]
    Frontmatter { path: String, message: String },

    /// Metadata or settings could not be serialized back to text
    #[error("failed to serialize {what}: {message}")]
    Serialize { what: &'static str, message: String },

    /// No document with this identity exists in the host
    #[error("document not found: {0}")]
    NotFound(String),

    /// Identity escapes the vault root or is otherwise unusable
    #[error("invalid document path '{0}'")]
    InvalidPath(String),

    /// Settings key that is not part of the configuration record
    #[error("unknown config key '{0}'")]
    UnknownKey(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, Error>;
