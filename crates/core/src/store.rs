//! On-disk write helpers and document identity normalization

use crate::error::{Error, Result};
use std::io::Write;
use std::path::{Component, Path};

/// Atomic write helper
///
/// Writes data to a temporary file in the target's directory, fsyncs it,
/// then renames it over the target. A reader never sees a half-written note.
pub fn atomic_write(target: &Path, data: &[u8]) -> Result<()> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| Error::io(dir, e))?;
    tmp.write_all(data).map_err(|e| Error::io(tmp.path(), e))?;
    tmp.as_file().sync_all().map_err(|e| Error::io(tmp.path(), e))?;
    tmp.persist(target).map_err(|e| Error::io(target, e.error))?;
    Ok(())
}

/// Normalize a document identity
///
/// - Uses `/` as the separator
/// - Removes `./` and empty segments
/// - Rejects `..`, absolute paths and empty identities
pub fn normalize_path(id: &str) -> Result<String> {
    let unified = id.replace('\\', "/");
    if unified.starts_with('/') || Path::new(id).is_absolute() {
        return Err(Error::InvalidPath(id.to_string()));
    }

    let mut segments = Vec::new();
    for component in Path::new(&unified).components() {
        match component {
            Component::Normal(segment) => match segment.to_str() {
                Some(segment) => segments.push(segment),
                None => return Err(Error::InvalidPath(id.to_string())),
            },
            Component::CurDir => {}
            _ => return Err(Error::InvalidPath(id.to_string())),
        }
    }

    if segments.is_empty() {
        return Err(Error::InvalidPath(id.to_string()));
    }
    Ok(segments.join("/"))
}
