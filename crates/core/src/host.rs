//! Host boundary
//!
//! The engine never touches documents directly. It reads a metadata
//! snapshot, and hands the host a mutation to apply atomically.

use crate::error::{Error, Result};
use chrono::{DateTime, FixedOffset};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Structured metadata block, field name to value, in document order
pub type Metadata = Map<String, Value>;

/// Document storage as seen by the updater
pub trait DocumentHost: Send + Sync {
    /// Current metadata; empty when the document has no metadata block
    fn read_metadata(&self, id: &str) -> Result<Metadata>;

    /// Apply `mutation` to the metadata and persist the document
    fn mutate_metadata(&self, id: &str, mutation: &mut dyn FnMut(&mut Metadata)) -> Result<()>;

    /// Original creation instant of the document
    fn created_at(&self, id: &str) -> Result<DateTime<FixedOffset>>;
}

impl<H: DocumentHost + ?Sized> DocumentHost for std::sync::Arc<H> {
    fn read_metadata(&self, id: &str) -> Result<Metadata> {
        (**self).read_metadata(id)
    }

    fn mutate_metadata(&self, id: &str, mutation: &mut dyn FnMut(&mut Metadata)) -> Result<()> {
        (**self).mutate_metadata(id, mutation)
    }

    fn created_at(&self, id: &str) -> Result<DateTime<FixedOffset>> {
        (**self).created_at(id)
    }
}

#[derive(Debug, Clone)]
struct MemoryDocument {
    metadata: Metadata,
    created: DateTime<FixedOffset>,
    writes: usize,
}

/// In-memory host, used by tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryHost {
    documents: Mutex<HashMap<String, MemoryDocument>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a document
    pub fn insert(&self, id: &str, metadata: Metadata, created: DateTime<FixedOffset>) {
        self.documents.lock().insert(
            id.to_string(),
            MemoryDocument {
                metadata,
                created,
                writes: 0,
            },
        );
    }

    /// Overwrite metadata without counting it as a write (an external edit)
    pub fn replace_metadata(&self, id: &str, metadata: Metadata) -> Result<()> {
        let mut documents = self.documents.lock();
        let document = documents
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        document.metadata = metadata;
        Ok(())
    }

    pub fn metadata(&self, id: &str) -> Option<Metadata> {
        self.documents.lock().get(id).map(|d| d.metadata.clone())
    }

    /// Number of mutations applied to a document
    pub fn write_count(&self, id: &str) -> usize {
        self.documents.lock().get(id).map_or(0, |d| d.writes)
    }
}

impl DocumentHost for MemoryHost {
    fn read_metadata(&self, id: &str) -> Result<Metadata> {
        self.metadata(id).ok_or_else(|| Error::NotFound(id.to_string()))
    }

    fn mutate_metadata(&self, id: &str, mutation: &mut dyn FnMut(&mut Metadata)) -> Result<()> {
        let mut documents = self.documents.lock();
        let document = documents
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        mutation(&mut document.metadata);
        document.writes += 1;
        Ok(())
    }

    fn created_at(&self, id: &str) -> Result<DateTime<FixedOffset>> {
        self.documents
            .lock()
            .get(id)
            .map(|d| d.created)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_memory_host_mutation() {
        let host = MemoryHost::new();
        let created = DateTime::parse_from_rfc3339("2023-05-01T08:00:00+00:00").unwrap();
        host.insert("a.md", Metadata::new(), created);

        host.mutate_metadata("a.md", &mut |m| {
            m.insert("modified".to_string(), json!("now"));
        })
        .unwrap();

        assert_eq!(host.read_metadata("a.md").unwrap()["modified"], json!("now"));
        assert_eq!(host.write_count("a.md"), 1);
        assert_eq!(host.created_at("a.md").unwrap(), created);
        assert!(matches!(host.read_metadata("b.md"), Err(Error::NotFound(_))));
    }
}
