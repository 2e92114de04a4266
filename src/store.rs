//! Persistence of the index between runs.
//!
//! The whole [`Docs`] state is written as one JSON blob. Writes overwrite
//! the file in place; a crash mid-save can leave a truncated index, and
//! concurrent `index` runs against the same file race (last writer wins).

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use papis_qa_core::docs::Docs;

/// Load/save access to the persisted index.
pub trait IndexStore {
    /// The stored index, or `None` if nothing has been indexed yet.
    fn load(&self) -> Result<Option<Docs>>;
    /// Replace the stored index with `docs`.
    fn save(&self, docs: &Docs) -> Result<()>;
}

/// Index stored in a file, normally `{config_home}/papis/{library}.qa`.
pub struct FileIndexStore {
    path: PathBuf,
}

impl FileIndexStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl IndexStore for FileIndexStore {
    fn load(&self) -> Result<Option<Docs>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&self.path)
            .with_context(|| format!("Failed to read index: {}", self.path.display()))?;
        let docs = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse index: {}", self.path.display()))?;
        Ok(Some(docs))
    }

    fn save(&self, docs: &Docs) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let bytes = serde_json::to_vec(docs)?;
        std::fs::write(&self.path, bytes)
            .with_context(|| format!("Failed to write index: {}", self.path.display()))
    }
}

/// In-memory store, holding the serialized blob like the file store does.
#[derive(Default)]
pub struct MemoryIndexStore {
    blob: Mutex<Option<Vec<u8>>>,
}

impl MemoryIndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last saved blob, if any.
    pub fn blob(&self) -> Option<Vec<u8>> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Vec<u8>>> {
        self.blob.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl IndexStore for MemoryIndexStore {
    fn load(&self) -> Result<Option<Docs>> {
        match self.lock().as_deref() {
            Some(bytes) => Ok(Some(serde_json::from_slice(bytes)?)),
            None => Ok(None),
        }
    }

    fn save(&self, docs: &Docs) -> Result<()> {
        *self.lock() = Some(serde_json::to_vec(docs)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn file_store_round_trip() {
        let tmp = TempDir::new().unwrap();
        let store = FileIndexStore::new(tmp.path().join("nested").join("papers.qa"));
        assert!(store.load().unwrap().is_none());

        let docs = Docs::new("gpt-4o", "text-embedding-3-small", 700);
        store.save(&docs).unwrap();
        assert!(store.path().exists());

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.llm, "gpt-4o");
        assert_eq!(loaded.embedding, "text-embedding-3-small");
        assert!(loaded.is_empty());
        assert!(!loaded.has_client());

        let mut bigger = Docs::new("gpt-4o", "text-embedding-3-small", 700);
        bigger.max_tokens = 350;
        store.save(&bigger).unwrap();
        assert_eq!(store.load().unwrap().unwrap().max_tokens, 350);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("papers.qa");
        std::fs::write(&path, b"\x00\x01 not json").unwrap();
        assert!(FileIndexStore::new(&path).load().is_err());
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryIndexStore::new();
        assert!(store.load().unwrap().is_none());
        store.save(&Docs::new("m", "e", 10)).unwrap();
        assert_eq!(store.load().unwrap().unwrap().max_tokens, 10);
        assert!(store.blob().is_some());
    }
}
