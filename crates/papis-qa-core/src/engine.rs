//! The QA engine interface driven by the synchronizer and `ask`.
//!
//! [`Docs`](crate::docs::Docs) is the one production implementation. The
//! trait exists so the synchronizer only sees the operations it needs,
//! including an explicit [`rename`](QaEngine::rename) instead of reaching
//! into the engine's name and text registries.

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Answer, Doc};

/// Outcome of [`QaEngine::add`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Added {
    /// The file was read, chunked, embedded, and registered under this name.
    New { docname: String },
    /// An entry with this fingerprint already exists; nothing was read.
    AlreadyPresent,
    /// The file could not be turned into text.
    Unreadable { reason: String },
}

/// Outcome of [`QaEngine::rename`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Renamed {
    /// The collision-free name actually assigned.
    pub docname: String,
    /// Whether the old name was registered in the name set before removal.
    pub old_name_registered: bool,
    /// Number of texts whose names were rewritten.
    pub texts_renamed: usize,
}

#[async_trait]
pub trait QaEngine: Send {
    /// Add a file under `dockey` unless that fingerprint is already indexed.
    async fn add(
        &mut self,
        path: &Path,
        dockey: &str,
        citation: &str,
        docname: &str,
    ) -> Result<Added>;

    /// Look up an indexed entry by fingerprint.
    fn doc(&self, dockey: &str) -> Option<&Doc>;

    /// Fingerprints of every indexed entry.
    fn dockeys(&self) -> Vec<String>;

    /// Replace the citation of an entry. Returns `false` if it does not exist.
    fn set_citation(&mut self, dockey: &str, citation: &str) -> bool;

    /// Rename the entry currently called `old_name`.
    ///
    /// `new_name` is made unique against the remaining names first, and
    /// every text of the entry is renamed along with it.
    fn rename(&mut self, old_name: &str, new_name: &str) -> Result<Renamed>;

    /// Drop an entry and all of its texts. Returns `false` if it did not exist.
    fn delete(&mut self, dockey: &str) -> bool;

    /// Answer `question` from the `k` most similar texts, citing at most
    /// `max_sources` of them.
    async fn query(&self, question: &str, k: usize, max_sources: usize) -> Result<Answer>;
}
