//! A throwaway library on disk, wired to the core crate's offline fakes.

use std::path::PathBuf;
use std::sync::Arc;

use papis_qa_core::docs::Clients;
use papis_qa_core::testing::{offline_clients, FailingEmbedder, KeywordChat, MapLoader};
use tempfile::TempDir;

use crate::library::{Author, Document};

/// Answer used by [`fake_clients`]; exercises the math delimiter rewrite.
pub const LATEX_ANSWER: &str = r"The half-life is \(t_{1/2}\), see \[E = mc^2\].";

/// A temporary directory of PDF stand-ins plus the text each one "contains".
pub struct FakeLibrary {
    dir: TempDir,
    loader: MapLoader,
}

impl FakeLibrary {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            loader: MapLoader::default(),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write raw bytes without registering any text for the file.
    pub fn write_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    /// A document with one attached `{id}.pdf` whose text is `body`.
    pub fn document(
        &self,
        id: &str,
        reference: &str,
        families: &[&str],
        year: Option<&str>,
        title: &str,
        body: &str,
    ) -> Document {
        let path = self.write_file(&format!("{}.pdf", id), &format!("%PDF {} {}", id, body));
        self.loader.insert(path.clone(), body);
        Document {
            id: id.to_string(),
            reference: reference.to_string(),
            title: Some(title.to_string()),
            year: year.map(String::from),
            authors: families
                .iter()
                .map(|f| Author {
                    family: Some(f.to_string()),
                    given: None,
                })
                .collect(),
            files: vec![path],
        }
    }
}

/// Offline clients reading texts registered in `lib`; "radium" is relevant.
pub fn fake_clients(lib: &FakeLibrary) -> Clients {
    offline_clients(KeywordChat::new("radium", LATEX_ANSWER), &lib.loader)
}

/// Like [`fake_clients`], but every embedding request fails.
pub fn failing_clients(lib: &FakeLibrary) -> Clients {
    Clients {
        embedder: Arc::new(FailingEmbedder),
        ..fake_clients(lib)
    }
}
