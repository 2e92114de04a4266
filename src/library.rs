//! Reader for papis libraries.
//!
//! A papis library is a directory tree in which every document lives in its
//! own folder holding an `info.yaml` and the attached files:
//!
//! ```text
//! papers/
//! ├── curie-1904/
//! │   ├── info.yaml
//! │   └── radium.pdf
//! └── ...
//! ```
//!
//! Only the fields papis-qa needs are read; everything else in `info.yaml`
//! is ignored.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// File name papis uses for document metadata.
pub const INFO_FILE: &str = "info.yaml";

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("library directory does not exist: {0}")]
    MissingRoot(PathBuf),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("failed to walk library: {0}")]
    Walk(#[from] walkdir::Error),
}

/// An author entry of `author_list`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub family: Option<String>,
    #[serde(default)]
    pub given: Option<String>,
}

impl Author {
    /// The family name, if present and not blank.
    pub fn family_name(&self) -> Option<&str> {
        self.family
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
    }
}

/// A document of the library, as read from its `info.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    /// Stable identifier (`papis_id`, or the folder name without one).
    pub id: String,
    /// Reference string (`ref`), possibly empty.
    pub reference: String,
    pub title: Option<String>,
    pub year: Option<String>,
    pub authors: Vec<Author>,
    /// Attached files, resolved against the document folder.
    pub files: Vec<PathBuf>,
}

impl Document {
    /// Attached files with a `.pdf` extension (case-insensitive).
    pub fn pdf_files(&self) -> impl Iterator<Item = &PathBuf> {
        self.files.iter().filter(|f| {
            f.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
        })
    }
}

#[derive(Deserialize)]
struct InfoYaml {
    #[serde(default, rename = "ref")]
    reference: Option<String>,
    #[serde(default)]
    papis_id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    year: Option<serde_yaml::Value>,
    #[serde(default)]
    author_list: Vec<Author>,
    #[serde(default)]
    files: Vec<String>,
}

fn year_to_string(value: serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

/// Parse one document folder's `info.yaml`.
pub fn read_document(info_path: &Path) -> Result<Document, LibraryError> {
    let content = std::fs::read_to_string(info_path).map_err(|source| LibraryError::Io {
        path: info_path.to_path_buf(),
        source,
    })?;
    let info: InfoYaml = serde_yaml::from_str(&content).map_err(|source| LibraryError::Yaml {
        path: info_path.to_path_buf(),
        source,
    })?;

    let folder = info_path.parent().unwrap_or(Path::new("."));
    let folder_name = folder
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    Ok(Document {
        id: info
            .papis_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or(folder_name),
        reference: info.reference.unwrap_or_default(),
        title: info.title,
        year: info.year.and_then(year_to_string),
        authors: info.author_list,
        files: info.files.iter().map(|f| folder.join(f)).collect(),
    })
}

/// Read every document under `root`, sorted by folder path.
///
/// Folders whose `info.yaml` cannot be read or parsed are logged and
/// skipped.
pub fn scan_library(root: &Path) -> Result<Vec<Document>, LibraryError> {
    if !root.is_dir() {
        return Err(LibraryError::MissingRoot(root.to_path_buf()));
    }

    let mut infos = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry?;
        if entry.file_type().is_file() && entry.file_name() == INFO_FILE {
            infos.push(entry.into_path());
        }
    }
    infos.sort();

    let mut documents = Vec::with_capacity(infos.len());
    for info in infos {
        match read_document(&info) {
            Ok(doc) => documents.push(doc),
            Err(e) => warn!("Skipping document: {}", e),
        }
    }
    debug!("Read {} documents from {}", documents.len(), root.display());
    Ok(documents)
}

/// Selects documents by simple term matching.
///
/// An empty query or `*` selects everything. Otherwise every
/// whitespace-separated term must match: `field:value` compares against
/// one of `ref`, `id`, `title`, `year`, `author`; a bare term may match any
/// of them. Matching is a case-insensitive substring test.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentQuery {
    terms: Vec<Term>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Term {
    field: Option<Field>,
    needle: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Ref,
    Id,
    Title,
    Year,
    Author,
}

impl Field {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "ref" => Some(Self::Ref),
            "id" | "papis_id" => Some(Self::Id),
            "title" => Some(Self::Title),
            "year" => Some(Self::Year),
            "author" => Some(Self::Author),
            _ => None,
        }
    }
}

impl DocumentQuery {
    pub fn parse(query: &str) -> Self {
        let query = query.trim();
        if query.is_empty() || query == "*" {
            return Self::default();
        }
        let terms = query
            .split_whitespace()
            .map(|raw| match raw.split_once(':') {
                Some((field, value)) if Field::parse(field).is_some() => Term {
                    field: Field::parse(field),
                    needle: value.to_lowercase(),
                },
                _ => Term {
                    field: None,
                    needle: raw.to_lowercase(),
                },
            })
            .collect();
        Self { terms }
    }

    pub fn matches_all(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.terms.iter().all(|term| term_matches(term, doc))
    }
}

fn term_matches(term: &Term, doc: &Document) -> bool {
    let hit = |value: &str| value.to_lowercase().contains(&term.needle);
    let authors = || {
        doc.authors.iter().any(|a| {
            a.family.as_deref().is_some_and(hit) || a.given.as_deref().is_some_and(hit)
        })
    };
    match term.field {
        Some(Field::Ref) => hit(&doc.reference),
        Some(Field::Id) => hit(&doc.id),
        Some(Field::Title) => doc.title.as_deref().is_some_and(hit),
        Some(Field::Year) => doc.year.as_deref().is_some_and(hit),
        Some(Field::Author) => authors(),
        None => {
            hit(&doc.reference)
                || hit(&doc.id)
                || doc.title.as_deref().is_some_and(hit)
                || doc.year.as_deref().is_some_and(hit)
                || authors()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_doc(root: &Path, folder: &str, yaml: &str) {
        let dir = root.join(folder);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(INFO_FILE), yaml).unwrap();
    }

    #[test]
    fn reads_metadata_and_resolves_files() {
        let tmp = TempDir::new().unwrap();
        write_doc(
            tmp.path(),
            "curie",
            "ref: curie1904\npapis_id: abc123\ntitle: Radium\nyear: 1904\n\
             author_list:\n  - family: Curie\n    given: Marie\n\
             files:\n  - radium.pdf\n  - notes.txt\n",
        );

        let docs = scan_library(tmp.path()).unwrap();
        assert_eq!(docs.len(), 1);
        let doc = &docs[0];
        assert_eq!(doc.id, "abc123");
        assert_eq!(doc.reference, "curie1904");
        assert_eq!(doc.year.as_deref(), Some("1904"));
        assert_eq!(doc.authors[0].family_name(), Some("Curie"));
        let pdfs: Vec<_> = doc.pdf_files().collect();
        assert_eq!(pdfs, vec![&tmp.path().join("curie").join("radium.pdf")]);
    }

    #[test]
    fn string_year_and_missing_id() {
        let tmp = TempDir::new().unwrap();
        write_doc(tmp.path(), "folder-7", "title: T\nyear: '2020'\n");
        let docs = scan_library(tmp.path()).unwrap();
        assert_eq!(docs[0].id, "folder-7");
        assert_eq!(docs[0].year.as_deref(), Some("2020"));
        assert_eq!(docs[0].reference, "");
    }

    #[test]
    fn broken_yaml_is_skipped() {
        let tmp = TempDir::new().unwrap();
        write_doc(tmp.path(), "a", "title: [unclosed\n");
        write_doc(tmp.path(), "b", "title: Fine\n");
        let docs = scan_library(tmp.path()).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].title.as_deref(), Some("Fine"));
    }

    #[test]
    fn missing_root_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let err = scan_library(&tmp.path().join("nope")).unwrap_err();
        assert!(matches!(err, LibraryError::MissingRoot(_)));
    }

    #[test]
    fn uppercase_pdf_extension_counts() {
        let doc = Document {
            files: vec!["a.PDF".into(), "b.djvu".into(), "c".into()],
            ..Default::default()
        };
        assert_eq!(doc.pdf_files().count(), 1);
    }

    #[test]
    fn query_terms() {
        let doc = Document {
            id: "x1".into(),
            reference: "curie1904".into(),
            title: Some("Radium and Radioactivity".into()),
            year: Some("1904".into()),
            authors: vec![Author {
                family: Some("Curie".into()),
                given: Some("Marie".into()),
            }],
            files: vec![],
        };
        assert!(DocumentQuery::parse("").matches_all());
        assert!(DocumentQuery::parse("*").matches(&doc));
        assert!(DocumentQuery::parse("radium").matches(&doc));
        assert!(DocumentQuery::parse("author:marie year:1904").matches(&doc));
        assert!(!DocumentQuery::parse("author:radium").matches(&doc));
        assert!(!DocumentQuery::parse("radium einstein").matches(&doc));
        assert!(DocumentQuery::parse("doi:10.1/x").terms[0].field.is_none());
    }
}
