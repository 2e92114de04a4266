//! Citation and display-name derivation.
//!
//! Both values are pure functions of a document's metadata, so a freshly
//! derived name can be compared against the one stored in the index to
//! detect that a document was renamed in the library.

use std::fmt;

use crate::library::Document;

/// The citation and display name to index a document under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Naming {
    pub citation: String,
    pub docname: String,
}

/// Why a document cannot be named.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No authors, no year, or a blank title.
    MissingMetadata,
    /// The first author has no usable family name.
    UnresolvedAuthor,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingMetadata => write!(f, "author, year or title is missing"),
            SkipReason::UnresolvedAuthor => write!(f, "the first author has no family name"),
        }
    }
}

/// The reference string if it has any non-whitespace content, else the
/// document identifier.
pub fn citation(doc: &Document) -> String {
    if doc.reference.trim().is_empty() {
        doc.id.clone()
    } else {
        doc.reference.clone()
    }
}

/// Derive the citation and display name of a document.
///
/// | authors | display name |
/// |---------|--------------|
/// | 1 | `Curie, Radium (1904)` |
/// | 2 | `Curie and Curie, Radium (1904)` |
/// | 3+ | `Curie et al., Radium (1904)` |
///
/// With two authors and no family name for the second, the one-author form
/// is used.
pub fn derive(doc: &Document) -> Result<Naming, SkipReason> {
    let title = doc.title.as_deref().map(str::trim).unwrap_or_default();
    let (Some(first), Some(year)) = (doc.authors.first(), doc.year.as_deref()) else {
        return Err(SkipReason::MissingMetadata);
    };
    if title.is_empty() {
        return Err(SkipReason::MissingMetadata);
    }
    let first = first.family_name().ok_or(SkipReason::UnresolvedAuthor)?;

    let author = match doc.authors.len() {
        1 => first.to_string(),
        2 => match doc.authors[1].family_name() {
            Some(second) => format!("{} and {}", first, second),
            None => first.to_string(),
        },
        _ => format!("{} et al.", first),
    };

    Ok(Naming {
        citation: citation(doc),
        docname: format!("{}, {} ({})", author, title, year),
    })
}
