//! Core data models shared by the index, the synchronizer, and the
//! query frontend.

use serde::{Deserialize, Serialize};

/// One indexed file.
///
/// Keyed by `dockey`, the content fingerprint of the file, so the entry
/// survives renames of the library document that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doc {
    pub dockey: String,
    /// Short provenance string shown next to answers.
    pub citation: String,
    /// Display name, unique within the index.
    pub docname: String,
}

/// A chunk of a document's text with its embedding.
///
/// `name` is always `"{docname} chunk {n}"`, which is what lets a rename
/// of the owning [`Doc`] be carried over to its texts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    pub name: String,
    pub dockey: String,
    pub text: String,
    #[serde(default)]
    pub embedding: Vec<f32>,
}

/// A text retrieved for a question, with the model's summary of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    /// Name of the underlying [`Text`].
    pub name: String,
    pub citation: String,
    /// What the model extracted from the text for this question.
    pub summary: String,
    /// Relevance as judged by the model, `0..=10`.
    pub score: u8,
    /// The raw excerpt.
    pub text: String,
}

/// The structured result of a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub question: String,
    pub answer: String,
    /// Supporting contexts, best first.
    pub contexts: Vec<Context>,
}
