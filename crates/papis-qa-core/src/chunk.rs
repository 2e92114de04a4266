//! Paragraph-boundary chunker for extracted PDF text.
//!
//! Text is split on blank lines (`\n\n`) and paragraphs are packed into
//! pieces of at most `max_tokens × 4` characters. A paragraph that is too
//! long on its own is cut at the last newline or space before the limit.
//!
//! ```rust
//! use papis_qa_core::chunk::chunk_text;
//!
//! let texts = chunk_text("Curie, Radium (1904)", "k1", "One.\n\nTwo.", 700);
//! assert_eq!(texts.len(), 1);
//! assert_eq!(texts[0].name, "Curie, Radium (1904) chunk 1");
//! ```

use crate::models::Text;

/// Approximate characters-per-token ratio.
const CHARS_PER_TOKEN: usize = 4;

/// Build the name of the `index`-th (zero based) text of a document.
pub fn text_name(docname: &str, index: usize) -> String {
    format!("{} chunk {}", docname, index + 1)
}

/// Split `body` into named [`Text`]s owned by `dockey`.
///
/// Embeddings are left empty; the caller fills them in. Returns no texts
/// when `body` holds nothing but whitespace.
pub fn chunk_text(docname: &str, dockey: &str, body: &str, max_tokens: usize) -> Vec<Text> {
    split_paragraphs(body, max_tokens.max(1) * CHARS_PER_TOKEN)
        .into_iter()
        .enumerate()
        .map(|(i, piece)| Text {
            name: text_name(docname, i),
            dockey: dockey.to_string(),
            text: piece,
            embedding: Vec::new(),
        })
        .collect()
}

fn split_paragraphs(body: &str, max_chars: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut buf = String::new();

    for para in body.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        let joined_len = if buf.is_empty() {
            para.len()
        } else {
            buf.len() + 2 + para.len()
        };
        if joined_len > max_chars && !buf.is_empty() {
            pieces.push(std::mem::take(&mut buf));
        }

        if para.len() > max_chars {
            pieces.extend(hard_split(para, max_chars));
            continue;
        }

        if !buf.is_empty() {
            buf.push_str("\n\n");
        }
        buf.push_str(para);
    }

    if !buf.is_empty() {
        pieces.push(buf);
    }
    pieces
}

/// Cut an oversized paragraph, preferring newline then space boundaries.
fn hard_split(para: &str, max_chars: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut rest = para;

    while !rest.is_empty() {
        let limit = floor_char_boundary(rest, max_chars);
        let cut = if limit >= rest.len() {
            rest.len()
        } else {
            rest[..limit]
                .rfind('\n')
                .or_else(|| rest[..limit].rfind(' '))
                .map(|pos| pos + 1)
                .unwrap_or(limit)
        };
        // Always make progress, even when the first char is wider than the limit.
        let cut = if cut == 0 {
            rest.chars().next().map(char::len_utf8).unwrap_or(rest.len())
        } else {
            cut
        };

        let piece = rest[..cut].trim();
        if !piece.is_empty() {
            out.push(piece.to_string());
        }
        rest = &rest[cut..];
    }
    out
}

fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}
