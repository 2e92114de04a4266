//! PDF text extraction.
//!
//! [`PdfLoader`] is the [`TextLoader`] attached to the index: the engine
//! calls it only for files whose fingerprint is not indexed yet.

use std::path::Path;

use anyhow::Result;
use papis_qa_core::docs::TextLoader;

/// Largest PDF read into memory for extraction.
const MAX_PDF_BYTES: u64 = 200 * 1024 * 1024;

/// Extraction error. The synchronizer logs these and skips the file.
#[derive(Debug)]
pub enum ExtractError {
    Io(std::io::Error),
    TooLarge(u64),
    Pdf(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::Io(e) => write!(f, "cannot read file: {}", e),
            ExtractError::TooLarge(size) => {
                write!(f, "file is {} bytes, limit is {}", size, MAX_PDF_BYTES)
            }
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Extract plain text from PDF bytes.
///
/// `pdf-extract` panics on some malformed files; such a panic is reported
/// as [`ExtractError::Pdf`] so one bad attachment cannot abort a whole run.
pub fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    contain_panic(|| {
        pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
    })
}

fn contain_panic<F>(extract: F) -> Result<String, ExtractError>
where
    F: FnOnce() -> Result<String, ExtractError> + std::panic::UnwindSafe,
{
    std::panic::catch_unwind(extract).unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Err(ExtractError::Pdf(format!("extractor panicked: {}", message)))
    })
}

/// Read a PDF from disk and extract its text.
pub fn extract_pdf_file(path: &Path) -> Result<String, ExtractError> {
    let size = std::fs::metadata(path).map_err(ExtractError::Io)?.len();
    if size > MAX_PDF_BYTES {
        return Err(ExtractError::TooLarge(size));
    }
    let bytes = std::fs::read(path).map_err(ExtractError::Io)?;
    extract_pdf(&bytes)
}

pub struct PdfLoader;

impl TextLoader for PdfLoader {
    fn load(&self, path: &Path) -> Result<String> {
        Ok(extract_pdf_file(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_is_a_pdf_error() {
        let err = extract_pdf(b"definitely not a pdf").unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }

    #[test]
    fn extractor_panic_becomes_pdf_error() {
        let err = contain_panic(|| panic!("bad xref")).unwrap_err();
        match err {
            ExtractError::Pdf(message) => assert!(message.contains("bad xref")),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = extract_pdf_file(Path::new("/nonexistent/paper.pdf")).unwrap_err();
        assert!(matches!(err, ExtractError::Io(_)));
        assert!(PdfLoader.load(Path::new("/nonexistent/paper.pdf")).is_err());
    }
}
