//! Source document loading
//!
//! The source is a UTF-8 text file. Pages are separated by form feeds
//! (`\x0c`), which is what `pdftotext` and most PDF exporters emit, so a
//! converted PDF keeps its page structure.

use crate::error::{RagError, Result};
use std::path::{Path, PathBuf};

const PAGE_BREAK: char = '\x0c';

/// One page of the source document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// 1-based page number
    pub number: usize,
    /// Char offset of the page's first character within the whole document
    pub offset: usize,
    pub text: String,
}

/// A loaded source document
#[derive(Debug, Clone)]
pub struct Document {
    pub path: PathBuf,
    pub pages: Vec<Page>,
    /// blake3 digest of the raw file bytes
    pub digest: String,
}

impl Document {
    /// Read and paginate a document from disk
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(RagError::DocumentNotFound {
                path: path.to_path_buf(),
            });
        }

        let bytes = std::fs::read(path).map_err(|e| RagError::Io {
            source: e,
            context: format!("Failed to read document: {}", path.display()),
        })?;
        let digest = blake3::hash(&bytes).to_hex().to_string();

        let text = String::from_utf8(bytes).map_err(|e| RagError::MalformedDocument {
            path: path.to_path_buf(),
            message: format!("not valid UTF-8: {e}"),
        })?;

        let document = Self::from_text(path, &text, digest);
        if document.pages.is_empty() {
            return Err(RagError::MalformedDocument {
                path: path.to_path_buf(),
                message: "document contains no text".to_string(),
            });
        }

        tracing::debug!(
            "Loaded {} ({} pages, digest {})",
            path.display(),
            document.pages.len(),
            &document.digest[..12]
        );

        Ok(document)
    }

    /// Paginate already-loaded text. Blank pages are dropped but keep their
    /// numbering so page numbers match the original.
    pub fn from_text(path: &Path, text: &str, digest: String) -> Self {
        let mut pages = Vec::new();
        let mut offset = 0;

        for (i, page_text) in text.split(PAGE_BREAK).enumerate() {
            let len = page_text.chars().count();
            if !page_text.trim().is_empty() {
                pages.push(Page {
                    number: i + 1,
                    offset,
                    text: page_text.to_string(),
                });
            }
            // +1 for the page break itself
            offset += len + 1;
        }

        Self {
            path: path.to_path_buf(),
            pages,
            digest,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_splits_on_form_feed() {
        let doc = Document::from_text(Path::new("doc.txt"), "one\x0ctwo\x0cthree", String::new());
        assert_eq!(doc.page_count(), 3);
        assert_eq!(doc.pages[1].text, "two");
        assert_eq!(doc.pages[1].offset, 4);
        assert_eq!(doc.pages[2].number, 3);
        assert_eq!(doc.pages[2].offset, 8);
    }

    #[test]
    fn test_blank_pages_keep_numbering() {
        let doc = Document::from_text(Path::new("doc.txt"), "one\x0c  \n\x0cthree", String::new());
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.pages[1].number, 3);
    }

    #[test]
    fn test_missing_document() {
        let err = Document::load(Path::new("/nonexistent/source.txt")).unwrap_err();
        assert!(matches!(err, RagError::DocumentNotFound { .. }));
    }

    #[test]
    fn test_empty_document_is_malformed() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("empty.txt");
        std::fs::write(&path, "   \n").unwrap();
        let err = Document::load(&path).unwrap_err();
        assert!(matches!(err, RagError::MalformedDocument { .. }));
    }

    #[test]
    fn test_binary_document_is_malformed() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("blob.bin");
        std::fs::write(&path, [0xff, 0xfe, 0x00, 0x80]).unwrap();
        let err = Document::load(&path).unwrap_err();
        assert!(matches!(err, RagError::MalformedDocument { .. }));
    }

    #[test]
    fn test_digest_is_stable() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("doc.txt");
        std::fs::write(&path, "stable content").unwrap();
        let a = Document::load(&path).unwrap();
        let b = Document::load(&path).unwrap();
        assert_eq!(a.digest, b.digest);
        assert_eq!(a.digest.len(), 64);
    }
}
