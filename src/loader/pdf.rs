//! PDF loader backed by `pdf-extract`.

use super::{normalize_text, DocumentLoader, LoadedPage};
use crate::error::{DocragError, Result};
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, instrument};

/// Extracts text page by page from PDF files.
pub struct PdfLoader;

impl PdfLoader {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PdfLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentLoader for PdfLoader {
    #[instrument(skip(self), fields(path = %path.display()))]
    async fn load(&self, path: &Path) -> Result<Vec<LoadedPage>> {
        let owned = path.to_path_buf();

        // Extraction is CPU-bound and synchronous.
        let pages = tokio::task::spawn_blocking(move || pdf_extract::extract_text_by_pages(&owned))
            .await
            .map_err(|e| DocragError::Loader(format!("PDF extraction task failed: {}", e)))?
            .map_err(|e| DocragError::Loader(format!("{}: {}", path.display(), e)))?;

        let loaded: Vec<LoadedPage> = pages
            .iter()
            .enumerate()
            .map(|(i, text)| LoadedPage::new(normalize_text(text), Some(i as u32 + 1)))
            .filter(|page| !page.text.is_empty())
            .collect();

        debug!("Loaded {} non-empty pages of {}", loaded.len(), pages.len());
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_pdf_is_a_loader_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"this is not a pdf").unwrap();

        let err = PdfLoader::new().load(&path).await.unwrap_err();
        assert!(matches!(err, DocragError::Loader(_)));
    }
}
