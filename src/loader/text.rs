//! Plain text and Markdown loader.

use super::{normalize_text, DocumentLoader, LoadedPage};
use crate::error::{DocragError, Result};
use async_trait::async_trait;
use std::path::Path;

/// Reads UTF-8 text files as a single page without a page number.
pub struct TextLoader;

impl TextLoader {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TextLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentLoader for TextLoader {
    async fn load(&self, path: &Path) -> Result<Vec<LoadedPage>> {
        let bytes = tokio::fs::read(path).await?;
        let text = String::from_utf8(bytes)
            .map_err(|_| DocragError::Loader(format!("{} is not valid UTF-8", path.display())))?;

        let text = normalize_text(&text);
        if text.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![LoadedPage::new(text, None)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_loads_single_unnumbered_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "Paris is the capital of France.\n").unwrap();

        let pages = TextLoader::new().load(&path).await.unwrap();
        assert_eq!(pages, vec![LoadedPage::new("Paris is the capital of France.", None)]);
    }

    #[tokio::test]
    async fn test_whitespace_only_file_has_no_pages() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blank.md");
        std::fs::write(&path, "  \n\n \t\n").unwrap();

        assert!(TextLoader::new().load(&path).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("binary.txt");
        std::fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();

        assert!(matches!(
            TextLoader::new().load(&path).await,
            Err(DocragError::Loader(_))
        ));
    }
}
