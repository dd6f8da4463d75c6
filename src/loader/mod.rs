//! Document loaders that turn files into ordered page text.
//!
//! Loaders only extract text; chunking and metadata are handled downstream.

mod pdf;
mod text;

pub use pdf::PdfLoader;
pub use text::TextLoader;

use crate::error::Result;
use async_trait::async_trait;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// Text of a single page, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedPage {
    /// Extracted text.
    pub text: String,
    /// 1-based page number, `None` for formats without pages.
    pub page_number: Option<u32>,
}

impl LoadedPage {
    pub fn new(text: impl Into<String>, page_number: Option<u32>) -> Self {
        Self {
            text: text.into(),
            page_number,
        }
    }
}

/// Supported document types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Pdf,
    Text,
    Markdown,
}

impl FileType {
    /// Detect the file type from a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "pdf" => Some(FileType::Pdf),
            "txt" => Some(FileType::Text),
            "md" | "markdown" => Some(FileType::Markdown),
            _ => None,
        }
    }

    /// Short label stored in chunk metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Pdf => "pdf",
            FileType::Text => "txt",
            FileType::Markdown => "md",
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for document loaders.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    /// Load a document into ordered pages.
    async fn load(&self, path: &Path) -> Result<Vec<LoadedPage>>;
}

/// Pick the loader for a file type.
pub fn loader_for(file_type: FileType) -> Box<dyn DocumentLoader> {
    match file_type {
        FileType::Pdf => Box::new(PdfLoader::new()),
        FileType::Text | FileType::Markdown => Box::new(TextLoader::new()),
    }
}

/// Normalize extracted text: collapse runs of spaces and tabs, trim line
/// ends, and fold three or more newlines into one paragraph break.
pub fn normalize_text(text: &str) -> String {
    static SPACES: OnceLock<Regex> = OnceLock::new();
    static BLANK_LINES: OnceLock<Regex> = OnceLock::new();

    let spaces = SPACES.get_or_init(|| Regex::new(r"[ \t\x{00A0}]+").expect("valid regex"));
    let blank_lines = BLANK_LINES.get_or_init(|| Regex::new(r"\n{3,}").expect("valid regex"));

    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let collapsed = spaces.replace_all(&text, " ");
    let trimmed: Vec<&str> = collapsed.lines().map(str::trim_end).collect();
    let joined = trimmed.join("\n");

    blank_lines.replace_all(&joined, "\n\n").trim().to_string()
}
