//! Structured RAG results with source attribution.

use super::{distinct_chunks, RetrievedChunk};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::Path;

/// Answer returned when retrieval finds nothing to ground an answer in.
pub const NO_INFORMATION_ANSWER: &str =
    "No relevant information was found in the indexed documents to answer this question.";

/// Page a source chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Number(u32),
    NotApplicable,
}

impl From<Option<u32>> for Page {
    fn from(page: Option<u32>) -> Self {
        page.map(Page::Number).unwrap_or(Page::NotApplicable)
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Page::Number(n) => write!(f, "{}", n),
            Page::NotApplicable => write!(f, "N/A"),
        }
    }
}

impl Serialize for Page {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Page::Number(n) => serializer.serialize_u32(*n),
            Page::NotApplicable => serializer.serialize_str("N/A"),
        }
    }
}

impl<'de> Deserialize<'de> for Page {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u32),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(Page::Number(n)),
            Raw::Text(_) => Ok(Page::NotApplicable),
        }
    }
}

/// A cited source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    /// Display name of the document.
    pub title: String,
    /// Original source path.
    pub source: String,
    pub score: f32,
    pub page: Page,
}

/// The public result of one ask cycle.
///
/// `context_used` is true exactly when `sources` is non-empty; the
/// constructors are the only way to build one.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RagResult {
    query: String,
    answer: String,
    sources: Vec<Source>,
    context_used: bool,
    num_sources: usize,
}

impl RagResult {
    /// Result for a query that retrieval could not ground.
    pub fn no_information(query: &str) -> Self {
        Self::without_context(query, NO_INFORMATION_ANSWER)
    }

    /// Result for a query whose generation step failed.
    pub fn generation_failed(query: &str, message: &str) -> Self {
        Self::without_context(query, &format!("Error generating response: {}", message))
    }

    fn without_context(query: &str, answer: &str) -> Self {
        Self {
            query: query.to_string(),
            answer: answer.to_string(),
            sources: Vec::new(),
            context_used: false,
            num_sources: 0,
        }
    }

    fn with_sources(query: &str, answer: &str, sources: Vec<Source>) -> Self {
        let num_sources = sources.len();
        Self {
            query: query.to_string(),
            answer: answer.to_string(),
            context_used: num_sources > 0,
            num_sources,
            sources,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn context_used(&self) -> bool {
        self.context_used
    }

    pub fn num_sources(&self) -> usize {
        self.num_sources
    }

    /// Format the result for terminal display.
    pub fn format_for_display(&self) -> String {
        let mut output = self.answer.clone();

        if !self.sources.is_empty() {
            output.push_str("\n\n--- Sources ---\n");
            for (i, source) in self.sources.iter().enumerate() {
                output.push_str(&format!(
                    "\n[{}] {} (page {}, score: {:.2})",
                    i + 1,
                    source.title,
                    source.page,
                    source.score
                ));
            }
        }

        output
    }
}

/// Maps an answer and its retrieved chunks onto a [`RagResult`].
#[derive(Debug, Clone, Default)]
pub struct ResponseFormatter;

impl ResponseFormatter {
    pub fn new() -> Self {
        Self
    }

    /// Build the result, one source per distinct chunk in retrieval order.
    ///
    /// Chunks repeating an earlier chunk's text are dropped, matching the
    /// numbering of the prompt's context documents.
    pub fn format(&self, query: &str, answer: &str, chunks: &[RetrievedChunk]) -> RagResult {
        let sources = distinct_chunks(chunks).map(source_for).collect();
        RagResult::with_sources(query, answer, sources)
    }
}

fn source_for(retrieved: &RetrievedChunk) -> Source {
    let meta = &retrieved.chunk.metadata;

    let title = if !meta.source_name.is_empty() {
        meta.source_name.clone()
    } else {
        Path::new(&meta.source_file)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Unknown".to_string())
    };

    Source {
        title,
        source: meta.source_file.clone(),
        score: retrieved.score,
        page: meta.page_number.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::chunk;

    #[test]
    fn test_format_maps_sources() {
        let chunks = vec![
            RetrievedChunk {
                chunk: chunk("data/Dubai.pdf", 0, "Visa rules", Some(4)),
                score: 0.82,
            },
            RetrievedChunk {
                chunk: chunk("notes.txt", 0, "Packing list", None),
                score: 0.41,
            },
        ];

        let result = ResponseFormatter::new().format("Do I need a visa?", "Yes [Document 1].", &chunks);

        assert!(result.context_used());
        assert_eq!(result.num_sources(), 2);
        assert_eq!(result.sources()[0].title, "Dubai.pdf");
        assert_eq!(result.sources()[0].source, "data/Dubai.pdf");
        assert_eq!(result.sources()[0].page, Page::Number(4));
        assert_eq!(result.sources()[1].page, Page::NotApplicable);
    }

    #[test]
    fn test_title_falls_back_to_file_name() {
        let mut c = chunk("/very/long/path/report.pdf", 0, "text", Some(1));
        c.metadata.source_name.clear();
        let source = source_for(&RetrievedChunk { chunk: c, score: 0.5 });
        assert_eq!(source.title, "report.pdf");

        let mut c = chunk("", 0, "text", None);
        c.metadata.source_name.clear();
        let source = source_for(&RetrievedChunk { chunk: c, score: 0.5 });
        assert_eq!(source.title, "Unknown");
    }

    #[test]
    fn test_no_information_has_no_sources() {
        let result = RagResult::no_information("What is the meaning of life?");
        assert_eq!(result.answer(), NO_INFORMATION_ANSWER);
        assert!(!result.context_used());
        assert_eq!(result.num_sources(), 0);
        assert!(result.sources().is_empty());

        let failed = RagResult::generation_failed("q", "timed out");
        assert!(!failed.context_used());
        assert!(failed.answer().contains("timed out"));
    }

    #[test]
    fn test_json_shape() {
        let chunks = vec![RetrievedChunk {
            chunk: chunk("notes.txt", 0, "text", None),
            score: 0.5,
        }];
        let result = ResponseFormatter::new().format("q", "a", &chunks);
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["contextUsed"], true);
        assert_eq!(json["numSources"], 1);
        assert_eq!(json["sources"][0]["page"], "N/A");
        assert_eq!(json["sources"][0]["title"], "notes.txt");
    }

    #[test]
    fn test_duplicate_chunks_cite_once() {
        let chunks = vec![
            RetrievedChunk { chunk: chunk("a.pdf", 0, "same words", Some(1)), score: 0.9 },
            RetrievedChunk { chunk: chunk("b.pdf", 3, "same words", Some(2)), score: 0.9 },
            RetrievedChunk { chunk: chunk("c.pdf", 1, "different words", Some(5)), score: 0.4 },
        ];
        let result = ResponseFormatter::new().format("q", "a", &chunks);

        let titles: Vec<&str> = result.sources().iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["a.pdf", "c.pdf"]);
        assert_eq!(result.num_sources(), 2);
    }
}
