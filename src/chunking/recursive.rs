//! Recursive separator splitting with overlap.
//!
//! Text is cut on the coarsest separator present (paragraph, line, space,
//! then single characters). Pieces that are still too long are split again
//! with the finer separators, and small pieces are merged greedily up to the
//! chunk size. Consecutive chunks built from the same run of pieces share up
//! to `overlap` characters.

use crate::error::{DocragError, Result};
use crate::loader::LoadedPage;
use std::collections::VecDeque;
use std::ops::Range;

const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Joins consecutive pages; doubles as a paragraph boundary.
const PAGE_SEPARATOR: &str = "\n\n";

/// A chunk of text with the page it is attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub page_number: Option<u32>,
}

/// A borrowed piece of the document with its byte offset.
#[derive(Debug, Clone, Copy)]
struct Fragment<'a> {
    start: usize,
    text: &'a str,
}

impl Fragment<'_> {
    fn end(&self) -> usize {
        self.start + self.text.len()
    }
}

/// Merged chunk text and the byte span of the document it covers.
#[derive(Debug)]
struct Piece {
    text: String,
    span: Range<usize>,
}

/// Character-based recursive splitter.
#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    chunk_size: usize,
    overlap: usize,
}

impl RecursiveSplitter {
    /// Create a splitter; requires `0 < overlap < chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 || overlap == 0 {
            return Err(DocragError::Config(format!(
                "chunk size and overlap must be positive (got {} and {})",
                chunk_size, overlap
            )));
        }
        if overlap >= chunk_size {
            return Err(DocragError::Config(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                overlap, chunk_size
            )));
        }
        Ok(Self { chunk_size, overlap })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split ordered pages into segments.
    ///
    /// A segment that spans a page break is attributed to the page holding
    /// most of its characters; ties go to the earlier page.
    pub fn split(&self, pages: &[LoadedPage]) -> Vec<Segment> {
        let mut document = String::new();
        let mut page_spans: Vec<(Range<usize>, Option<u32>)> = Vec::new();

        for page in pages {
            if page.text.trim().is_empty() {
                continue;
            }
            if !document.is_empty() {
                document.push_str(PAGE_SEPARATOR);
            }
            let start = document.len();
            document.push_str(&page.text);
            page_spans.push((start..document.len(), page.page_number));
        }

        if document.is_empty() {
            return Vec::new();
        }

        self.split_fragment(Fragment { start: 0, text: &document }, &SEPARATORS)
            .into_iter()
            .map(|piece| Segment {
                page_number: majority_page(&document, &piece.span, &page_spans),
                text: piece.text,
            })
            .collect()
    }

    /// Split raw text without page information.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }
        self.split_fragment(Fragment { start: 0, text }, &SEPARATORS)
            .into_iter()
            .map(|piece| piece.text)
            .collect()
    }

    fn split_fragment(&self, fragment: Fragment<'_>, separators: &[&str]) -> Vec<Piece> {
        let (separator, finer) = pick_separator(fragment.text, separators);
        let parts = fragments(fragment, separator);

        let mut pieces = Vec::new();
        let mut pending: Vec<Fragment<'_>> = Vec::new();

        for part in parts {
            if char_len(part.text) <= self.chunk_size {
                pending.push(part);
                continue;
            }

            if !pending.is_empty() {
                pieces.extend(self.merge(&pending, separator));
                pending.clear();
            }

            if finer.is_empty() {
                pieces.push(Piece {
                    text: part.text.to_string(),
                    span: part.start..part.end(),
                });
            } else {
                pieces.extend(self.split_fragment(part, finer));
            }
        }

        if !pending.is_empty() {
            pieces.extend(self.merge(&pending, separator));
        }

        pieces
    }

    /// Greedily merge fragments into chunks of at most `chunk_size` characters,
    /// carrying up to `overlap` trailing characters into the next chunk.
    fn merge(&self, parts: &[Fragment<'_>], separator: &str) -> Vec<Piece> {
        let separator_len = char_len(separator);
        let mut pieces = Vec::new();
        let mut window: VecDeque<Fragment<'_>> = VecDeque::new();
        let mut total = 0usize;

        for part in parts.iter().copied() {
            let len = char_len(part.text);
            let joiner = |window: &VecDeque<Fragment<'_>>| {
                if window.is_empty() {
                    0
                } else {
                    separator_len
                }
            };

            if total + len + joiner(&window) > self.chunk_size && !window.is_empty() {
                if let Some(piece) = join(&window, separator) {
                    pieces.push(piece);
                }

                while total > self.overlap
                    || (total > 0 && total + len + joiner(&window) > self.chunk_size)
                {
                    let Some(first) = window.pop_front() else {
                        break;
                    };
                    total -= char_len(first.text) + joiner(&window);
                }
            }

            total += len + joiner(&window);
            window.push_back(part);
        }

        if let Some(piece) = join(&window, separator) {
            pieces.push(piece);
        }

        pieces
    }
}

/// First separator present in the text, plus the finer ones after it.
fn pick_separator<'s>(text: &str, separators: &'s [&'s str]) -> (&'s str, &'s [&'s str]) {
    for (i, separator) in separators.iter().enumerate() {
        if separator.is_empty() {
            return (separator, &[]);
        }
        if text.contains(separator) {
            return (separator, &separators[i + 1..]);
        }
    }
    ("", &[])
}

/// Cut a fragment on a separator, dropping empty parts. An empty separator
/// cuts between characters.
fn fragments<'a>(fragment: Fragment<'a>, separator: &str) -> Vec<Fragment<'a>> {
    if separator.is_empty() {
        return fragment
            .text
            .char_indices()
            .map(|(i, c)| Fragment {
                start: fragment.start + i,
                text: &fragment.text[i..i + c.len_utf8()],
            })
            .collect();
    }

    let mut parts = Vec::new();
    let mut offset = 0;
    for part in fragment.text.split(separator) {
        if !part.is_empty() {
            parts.push(Fragment {
                start: fragment.start + offset,
                text: part,
            });
        }
        offset += part.len() + separator.len();
    }
    parts
}

fn join(window: &VecDeque<Fragment<'_>>, separator: &str) -> Option<Piece> {
    let first = window.front()?;
    let last = window.back()?;

    let text = window
        .iter()
        .map(|f| f.text)
        .collect::<Vec<_>>()
        .join(separator);
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    Some(Piece {
        text: text.to_string(),
        span: first.start..last.end(),
    })
}

fn majority_page(
    document: &str,
    span: &Range<usize>,
    page_spans: &[(Range<usize>, Option<u32>)],
) -> Option<u32> {
    let mut best: Option<(usize, Option<u32>)> = None;

    for (page_span, page_number) in page_spans {
        let start = span.start.max(page_span.start);
        let end = span.end.min(page_span.end);
        if start >= end {
            continue;
        }
        let covered = char_len(&document[start..end]);
        if best.map_or(true, |(most, _)| covered > most) {
            best = Some((covered, *page_number));
        }
    }

    best.and_then(|(_, page)| page)
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
