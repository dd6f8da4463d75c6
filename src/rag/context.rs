//! Prompt assembly for RAG responses.

use super::{distinct_chunks, ConversationState, RetrievedChunk};

/// Instruction block placed at the top of every prompt.
pub const INSTRUCTIONS: &str = "You are a helpful AI assistant that answers questions based on the provided context documents.

Instructions:
- Use only the information provided in the context documents to answer the question
- If the context doesn't contain enough information to answer the question, say clearly that the information was not found
- Cite your sources by referencing the document numbers (for example, Document 1)
- Be concise but comprehensive in your responses
- If the documents contain conflicting information, point this out";

const HISTORY_HEADER: &str = "Conversation History:";
const CONTEXT_HEADER: &str = "Context Documents:";

/// Builds the generation prompt from retrieved chunks and optional history.
///
/// The output is a pure function of its inputs.
#[derive(Debug, Clone, Default)]
pub struct ContextAssembler;

impl ContextAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Assemble the full prompt.
    ///
    /// Chunks with identical text are included once (first occurrence wins)
    /// and the remaining documents are numbered contiguously from 1.
    pub fn build_prompt(
        &self,
        query: &str,
        chunks: &[RetrievedChunk],
        history: Option<&ConversationState>,
    ) -> String {
        let mut prompt = String::from(INSTRUCTIONS);
        prompt.push_str("\n\n");

        if let Some(history) = history.filter(|h| !h.is_empty()) {
            prompt.push_str(HISTORY_HEADER);
            prompt.push('\n');
            for turn in history.turns() {
                prompt.push_str(&format!("{}: {}\n", turn.role.label(), turn.content));
            }
            prompt.push('\n');
        }

        prompt.push_str(CONTEXT_HEADER);
        prompt.push('\n');
        prompt.push_str(&format_documents(chunks));
        prompt.push_str("\n\n");

        prompt.push_str(&format!("Question: {}\n\nAnswer:", query));
        prompt
    }
}

/// Format chunks as numbered documents separated by blank lines.
pub fn format_documents(chunks: &[RetrievedChunk]) -> String {
    distinct_chunks(chunks)
        .enumerate()
        .map(|(i, c)| {
            let page = c
                .chunk
                .metadata
                .page_number
                .map(|p| p.to_string())
                .unwrap_or_else(|| "N/A".to_string());
            format!(
                "Document {} (Source: {}, Page: {}):\n{}",
                i + 1,
                c.chunk.metadata.source_name,
                page,
                c.chunk.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::ConversationTurn;
    use crate::test_support::chunk;

    fn retrieved(file: &str, index: usize, text: &str, page: Option<u32>, score: f32) -> RetrievedChunk {
        RetrievedChunk {
            chunk: chunk(file, index, text, page),
            score,
        }
    }

    #[test]
    fn test_prompt_layout() {
        let chunks = vec![
            retrieved("docs/Dubai.pdf", 0, "Dubai requires a visa on arrival.", Some(4), 0.9),
            retrieved("notes.txt", 0, "Bring sunscreen.", None, 0.5),
        ];

        let prompt = ContextAssembler::new().build_prompt("Do I need a visa?", &chunks, None);

        let expected = format!(
            "{}\n\nContext Documents:\n\
             Document 1 (Source: Dubai.pdf, Page: 4):\nDubai requires a visa on arrival.\n\n\
             Document 2 (Source: notes.txt, Page: N/A):\nBring sunscreen.\n\n\
             Question: Do I need a visa?\n\nAnswer:",
            INSTRUCTIONS
        );
        assert_eq!(prompt, expected);
        assert!(!prompt.contains(HISTORY_HEADER));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let chunks = vec![retrieved("a.pdf", 0, "alpha", Some(1), 0.7)];
        let assembler = ContextAssembler::new();
        assert_eq!(
            assembler.build_prompt("q", &chunks, None),
            assembler.build_prompt("q", &chunks, None)
        );
    }

    #[test]
    fn test_history_block() {
        let mut history = ConversationState::new(10);
        history.push(ConversationTurn::user("What is the capital of France?"));
        history.push(ConversationTurn::assistant("Paris."));

        let chunks = vec![retrieved("a.pdf", 0, "alpha", Some(1), 0.7)];
        let prompt = ContextAssembler::new().build_prompt("And Italy?", &chunks, Some(&history));

        assert!(prompt.contains(
            "Conversation History:\nUser: What is the capital of France?\nAssistant: Paris.\n\nContext Documents:\n"
        ));

        // An empty history adds nothing.
        let empty = ConversationState::new(10);
        let without = ContextAssembler::new().build_prompt("And Italy?", &chunks, Some(&empty));
        assert!(!without.contains(HISTORY_HEADER));
    }

    #[test]
    fn test_duplicate_chunks_collapse() {
        let chunks = vec![
            retrieved("a.pdf", 0, "same words", Some(1), 0.9),
            retrieved("b.pdf", 3, "same words", Some(2), 0.9),
            retrieved("c.pdf", 1, "different words", Some(5), 0.4),
        ];

        let documents = format_documents(&chunks);
        assert_eq!(documents.matches("same words").count(), 1);
        assert!(documents.contains("Document 1 (Source: a.pdf, Page: 1)"));
        assert!(documents.contains("Document 2 (Source: c.pdf, Page: 5)"));
        assert!(!documents.contains("Document 3"));
    }
}
