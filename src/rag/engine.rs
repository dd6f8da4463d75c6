//! The ask cycle: retrieve, assemble, generate, format.

use super::{
    with_timeout, ContextAssembler, ConversationState, ConversationTurn, RagResult, Retrieval,
    ResponseFormatter, Retriever,
};
use crate::config::Settings;
use crate::embedding::Embedder;
use crate::error::{DocragError, Result};
use crate::generation::Generator;
use crate::vector_store::VectorStore;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Tunables for one [`AnswerEngine`].
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Chunks retrieved when the caller does not ask for a specific number.
    pub top_k: usize,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Limit for each collaborator call.
    pub timeout_seconds: u64,
}

impl EngineOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            top_k: settings.retrieval.top_k,
            temperature: settings.generation.temperature,
            max_tokens: settings.generation.max_tokens,
            timeout_seconds: settings.service.timeout_seconds,
        }
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Answers questions from the indexed documents.
///
/// Collaborator failures never escape [`AnswerEngine::ask`]; they degrade into
/// a result with `context_used == false`. Only configuration errors propagate.
pub struct AnswerEngine {
    vector_store: Arc<dyn VectorStore>,
    retriever: Retriever,
    generator: Arc<dyn Generator>,
    assembler: ContextAssembler,
    formatter: ResponseFormatter,
    options: EngineOptions,
}

impl AnswerEngine {
    /// Create a new answer engine.
    pub fn new(
        vector_store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        options: EngineOptions,
    ) -> Self {
        let retriever =
            Retriever::new(vector_store.clone(), embedder).with_timeout(options.timeout_seconds);

        Self {
            vector_store,
            retriever,
            generator,
            assembler: ContextAssembler::new(),
            formatter: ResponseFormatter::new(),
            options,
        }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Answer `query`, optionally continuing a conversation.
    ///
    /// When `history` is given, prior turns are included in the prompt and the
    /// new question and answer are appended after a successful answer.
    #[instrument(skip(self, history), fields(with_history = history.is_some()))]
    pub async fn ask(
        &self,
        query: &str,
        history: Option<&mut ConversationState>,
        top_k: Option<usize>,
    ) -> Result<RagResult> {
        let k = top_k.unwrap_or(self.options.top_k);
        if k == 0 {
            return Err(DocragError::Config("top_k must be at least 1".to_string()));
        }

        info!("Processing question: {}", query);

        match with_timeout(self.options.timeout_seconds, self.vector_store.count()).await {
            Ok(0) => {
                info!("Collection is empty, skipping generation");
                return Ok(RagResult::no_information(query));
            }
            Ok(count) => debug!("Collection holds {} chunks", count),
            Err(e) => {
                warn!("Could not count stored chunks: {}", e);
                return Ok(RagResult::no_information(query));
            }
        }

        let chunks = match self.retriever.search(query, k).await {
            Ok(Retrieval::Found(chunks)) => chunks,
            Ok(Retrieval::Empty) => return Ok(RagResult::no_information(query)),
            Err(e) if e.is_config() => return Err(e),
            Err(e) => {
                warn!("Retrieval failed, answering without context: {}", e);
                return Ok(RagResult::no_information(query));
            }
        };

        for (i, c) in chunks.iter().enumerate() {
            debug!(
                "Context {}: {} (page {:?}, score {:.3})",
                i + 1,
                c.chunk.metadata.source_name,
                c.chunk.metadata.page_number,
                c.score
            );
        }

        let prompt = self
            .assembler
            .build_prompt(query, &chunks, history.as_deref());

        let generated = with_timeout(
            self.options.timeout_seconds,
            self.generator
                .generate(&prompt, self.options.temperature, self.options.max_tokens),
        )
        .await;

        let answer = match generated {
            Ok(answer) if !answer.trim().is_empty() => answer,
            Ok(_) => {
                warn!("Generator returned an empty answer");
                return Ok(RagResult::generation_failed(query, "empty response from model"));
            }
            Err(e) => {
                warn!("Generation failed: {}", e);
                return Ok(RagResult::generation_failed(query, &e.to_string()));
            }
        };

        let result = self.formatter.format(query, &answer, &chunks);

        if let Some(history) = history {
            history.push(ConversationTurn::user(query));
            history.push(ConversationTurn::assistant(answer));
        }

        info!("Answered with {} sources", result.num_sources());
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::NO_INFORMATION_ANSWER;
    use crate::test_support::{
        collection_config, stored_chunk, FailingEmbedder, FailingGenerator, KeywordEmbedder,
        RecordingGenerator, StalledGenerator,
    };
    use crate::vector_store::MemoryVectorStore;

    fn options() -> EngineOptions {
        EngineOptions {
            top_k: 3,
            temperature: 0.6,
            max_tokens: 500,
            timeout_seconds: 1,
        }
    }

    async fn store_with(texts: &[(&str, &str)]) -> Arc<MemoryVectorStore> {
        let store = Arc::new(MemoryVectorStore::new(collection_config(5)));
        let chunks: Vec<_> = texts
            .iter()
            .map(|(file, text)| stored_chunk(file, 0, text, Some(1), KeywordEmbedder::vector(text)))
            .collect();
        store.upsert(&chunks).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_empty_store_never_calls_generator() {
        let store = Arc::new(MemoryVectorStore::new(collection_config(5)));
        let generator = Arc::new(RecordingGenerator::new("should not be used"));
        let engine = AnswerEngine::new(store, Arc::new(KeywordEmbedder::default()), generator.clone(), options());

        for query in ["What is the capital of France?", "", "anything at all"] {
            let result = engine.ask(query, None, None).await.unwrap();
            assert_eq!(result.answer(), NO_INFORMATION_ANSWER);
            assert!(!result.context_used());
            assert!(result.sources().is_empty());
        }
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_grounded_answer_cites_seeded_document() {
        let store = store_with(&[("docs/france.txt", "Paris is the capital of France.")]).await;
        let generator = Arc::new(RecordingGenerator::new("Paris [Document 1]."));
        let engine = AnswerEngine::new(store, Arc::new(KeywordEmbedder::default()), generator.clone(), options());

        let result = engine
            .ask("What is the capital of France?", None, Some(1))
            .await
            .unwrap();

        assert!(result.context_used());
        assert_eq!(result.num_sources(), 1);
        assert_eq!(result.sources()[0].title, "france.txt");
        assert_eq!(result.answer(), "Paris [Document 1].");

        let prompt = generator.last_prompt().unwrap();
        assert!(prompt.contains("Document 1 (Source: france.txt, Page: 1):\nParis is the capital of France."));
        assert!(prompt.ends_with("Question: What is the capital of France?\n\nAnswer:"));
    }

    #[tokio::test]
    async fn test_sources_follow_prompt_numbering() {
        let store = store_with(&[
            ("a.pdf", "Paris visa rules."),
            ("b.pdf", "Paris visa rules."),
            ("c.pdf", "Paris has many museums."),
        ])
        .await;
        let generator = Arc::new(RecordingGenerator::new("See Document 2."));
        let engine = AnswerEngine::new(store, Arc::new(KeywordEmbedder::default()), generator.clone(), options());

        let result = engine.ask("Paris visa?", None, Some(3)).await.unwrap();
        let prompt = generator.last_prompt().unwrap();

        assert_eq!(result.num_sources(), 2);
        for (i, source) in result.sources().iter().enumerate() {
            let line = format!("Document {} (Source: {}, Page: 1):", i + 1, source.title);
            assert!(prompt.contains(&line), "missing {:?}", line);
        }
        assert_eq!(result.sources()[1].title, "c.pdf");
        assert!(!prompt.contains("Document 3"));
    }

    #[tokio::test]
    async fn test_history_flows_into_next_prompt() {
        let store = store_with(&[("math.txt", "Basic arithmetic facts.")]).await;
        let generator = Arc::new(RecordingGenerator::new("4"));
        let engine = AnswerEngine::new(store, Arc::new(KeywordEmbedder::default()), generator.clone(), options());
        let mut history = ConversationState::new(20);

        engine.ask("What is 2+2?", Some(&mut history), None).await.unwrap();
        assert_eq!(history.len(), 2);

        engine.ask("And times 3?", Some(&mut history), None).await.unwrap();
        let prompt = generator.last_prompt().unwrap();
        assert!(prompt.contains("User: What is 2+2?\nAssistant: 4\n"));
        assert_eq!(history.len(), 4);
    }

    #[tokio::test]
    async fn test_retrieval_failure_degrades() {
        let store = store_with(&[("a.txt", "Paris")]).await;
        let generator = Arc::new(RecordingGenerator::new("unused"));
        let engine = AnswerEngine::new(store, Arc::new(FailingEmbedder), generator.clone(), options());

        let result = engine.ask("Paris?", None, None).await.unwrap();
        assert_eq!(result.answer(), NO_INFORMATION_ANSWER);
        assert!(!result.context_used());
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_generation_failure_leaves_history_untouched() {
        let store = store_with(&[("a.txt", "Paris")]).await;
        let engine = AnswerEngine::new(
            store,
            Arc::new(KeywordEmbedder::default()),
            Arc::new(FailingGenerator),
            options(),
        );
        let mut history = ConversationState::new(20);

        let result = engine.ask("Paris?", Some(&mut history), None).await.unwrap();
        assert!(!result.context_used());
        assert_eq!(result.num_sources(), 0);
        assert!(result.answer().starts_with("Error generating response"));
        assert!(history.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_generation_timeout_degrades() {
        let store = store_with(&[("a.txt", "Paris")]).await;
        let engine = AnswerEngine::new(
            store,
            Arc::new(KeywordEmbedder::default()),
            Arc::new(StalledGenerator),
            options(),
        );

        let result = engine.ask("Paris?", None, None).await.unwrap();
        assert!(!result.context_used());
        assert!(result.answer().contains("timed out"));
    }

    #[tokio::test]
    async fn test_zero_top_k_is_rejected() {
        let store = store_with(&[("a.txt", "Paris")]).await;
        let engine = AnswerEngine::new(
            store,
            Arc::new(KeywordEmbedder::default()),
            Arc::new(RecordingGenerator::new("unused")),
            options(),
        );
        assert!(engine.ask("Paris?", None, Some(0)).await.unwrap_err().is_config());
    }

    #[tokio::test]
    async fn test_result_invariant_holds_on_every_path() {
        let store = store_with(&[("a.txt", "Paris"), ("b.txt", "Rome")]).await;
        let engines = [
            AnswerEngine::new(store.clone(), Arc::new(KeywordEmbedder::default()), Arc::new(RecordingGenerator::new("ok")), options()),
            AnswerEngine::new(store.clone(), Arc::new(FailingEmbedder), Arc::new(RecordingGenerator::new("ok")), options()),
            AnswerEngine::new(store, Arc::new(KeywordEmbedder::default()), Arc::new(FailingGenerator), options()),
        ];

        for engine in &engines {
            for k in [1, 2, 5] {
                let result = engine.ask("Paris or Rome?", None, Some(k)).await.unwrap();
                assert_eq!(result.context_used(), result.num_sources() > 0);
                assert_eq!(result.num_sources(), result.sources().len());
            }
        }
    }
}
