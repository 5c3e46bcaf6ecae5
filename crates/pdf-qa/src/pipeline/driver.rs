use crate::config::Settings;
use crate::document::{DocumentLoader, PageExtractor, TextChunker};
use crate::models::{display_name, Chunk, RetainedAnswer};
use crate::services::{
    Aggregator, ChunkAnswerer, CompletionProvider, EmbeddingProvider, RelevanceFilter,
};
use crate::utils::error::PipelineError;
use crate::utils::metrics::{Metrics, Timer};
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Outcome of one run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Retained answers in discovery order
    pub retained: Vec<RetainedAnswer>,
    /// Exactly what was handed to the aggregator
    pub aggregation_input: Vec<String>,
    pub comprehensive_answer: String,
}

/// Drives extraction, chunking, answering, filtering and aggregation for
/// one question over every document in the source directory.
pub struct PipelineDriver {
    settings: Settings,
    extractor: Arc<dyn PageExtractor>,
    chunker: TextChunker,
    answerer: ChunkAnswerer,
    filter: RelevanceFilter,
    aggregator: Aggregator,
    metrics: Metrics,
}

impl PipelineDriver {
    pub fn new(
        settings: Settings,
        extractor: Arc<dyn PageExtractor>,
        llm: Arc<dyn CompletionProvider>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        let chunker = TextChunker::new(settings.chunking.size, settings.chunking.strategy);

        let hint = Some(settings.question.answer_length_hint.clone()).filter(|h| !h.trim().is_empty());
        let answerer = ChunkAnswerer::new(llm.clone(), hint);
        let filter = RelevanceFilter::new(embedder, settings.relevance.threshold);
        let aggregator = Aggregator::new(llm, settings.question.aggregation_instruction.clone());

        Self {
            settings,
            extractor,
            chunker,
            answerer,
            filter,
            aggregator,
            metrics: Metrics::new(),
        }
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn discover_documents(&self) -> Result<Vec<PathBuf>, PipelineError> {
        DocumentLoader::discover(&self.settings.source.dir, &self.settings.source.extensions)
    }

    /// Full run: collect retained answers, then aggregate them once.
    pub async fn run(&self) -> Result<PipelineReport, PipelineError> {
        let timer = Timer::new();

        let retained = self.collect_retained().await?;
        let aggregation_input: Vec<String> = retained.iter().map(RetainedAnswer::render).collect();

        info!("🧠 Evaluating and combining {} answers...", aggregation_input.len());
        let comprehensive_answer = self.aggregator.aggregate(&aggregation_input).await?;

        self.metrics.add_processing_time(timer.elapsed());

        Ok(PipelineReport {
            retained,
            aggregation_input,
            comprehensive_answer,
        })
    }

    /// Answer and filter every chunk of every document.
    ///
    /// Only an unreadable source directory is an error here; failures of a
    /// single document or chunk are logged and skipped.
    pub async fn collect_retained(&self) -> Result<Vec<RetainedAnswer>, PipelineError> {
        let documents = self.discover_documents()?;

        if documents.is_empty() {
            warn!(
                "{}",
                PipelineError::NoInput(format!(
                    "no documents with extensions {:?} in {:?}",
                    self.settings.source.extensions, self.settings.source.dir
                ))
            );
            return Ok(Vec::new());
        }

        info!("📂 Iterating over {} documents...", documents.len());

        let mut retained = Vec::new();

        for (document_index, path) in documents.iter().enumerate() {
            let chunks = match self.load_chunks(document_index, path).await {
                Some(chunks) => chunks,
                None => continue,
            };

            retained.extend(self.process_chunks(chunks).await);
        }

        // Completion order under concurrency is arbitrary
        retained.sort_by_key(|r| r.record.key);

        if retained.is_empty() {
            warn!(
                "{}",
                PipelineError::NoInput("every chunk was filtered out or failed".to_string())
            );
        }

        Ok(retained)
    }

    /// Extract and chunk one document. The extracted pages are dropped here,
    /// before the next document is opened.
    async fn load_chunks(&self, document_index: usize, path: &Path) -> Option<Vec<Chunk>> {
        info!("📖 Extracting text from {}...", display_name(path));

        match self.extractor.extract(path).await {
            Ok(document) => {
                self.metrics.increment_documents_processed();
                let chunks = self.chunker.chunk_document(document_index, &document);
                self.metrics.add_chunks_created(chunks.len() as u64);

                if chunks.is_empty() {
                    warn!("{} has no extractable text", document.file_name);
                }
                Some(chunks)
            }
            Err(e) => {
                self.metrics.increment_documents_failed();
                error!("❌ Skipping document: {}", e);
                None
            }
        }
    }

    async fn process_chunks(&self, chunks: Vec<Chunk>) -> Vec<RetainedAnswer> {
        let concurrency = self.settings.worker.concurrency.max(1);

        stream::iter(chunks)
            .map(|chunk| self.process_chunk(chunk))
            .buffer_unordered(concurrency)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    /// Answer one chunk and gate it on similarity to that same chunk's text.
    async fn process_chunk(&self, chunk: Chunk) -> Option<RetainedAnswer> {
        let question = &self.settings.question.text;

        let record = match self.answerer.answer(question, &chunk).await {
            Ok(record) => {
                self.metrics.increment_answers_generated();
                record
            }
            Err(e) => {
                self.metrics.increment_answer_failures();
                error!(
                    "❌ No answer for page {} of {}: {}",
                    chunk.page_number, chunk.source_filename, e
                );
                return None;
            }
        };

        let similarity = match self.filter.similarity(&record.answer, &chunk.text).await {
            Ok(score) => score,
            Err(e) => {
                // Unverified answers are not kept
                self.metrics.increment_embedding_failures();
                self.metrics.increment_answers_rejected();
                warn!(
                    "Relevance check failed for page {} of {}, dropping answer: {}",
                    chunk.page_number, chunk.source_filename, e
                );
                return None;
            }
        };

        if !self.filter.passes(similarity) {
            self.metrics.increment_answers_rejected();
            info!(
                "No related information found on page {} of {} (similarity {:.3})",
                chunk.page_number, chunk.source_filename, similarity
            );
            return None;
        }

        let retained = RetainedAnswer { record, similarity };
        self.metrics.increment_answers_retained();
        info!("✅ Retained answer {}", retained.citation());
        debug!("Answer: {}", retained.record.answer);

        Some(retained)
    }
}
