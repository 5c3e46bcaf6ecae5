use crate::models::{AnswerRecord, Chunk};
use crate::services::llm_service::{CompletionProvider, CompletionRequest};
use crate::utils::error::PipelineError;
use std::sync::Arc;
use tracing::debug;

/// Asks the question against a single chunk.
#[derive(Clone)]
pub struct ChunkAnswerer {
    llm: Arc<dyn CompletionProvider>,
    answer_length_hint: Option<String>,
}

impl ChunkAnswerer {
    pub fn new(llm: Arc<dyn CompletionProvider>, answer_length_hint: Option<String>) -> Self {
        Self {
            llm,
            answer_length_hint,
        }
    }

    pub async fn answer(&self, question: &str, chunk: &Chunk) -> Result<AnswerRecord, PipelineError> {
        debug!(
            "Asking question on page {} of {} ({} chars)",
            chunk.page_number,
            chunk.source_filename,
            chunk.text.chars().count()
        );

        let completion = self
            .llm
            .complete(CompletionRequest {
                instruction: question.to_string(),
                context: chunk.text.clone(),
                answer_length_hint: self.answer_length_hint.clone(),
            })
            .await?;

        Ok(AnswerRecord {
            key: chunk.key,
            rationale: completion.rationale,
            answer: completion.answer,
            page_number: chunk.page_number,
            source_filename: chunk.source_filename.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChunkKey;
    use crate::services::llm_service::{Completion, MockCompletionProvider};

    fn chunk() -> Chunk {
        Chunk {
            key: ChunkKey {
                document_index: 2,
                page_number: 7,
                chunk_index: 1,
            },
            text: "Save the Children runs climate-resilience projects in Kenya.".to_string(),
            page_number: 7,
            source_filename: "A.pdf".to_string(),
        }
    }

    #[tokio::test]
    async fn record_carries_chunk_provenance() {
        let mut llm = MockCompletionProvider::new();
        llm.expect_complete()
            .withf(|req| {
                req.instruction == "How?"
                    && req.context.contains("Kenya")
                    && req.answer_length_hint.as_deref() == Some("short")
            })
            .times(1)
            .returning(|_| {
                Ok(Completion {
                    rationale: "the page names Kenya".to_string(),
                    answer: "Kenya climate-resilience project".to_string(),
                })
            });

        let answerer = ChunkAnswerer::new(Arc::new(llm), Some("short".to_string()));
        let record = answerer.answer("How?", &chunk()).await.unwrap();

        assert_eq!(record.answer, "Kenya climate-resilience project");
        assert_eq!(record.rationale, "the page names Kenya");
        assert_eq!(record.page_number, 7);
        assert_eq!(record.source_filename, "A.pdf");
        assert_eq!(record.key, chunk().key);
    }

    #[tokio::test]
    async fn completion_failure_is_propagated() {
        let mut llm = MockCompletionProvider::new();
        llm.expect_complete()
            .returning(|_| Err(PipelineError::AnswerGeneration("rate limited".to_string())));

        let answerer = ChunkAnswerer::new(Arc::new(llm), None);
        let result = answerer.answer("How?", &chunk()).await;

        assert!(matches!(result, Err(PipelineError::AnswerGeneration(_))));
    }
}
