use crate::services::llm_service::{CompletionProvider, CompletionRequest};
use crate::utils::error::PipelineError;
use std::sync::Arc;
use tracing::{debug, info};

/// Returned when nothing survived filtering; no model call is made.
pub const NO_ANSWERS_SENTINEL: &str = "no answers available";

/// Synthesizes one answer out of all retained, cited answers.
#[derive(Clone)]
pub struct Aggregator {
    llm: Arc<dyn CompletionProvider>,
    instruction: String,
}

impl Aggregator {
    pub fn new(llm: Arc<dyn CompletionProvider>, instruction: String) -> Self {
        Self { llm, instruction }
    }

    /// Combine rendered answers (`"{answer} (page N from file F)"`) in order.
    pub async fn aggregate(&self, answers: &[String]) -> Result<String, PipelineError> {
        if answers.is_empty() {
            info!("No retained answers, skipping aggregation call");
            return Ok(NO_ANSWERS_SENTINEL.to_string());
        }

        let combined_text = answers.join(" ");
        debug!(
            "Aggregating {} answers ({} chars)",
            answers.len(),
            combined_text.chars().count()
        );

        let completion = self
            .llm
            .complete(CompletionRequest {
                instruction: self.instruction.clone(),
                context: combined_text,
                answer_length_hint: None,
            })
            .await?;

        // Rationale is not part of the final output
        Ok(completion.answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::llm_service::{Completion, MockCompletionProvider};

    #[tokio::test]
    async fn empty_input_short_circuits() {
        let mut llm = MockCompletionProvider::new();
        llm.expect_complete().never();

        let aggregator = Aggregator::new(Arc::new(llm), "combine".to_string());
        assert_eq!(aggregator.aggregate(&[]).await.unwrap(), "no answers available");
    }

    #[tokio::test]
    async fn joins_answers_and_returns_only_the_answer() {
        let mut llm = MockCompletionProvider::new();
        llm.expect_complete()
            .withf(|req| {
                req.instruction == "combine"
                    && req.context
                        == "first (page 1 from file A.pdf) second (page 2 from file B.pdf)"
            })
            .times(1)
            .returning(|_| {
                Ok(Completion {
                    rationale: "discarded".to_string(),
                    answer: "Comprehensive answer".to_string(),
                })
            });

        let aggregator = Aggregator::new(Arc::new(llm), "combine".to_string());
        let answer = aggregator
            .aggregate(&[
                "first (page 1 from file A.pdf)".to_string(),
                "second (page 2 from file B.pdf)".to_string(),
            ])
            .await
            .unwrap();

        assert_eq!(answer, "Comprehensive answer");
    }

    #[tokio::test]
    async fn failure_is_propagated() {
        let mut llm = MockCompletionProvider::new();
        llm.expect_complete()
            .returning(|_| Err(PipelineError::AnswerGeneration("timeout".to_string())));

        let aggregator = Aggregator::new(Arc::new(llm), "combine".to_string());
        assert!(aggregator.aggregate(&["x".to_string()]).await.is_err());
    }
}
