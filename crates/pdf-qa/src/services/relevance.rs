use crate::services::embedding_service::EmbeddingProvider;
use crate::utils::error::PipelineError;
use crate::utils::similarity::cosine_similarity;
use std::sync::Arc;
use tracing::debug;

/// Keeps an answer only when it is semantically close to its source text.
#[derive(Clone)]
pub struct RelevanceFilter {
    embedder: Arc<dyn EmbeddingProvider>,
    threshold: f32,
}

impl RelevanceFilter {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, threshold: f32) -> Self {
        Self { embedder, threshold }
    }

    /// Cosine similarity between the answer and its context embeddings.
    pub async fn similarity(&self, answer: &str, context: &str) -> Result<f32, PipelineError> {
        let context_embedding = self.embedder.embed(context).await?;
        let answer_embedding = self.embedder.embed(answer).await?;

        let score = cosine_similarity(&context_embedding, &answer_embedding)?;
        debug!("Answer/context similarity {:.4} (threshold {})", score, self.threshold);

        Ok(score)
    }

    /// Strictly above the threshold
    pub fn passes(&self, score: f32) -> bool {
        score > self.threshold
    }
}
