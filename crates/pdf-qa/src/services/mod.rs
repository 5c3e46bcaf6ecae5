pub mod aggregator;
pub mod answerer;
pub mod embedding_service;
pub mod llm_service;
pub mod relevance;

pub use aggregator::{Aggregator, NO_ANSWERS_SENTINEL};
pub use answerer::ChunkAnswerer;
pub use embedding_service::{EmbeddingProvider, EmbeddingService};
pub use llm_service::{Completion, CompletionProvider, CompletionRequest, LlmService};
pub use relevance::RelevanceFilter;
