pub mod settings;

pub use settings::{
    ChunkingConfig, EmbeddingConfig, LlmConfig, QuestionConfig, RelevanceConfig, Settings,
    SourceConfig, WorkerConfig,
};
