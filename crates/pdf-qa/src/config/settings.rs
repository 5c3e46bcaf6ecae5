use crate::document::ChunkStrategy;
use crate::utils::error::PipelineError;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_QUESTION: &str = "How save the children align to climate projects?";

pub const DEFAULT_AGGREGATION_INSTRUCTION: &str = "You are not creative. You are an analytical NGO auditor. \
Analyze all the answers from all pages and files, select the strongest answers from each page and file \
related to the question, and combine all answers into one detailed answer with examples, actions, \
strategies, initiatives and project names. Always cite the page number and file name! \
Be extremely detailed but avoid being verbose.";

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct Settings {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub question: QuestionConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub relevance: RelevanceConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SourceConfig {
    pub dir: PathBuf,
    /// Lowercase file extensions treated as documents.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct QuestionConfig {
    pub text: String,
    #[serde(default = "default_aggregation_instruction")]
    pub aggregation_instruction: String,
    /// Hint passed to the model about the expected answer length.
    #[serde(default = "default_answer_length_hint")]
    pub answer_length_hint: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ChunkingConfig {
    #[serde(default)]
    pub strategy: ChunkStrategy,
    #[serde(default = "default_chunk_size")]
    pub size: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct RelevanceConfig {
    /// Answers are kept when cosine similarity is strictly above this value.
    /// 0.5 keeps only answers close to their chunk; 0.0 keeps almost everything.
    pub threshold: f32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
    pub max_tokens: usize,
    pub temperature: f32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub model: String,  // all-MiniLM-L6-v2 = 384 dims
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
    /// Also send the text as `content` (older llama.cpp servers)
    pub llama_cpp_content: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct WorkerConfig {
    /// Max chunks in flight. 1 keeps the run strictly sequential.
    pub concurrency: usize,
}

fn default_extensions() -> Vec<String> {
    vec!["pdf".to_string()]
}

fn default_aggregation_instruction() -> String {
    DEFAULT_AGGREGATION_INSTRUCTION.to_string()
}

fn default_answer_length_hint() -> String {
    "a detailed answer citing the page number and file name".to_string()
}

fn default_chunk_size() -> usize {
    10_000
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
            extensions: default_extensions(),
        }
    }
}

impl Default for QuestionConfig {
    fn default() -> Self {
        Self {
            text: DEFAULT_QUESTION.to_string(),
            aggregation_instruction: default_aggregation_instruction(),
            answer_length_hint: default_answer_length_hint(),
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            strategy: ChunkStrategy::default(),
            size: default_chunk_size(),
        }
    }
}

impl Default for RelevanceConfig {
    fn default() -> Self {
        Self { threshold: 0.5 }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            timeout_seconds: 120,
            max_tokens: 4096,
            temperature: 0.0,
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8081".to_string(),
            model: "all-MiniLM-L6-v2".to_string(),
            api_key: None,
            timeout_seconds: 60,
            llama_cpp_content: false,
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { concurrency: 1 }
    }
}

impl Settings {
    /// Load settings from `<config_file>.{toml,yaml,json}` (optional) and `APP__*` env vars.
    pub fn load_from(config_file: &str) -> Result<Self, PipelineError> {
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .add_source(File::with_name(config_file).required(false))
            // Example: APP__LLM__API_KEY=sk-...
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("source.extensions")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| PipelineError::Config(e.to_string()))?;

        let mut settings: Settings = config
            .try_deserialize()
            .map_err(|e| PipelineError::Config(e.to_string()))?;

        // Fall back to the conventional variable for the hosted completion API
        if settings.llm.api_key.is_none() {
            settings.llm.api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty());
        }
        if settings.embedding.api_key.is_none() {
            settings.embedding.api_key = settings.llm.api_key.clone();
        }

        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.question.text.trim().is_empty() {
            return Err(PipelineError::Config("question text must not be empty".to_string()));
        }

        if self.chunking.size == 0 {
            return Err(PipelineError::Config("chunking.size must be positive".to_string()));
        }

        if !self.relevance.threshold.is_finite() {
            return Err(PipelineError::Config(format!(
                "relevance.threshold must be a finite number, got {}",
                self.relevance.threshold
            )));
        }

        if self.worker.concurrency == 0 {
            return Err(PipelineError::Config("worker.concurrency must be at least 1".to_string()));
        }

        if self.source.extensions.is_empty() {
            return Err(PipelineError::Config(
                "source.extensions must name at least one document type".to_string(),
            ));
        }

        if !self.source.dir.is_dir() {
            return Err(PipelineError::Config(format!(
                "Source directory not found: {:?}",
                self.source.dir
            )));
        }

        Ok(())
    }
}
