use anyhow::Result;
use clap::Parser;
use pdf_qa::document::{ChunkStrategy, DocumentParser};
use pdf_qa::services::{EmbeddingService, LlmService};
use pdf_qa::utils::logger::init_logger;
use pdf_qa::{PipelineDriver, Settings};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "pdf-qa",
    version,
    about = "Answer one question across a folder of PDF documents, with page citations"
)]
struct Args {
    /// Settings file without extension (TOML/YAML/JSON)
    #[arg(long, default_value = "config/settings")]
    config: String,

    /// Directory scanned (non-recursively) for documents
    #[arg(long)]
    source_dir: Option<PathBuf>,

    /// Question asked against every chunk
    #[arg(long)]
    question: Option<String>,

    /// Chunking strategy: whole-document, per-page or fixed-size
    #[arg(long)]
    chunking: Option<ChunkStrategy>,

    /// Maximum characters per chunk (fixed-size strategy)
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Minimum answer/context cosine similarity (exclusive)
    #[arg(long, allow_negative_numbers = true)]
    threshold: Option<f32>,

    /// Number of chunks processed concurrently
    #[arg(long)]
    concurrency: Option<usize>,
}

impl Args {
    fn apply(self, settings: &mut Settings) {
        if let Some(dir) = self.source_dir {
            settings.source.dir = dir;
        }
        if let Some(question) = self.question {
            settings.question.text = question;
        }
        if let Some(strategy) = self.chunking {
            settings.chunking.strategy = strategy;
        }
        if let Some(size) = self.chunk_size {
            settings.chunking.size = size;
        }
        if let Some(threshold) = self.threshold {
            settings.relevance.threshold = threshold;
        }
        if let Some(concurrency) = self.concurrency {
            settings.worker.concurrency = concurrency;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_logger()?;

    info!("🚀 Starting pdf-qa...");

    let mut settings = Settings::load_from(&args.config)?;
    args.apply(&mut settings);
    settings.validate()?;
    info!(
        "✅ Configuration loaded: source={:?}, strategy={:?}, chunk_size={}, threshold={}, concurrency={}",
        settings.source.dir,
        settings.chunking.strategy,
        settings.chunking.size,
        settings.relevance.threshold,
        settings.worker.concurrency
    );

    if settings.llm.api_key.is_none() {
        warn!("No completion API key configured (APP__LLM__API_KEY or OPENAI_API_KEY)");
    }

    // Service handles are created once and shared by every chunk task
    let llm = Arc::new(LlmService::new(settings.llm.clone())?);
    let embedder = Arc::new(EmbeddingService::new(settings.embedding.clone())?);
    let extractor = Arc::new(DocumentParser::new());

    let driver = PipelineDriver::new(settings, extractor, llm, embedder);
    let report = driver.run().await?;

    driver.metrics().log_summary();

    println!("{}", report.comprehensive_answer);

    Ok(())
}
