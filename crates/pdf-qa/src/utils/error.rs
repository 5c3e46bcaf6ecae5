use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Extraction failed for {file}: {reason}")]
    Extraction { file: String, reason: String },

    #[error("Answer generation failed: {0}")]
    AnswerGeneration(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Service responded {status}: {body}")]
    Service { status: u16, body: String },

    #[error("No input: {0}")]
    NoInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl PipelineError {
    pub fn extraction(file: impl Into<String>, reason: impl ToString) -> Self {
        PipelineError::Extraction {
            file: file.into(),
            reason: reason.to_string(),
        }
    }

    /// Failures that a later attempt of the same request may not hit again.
    pub fn is_transient(&self) -> bool {
        match self {
            PipelineError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            PipelineError::Service { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
