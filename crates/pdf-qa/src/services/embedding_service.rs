use crate::config::EmbeddingConfig;
use crate::utils::error::PipelineError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Trait for embedding service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, PipelineError>;
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>, // llama.cpp field name
}

/// Client for an OpenAI-compatible `/v1/embeddings` endpoint.
///
/// Also understands the llama.cpp response shapes so a local llama-server
/// running a sentence-embedding model works unchanged.
#[derive(Clone)]
pub struct EmbeddingService {
    client: Client,
    config: EmbeddingConfig,
}

impl EmbeddingService {
    pub fn new(config: EmbeddingConfig) -> Result<Self, PipelineError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self { client, config })
    }

    async fn embed_internal(&self, text: &str) -> Result<Vec<f32>, PipelineError> {
        debug!("Generating embedding for {} chars", text.len());

        let request = EmbeddingRequest {
            model: &self.config.model,
            input: text,
            content: self.config.llama_cpp_content.then_some(text),
        };

        let url = format!("{}/v1/embeddings", self.config.base_url.trim_end_matches('/'));
        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Service { status, body });
        }

        let json_value: serde_json::Value = response.json().await?;

        parse_embedding(&json_value)
    }
}

#[async_trait]
impl EmbeddingProvider for EmbeddingService {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, PipelineError> {
        self.embed_internal(text).await.map_err(|e| match e {
            PipelineError::Embedding(_) => e,
            other => PipelineError::Embedding(other.to_string()),
        })
    }
}

fn as_vector(values: &[serde_json::Value]) -> Vec<f32> {
    values
        .iter()
        .filter_map(|v| v.as_f64().map(|f| f as f32))
        .collect()
}

/// Accepts `{"data":[{"embedding":[..]}]}`, `{"embedding":[..]}`,
/// `[{"embedding":[..]}]` (optionally nested `[[..]]`) and a bare `[..]`.
pub fn parse_embedding(json_value: &serde_json::Value) -> Result<Vec<f32>, PipelineError> {
    let unrecognized =
        || PipelineError::Embedding(format!("Unrecognized embedding response format: {}", json_value));

    let field = if let Some(data) = json_value.get("data").and_then(|d| d.as_array()) {
        // OpenAI data format
        data.first()
            .and_then(|item| item.get("embedding"))
            .and_then(|e| e.as_array())
            .ok_or_else(unrecognized)?
    } else if let Some(embedding) = json_value.get("embedding").and_then(|e| e.as_array()) {
        // Standard llama.cpp format
        embedding
    } else if let Some(arr) = json_value.as_array() {
        match arr.first() {
            None => {
                return Err(PipelineError::Embedding(
                    "Empty array returned from embedding server".to_string(),
                ))
            }
            Some(first) if first.is_object() => first
                .get("embedding")
                .and_then(|e| e.as_array())
                .ok_or_else(unrecognized)?,
            Some(_) => arr,
        }
    } else {
        return Err(unrecognized());
    };

    // Double nesting [[...]] shows up with pooled batch output
    let embedding = match field.first().and_then(|v| v.as_array()) {
        Some(inner) => as_vector(inner),
        None => as_vector(field),
    };

    if embedding.is_empty() {
        return Err(PipelineError::Embedding("Generated embedding is empty".to_string()));
    }

    Ok(embedding)
}
