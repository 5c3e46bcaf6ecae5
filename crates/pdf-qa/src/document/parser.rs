use crate::models::{display_name, Page, SourceDocument};
use crate::utils::error::PipelineError;
use async_trait::async_trait;
use encoding_rs::UTF_8;
use lopdf::Document as PdfDocument;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Turns a file into its ordered, 1-based pages. Never modifies the file.
#[async_trait]
pub trait PageExtractor: Send + Sync {
    async fn extract(&self, path: &Path) -> Result<SourceDocument, PipelineError>;
}

/// Extracts PDF pages with lopdf; `txt`/`md` files become a single page.
#[derive(Debug, Default, Clone)]
pub struct DocumentParser;

impl DocumentParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse document from path (blocking)
    pub fn parse(path: &Path) -> Result<SourceDocument, PipelineError> {
        let file_name = display_name(path);
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .ok_or_else(|| PipelineError::extraction(&file_name, "no file extension"))?;

        debug!("Parsing file: {:?} (type: {})", path, extension);

        let pages = match extension.as_str() {
            "pdf" => Self::parse_pdf(path, &file_name)?,
            _ => Self::parse_text(path, &file_name)?,
        };

        debug!("Parsed {} pages from {:?}", pages.len(), path);

        Ok(SourceDocument::new(path.to_path_buf(), pages))
    }

    /// Parse PDF using lopdf, one entry per page in physical order
    fn parse_pdf(path: &Path, file_name: &str) -> Result<Vec<Page>, PipelineError> {
        // The loaded document is dropped when this function returns
        let doc = PdfDocument::load(path).map_err(|e| PipelineError::extraction(file_name, e))?;

        let mut pages = Vec::new();

        // get_pages is keyed by page number, so iteration is already in order
        for page_number in doc.get_pages().keys().copied() {
            let raw_text = match doc.extract_text(&[page_number]) {
                Ok(text) => text,
                Err(e) => {
                    warn!(
                        "Failed to extract text from page {} of {}: {}",
                        page_number, file_name, e
                    );
                    String::new()
                }
            };

            pages.push(Page {
                page_number,
                raw_text,
                source_file: file_name.to_string(),
            });
        }

        Ok(pages)
    }

    /// Plain text as a single page
    fn parse_text(path: &Path, file_name: &str) -> Result<Vec<Page>, PipelineError> {
        let raw_content = fs::read(path).map_err(|e| PipelineError::extraction(file_name, e))?;
        let raw_text = Self::decode_text(&raw_content);

        Ok(vec![Page {
            page_number: 1,
            raw_text,
            source_file: file_name.to_string(),
        }])
    }

    /// Decode as UTF-8, replacing invalid sequences
    fn decode_text(bytes: &[u8]) -> String {
        if let Ok(text) = std::str::from_utf8(bytes) {
            return text.to_string();
        }

        let (decoded, _, had_errors) = UTF_8.decode(bytes);
        if had_errors {
            debug!("Replaced invalid UTF-8 sequences while decoding text");
        }
        decoded.into_owned()
    }
}

#[async_trait]
impl PageExtractor for DocumentParser {
    async fn extract(&self, path: &Path) -> Result<SourceDocument, PipelineError> {
        let path: PathBuf = path.to_path_buf();
        let file_name = display_name(&path);

        // lopdf is synchronous and CPU bound
        tokio::task::spawn_blocking(move || Self::parse(&path))
            .await
            .map_err(|e| PipelineError::extraction(file_name, e))?
    }
}
