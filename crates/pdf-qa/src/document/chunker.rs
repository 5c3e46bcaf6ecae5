use crate::models::{Chunk, ChunkKey, SourceDocument};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ChunkStrategy {
    WholeDocument, // all pages in one chunk
    PerPage,       // one chunk per page
    #[default]
    FixedSize,     // each page sliced into fixed-size chunks
}

impl std::str::FromStr for ChunkStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "whole-document" => Ok(Self::WholeDocument),
            "per-page" => Ok(Self::PerPage),
            "fixed-size" => Ok(Self::FixedSize),
            other => Err(format!(
                "unknown chunking strategy '{}' (expected whole-document, per-page or fixed-size)",
                other
            )),
        }
    }
}

/// Lazy positional slicing of a string into pieces of `max_chars` characters.
///
/// No overlap and no gaps: concatenating the pieces gives back the input. Every
/// piece but the last holds exactly `max_chars` characters. The iterator is
/// `Clone`, so a saved copy restarts from the same position.
#[derive(Debug, Clone)]
pub struct FixedSizeChunks<'a> {
    rest: &'a str,
    max_chars: usize,
}

pub fn chunk_text(text: &str, max_chars: usize) -> FixedSizeChunks<'_> {
    FixedSizeChunks {
        rest: text,
        max_chars,
    }
}

impl<'a> Iterator for FixedSizeChunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        // A zero size can never make progress
        if self.rest.is_empty() || self.max_chars == 0 {
            return None;
        }

        let split_at = self
            .rest
            .char_indices()
            .nth(self.max_chars)
            .map(|(idx, _)| idx)
            .unwrap_or(self.rest.len());

        let (head, tail) = self.rest.split_at(split_at);
        self.rest = tail;
        Some(head)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.rest.is_empty() || self.max_chars == 0 {
            return (0, Some(0));
        }
        // Byte length bounds the char count from above
        let upper = self.rest.len().div_ceil(self.max_chars);
        (1, Some(upper))
    }
}

impl std::iter::FusedIterator for FixedSizeChunks<'_> {}

pub struct TextChunker {
    chunk_size: usize,
    strategy: ChunkStrategy,
}

impl TextChunker {
    pub fn new(chunk_size: usize, strategy: ChunkStrategy) -> Self {
        Self {
            chunk_size,
            strategy,
        }
    }

    /// Split a document into chunks tagged with their position in the run.
    pub fn chunk_document(&self, document_index: usize, document: &SourceDocument) -> Vec<Chunk> {
        let chunks = match self.strategy {
            ChunkStrategy::WholeDocument => self.chunk_whole(document_index, document),
            ChunkStrategy::PerPage => self.chunk_per_page(document_index, document),
            ChunkStrategy::FixedSize => self.chunk_fixed(document_index, document),
        };

        debug!(
            "Created {} chunks for {} ({} pages, strategy {:?})",
            chunks.len(),
            document.file_name,
            document.pages.len(),
            self.strategy
        );

        chunks
    }

    /// Whole document as a single chunk, cited by its first page.
    fn chunk_whole(&self, document_index: usize, document: &SourceDocument) -> Vec<Chunk> {
        let text = document
            .pages
            .iter()
            .map(|p| p.raw_text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        if text.is_empty() {
            return Vec::new();
        }

        let page_number = document.pages.first().map(|p| p.page_number).unwrap_or(1);

        vec![Chunk {
            key: ChunkKey {
                document_index,
                page_number,
                chunk_index: 0,
            },
            text,
            page_number,
            source_filename: document.file_name.clone(),
        }]
    }

    fn chunk_per_page(&self, document_index: usize, document: &SourceDocument) -> Vec<Chunk> {
        document
            .pages
            .iter()
            .filter(|page| {
                let keep = !page.raw_text.is_empty();
                if !keep {
                    debug!("Skipping empty page {} of {}", page.page_number, document.file_name);
                }
                keep
            })
            .map(|page| Chunk {
                key: ChunkKey {
                    document_index,
                    page_number: page.page_number,
                    chunk_index: 0,
                },
                text: page.raw_text.clone(),
                page_number: page.page_number,
                source_filename: document.file_name.clone(),
            })
            .collect()
    }

    fn chunk_fixed(&self, document_index: usize, document: &SourceDocument) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        for page in &document.pages {
            // Empty text yields no pieces; whitespace is kept verbatim
            for (chunk_index, piece) in chunk_text(&page.raw_text, self.chunk_size).enumerate() {
                chunks.push(Chunk {
                    key: ChunkKey {
                        document_index,
                        page_number: page.page_number,
                        chunk_index,
                    },
                    text: piece.to_string(),
                    page_number: page.page_number,
                    source_filename: document.file_name.clone(),
                });
            }
        }

        chunks
    }
}
