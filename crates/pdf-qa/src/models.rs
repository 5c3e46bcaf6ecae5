use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// A document found in the source directory, with its extracted pages.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub path: PathBuf,
    pub file_name: String,
    pub pages: Vec<Page>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// 1-based, physical page order
    pub page_number: u32,
    pub raw_text: String,
    pub source_file: String,
}

/// Position of a chunk in discovery order: document, then page, then slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ChunkKey {
    pub document_index: usize,
    pub page_number: u32,
    pub chunk_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub key: ChunkKey,
    pub text: String,
    pub page_number: u32,
    pub source_filename: String,
}

/// Model output for one chunk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerRecord {
    pub key: ChunkKey,
    pub rationale: String,
    pub answer: String,
    pub page_number: u32,
    pub source_filename: String,
}

/// An answer that passed the relevance filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetainedAnswer {
    pub record: AnswerRecord,
    pub similarity: f32,
}

impl SourceDocument {
    pub fn new(path: PathBuf, pages: Vec<Page>) -> Self {
        let file_name = display_name(&path);
        Self {
            path,
            file_name,
            pages,
        }
    }
}

impl RetainedAnswer {
    pub fn citation(&self) -> String {
        format_citation(self.record.page_number, &self.record.source_filename)
    }

    /// Answer text followed by its citation, as fed to aggregation.
    pub fn render(&self) -> String {
        format!("{} {}", self.record.answer, self.citation())
    }
}

impl fmt::Display for RetainedAnswer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

pub fn format_citation(page_number: u32, source_filename: &str) -> String {
    format!("(page {} from file {})", page_number, source_filename)
}

/// File name used in citations; falls back to the full path.
pub fn display_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}
