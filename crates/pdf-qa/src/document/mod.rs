pub mod loader;
pub mod parser;
pub mod chunker;

pub use loader::DocumentLoader;
pub use parser::{DocumentParser, PageExtractor};
pub use chunker::{chunk_text, ChunkStrategy, FixedSizeChunks, TextChunker};
